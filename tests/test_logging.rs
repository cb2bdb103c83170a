use poetry_admin::logging;

#[test]
fn test_logging_writes_session_and_events() -> anyhow::Result<()> {
    let data_dir = tempfile::tempdir()?;

    logging::init_logging(data_dir.path(), "report")?;
    tracing::warn!("Test warning message");

    let log_file = logging::log_file(data_dir.path());
    assert!(log_file.exists(), "log file not created: {}", log_file.display());

    let contents = std::fs::read_to_string(&log_file)?;
    assert!(contents.contains("New session: report"));
    assert!(contents.contains(&"=".repeat(80)));
    assert!(contents.contains("Test warning message"));

    // a second session appends to the same file
    logging::init_logging(data_dir.path(), "summary")?;
    let contents = std::fs::read_to_string(&log_file)?;
    assert!(contents.contains("New session: report"));
    assert!(contents.contains("New session: summary"));

    Ok(())
}
