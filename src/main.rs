use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use poetry_admin::buckets::{EntitySource, Granularity};
use poetry_admin::config::{self, Preferences};
use poetry_admin::dashboard::DashboardStats;
use poetry_admin::leaderboard::LeaderboardKind;
use poetry_admin::logging;
use poetry_admin::progress::{format_leaderboard_table, Spinner};
use poetry_admin::renderer;
use poetry_admin::stats::DashboardReport;
use poetry_admin::store::{read_dump, DocumentStore, MemoryStore, SqliteStore};
use poetry_admin::window::TimeWindow;

#[derive(Parser)]
#[command(name = "poetry-admin")]
#[command(about = "Engagement analytics for the poetry admin console", long_about = None)]
struct Cli {
    /// SQLite document store (defaults to the preferences' store path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON dump to read instead of the SQLite store
    #[arg(long, global = true)]
    dump: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON dump into the SQLite store
    Import,
    /// Headline counters
    Summary,
    /// Comments awaiting a moderator reply
    Backlog,
    /// Oldest pending poem requests
    Queue {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// User id to display name table
    Names,
    /// Bucketed counts of poems or users
    Series {
        #[arg(long, value_enum)]
        entity: EntityArg,
        #[arg(long, value_enum)]
        granularity: GranularityArg,
        /// Year for the month granularity (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Poems with the most comments
    TopPoems {
        /// today, week, month, year or all
        #[arg(long, default_value = "all")]
        window: TimeWindow,
    },
    /// Most commenting users or most active poets
    Leaderboard {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long, default_value = "all")]
        window: TimeWindow,
        /// Number of rows (defaults to the preferences' leaderboard limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Print an aligned text table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Every dashboard query in one report
    Report {
        #[arg(long, default_value = "all")]
        window: TimeWindow,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum, default_value = "json")]
        render: RenderFormat,
        /// Directory to write the report into (prints to stdout otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Import => "import",
            Commands::Summary => "summary",
            Commands::Backlog => "backlog",
            Commands::Queue { .. } => "queue",
            Commands::Names => "names",
            Commands::Series { .. } => "series",
            Commands::TopPoems { .. } => "top-poems",
            Commands::Leaderboard { .. } => "leaderboard",
            Commands::Report { .. } => "report",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EntityArg {
    Poems,
    Users,
}

impl From<EntityArg> for EntitySource {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::Poems => EntitySource::Poems,
            EntityArg::Users => EntitySource::Users,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Hour,
    Weekday,
    Day,
    Month,
    Year,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Commenters,
    Poets,
}

impl From<KindArg> for LeaderboardKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Commenters => LeaderboardKind::MostCommentedUsers,
            KindArg::Poets => LeaderboardKind::MostActivePoets,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RenderFormat {
    Md,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_root = config::resolve_data_root()?;
    let prefs = Preferences::load_from(&data_root)?;
    logging::init_logging(&data_root, cli.command.name())?;

    tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")?
        .block_on(run(cli, &data_root, &prefs))
}

async fn run(cli: Cli, data_root: &Path, prefs: &Preferences) -> Result<()> {
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| prefs.store_path_or_default(data_root));
    let dump = cli.dump.as_deref();
    let open = || -> Result<DashboardStats> { Ok(DashboardStats::new(open_store(dump, &db_path)?)) };

    match cli.command {
        Commands::Import => {
            let dump_path = dump.context("import needs --dump <json>")?;
            import(dump_path, &db_path)
        }
        Commands::Summary => print_json(&open()?.dashboard_summary().await),
        Commands::Backlog => print_json(&open()?.reply_backlog().await),
        Commands::Queue { limit } => print_json(&open()?.request_queue(limit).await),
        Commands::Names => print_json(&open()?.user_names_map().await),
        Commands::Series {
            entity,
            granularity,
            year,
        } => {
            let granularity = match granularity {
                GranularityArg::Hour => Granularity::HourOfDay,
                GranularityArg::Weekday => Granularity::DayOfWeek,
                GranularityArg::Day => Granularity::DayOfMonth,
                GranularityArg::Month => {
                    Granularity::MonthOfYear(year.unwrap_or_else(|| chrono::Local::now().year()))
                }
                GranularityArg::Year => Granularity::Year,
            };
            print_json(&open()?.series(entity.into(), granularity).await)
        }
        Commands::TopPoems { window } => print_json(&open()?.top_poems_by_comments(window).await),
        Commands::Leaderboard {
            kind,
            window,
            limit,
            table,
        } => {
            let limit = limit.unwrap_or(prefs.leaderboard_limit);
            let entries = open()?.leaderboard(kind.into(), window, limit).await;
            if table {
                print!("{}", format_leaderboard_table(&entries));
                Ok(())
            } else {
                print_json(&entries)
            }
        }
        Commands::Report {
            window,
            year,
            render,
            output,
        } => {
            let stats = open()?;
            let spinner = Spinner::start("Computing dashboard report…");
            let report = stats.report(window, year, prefs.leaderboard_limit).await;
            spinner.finish();
            write_report(&report, render, output.as_deref())
        }
    }
}

/// A dump file wins over the SQLite store when both are given.
fn open_store(dump: Option<&Path>, db_path: &Path) -> Result<Arc<dyn DocumentStore>> {
    if let Some(dump) = dump {
        return Ok(Arc::new(MemoryStore::load_from_file(dump)?));
    }
    if !db_path.exists() {
        anyhow::bail!(
            "No document store at {}. Run `poetry-admin import --dump <json>` first or pass --dump.",
            db_path.display()
        );
    }
    Ok(Arc::new(SqliteStore::init(db_path)?))
}

fn import(dump_path: &Path, db_path: &Path) -> Result<()> {
    let dump = read_dump(dump_path)?;
    let store = SqliteStore::init(db_path)?;
    let written = store.import_dump(&dump)?;
    eprintln!("Imported {} documents into {}", written, db_path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

fn write_report(report: &DashboardReport, render: RenderFormat, output: Option<&Path>) -> Result<()> {
    let (content, extension) = match render {
        RenderFormat::Md => (renderer::md::render(report)?, "md"),
        RenderFormat::Json => (
            serde_json::to_string_pretty(report).context("Failed to serialize dashboard report")?,
            "json",
        ),
    };

    let Some(output_dir) = output else {
        println!("{}", content);
        return Ok(());
    };

    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;
    let output_path = output_dir.join(default_report_filename(report, extension));
    std::fs::write(&output_path, content)
        .with_context(|| format!("Failed to write report: {}", output_path.display()))?;
    eprintln!("Report written to: {}", output_path.display());
    Ok(())
}

fn default_report_filename(report: &DashboardReport, extension: &str) -> String {
    format!("dashboard-{}-{}.{}", report.window.as_str(), report.year, extension)
}
