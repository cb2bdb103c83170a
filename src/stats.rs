use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::buckets::SeriesPoint;
use crate::leaderboard::{LeaderboardEntry, TopPoem, UserNames};
use crate::window::TimeWindow;

#[cfg(test)]
use anyhow::{anyhow, bail};
#[cfg(test)]
use jsonschema::{Draft, JSONSchema};

/// Headline counters of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_poems: u64,
    pub total_users: u64,
    pub pending_requests: u64,
    pub poems_this_month: u64,
    pub poems_this_year: u64,
    pub users_this_year: u64,
}

/// Comments split by whether a moderator has replied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBacklog {
    pub total_comments: u64,
    pub replied: u64,
    pub awaiting_reply: u64,
}

/// One pending poem request, oldest first in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub id: String,
    pub title: String,
    pub requested_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

/// The five bucketed series of one entity source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSet {
    pub per_hour_today: Vec<SeriesPoint>,
    pub per_day_this_week: Vec<SeriesPoint>,
    pub per_day_this_month: Vec<SeriesPoint>,
    pub per_month: Vec<SeriesPoint>,
    pub per_year: Vec<SeriesPoint>,
}

/// Ranked lists for one time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rankings {
    pub top_poems: Vec<TopPoem>,
    pub most_commented_users: Vec<LeaderboardEntry>,
    pub most_active_poets: Vec<LeaderboardEntry>,
}

/// Everything the overview page shows, computed in one pass.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub schema_version: i32,
    pub generated_at: String,
    pub window: TimeWindow,
    pub year: i32,
    pub summary: DashboardSummary,
    pub reply_backlog: ReplyBacklog,
    pub request_queue: Vec<QueuedRequest>,
    pub poems: SeriesSet,
    pub users: SeriesSet,
    pub rankings: Rankings,
    pub rankings_all_time: Rankings,
    pub user_names: UserNames,
}

impl DashboardReport {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report file: {}", path.display()))?;

        let report: DashboardReport = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from: {}", path.display()))?;

        Ok(report)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize dashboard report")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report file: {}", path.display()))?;
        Ok(())
    }

    #[cfg(test)]
    /// Validate report JSON against the JSON schema
    pub fn validate_with_schema(report_json: &serde_json::Value, schema: &JSONSchema) -> Result<()> {
        match schema.validate(report_json) {
            Ok(_) => Ok(()),
            Err(errors) => {
                let error_messages: Vec<String> = errors
                    .map(|e| format!("  - {}: {}", e.instance_path, e))
                    .collect();
                bail!("Report validation failed:\n{}", error_messages.join("\n"))
            }
        }
    }

    #[cfg(test)]
    /// Load and compile the JSON schema
    pub fn load_schema(schema_path: &Path) -> Result<JSONSchema> {
        let schema_content = std::fs::read_to_string(schema_path)
            .with_context(|| format!("Failed to read schema file: {}", schema_path.display()))?;

        let schema_json: serde_json::Value =
            serde_json::from_str(&schema_content).with_context(|| {
                format!(
                    "Failed to parse schema JSON from: {}",
                    schema_path.display()
                )
            })?;

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_json)
            .map_err(|e| anyhow!("Failed to compile JSON schema: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn get_schema_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("report_schema.json")
    }

    fn point(label: &str, value: u64) -> SeriesPoint {
        SeriesPoint {
            label: label.to_string(),
            value,
        }
    }

    fn sample_report() -> DashboardReport {
        let mut user_names = UserNames::new();
        user_names.insert("u1".to_string(), "Alice".to_string());

        DashboardReport {
            schema_version: 1,
            generated_at: "2025-03-12 15:30:00".to_string(),
            window: TimeWindow::Month,
            year: 2025,
            summary: DashboardSummary {
                total_poems: 3,
                total_users: 1,
                pending_requests: 1,
                poems_this_month: 2,
                poems_this_year: 3,
                users_this_year: 1,
            },
            reply_backlog: ReplyBacklog {
                total_comments: 2,
                replied: 1,
                awaiting_reply: 1,
            },
            request_queue: vec![QueuedRequest {
                id: "r1".to_string(),
                title: "Ode".to_string(),
                requested_by: "Bo".to_string(),
                submitted_at: None,
            }],
            poems: SeriesSet {
                per_year: vec![point("2024", 1), point("2025", 2)],
                ..SeriesSet::default()
            },
            users: SeriesSet::default(),
            rankings: Rankings {
                top_poems: vec![TopPoem {
                    slug: "p1".to_string(),
                    title: "First".to_string(),
                    comment_count: 2,
                }],
                most_commented_users: vec![LeaderboardEntry {
                    user_id: "u1".to_string(),
                    name: "Alice".to_string(),
                    count: 2,
                }],
                most_active_poets: vec![],
            },
            rankings_all_time: Rankings::default(),
            user_names,
        }
    }

    #[test]
    fn test_load_schema() {
        let result = DashboardReport::load_schema(&get_schema_path());
        assert!(result.is_ok(), "Failed to load schema: {:?}", result.err());
    }

    #[test]
    fn test_sample_report_matches_schema() {
        let schema = DashboardReport::load_schema(&get_schema_path()).expect("Failed to load schema");
        let value = serde_json::to_value(sample_report()).unwrap();
        let result = DashboardReport::validate_with_schema(&value, &schema);
        assert!(result.is_ok(), "Sample report failed validation: {:?}", result.err());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(value["summary"]["totalPoems"], json!(3));
        assert_eq!(value["window"], json!("month"));
        assert_eq!(value["rankings"]["topPoems"][0]["commentCount"], json!(2));
        assert_eq!(value["rankings"]["mostCommentedUsers"][0]["userId"], json!("u1"));
        assert_eq!(value["userNames"]["u1"], json!("Alice"));
        assert!(value["requestQueue"][0].get("submittedAt").is_none());
    }

    #[test]
    fn test_validate_missing_summary_field() {
        let schema = DashboardReport::load_schema(&get_schema_path()).expect("Failed to load schema");
        let mut value = serde_json::to_value(sample_report()).unwrap();
        value["summary"]
            .as_object_mut()
            .unwrap()
            .remove("pendingRequests");

        let result = DashboardReport::validate_with_schema(&value, &schema);
        assert!(result.is_err(), "Should fail validation for missing 'pendingRequests'");
        let err_msg = format!("{:?}", result.err().unwrap());
        assert!(err_msg.contains("pendingRequests"), "Error should mention missing field");
    }

    #[test]
    fn test_validate_unknown_window() {
        let schema = DashboardReport::load_schema(&get_schema_path()).expect("Failed to load schema");
        let mut value = serde_json::to_value(sample_report()).unwrap();
        value["window"] = json!("fortnight");

        assert!(DashboardReport::validate_with_schema(&value, &schema).is_err());
    }

    #[test]
    fn test_validate_negative_count() {
        let schema = DashboardReport::load_schema(&get_schema_path()).expect("Failed to load schema");
        let mut value = serde_json::to_value(sample_report()).unwrap();
        value["poems"]["perYear"][0]["value"] = json!(-1);

        assert!(DashboardReport::validate_with_schema(&value, &schema).is_err());
    }

    #[test]
    fn test_save_and_load_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = sample_report();

        report.save_to_file(&path).unwrap();
        let loaded = DashboardReport::load_from_file(&path).unwrap();

        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.rankings, report.rankings);
        assert_eq!(loaded.user_names, report.user_names);
    }
}
