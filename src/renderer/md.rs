use crate::buckets::SeriesPoint;
use crate::leaderboard::{LeaderboardEntry, TopPoem};
use crate::stats::*;
use anyhow::Result;

/// Render a dashboard report to Markdown
pub fn render(report: &DashboardReport) -> Result<String> {
    let mut output = String::new();

    render_header(&mut output, report);
    render_summary(&mut output, &report.summary, &report.reply_backlog);
    render_request_queue(&mut output, &report.request_queue);

    output.push_str("### 📈 Poems\n");
    render_series_set(&mut output, &report.poems, report.year);
    output.push_str("### 🧑 Users\n");
    render_series_set(&mut output, &report.users, report.year);

    output.push_str(&format!("### 🏆 Rankings — {}\n", report.window.label()));
    render_rankings(&mut output, &report.rankings);
    output.push_str("### 🏛️ Rankings — All Time\n");
    render_rankings(&mut output, &report.rankings_all_time);

    Ok(output)
}

fn render_header(output: &mut String, report: &DashboardReport) {
    output.push_str("# 📜 Poetry Dashboard\n");
    output.push_str(&format!(
        "Generated {} · window: **{}** · year: **{}**\n\n",
        report.generated_at,
        report.window.label(),
        report.year
    ));
}

fn render_summary(output: &mut String, summary: &DashboardSummary, backlog: &ReplyBacklog) {
    output.push_str("### 📊 Summary\n");
    let rows = [
        ("Total poems", summary.total_poems),
        ("Total users", summary.total_users),
        ("Pending requests", summary.pending_requests),
        ("Poems this month", summary.poems_this_month),
        ("Poems this year", summary.poems_this_year),
        ("Users this year", summary.users_this_year),
        ("Comments awaiting reply", backlog.awaiting_reply),
    ];
    for (label, value) in rows {
        output.push_str(&format!("- **{}**: {}\n", label, format_number(value)));
    }
    output.push('\n');
}

fn render_request_queue(output: &mut String, queue: &[QueuedRequest]) {
    if queue.is_empty() {
        return;
    }
    output.push_str("### 📥 Oldest pending requests\n");
    output.push_str("| Title | Requested by | Submitted |\n");
    output.push_str("| ----- | ------------ | --------- |\n");
    for req in queue {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&req.title),
            escape_cell(&req.requested_by),
            req.submitted_at.as_deref().unwrap_or("-")
        ));
    }
    output.push('\n');
}

fn render_series_set(output: &mut String, set: &SeriesSet, year: i32) {
    output.push_str("#### 🕐 Today by hour\n");
    render_series_row(output, &set.per_hour_today);

    output.push_str("#### 📅 This week\n");
    render_series_row(output, &set.per_day_this_week);

    output.push_str("#### 🗓️ This month\n");
    render_series_row(output, &set.per_day_this_month);

    output.push_str(&format!("#### 📆 By month ({})\n", year));
    render_series_row(output, &set.per_month);

    if !set.per_year.is_empty() {
        output.push_str("#### 📆 By year\n");
        output.push_str("| Year | Count |\n");
        output.push_str("| ---- | ----- |\n");
        for point in &set.per_year {
            output.push_str(&format!("| {} | {} |\n", point.label, format_number(point.value)));
        }
        output.push('\n');
    }
}

/// One table, one column per bucket, split into rows of twelve.
fn render_series_row(output: &mut String, series: &[SeriesPoint]) {
    for chunk in series.chunks(12) {
        output.push('|');
        for point in chunk {
            output.push_str(&format!(" {} |", point.label));
        }
        output.push('\n');
        output.push('|');
        for _ in chunk {
            output.push_str(" --- |");
        }
        output.push('\n');
        output.push('|');
        for point in chunk {
            output.push_str(&format!(" {} |", format_number(point.value)));
        }
        output.push_str("\n\n");
    }
}

fn render_rankings(output: &mut String, rankings: &Rankings) {
    render_top_poems(output, &rankings.top_poems);
    render_leaderboard(output, "💬 Most commented users", "Comments", &rankings.most_commented_users);
    render_leaderboard(output, "✍️ Most active poets", "Poems", &rankings.most_active_poets);
}

fn render_top_poems(output: &mut String, top: &[TopPoem]) {
    output.push_str("#### 🔥 Top poems by comments\n");
    if top.is_empty() {
        output.push_str("_No comments in this period._\n\n");
        return;
    }
    for (i, poem) in top.iter().enumerate() {
        output.push_str(&format!(
            "{}. **{}** (`{}`): {} {}\n",
            i + 1,
            poem.title,
            poem.slug,
            format_number(poem.comment_count),
            plural(poem.comment_count, "comment", "comments")
        ));
    }
    output.push('\n');
}

fn render_leaderboard(output: &mut String, title: &str, unit: &str, entries: &[LeaderboardEntry]) {
    output.push_str(&format!("#### {}\n", title));
    if entries.is_empty() {
        output.push_str("_Nobody yet._\n\n");
        return;
    }
    output.push_str(&format!("| # | Name | {} |\n", unit));
    output.push_str("| - | ---- | --- |\n");
    for (i, entry) in entries.iter().enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            escape_cell(&entry.name),
            format_number(entry.count)
        ));
    }
    output.push('\n');
}

fn plural<'a>(n: u64, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Keep user-supplied text from breaking the table.
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// Format a count with thousands separators (1234567 → "1,234,567").
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped_rev = String::new();

    for (count, ch) in digits.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            grouped_rev.push(',');
        }
        grouped_rev.push(ch);
    }

    grouped_rev.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::UserNames;
    use crate::window::TimeWindow;

    fn point(label: &str, value: u64) -> SeriesPoint {
        SeriesPoint {
            label: label.to_string(),
            value,
        }
    }

    fn report() -> DashboardReport {
        DashboardReport {
            schema_version: 1,
            generated_at: "2025-03-12 15:30:00 +00:00".to_string(),
            window: TimeWindow::Week,
            year: 2025,
            summary: DashboardSummary {
                total_poems: 1234,
                total_users: 2,
                pending_requests: 1,
                poems_this_month: 0,
                poems_this_year: 7,
                users_this_year: 2,
            },
            reply_backlog: ReplyBacklog {
                total_comments: 3,
                replied: 1,
                awaiting_reply: 2,
            },
            request_queue: vec![QueuedRequest {
                id: "r1".to_string(),
                title: "Ode | Sonnet".to_string(),
                requested_by: "Bo".to_string(),
                submitted_at: None,
            }],
            poems: SeriesSet {
                per_hour_today: (0..24).map(|h| point(&h.to_string(), 0)).collect(),
                per_year: vec![point("2024", 3), point("2025", 4)],
                ..SeriesSet::default()
            },
            users: SeriesSet::default(),
            rankings: Rankings {
                top_poems: vec![TopPoem {
                    slug: "p1".to_string(),
                    title: "First".to_string(),
                    comment_count: 1,
                }],
                most_commented_users: vec![LeaderboardEntry {
                    user_id: "u1".to_string(),
                    name: "Alice".to_string(),
                    count: 2,
                }],
                most_active_poets: vec![],
            },
            rankings_all_time: Rankings::default(),
            user_names: UserNames::new(),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_render_sections() {
        let md = render(&report()).unwrap();
        assert!(md.starts_with("# 📜 Poetry Dashboard\n"));
        assert!(md.contains("window: **This Week**"));
        assert!(md.contains("- **Total poems**: 1,234"));
        assert!(md.contains("- **Comments awaiting reply**: 2"));
        assert!(md.contains("| Ode \\| Sonnet | Bo | - |"));
        assert!(md.contains("| 2025 | 4 |"));
        assert!(md.contains("1. **First** (`p1`): 1 comment\n"));
        assert!(md.contains("| 1 | Alice | 2 |"));
        assert!(md.contains("_Nobody yet._"));
        assert!(md.contains("### 🏛️ Rankings — All Time"));
    }

    #[test]
    fn test_hourly_series_splits_into_rows_of_twelve() {
        let mut out = String::new();
        let series: Vec<_> = (0..24).map(|h| point(&h.to_string(), h + 100)).collect();
        render_series_row(&mut out, &series);

        let header_rows: Vec<_> = out.lines().filter(|l| l.starts_with("| 0 |") || l.starts_with("| 12 |")).collect();
        assert_eq!(header_rows.len(), 2);
        assert!(out.contains("| 23 |\n"));
    }
}
