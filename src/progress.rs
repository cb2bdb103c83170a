/// Terminal presentation helpers for the CLI.
///
/// A spinner while long queries run (TTY only) and fixed-width leaderboard
/// tables whose name column is truncated by display width.
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::leaderboard::LeaderboardEntry;

/// Width of the name column in leaderboard tables.
const NAME_WIDTH: usize = 32;

/// Truncates a string to a display width with a middle ellipsis if needed,
/// padding shorter strings to exactly `max_width` columns.
///
/// - "Short name" (limit 20) → "Short name          "
/// - "A very long poet name indeed" (limit 15) → "A very … indeed"
pub fn truncate_middle(s: &str, max_width: usize) -> String {
    let width = s.width();
    if width <= max_width {
        return pad_to(s.to_string(), width, max_width);
    }

    let ellipsis = '…';
    let ellipsis_width = ellipsis.width().unwrap_or(1);
    if max_width <= ellipsis_width {
        let (head, used) = take_width(s.chars(), max_width);
        return pad_to(head, used, max_width);
    }

    let available = max_width - ellipsis_width;
    let (start, start_used) = take_width(s.chars(), available.div_ceil(2));
    let (end_rev, end_used) = take_width(s.chars().rev(), available / 2);
    let end: String = end_rev.chars().rev().collect();

    let out = format!("{}{}{}", start, ellipsis, end);
    pad_to(out, start_used + ellipsis_width + end_used, max_width)
}

/// Take characters while their summed display width fits `budget`.
fn take_width(chars: impl Iterator<Item = char>, budget: usize) -> (String, usize) {
    let mut out = String::new();
    let mut used = 0;
    for ch in chars {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    (out, used)
}

fn pad_to(mut s: String, width: usize, target: usize) -> String {
    s.extend(std::iter::repeat(' ').take(target.saturating_sub(width)));
    s
}

/// Formats a leaderboard as an aligned text table.
///
/// ```text
///  #  Name                             Count
///  1  Alice                                2
/// ```
pub fn format_leaderboard_table(entries: &[LeaderboardEntry]) -> String {
    let mut out = format!("{:>2}  {}  {:>5}\n", "#", truncate_middle("Name", NAME_WIDTH), "Count");
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}  {}  {:>5}\n",
            i + 1,
            truncate_middle(&entry.name, NAME_WIDTH),
            entry.count
        ));
    }
    out
}

/// Spinner shown on stderr while a query runs.
///
/// In non-TTY mode nothing is drawn.
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "))
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Clears the spinner from the terminal.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_follows_tty() {
        let spinner = Spinner::start("Computing");
        assert_eq!(spinner.bar.is_some(), std::io::stderr().is_terminal());
        spinner.finish();
    }

    #[test]
    fn test_truncate_middle_short() {
        let out = truncate_middle("Short name", 20);
        assert!(out.starts_with("Short name"));
        assert_eq!(out.width(), 20);
    }

    #[test]
    fn test_truncate_middle_long() {
        let out = truncate_middle("A very long poet name indeed", 15);
        assert_eq!(out, "A very … indeed");
        assert_eq!(out.width(), 15);
    }

    #[test]
    fn test_truncate_middle_wide_chars() {
        // each CJK character is two columns wide
        let out = truncate_middle("李白李白李白李白李白", 9);
        assert!(out.contains('…'));
        assert_eq!(out.width(), 9);
    }

    #[test]
    fn test_truncate_middle_tiny_width() {
        assert_eq!(truncate_middle("Rumi", 1), "R");
    }

    #[test]
    fn test_leaderboard_table() {
        let entries = vec![
            LeaderboardEntry {
                user_id: "u1".to_string(),
                name: "Alice".to_string(),
                count: 12,
            },
            LeaderboardEntry {
                user_id: "u2".to_string(),
                name: "Bo".to_string(),
                count: 3,
            },
        ];
        let table = format_leaderboard_table(&entries);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Name"));
        assert!(lines[1].starts_with(" 1  Alice"));
        assert!(lines[1].ends_with("   12"));
        assert_eq!(lines[1].width(), lines[2].width());
    }
}
