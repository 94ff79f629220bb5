//! Console report of a finished run.

use colored::*;

use crate::application::summary::{PREVIEW_ROWS, ResultRow, RunSummary};
use crate::domain::entities::LinkStatus;

const PROVIDER_WIDTH: usize = 24;
const URL_WIDTH: usize = 60;

/// Renders the run summary printed at the end of `link-verifier`.
///
/// # Output Format
///
/// ```text
/// 🔗 Link verification
///
///   Processed 3 of 3 candidates: 1 valid, 1 redirected, 1 broken; 3 written, 0 unpersisted
///
///   Valid:       1
///   Redirected:  1
///   Broken:      1
///
///   ID      Provider                 Status      Final URL
///   ────────────────────────────────────────────────────────────────
///   1       Acme                     valid       https://acme.com/a
/// ```
pub fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", "🔗 Link verification".bright_blue().bold()));
    out.push_str(&format!("  {}\n\n", summary.totals_line().bright_white()));

    for status in LinkStatus::ALL {
        out.push_str(&format!(
            "  {:<12} {}\n",
            format!("{}:", capitalize(status.as_str())),
            paint(status, &summary.count(status).to_string()).bold()
        ));
    }

    if summary.without_link > 0 {
        out.push_str(&format!(
            "  {:<12} {}\n",
            "No link:",
            summary.without_link.to_string().bright_black()
        ));
    }
    out.push('\n');

    if summary.dry_run {
        out.push_str(&format!(
            "  {}\n",
            format!("Dry run: {} verdicts not written", summary.skipped_writes).yellow()
        ));
    } else if summary.persist_failures > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("⚠️  {} verdicts could not be written", summary.persist_failures)
                .red()
                .bold()
        ));
    }
    if summary.task_failures > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("⚠️  {} records failed unexpectedly", summary.task_failures).red()
        ));
    }
    if summary.interrupted > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("⏹  {} records left unverified (interrupted)", summary.interrupted).yellow()
        ));
    }

    let preview = summary.preview();
    if preview.is_empty() {
        return out;
    }

    out.push_str(&format!(
        "\n  {:<7} {:<width$} {:<11} {}\n",
        "ID".bright_white().bold(),
        "Provider".bright_white().bold(),
        "Status".bright_white().bold(),
        "Final URL".bright_white().bold(),
        width = PROVIDER_WIDTH
    ));
    out.push_str(&format!("  {}\n", "─".repeat(80).bright_black()));

    for row in preview {
        out.push_str(&render_row(row));
    }

    if summary.rows.len() > PREVIEW_ROWS {
        out.push_str(&format!(
            "  {}\n",
            format!("… {} more", summary.rows.len() - PREVIEW_ROWS).bright_black()
        ));
    }
    if preview.iter().any(ResultRow::is_unpersisted) {
        out.push_str(&format!("\n  {} verdict not written\n", "*".red().bold()));
    }

    out
}

fn render_row(row: &ResultRow) -> String {
    let marker = if row.is_unpersisted() {
        "*".red().bold()
    } else {
        " ".normal()
    };

    format!(
        "  {:<6}{} {:<width$} {:<11} {}\n",
        row.id.to_string().bright_black(),
        marker,
        truncate(&row.provider, PROVIDER_WIDTH).cyan(),
        paint(row.status, row.status.as_str()),
        truncate(row.final_url.as_deref().unwrap_or("-"), URL_WIDTH),
        width = PROVIDER_WIDTH
    )
}

fn paint(status: LinkStatus, text: &str) -> ColoredString {
    match status {
        LinkStatus::Valid => text.green(),
        LinkStatus::Redirected => text.yellow(),
        LinkStatus::Broken => text.red(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Shortens `s` to at most `max` characters, marking the cut with `…`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::PersistOutcome;

    fn row(
        id: i64,
        status: LinkStatus,
        final_url: Option<&str>,
        persist: PersistOutcome,
    ) -> ResultRow {
        ResultRow {
            id,
            provider: "Seguros SURA".to_string(),
            status,
            final_url: final_url.map(str::to_string),
            persist,
        }
    }

    fn plain(summary: &RunSummary) -> String {
        colored::control::set_override(false);
        render(summary)
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("bolívar-seguros", 4), "bol…");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("redirected"), "Redirected");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_render_live_run() {
        let mut summary = RunSummary::new(false);
        summary.candidates = 2;
        summary.record(row(
            7,
            LinkStatus::Redirected,
            Some("https://sura.com/new"),
            PersistOutcome::Written,
        ));
        summary.record(row(
            9,
            LinkStatus::Broken,
            None,
            PersistOutcome::Failed("timeout".into()),
        ));

        let out = plain(&summary);

        assert!(out.contains(&summary.totals_line()));
        assert!(out.contains("Redirected:  1"));
        assert!(out.contains("https://sura.com/new"));
        assert!(out.contains("1 verdicts could not be written"));
        assert!(out.contains("9     *"));
        assert!(out.contains("* verdict not written"));
    }

    #[test]
    fn test_render_dry_run_preview_is_capped() {
        let mut summary = RunSummary::new(true);
        for id in 0..25 {
            summary.record(row(
                id,
                LinkStatus::Valid,
                Some("https://sura.com/"),
                PersistOutcome::Skipped,
            ));
        }
        summary.candidates = 25;

        let out = plain(&summary);

        assert!(out.contains("Dry run: 25 verdicts not written"));
        assert_eq!(out.matches("https://sura.com/").count(), PREVIEW_ROWS);
        assert!(out.contains("… 5 more"));
        assert!(!out.contains("verdict not written\n"));
    }

    #[test]
    fn test_render_empty_run() {
        let summary = RunSummary::new(false);
        let out = plain(&summary);
        assert!(out.contains("Processed 0 of 0 candidates"));
        assert!(!out.contains("Final URL"));
    }
}
