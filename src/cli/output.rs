//! Console output helpers shared by the CLI commands.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    pub fn info(msg: &str) {
        println!("{} {}", style("·").cyan(), msg);
    }

    pub fn success(msg: &str) {
        println!("{} {}", style("ok").green().bold(), msg);
    }

    /// Warnings and errors go to stderr so piped output stays clean.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style("warning").yellow().bold(), msg);
    }

    pub fn error(msg: &str) {
        eprintln!("{} {}", style("error").red().bold(), msg);
    }

    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    pub fn kv(key: &str, value: &str) {
        println!("  {} {}", style(format!("{key}:")).dim(), value);
    }

    /// One line per indexed source in the stats listing.
    pub fn source_info(source_id: &str, kind: &str, chunks: u32, reference: Option<&str>) {
        let mut line = format!(
            "  {} {} ({kind}, {chunks} chunks",
            style("·").cyan(),
            style(source_id).bold()
        );
        if let Some(pdf_id) = reference {
            line.push_str(&format!(", discusses {pdf_id}"));
        }
        line.push(')');
        println!("{line}");
    }

    /// One fused search hit with provenance and score.
    pub fn search_result(source_id: &str, span: &str, score: f32, content: &str) {
        println!(
            "\n{} {} ({})",
            style(format!("{score:.2}")).green().bold(),
            style(source_id).bold(),
            style(span).cyan()
        );
        println!("   {}", content_preview(content, 200));
    }

    pub fn citation(formatted: &str) {
        println!("  {formatted}");
    }

    pub fn spinner(msg: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner().with_message(msg.to_string());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("static spinner template"),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }
}

/// First `max_chars` characters of `content` on one line, with an ellipsis
/// when truncated.
fn content_preview(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    let mut preview: String = flat.chars().take(max_chars).collect();
    if preview.len() < flat.len() {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview_truncates_on_char_boundary() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("multi\nline", 10), "multi line");
        let truncated = content_preview("åäö åäö åäö", 5);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncated.chars().count(), 6);
    }
}
