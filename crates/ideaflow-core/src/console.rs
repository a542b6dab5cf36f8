//! Console presentation of a running conversation.
//!
//! The driver talks to a [`DisplaySink`] so tests can record calls instead of
//! printing. [`ConsoleSink`] is the production implementation: banner, one
//! block per accepted turn with the role's emoji, truncated content, and a
//! closing summary.

use crate::driver::{Termination, TranscriptEntry};
use crate::report::SavedReports;
use crate::roles::{role_by_name, RoleSpec};

/// Maximum characters of a turn's content printed to the console. The full
/// text always lands in the reports.
const TURN_PREVIEW_CHARS: usize = 500;

/// Maximum characters of a turn's content shown per summary line.
const SUMMARY_PREVIEW_CHARS: usize = 60;

/// Receiver of run progress. All methods are fire-and-forget.
pub trait DisplaySink: Send + Sync {
    fn banner(&self, idea: &str);
    fn progress(&self, current: usize, total: usize, role: &RoleSpec);
    fn turn(&self, step: usize, role: &RoleSpec, content: &str);
    fn decode_warning(&self, role_name: &str, raw: &str);
    fn skipped_empty(&self, role_name: &str);
    fn completed(&self, total_steps: usize, termination: &Termination);
    fn summary(&self, transcript: &[TranscriptEntry]);
    fn reports_saved(&self, saved: &SavedReports);
}

/// Stdout implementation used by the CLI.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}

fn emoji_for(role_name: &str) -> &'static str {
    role_by_name(role_name).map(|spec| spec.emoji).unwrap_or("🤖")
}

impl DisplaySink for ConsoleSink {
    fn banner(&self, idea: &str) {
        println!("{}", "=".repeat(70));
        println!("🚀 Research Idea Analysis Pipeline");
        println!("{}", "=".repeat(70));
        println!("💡 Idea: {idea}\n");
    }

    fn progress(&self, current: usize, total: usize, role: &RoleSpec) {
        println!("⏳ [{current}/{total}] Consulting {}...", role.display_name());
    }

    fn turn(&self, step: usize, role: &RoleSpec, content: &str) {
        println!("{}", "-".repeat(70));
        println!("[Step {step}] {} {}", role.emoji, role.display_name());
        println!("{}", "-".repeat(70));
        println!("{}\n", truncate_chars(content.trim(), TURN_PREVIEW_CHARS));
    }

    fn decode_warning(&self, role_name: &str, raw: &str) {
        println!(
            "⚠️  {} replied outside the envelope format, using raw text ({} chars)",
            role_name,
            raw.chars().count()
        );
    }

    fn skipped_empty(&self, role_name: &str) {
        println!("⚠️  {role_name} produced no content, skipping turn");
    }

    fn completed(&self, total_steps: usize, termination: &Termination) {
        println!("{}", "=".repeat(70));
        println!("✅ Analysis finished: {termination} ({total_steps} steps)");
        println!("{}", "=".repeat(70));
    }

    fn summary(&self, transcript: &[TranscriptEntry]) {
        println!("\n📋 Summary");
        for entry in transcript {
            println!(
                "  {}. {} {}: {}",
                entry.step,
                emoji_for(&entry.agent),
                display_agent(&entry.agent),
                truncate_chars(entry.content.trim(), SUMMARY_PREVIEW_CHARS)
            );
        }
    }

    fn reports_saved(&self, saved: &SavedReports) {
        println!("\n💾 Reports saved:");
        println!("  JSON:     {}", saved.json_path.display());
        println!("  Markdown: {}", saved.markdown_path.display());
        println!("  HTML:     {}", saved.html_path.display());
        println!("  Open:     {}", crate::report::html_url(&saved.html_path));
    }
}

fn display_agent(role_name: &str) -> String {
    role_by_name(role_name)
        .map(|spec| spec.display_name())
        .unwrap_or_else(|_| role_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_character_based_not_byte_based() {
        let text = "🎯".repeat(10);
        let shortened = truncate_chars(&text, 4);
        assert_eq!(shortened, format!("{}...", "🎯".repeat(4)));
    }

    #[test]
    fn short_text_passes_through_untouched() {
        assert_eq!(truncate_chars("brief", 500), "brief");
    }

    #[test]
    fn unknown_agent_names_fall_back_gracefully() {
        assert_eq!(emoji_for("mystery_agent"), "🤖");
        assert_eq!(display_agent("mystery_agent"), "mystery_agent");
    }
}
