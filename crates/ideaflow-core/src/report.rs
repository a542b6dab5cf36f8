//! Report sinks: persist a finished conversation as JSON, Markdown, and HTML.
//!
//! All three artifacts are written on every run, including partial runs cut
//! short by a fault. The JSON artifact is the machine-readable source of
//! truth; Markdown and HTML are renderings of the same transcript.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::driver::ConversationState;
use crate::error::Result;
use crate::roles::role_by_name;

/// Bumped when the JSON artifact shape changes.
const SCHEMA_VERSION: u32 = 1;

/// Paths of the three artifacts written by [`ReportWriter::save`].
#[derive(Debug, Clone)]
pub struct SavedReports {
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
    pub html_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct JsonArtifact<'a> {
    schema_version: u32,
    run_id: Uuid,
    generated_at: String,
    idea: &'a str,
    termination: &'a crate::driver::Termination,
    total_steps: usize,
    transcript: &'a [crate::driver::TranscriptEntry],
}

/// Writes timestamped report files into a target directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Write all three artifacts for `state`.
    ///
    /// File names share one `research_<timestamp>` stem so a run's artifacts
    /// sort together.
    pub fn save(&self, state: &ConversationState) -> Result<SavedReports> {
        fs::create_dir_all(&self.out_dir)?;

        let stem = format!("research_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let json_path = self.out_dir.join(format!("{stem}.json"));
        let markdown_path = self.out_dir.join(format!("{stem}.md"));
        let html_path = self.out_dir.join(format!("{stem}.html"));

        let artifact = JsonArtifact {
            schema_version: SCHEMA_VERSION,
            run_id: Uuid::new_v4(),
            generated_at: Utc::now().to_rfc3339(),
            idea: &state.idea,
            termination: &state.termination,
            total_steps: state.transcript.len(),
            transcript: &state.transcript,
        };
        fs::write(&json_path, serde_json::to_string_pretty(&artifact)?)?;
        fs::write(&markdown_path, render_markdown(state))?;
        fs::write(&html_path, render_html(state))?;

        Ok(SavedReports {
            json_path,
            markdown_path,
            html_path,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// Absolute `file://` locator for a written report, for pasting into a
/// browser. Falls back to the path as given when it cannot be canonicalized.
pub fn html_url(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn agent_heading(role_name: &str) -> String {
    match role_by_name(role_name) {
        Ok(spec) => format!("{} {}", spec.emoji, spec.display_name()),
        Err(_) => role_name.to_string(),
    }
}

fn render_markdown(state: &ConversationState) -> String {
    let mut out = String::new();
    out.push_str("# Research Idea Analysis Report\n\n");
    out.push_str(&format!("**Idea:** {}\n\n", state.idea));
    out.push_str(&format!(
        "**Generated:** {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("**Outcome:** {}\n\n", state.termination));
    out.push_str(&format!("**Total steps:** {}\n\n", state.transcript.len()));
    out.push_str("---\n\n");

    for entry in &state.transcript {
        out.push_str(&format!(
            "## Step {}: {}\n\n",
            entry.step,
            agent_heading(&entry.agent)
        ));
        out.push_str(entry.content.trim());
        out.push_str("\n\n");
    }
    out
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_html(state: &ConversationState) -> String {
    let mut body = String::new();
    for entry in &state.transcript {
        body.push_str(&format!(
            "    <section class=\"step\">\n      <h2>Step {}: {}</h2>\n      <pre>{}</pre>\n    </section>\n",
            entry.step,
            html_escape(&agent_heading(&entry.agent)),
            html_escape(entry.content.trim())
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Research Idea Analysis Report</title>
  <style>
    body {{ font-family: -apple-system, "Segoe UI", sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; color: #1f2933; }}
    h1 {{ border-bottom: 2px solid #3b82f6; padding-bottom: 0.5rem; }}
    .meta {{ color: #52606d; margin-bottom: 2rem; }}
    .step {{ background: #f8fafc; border-left: 4px solid #3b82f6; border-radius: 4px; margin: 1rem 0; padding: 0.5rem 1rem; }}
    .step pre {{ white-space: pre-wrap; font-family: inherit; }}
  </style>
</head>
<body>
  <h1>Research Idea Analysis Report</h1>
  <p class="meta">
    <strong>Idea:</strong> {idea}<br>
    <strong>Generated:</strong> {generated}<br>
    <strong>Outcome:</strong> {outcome}<br>
    <strong>Total steps:</strong> {steps}
  </p>
{body}</body>
</html>
"#,
        idea = html_escape(&state.idea),
        generated = Local::now().format("%Y-%m-%d %H:%M:%S"),
        outcome = html_escape(&state.termination.to_string()),
        steps = state.transcript.len(),
        body = body,
    )
}
