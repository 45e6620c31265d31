//! Run records.
//!
//! Every invocation that executes pipeline steps writes its outcome to
//! `.docship/last-run.json`, replacing the previous record. `docship status`
//! prints it back. Like the pipeline itself, the record is last-writer-wins.

use crate::config::PipelineConfig;
use crate::log;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fs;

/// How a whole run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// Every step ran to the end.
    Completed,
    /// A step halted the run early without failing it.
    Skipped,
    /// A step failed; later steps never ran.
    Failed,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// How a single step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Completed,
    /// The step found nothing to do.
    Unchanged,
    /// The step halted the run.
    Skipped,
    Failed,
    /// An earlier step failed or halted first.
    NotReached,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::NotReached => "not-reached",
        }
    }
}

/// Record of one step inside a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    /// Failure message or skip reason, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Record of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Subcommand that produced this record (run, build, publish).
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Branch the run was triggered for, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_ref: Option<String>,
    /// Short revision of the source work tree, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub outcome: RunOutcome,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Write the record, replacing the previous one.
    pub fn write(&self, config: &PipelineConfig) -> Result<()> {
        let path = config.report_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create `{}`", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(())
    }

    /// Load the most recent record.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let path = config.report_path();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("No run recorded yet at `{}`", path.display()))?;
        let report = serde_json::from_str(&content)
            .with_context(|| format!("Malformed run record `{}`", path.display()))?;
        Ok(report)
    }
}

/// Print the most recent run record.
pub fn show_status(config: &PipelineConfig) -> Result<()> {
    let report = RunReport::load(config)?;

    let outcome = match report.outcome {
        RunOutcome::Completed => report.outcome.as_str().green().bold(),
        RunOutcome::Skipped => report.outcome.as_str().yellow().bold(),
        RunOutcome::Failed => report.outcome.as_str().red().bold(),
    };
    log!("status";
        "`{}` {} at {}",
        report.command,
        outcome,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(event_ref) = &report.event_ref {
        log!("status"; "ref: {event_ref}");
    }
    if let Some(revision) = &report.revision {
        log!("status"; "revision: {revision}");
    }

    for step in &report.steps {
        let mut line = format!("{:<10} {}", step.name, colorize_status(step.status));
        if step.status != StepStatus::NotReached {
            line.push_str(&format!(" ({})", fmt_duration(step.duration_ms)));
        }
        if let Some(detail) = &step.detail {
            line.push_str(": ");
            line.push_str(detail);
        }
        log!("status"; "{line}");
    }

    Ok(())
}

fn colorize_status(status: StepStatus) -> ColoredString {
    let name = status.as_str();
    match status {
        StepStatus::Completed => name.green(),
        StepStatus::Unchanged => name.cyan(),
        StepStatus::Skipped => name.yellow(),
        StepStatus::Failed => name.red(),
        StepStatus::NotReached => name.dimmed(),
    }
}

/// Render a duration in the most readable unit.
pub fn fmt_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}
