//! CLI output formatting

use crate::core::RunStatus;
use crate::execution::PipelineEvent;
use crate::persistence::RunSummary;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar spanning a flow's steps
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::NotStarted => style("NOT STARTED").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Finalizing => style("FINALIZING").yellow().to_string(),
        RunStatus::Done => style("DONE").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a run summary for history listings
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Done => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running | RunStatus::Finalizing => SPINNER,
        RunStatus::NotStarted => INFO,
    };

    let resumed = summary
        .start_step
        .as_deref()
        .map(|s| format!(" (from {})", s))
        .unwrap_or_default();

    format!(
        "{} {} - {} [{}] - {} ({}/{}){}",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.flow_name).bold(),
        style(&summary.tool).cyan(),
        format_status(summary.status),
        summary.completed_steps,
        summary.total_steps,
        style(resumed).dim()
    )
}

/// Format a pipeline event for console display
pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::RunStarted { start_step, total } => format!(
            "{} Starting flow at {} ({} steps)",
            ROCKET,
            style(start_step).cyan(),
            total
        ),
        PipelineEvent::CheckpointRestored { step } => {
            format!("{} Restored checkpoint for {}", INFO, style(step).cyan())
        }
        PipelineEvent::StepStarted { step, index, total } => {
            format!("{} {} ({}/{})", SPINNER, style(step).cyan(), index + 1, total)
        }
        PipelineEvent::StepCompleted { step } => format!("{} {}", CHECK, style(step).green()),
        PipelineEvent::CheckpointPersisted { step } => {
            format!("{} Checkpoint written for {}", INFO, style(step).dim())
        }
        PipelineEvent::Finalizing => format!("{} Handing script to the tool", INFO),
        PipelineEvent::RunCompleted { status } => {
            format!("{} Flow {}", INFO, format_status(*status))
        }
    }
}
