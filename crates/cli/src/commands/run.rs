use anyhow::Result;
use colored::*;
use sitepipe_core::results::{RunReport, TaskOutcome};
use sitepipe_core::site_manager::{SiteManager, WATCH_TARGET};
use sitepipe_core::tasks::get_task_color;
use tokio_util::sync::CancellationToken;

/// Tasks that leave a live-reload server running
const SERVE_TASKS: [&str; 2] = ["serve", "serve:built"];

pub async fn execute(manager: &SiteManager, target: &str, cancel: CancellationToken) -> Result<()> {
    // `watch` is not a task: it never finishes on its own
    if target == WATCH_TARGET {
        return super::watch::execute(manager, cancel).await;
    }

    println!("{} {}", "Running".bold(), target.cyan());
    println!();

    let report = manager
        .run(&[target], cancel.clone())
        .await
        .map_err(|e| {
            if e.is_registration_error() {
                anyhow::anyhow!("Invalid task graph for {}: {}", target, e)
            } else {
                anyhow::anyhow!("Failed to run {}: {}", target, e)
            }
        })?;

    print_summary(&report);
    let started_server = SERVE_TASKS
        .iter()
        .any(|task| report.outcome(task).map(TaskOutcome::is_success).unwrap_or(false));
    report.into_result()?;

    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        "All tasks completed successfully!".green().bold()
    );

    if started_server {
        println!("{}", "Serving with live reload, press Ctrl-C to stop".dimmed());
        cancel.cancelled().await;
    }

    Ok(())
}

pub fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "Summary:".bold());
    for result in &report.results {
        let name = result.name.color(get_task_color(&result.name));
        match &result.outcome {
            TaskOutcome::Succeeded { duration } => {
                println!(
                    "  {} {} {}",
                    "✓".green(),
                    name,
                    format!("({:.2?})", duration).dimmed()
                );
            }
            TaskOutcome::Failed { reason } => {
                println!("  {} {} {}", "✗".red(), name, reason.red());
            }
            TaskOutcome::Skipped => {
                println!("  {} {} {}", "-".yellow(), name, "skipped".dimmed());
            }
        }
    }
}
