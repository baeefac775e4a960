use anyhow::Result;
use colored::*;
use sitepipe_core::site_manager::SiteManager;

pub fn execute(manager: &SiteManager, targets: &[String]) -> Result<()> {
    println!("{} {}", "Execution plan for".bold(), targets.join(", ").cyan());

    // Get execution plan from site manager
    let result = manager
        .get_execution_plan(targets)
        .map_err(|e| anyhow::anyhow!("Failed to get execution plan: {}", e))?;

    println!("\n{}:", "Execution order".bold());
    for (i, task) in result.plan.tasks().iter().enumerate() {
        let color = result.task_colors.get(task).copied().unwrap_or(Color::White);
        println!("  {}. {}", i + 1, task.color(color));
    }

    println!("\n{}:", "Dependency levels".bold());
    for (i, level) in result.levels.iter().enumerate() {
        println!("  {} {}", format!("{}:", i).dimmed(), level.join(", "));
    }

    if result.transfer_ready {
        println!();
        println!("{} {}", "Note:".bold(), "this plan uploads over FTP".dimmed());
    } else if result.needs_transfer {
        println!();
        println!(
            "{} {}",
            "Note:".yellow().bold(),
            "this plan uploads over FTP and needs FTP_HOST, FTP_USER and FTP_PASSWORD".yellow()
        );
    }

    Ok(())
}
