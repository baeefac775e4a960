use anyhow::Result;
use colored::*;
use sitepipe_core::site_manager::SiteManager;

pub fn execute(manager: &SiteManager) -> Result<()> {
    let result = manager.list_tasks();

    println!("{}", "Tasks".bold().underline());

    if result.tasks.is_empty() {
        println!("  {}", "No tasks registered".dimmed());
        return Ok(());
    }

    for task in &result.tasks {
        let color = result.task_colors.get(&task.name).copied().unwrap_or(Color::White);
        let label = format!("[{}]", task.kind);
        match &task.description {
            Some(description) => println!(
                "{} {} {}",
                task.name.color(color).bold(),
                label.dimmed(),
                description
            ),
            None => println!("{} {}", task.name.color(color).bold(), label.dimmed()),
        }

        if !task.prerequisites.is_empty() {
            println!("  {} {}", "needs:".dimmed(), task.prerequisites.join(", "));
        }
        if !task.members.is_empty() {
            println!("  {} {}", "runs in parallel:".dimmed(), task.members.join(", "));
        }
    }

    Ok(())
}
