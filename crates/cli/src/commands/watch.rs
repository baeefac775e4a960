use anyhow::Result;
use colored::*;
use sitepipe_core::site_manager::SiteManager;
use tokio_util::sync::CancellationToken;

pub async fn execute(manager: &SiteManager, cancel: CancellationToken) -> Result<()> {
    println!(
        "{} {}",
        "Watching".bold(),
        manager.site.root.display().to_string().cyan()
    );
    for binding in manager.watch_bindings() {
        println!(
            "  {} {} {}",
            binding.patterns().join(", ").dimmed(),
            "->".dimmed(),
            binding.tasks().join(", ")
        );
    }
    println!();

    let summary = manager
        .watch(cancel)
        .await
        .map_err(|e| anyhow::anyhow!("Watch failed: {}", e))?;

    println!();
    println!(
        "{} {} rebuild(s), {} failed",
        "Stopped watching:".bold(),
        summary.triggers,
        summary.failures
    );

    Ok(())
}
