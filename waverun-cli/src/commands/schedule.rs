//! Schedule command - print the waves a plan would run in.

use anyhow::{Context, Result};

/// Run the schedule command.
pub fn run(file: &str, max_parallel: Option<usize>, json: bool) -> Result<()> {
    let mut plan = super::load_plan(file)?;
    if let Some(max_parallel) = max_parallel {
        plan.settings.max_parallel = Some(max_parallel);
    }

    let (graph, schedule) = super::planning_engine()
        .plan_waves(&plan)
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;

    tracing::debug!(items = graph.len(), waves = schedule.len(), "Plan scheduled");

    if json {
        let output = serde_json::to_string_pretty(schedule.waves())
            .context("Failed to serialize schedule")?;
        println!("{}", output);
        return Ok(());
    }

    println!("Schedule for '{}' ({} items, {} waves)", plan.name, graph.len(), schedule.len());
    for wave in schedule.iter() {
        let items: Vec<String> = wave
            .items
            .iter()
            .map(|id| match graph.item(id.as_str()) {
                Some(item) if item.critical => format!("{}*", id),
                _ => id.to_string(),
            })
            .collect();
        println!("  Wave {:>3}: {}", wave.index, items.join(", "));
    }
    if graph.items().iter().any(|item| item.critical) {
        println!();
        println!("  * critical");
    }

    Ok(())
}
