//! Validate command - check a plan and summarize its schedule.

use anyhow::Result;
use std::collections::BTreeSet;

/// Run the validate command.
pub fn run(file: &str) -> Result<()> {
    tracing::info!(file = %file, "Validating plan");

    println!("Validation Results for: {}", file);
    println!("========================{}", "=".repeat(file.len()));
    println!();

    let plan = match super::load_plan(file) {
        Ok(plan) => plan,
        Err(e) => {
            println!("✗ PARSE ERROR:");
            println!("  {:#}", e);
            anyhow::bail!("Plan could not be loaded");
        }
    };
    println!("✓ Plan syntax is valid");

    let engine = super::planning_engine();
    let (graph, schedule) = match engine.plan_waves(&plan) {
        Ok(planned) => planned,
        Err(e) => {
            println!("✗ {} error:", if e.is_validation_error() { "Validation" } else { "Graph" });
            println!("  [{}] {}", e.code(), e);
            anyhow::bail!("Plan validation failed");
        }
    };
    println!("✓ Dependency graph is acyclic");
    println!("✓ Schedule computed");
    println!();

    println!("Plan Summary:");
    println!("  Name: {}", plan.name);
    println!("  Items: {}", graph.len());
    println!(
        "  Edges: {} ({} inferred from conflicts)",
        graph.edges().len(),
        graph.implicit_edge_count()
    );
    println!("  Waves: {}", schedule.len());
    let widest = schedule.waves().iter().map(|w| w.len()).max().unwrap_or(0);
    println!("  Widest wave: {} item(s)", widest);

    let critical: Vec<&str> = graph
        .items()
        .iter()
        .filter(|item| item.critical)
        .map(|item| item.id.as_str())
        .collect();
    if !critical.is_empty() {
        println!("  Critical: {}", critical.join(", "));
    }

    let mut warnings = 0;
    let types: BTreeSet<&str> = graph.items().iter().map(|i| i.item_type.as_str()).collect();
    for capped in plan.settings.type_caps.keys() {
        if !types.contains(capped.as_str()) {
            warnings += 1;
            println!();
            println!("⚠ WARNING: Type cap for '{}' matches no item", capped);
        }
    }
    if graph.is_empty() {
        warnings += 1;
        println!();
        println!("⚠ WARNING: Plan has no items");
    }

    println!();
    if warnings == 0 {
        println!("✓ Plan is valid");
    } else {
        println!("✓ Plan is valid with {} warning(s)", warnings);
    }

    Ok(())
}
