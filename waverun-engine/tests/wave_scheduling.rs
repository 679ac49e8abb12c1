//! Integration tests for dependency analysis and wave scheduling.
//!
//! Tests verify that:
//! - Every required edge crosses forward between waves
//! - Conflicting items never share a wave
//! - Cycles are rejected before any wave is produced
//! - Wave sizes respect the global budget and type caps
//! - Schedules are deterministic

mod common;

use common::{example_a_plan, layered_plan};
use waverun_core::prelude::*;
use waverun_engine::prelude::*;

fn plan_waves(plan: &Plan, max_parallel: usize) -> Result<(ExecutionGraph, Schedule)> {
    WaveEngine::new(
        EngineConfig::default().with_max_parallel(max_parallel),
        ExecutorRegistry::new(),
    )
    .plan_waves(plan)
}

#[test]
fn example_a_waves() {
    let (_, schedule) = plan_waves(&example_a_plan(), 2).unwrap();
    assert_eq!(
        schedule.as_id_lists(),
        vec![vec!["A", "C"], vec!["B"], vec!["D"]]
    );

    let (_, schedule) = plan_waves(&example_a_plan(), 1).unwrap();
    assert_eq!(
        schedule.as_id_lists(),
        vec![vec!["A"], vec!["C"], vec!["B"], vec!["D"]]
    );
}

#[test]
fn example_b_exclusive_resource_gets_implicit_edge() {
    let plan = Plan::new("example-b")
        .with_item(WorkItem::new("X", "db").with_exclusive_resource("db-lock"))
        .with_item(WorkItem::new("Y", "db").with_exclusive_resource("db-lock"))
        .with_max_parallel(4);

    let (graph, schedule) = plan_waves(&plan, 4).unwrap();
    assert_eq!(graph.implicit_edge_count(), 1);
    assert_ne!(schedule.wave_of("X"), schedule.wave_of("Y"));
    assert_eq!(schedule.as_id_lists(), vec![vec!["X"], vec!["Y"]]);
}

#[test]
fn required_edges_cross_forward() {
    let plan = layered_plan(4, 3)
        .with_edge(DependencyEdge::new("l0_0", "l3_2").with_kind(DependencyKind::Service));
    let (graph, schedule) = plan_waves(&plan, 2).unwrap();

    for edge in graph.edges() {
        let from = schedule.wave_of(edge.from.as_str()).unwrap();
        let to = schedule.wave_of(edge.to.as_str()).unwrap();
        assert!(from < to, "{} must run before {}", edge.from, edge.to);
    }
    assert_eq!(schedule.total_items(), 12);
}

#[test]
fn shared_state_and_resource_holders_never_share_a_wave() {
    let plan = Plan::new("conflicts")
        .with_item(WorkItem::new("s1", "unit").modifies_shared_state())
        .with_item(WorkItem::new("free1", "unit"))
        .with_item(WorkItem::new("s2", "unit").modifies_shared_state())
        .with_item(WorkItem::new("r1", "unit").with_exclusive_resource("cache"))
        .with_item(WorkItem::new("free2", "unit"))
        .with_item(WorkItem::new("r2", "unit").with_exclusive_resource("cache"))
        .with_item(
            WorkItem::new("r3", "unit")
                .with_exclusive_resource("cache")
                .modifies_shared_state(),
        );

    let (graph, schedule) = plan_waves(&plan, 8).unwrap();

    for wave in schedule.waves() {
        for (i, a) in wave.items.iter().enumerate() {
            for b in &wave.items[i + 1..] {
                let a = graph.item(a.as_str()).unwrap();
                let b = graph.item(b.as_str()).unwrap();
                assert!(!a.conflicts_with(b), "{} and {} share wave {}", a.id, b.id, wave.index);
            }
        }
    }
}

#[test]
fn cycle_rejected_with_members_and_no_waves() {
    let plan = Plan::new("cyclic")
        .with_item(WorkItem::new("A", "unit"))
        .with_item(WorkItem::new("B", "unit"))
        .with_edge(DependencyEdge::new("A", "B"))
        .with_edge(DependencyEdge::new("B", "A"));

    let err = plan_waves(&plan, 2).unwrap_err();
    assert_eq!(err.code(), "E201");
    assert!(err.to_string().contains("A -> B"));
    assert!(err.is_fatal());
}

#[test]
fn waves_respect_budget_and_type_caps() {
    let mut plan = Plan::new("caps");
    for i in 0..6 {
        plan = plan.with_item(WorkItem::new(format!("e2e{}", i), "e2e"));
        plan = plan.with_item(WorkItem::new(format!("unit{}", i), "unit"));
    }
    plan.settings.type_caps.insert("e2e".to_string(), 1);

    let (graph, schedule) = plan_waves(&plan, 3).unwrap();
    for wave in schedule.waves() {
        assert!(wave.len() <= 3);
        let e2e = wave
            .items
            .iter()
            .filter(|id| graph.item(id.as_str()).unwrap().item_type == "e2e")
            .count();
        assert!(e2e <= 1, "wave {} has {} e2e items", wave.index, e2e);
    }
    assert_eq!(schedule.total_items(), 12);
}

#[test]
fn identical_input_yields_identical_schedule() {
    let plan = layered_plan(3, 5)
        .with_item(WorkItem::new("urgent", "unit").with_priority(10))
        .with_item(WorkItem::new("quick", "unit").with_estimated_duration_ms(1));

    let first = plan_waves(&plan, 3).unwrap().1;
    for _ in 0..10 {
        assert_eq!(plan_waves(&plan, 3).unwrap().1, first);
    }
}

#[test]
fn plan_document_round_trip_to_schedule() {
    let yaml = r#"
name: nightly
items:
  - id: migrate
    type: db
    critical: true
    exclusive_resources: [db-lock]
  - id: seed
    type: db
    exclusive_resources: [db-lock]
  - id: api
    type: http
    priority: 5
edges:
  - from: migrate
    to: api
settings:
  max_parallel: 2
"#;
    let plan = Plan::from_yaml(yaml).unwrap();
    let (_, schedule) = plan_waves(&plan, 8).unwrap();

    // Plan settings win over the engine budget.
    assert!(schedule.waves().iter().all(|wave| wave.len() <= 2));
    assert!(schedule.wave_of("migrate") < schedule.wave_of("seed"));
    assert!(schedule.wave_of("migrate") < schedule.wave_of("api"));
}

#[test]
fn dangling_edge_is_a_validation_error() {
    let plan = Plan::new("bad")
        .with_item(WorkItem::new("a", "unit"))
        .with_edge(DependencyEdge::new("a", "missing"));

    let err = plan_waves(&plan, 2).unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(err.code(), "E103");
}
