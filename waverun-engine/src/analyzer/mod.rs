//! Dependency analysis: plan validation, implicit edges and cycle detection.
//!
//! The analyzer turns the items and explicit edges of a plan into an
//! [`ExecutionGraph`]:
//! 1. Validate items and edges (duplicate ids, dangling references, ...)
//! 2. Insert items in declaration order and add explicit edges
//! 3. Infer implicit edges for shared-state and exclusive-resource conflicts
//! 4. Reject any cycle, naming its members
//!
//! Either a complete validated graph is returned or the whole build fails.

mod cycles;
mod graph;
mod implicit;

pub use graph::ExecutionGraph;

use std::collections::HashSet;
use waverun_core::error::{Result, WaverunError};
use waverun_core::plan::{ImplicitOrder, Plan};
use waverun_core::types::{DependencyEdge, ItemId, WorkItem};

/// Builds validated execution graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyAnalyzer {
    implicit_order: ImplicitOrder,
}

impl DependencyAnalyzer {
    /// Create an analyzer with the given conflict order for implicit edges.
    pub fn new(implicit_order: ImplicitOrder) -> Self {
        Self { implicit_order }
    }

    /// Conflict order used for implicit edges.
    pub fn implicit_order(&self) -> ImplicitOrder {
        self.implicit_order
    }

    /// Analyze the items and edges of a plan.
    pub fn analyze_plan(&self, plan: &Plan) -> Result<ExecutionGraph> {
        self.analyze(plan.items.clone(), &plan.edges)
    }

    /// Build the execution graph.
    ///
    /// # Errors
    ///
    /// - A validation error for malformed items or dangling edges
    /// - [`WaverunError::CircularDependency`] if the edges, including
    ///   inferred ones, form a cycle
    pub fn analyze(&self, items: Vec<WorkItem>, edges: &[DependencyEdge]) -> Result<ExecutionGraph> {
        validate_items(&items)?;

        let mut graph = ExecutionGraph::with_items(items);
        for edge in edges {
            validate_edge(&graph, edge)?;
            if !graph.add_edge(edge.clone()) {
                tracing::debug!(edge = %edge, "Merged duplicate dependency edge");
            }
        }
        let explicit = graph.edges().len();

        let implicit = implicit::add_implicit_edges(&mut graph, self.implicit_order);

        if let Some(cycle) = cycles::cyclic_components(&graph).into_iter().next() {
            let cycle: Vec<ItemId> = cycle
                .into_iter()
                .map(|idx| graph.item_at(idx).id.clone())
                .collect();
            tracing::error!(cycle = ?cycle, "Circular dependency detected");
            return Err(WaverunError::CircularDependency { cycle });
        }

        tracing::debug!(
            items = graph.len(),
            explicit_edges = explicit,
            implicit_edges = implicit,
            "Execution graph built"
        );

        Ok(graph)
    }
}

fn validate_items(items: &[WorkItem]) -> Result<()> {
    let mut seen: HashSet<&ItemId> = HashSet::with_capacity(items.len());

    for (position, item) in items.iter().enumerate() {
        if item.id.is_empty() {
            return Err(WaverunError::EmptyItemId { position });
        }
        if !seen.insert(&item.id) {
            return Err(WaverunError::DuplicateItem {
                item_id: item.id.clone(),
            });
        }
        if item.item_type.trim().is_empty() {
            return Err(WaverunError::InvalidItem {
                item_id: item.id.clone(),
                cause: "item type is empty".to_string(),
            });
        }
        if item.timeout_ms == 0 {
            return Err(WaverunError::InvalidItem {
                item_id: item.id.clone(),
                cause: "timeout must be greater than zero".to_string(),
            });
        }
    }

    Ok(())
}

fn validate_edge(graph: &ExecutionGraph, edge: &DependencyEdge) -> Result<()> {
    for endpoint in [&edge.from, &edge.to] {
        if !graph.contains(endpoint.as_str()) {
            return Err(WaverunError::DanglingEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
                missing: endpoint.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waverun_core::types::DependencyKind;

    fn items(ids: &[&str]) -> Vec<WorkItem> {
        ids.iter().map(|id| WorkItem::new(*id, "unit")).collect()
    }

    fn cycle_of(err: WaverunError) -> Vec<String> {
        match err {
            WaverunError::CircularDependency { cycle } => {
                cycle.into_iter().map(|id| id.to_string()).collect()
            }
            other => panic!("expected CircularDependency, got {other}"),
        }
    }

    #[test]
    fn linear_plan() {
        let graph = DependencyAnalyzer::default()
            .analyze(
                items(&["a", "b", "c"]),
                &[DependencyEdge::new("a", "b"), DependencyEdge::new("b", "c")],
            )
            .unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.implicit_edge_count(), 0);
    }

    #[test]
    fn two_item_cycle_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(
                items(&["a", "b"]),
                &[DependencyEdge::new("a", "b"), DependencyEdge::new("b", "a")],
            )
            .unwrap_err();
        assert_eq!(cycle_of(err), vec!["a", "b"]);
    }

    #[test]
    fn optional_edge_in_cycle_still_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(
                items(&["a", "b"]),
                &[
                    DependencyEdge::new("a", "b"),
                    DependencyEdge::new("b", "a").optional(),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, WaverunError::CircularDependency { .. }));
    }

    #[test]
    fn self_dependency_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(items(&["a"]), &[DependencyEdge::new("a", "a")])
            .unwrap_err();
        assert_eq!(cycle_of(err), vec!["a"]);
    }

    #[test]
    fn three_item_cycle_names_all_members() {
        let err = DependencyAnalyzer::default()
            .analyze(
                items(&["a", "b", "c", "d"]),
                &[
                    DependencyEdge::new("b", "c"),
                    DependencyEdge::new("c", "a"),
                    DependencyEdge::new("a", "b"),
                    DependencyEdge::new("c", "d"),
                ],
            )
            .unwrap_err();
        assert_eq!(cycle_of(err), vec!["a", "b", "c"]);
    }

    #[test]
    fn conflicts_already_ordered_by_explicit_path_need_no_implicit_edge() {
        // a and c share state; c -> b -> a already serializes them against
        // declaration order, which must not turn into a cycle.
        let mut plan_items = items(&["a", "b", "c"]);
        plan_items[0].modifies_shared_state = true;
        plan_items[2].modifies_shared_state = true;

        let graph = DependencyAnalyzer::default()
            .analyze(
                plan_items,
                &[DependencyEdge::new("c", "b"), DependencyEdge::new("b", "a")],
            )
            .unwrap();
        assert_eq!(graph.implicit_edge_count(), 0);
    }

    #[test]
    fn dangling_edge_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(items(&["a"]), &[DependencyEdge::new("a", "ghost")])
            .unwrap_err();
        match err {
            WaverunError::DanglingEdge { missing, .. } => assert_eq!(missing.as_str(), "ghost"),
            other => panic!("expected DanglingEdge, got {other}"),
        }
    }

    #[test]
    fn duplicate_item_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(items(&["a", "b", "a"]), &[])
            .unwrap_err();
        assert_eq!(err.code(), "E102");
    }

    #[test]
    fn empty_id_and_type_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(vec![WorkItem::new("", "unit")], &[])
            .unwrap_err();
        assert!(matches!(err, WaverunError::EmptyItemId { position: 0 }));

        let err = DependencyAnalyzer::default()
            .analyze(vec![WorkItem::new("a", " ")], &[])
            .unwrap_err();
        assert_eq!(err.code(), "E104");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = DependencyAnalyzer::default()
            .analyze(vec![WorkItem::new("a", "unit").with_timeout_ms(0)], &[])
            .unwrap_err();
        assert_eq!(err.code(), "E104");
    }

    #[test]
    fn exclusive_resource_adds_implicit_edge() {
        let graph = DependencyAnalyzer::default()
            .analyze(
                vec![
                    WorkItem::new("x", "db").with_exclusive_resource("db-lock"),
                    WorkItem::new("y", "db").with_exclusive_resource("db-lock"),
                ],
                &[],
            )
            .unwrap();

        let edge = &graph.edges()[0];
        assert_eq!(edge.kind, DependencyKind::Implicit);
        assert_eq!(edge.from.as_str(), "x");
        assert_eq!(edge.to.as_str(), "y");
    }
}
