//! Implicit edge inference for shared-state and exclusive-resource conflicts.

use super::graph::ExecutionGraph;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use waverun_core::plan::ImplicitOrder;
use waverun_core::types::DependencyEdge;

/// Item indices in the order conflicting items get serialized.
fn conflict_order(graph: &ExecutionGraph, order: ImplicitOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..graph.len()).collect();
    if order == ImplicitOrder::Priority {
        // Stable sort keeps declaration order among equal priorities.
        indices.sort_by_key(|&idx| Reverse(graph.item_at(idx).priority));
    }
    indices
}

/// Conflict sets, each listed in conflict order: one for shared state and
/// one per exclusive resource.
fn conflict_sets(graph: &ExecutionGraph, order: &[usize]) -> Vec<(String, Vec<usize>)> {
    let mut sets = Vec::new();

    let shared_state: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&idx| graph.item_at(idx).modifies_shared_state)
        .collect();
    if shared_state.len() > 1 {
        sets.push(("shared state".to_string(), shared_state));
    }

    let mut by_resource: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for &idx in order {
        for resource in &graph.item_at(idx).exclusive_resources {
            by_resource.entry(resource.as_str()).or_default().push(idx);
        }
    }
    for (resource, holders) in by_resource {
        if holders.len() > 1 {
            sets.push((format!("resource '{}'", resource), holders));
        }
    }

    sets
}

/// Reachability between the members of a conflict set under the current
/// edges: `reach[i][j]` is true when member `i` has a path to member `j`.
///
/// One walk per member.
fn member_reachability(graph: &ExecutionGraph, members: &[usize]) -> Vec<Vec<bool>> {
    let mut slot = vec![None; graph.len()];
    for (pos, &idx) in members.iter().enumerate() {
        slot[idx] = Some(pos);
    }

    // Stamped with the walking member so the buffer is shared across walks.
    let mut visited = vec![usize::MAX; graph.len()];
    let mut queue = VecDeque::new();

    members
        .iter()
        .enumerate()
        .map(|(pos, &start)| {
            let mut row = vec![false; members.len()];
            visited[start] = pos;
            queue.push_back(start);

            while let Some(idx) = queue.pop_front() {
                for succ in graph.successor_indices(idx) {
                    if visited[succ] != pos {
                        visited[succ] = pos;
                        if let Some(member) = slot[succ] {
                            row[member] = true;
                        }
                        queue.push_back(succ);
                    }
                }
            }
            row
        })
        .collect()
}

/// Order in which the members of a conflict set are chained.
///
/// Members already ordered by existing edges keep that order; everything
/// else follows conflict order (the member positions).
fn serialization_order(reach: &[Vec<bool>]) -> Vec<usize> {
    let len = reach.len();
    let mut pending: Vec<usize> = (0..len)
        .map(|to| (0..len).filter(|&from| from != to && reach[from][to]).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..len)
        .filter(|&pos| pending[pos] == 0)
        .map(Reverse)
        .collect();
    let mut placed = vec![false; len];
    let mut order = Vec::with_capacity(len);

    while let Some(Reverse(pos)) = ready.pop() {
        placed[pos] = true;
        order.push(pos);
        for next in 0..len {
            if next != pos && reach[pos][next] && !placed[next] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
    }

    // Members on an explicit cycle never become ready; cycle detection
    // reports them after inference.
    order.extend((0..len).filter(|&pos| !placed[pos]));
    order
}

/// Add implicit edges so that no two conflicting items can share a wave.
///
/// The members of each conflict set are chained: every member gets an edge
/// to the next one, so the whole set is totally ordered. Members already
/// ordered by existing edges keep that order even when conflict order
/// says otherwise, and consecutive members that are already ordered get no
/// edge. Implicit edges are optional: they order items but never block on
/// failure.
///
/// Returns the number of edges added.
pub(crate) fn add_implicit_edges(graph: &mut ExecutionGraph, order: ImplicitOrder) -> usize {
    let order = conflict_order(graph, order);
    let mut added = 0;

    for (reason, members) in conflict_sets(graph, &order) {
        let reach = member_reachability(graph, &members);

        for pair in serialization_order(&reach).windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            if reach[earlier][later] {
                continue;
            }

            let edge = DependencyEdge::implicit(
                graph.item_at(members[earlier]).id.clone(),
                graph.item_at(members[later]).id.clone(),
            );
            tracing::debug!(
                from = %edge.from,
                to = %edge.to,
                reason = %reason,
                "Inferred implicit dependency"
            );
            graph.add_edge(edge);
            added += 1;
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::cycles::cyclic_components;
    use waverun_core::types::WorkItem;

    fn edge_pairs(graph: &ExecutionGraph) -> Vec<(String, String)> {
        graph
            .edges()
            .iter()
            .filter(|e| e.is_implicit())
            .map(|e| (e.from.to_string(), e.to.to_string()))
            .collect()
    }

    #[test]
    fn shared_state_items_are_serialized_in_declaration_order() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("a", "unit").modifies_shared_state(),
            WorkItem::new("b", "unit"),
            WorkItem::new("c", "unit").modifies_shared_state(),
        ]);

        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 1);
        assert_eq!(edge_pairs(&graph), vec![("a".into(), "c".into())]);
        assert!(graph.edges()[0].optional);
    }

    #[test]
    fn resource_holders_are_chained() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("x", "unit").with_exclusive_resource("db-lock"),
            WorkItem::new("y", "unit").with_exclusive_resource("db-lock"),
            WorkItem::new("z", "unit").with_exclusive_resource("db-lock"),
        ]);

        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 2);
        assert_eq!(
            edge_pairs(&graph),
            vec![("x".into(), "y".into()), ("y".into(), "z".into())]
        );
    }

    #[test]
    fn existing_order_wins_over_declaration_order() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("x", "unit").with_exclusive_resource("db-lock"),
            WorkItem::new("y", "unit").with_exclusive_resource("db-lock"),
            WorkItem::new("z", "unit").with_exclusive_resource("db-lock"),
        ]);
        graph.add_edge(DependencyEdge::new("z", "x"));

        // x has to follow z, so the chain is y -> z (-> x already present).
        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 1);
        assert_eq!(edge_pairs(&graph), vec![("y".into(), "z".into())]);
        assert!(cyclic_components(&graph).is_empty());
    }

    #[test]
    fn consecutive_pair_ordered_through_other_item_gets_no_edge() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("a", "unit").modifies_shared_state(),
            WorkItem::new("mid", "unit"),
            WorkItem::new("b", "unit").modifies_shared_state(),
        ]);
        graph.add_edge(DependencyEdge::new("a", "mid"));
        graph.add_edge(DependencyEdge::new("mid", "b"));

        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 0);
    }

    #[test]
    fn large_conflict_set_adds_linear_edge_count() {
        let items = (0..500)
            .map(|i| WorkItem::new(format!("s{i}"), "unit").modifies_shared_state())
            .collect();
        let mut graph = ExecutionGraph::with_items(items);

        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 499);
        assert_eq!(graph.implicit_edge_count(), 499);
        assert!(cyclic_components(&graph).is_empty());
    }

    #[test]
    fn explicit_reverse_edge_suppresses_implicit_edge() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("x", "unit").with_exclusive_resource("db-lock"),
            WorkItem::new("y", "unit").with_exclusive_resource("db-lock"),
        ]);
        graph.add_edge(DependencyEdge::new("y", "x"));

        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 0);
    }

    #[test]
    fn priority_order_puts_urgent_item_first() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("low", "unit").modifies_shared_state(),
            WorkItem::new("high", "unit")
                .modifies_shared_state()
                .with_priority(10),
        ]);

        add_implicit_edges(&mut graph, ImplicitOrder::Priority);
        assert_eq!(edge_pairs(&graph), vec![("high".into(), "low".into())]);
    }

    #[test]
    fn pair_sharing_state_and_resource_gets_one_edge() {
        let mut graph = ExecutionGraph::with_items(vec![
            WorkItem::new("a", "unit")
                .modifies_shared_state()
                .with_exclusive_resource("cache"),
            WorkItem::new("b", "unit")
                .modifies_shared_state()
                .with_exclusive_resource("cache"),
        ]);

        assert_eq!(add_implicit_edges(&mut graph, ImplicitOrder::Declaration), 1);
    }
}
