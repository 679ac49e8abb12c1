//! Execution graph representation.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use waverun_core::types::{DependencyEdge, ItemId, WorkItem};

/// The validated dependency graph of a plan.
///
/// Only [`DependencyAnalyzer`](super::DependencyAnalyzer) constructs graphs,
/// and only after rejecting malformed plans and cycles. Once built, the
/// graph is read-only.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    /// Work items in declaration order.
    items: Vec<WorkItem>,
    /// Declaration index by item id.
    index: HashMap<ItemId, usize>,
    /// All edges, explicit first, then implicit.
    edges: Vec<DependencyEdge>,
    /// Edge indices by source item index.
    outgoing: Vec<Vec<usize>>,
    /// Edge indices by target item index.
    incoming: Vec<Vec<usize>>,
}

impl ExecutionGraph {
    /// Create a graph with nodes only. Ids must already be validated unique.
    pub(crate) fn with_items(items: Vec<WorkItem>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.id.clone(), idx))
            .collect();
        let len = items.len();

        Self {
            items,
            index,
            edges: Vec::new(),
            outgoing: vec![Vec::new(); len],
            incoming: vec![Vec::new(); len],
        }
    }

    /// Add an edge between two known items.
    ///
    /// An edge duplicating an existing `from -> to` pair is merged into it:
    /// the merged edge is required if either edge was. Returns `false` when
    /// the edge was merged.
    pub(crate) fn add_edge(&mut self, edge: DependencyEdge) -> bool {
        let from = self.index[&edge.from];
        let to = self.index[&edge.to];

        if let Some(existing) = self.edge_between(from, to) {
            let existing = &mut self.edges[existing];
            existing.optional &= edge.optional;
            return false;
        }

        let idx = self.edges.len();
        self.outgoing[from].push(idx);
        self.incoming[to].push(idx);
        self.edges.push(edge);
        true
    }

    /// Index of the edge `from -> to`, if present.
    pub(crate) fn edge_between(&self, from: usize, to: usize) -> Option<usize> {
        self.outgoing[from]
            .iter()
            .copied()
            .find(|&e| self.index[&self.edges[e].to] == to)
    }

    /// Target indices of the outgoing edges of an item.
    pub(crate) fn successor_indices(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing[idx]
            .iter()
            .map(move |&e| self.index[&self.edges[e].to])
    }

    /// Source indices of the incoming edges of an item.
    pub(crate) fn predecessor_indices(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.incoming[idx]
            .iter()
            .map(move |&e| self.index[&self.edges[e].from])
    }

    /// Get an item by id.
    pub fn item(&self, id: &str) -> Option<&WorkItem> {
        self.index.get(id).map(|&idx| &self.items[idx])
    }

    /// Get an item by declaration index.
    pub fn item_at(&self, idx: usize) -> &WorkItem {
        &self.items[idx]
    }

    /// All items in declaration order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// All edges (explicit and implicit).
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Number of edges inferred by the analyzer.
    pub fn implicit_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_implicit()).count()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the graph has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the graph contains an item.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Declaration index of an item.
    pub fn declaration_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Edges pointing into an item.
    pub fn incoming_edges(&self, id: &str) -> impl Iterator<Item = &DependencyEdge> {
        self.index
            .get(id)
            .into_iter()
            .flat_map(|&idx| self.incoming[idx].iter().map(|&e| &self.edges[e]))
    }

    /// Edges leaving an item.
    pub fn outgoing_edges(&self, id: &str) -> impl Iterator<Item = &DependencyEdge> {
        self.index
            .get(id)
            .into_iter()
            .flat_map(|&idx| self.outgoing[idx].iter().map(|&e| &self.edges[e]))
    }

    /// Direct predecessors of an item.
    pub fn predecessors(&self, id: &str) -> Vec<&ItemId> {
        self.incoming_edges(id).map(|edge| &edge.from).collect()
    }

    /// Predecessors that must pass for the item to run.
    pub fn required_predecessors(&self, id: &str) -> Vec<&ItemId> {
        self.incoming_edges(id)
            .filter(|edge| !edge.optional)
            .map(|edge| &edge.from)
            .collect()
    }

    /// Direct successors of an item.
    pub fn successors(&self, id: &str) -> Vec<&ItemId> {
        self.outgoing_edges(id).map(|edge| &edge.to).collect()
    }

    /// Topological order using Kahn's algorithm.
    ///
    /// Among items whose predecessors are done, the earliest declared comes
    /// first, so the order is stable for a given plan.
    pub fn topological_order(&self) -> Vec<&ItemId> {
        let mut in_degree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();

        let mut queue: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, degree)| *degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut sorted = Vec::with_capacity(self.items.len());
        while let Some(Reverse(idx)) = queue.pop() {
            sorted.push(&self.items[idx].id);
            for succ in self.successor_indices(idx) {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    queue.push(Reverse(succ));
                }
            }
        }

        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(ids: &[&str]) -> ExecutionGraph {
        ExecutionGraph::with_items(ids.iter().map(|id| WorkItem::new(*id, "unit")).collect())
    }

    #[test]
    fn duplicate_edges_merge_to_strictest() {
        let mut g = graph(&["a", "b"]);
        assert!(g.add_edge(DependencyEdge::new("a", "b").optional()));
        assert!(!g.add_edge(DependencyEdge::new("a", "b")));

        assert_eq!(g.edges().len(), 1);
        assert!(!g.edges()[0].optional);
    }

    #[test]
    fn predecessors_and_successors() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_edge(DependencyEdge::new("a", "c"));
        g.add_edge(DependencyEdge::new("b", "c").optional());

        let preds: Vec<&str> = g.predecessors("c").iter().map(|id| id.as_str()).collect();
        assert_eq!(preds, vec!["a", "b"]);

        let required: Vec<&str> = g
            .required_predecessors("c")
            .iter()
            .map(|id| id.as_str())
            .collect();
        assert_eq!(required, vec!["a"]);

        assert_eq!(g.successors("a").len(), 1);
        assert!(g.successors("c").is_empty());
    }

    #[test]
    fn diamond_topological_order() {
        let mut g = graph(&["d", "b", "c", "a"]);
        g.add_edge(DependencyEdge::new("a", "b"));
        g.add_edge(DependencyEdge::new("a", "c"));
        g.add_edge(DependencyEdge::new("b", "d"));
        g.add_edge(DependencyEdge::new("c", "d"));

        let order: Vec<&str> = g.topological_order().iter().map(|id| id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn unknown_item_lookups() {
        let g = graph(&["a"]);
        assert!(g.item("ghost").is_none());
        assert!(g.predecessors("ghost").is_empty());
        assert_eq!(g.declaration_index("a"), Some(0));
    }
}
