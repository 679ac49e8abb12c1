//! Strongly connected component search (Tarjan) for cycle detection.

use super::graph::ExecutionGraph;

const UNVISITED: usize = usize::MAX;

/// Find every strongly connected component that forms a cycle.
///
/// A component is cyclic when it has more than one member or its single
/// member has a self-loop. Members are item indices sorted ascending
/// (declaration order); components are ordered by their first member.
///
/// The search is iterative so deep dependency chains cannot overflow the
/// stack.
pub(crate) fn cyclic_components(graph: &ExecutionGraph) -> Vec<Vec<usize>> {
    let n = graph.len();
    let successors: Vec<Vec<usize>> = (0..n)
        .map(|idx| graph.successor_indices(idx).collect())
        .collect();

    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0;
    let mut components = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        // (node, position of the next successor to visit)
        let mut call_stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(&(node, pos)) = call_stack.last() {
            if pos < successors[node].len() {
                let succ = successors[node][pos];
                if let Some(frame) = call_stack.last_mut() {
                    frame.1 += 1;
                }

                if index[succ] == UNVISITED {
                    index[succ] = next_index;
                    lowlink[succ] = next_index;
                    next_index += 1;
                    stack.push(succ);
                    on_stack[succ] = true;
                    call_stack.push((succ, 0));
                } else if on_stack[succ] {
                    lowlink[node] = lowlink[node].min(index[succ]);
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }

            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }

                let is_cycle = component.len() > 1 || graph.edge_between(node, node).is_some();
                if is_cycle {
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }
    }

    components.sort_by_key(|component| component[0]);
    components
}
