//! Edge valuation: the Ball-Larus numbering pass
//!
//! A post-order walk from the entry assigns every edge an integer value so
//! that the values summed along any entry-to-exit path form exactly the set
//! `{0, 1, ..., num_paths - 1}`, each realized by one path. Runs on the
//! pre-closure DAG; the exit-to-entry closure edge is added afterwards.

use crate::numbering::{NodeId, PathGraph};

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    Active,
    Done,
}

struct Frame {
    node: NodeId,
    next_edge: usize,
    running_sum: u64,
}

/// Assign edge values and per-node path counts
///
/// For each node in leaving order: a node without out-edges counts one
/// path; otherwise each out-edge, in the node's fixed iteration order,
/// receives the running sum of successor path counts seen so far.
///
/// The deep recursion of the textbook formulation is replaced by an
/// explicit frame stack so arbitrarily large procedures cannot overflow
/// the native stack.
///
/// # Panics
/// Panics if the graph contains a cycle. Dummy edges must already have
/// broken every loop, so a cycle here is a programmer error.
pub fn assign_edge_vals(graph: &mut PathGraph) {
    graph.init_dfs();

    let mut state = vec![VisitState::Unvisited; graph.node_count()];
    let mut stack = Vec::new();

    let entry = graph.entry();
    state[entry] = VisitState::Active;
    graph.node_mut(entry).visited = true;
    stack.push(Frame { node: entry, next_edge: 0, running_sum: 0 });

    while let Some(top) = stack.last() {
        let node = top.node;
        let next_edge = top.next_edge;
        let out_degree = graph.node(node).out_edges.len();

        if next_edge < out_degree {
            let edge_id = graph.node(node).out_edges[next_edge];
            let head = graph.edge(edge_id).head;
            match state[head] {
                VisitState::Unvisited => {
                    // Descend; this edge is re-examined once the subtree
                    // below `head` has its path count.
                    state[head] = VisitState::Active;
                    graph.node_mut(head).visited = true;
                    stack.push(Frame { node: head, next_edge: 0, running_sum: 0 });
                }
                VisitState::Active => {
                    panic!(
                        "cycle through node {} while assigning edge values; \
                         the graph must be a DAG here",
                        head
                    );
                }
                VisitState::Done => {
                    let head_paths = graph.node(head).num_paths;
                    let frame = stack.last_mut().expect("frame on stack");
                    let sum = frame.running_sum;
                    frame.next_edge += 1;
                    frame.running_sum = sum + head_paths;
                    graph.edge_mut(edge_id).edge_val = sum as i64;
                }
            }
        } else {
            let frame = stack.pop().expect("frame on stack");
            let num_paths = if out_degree == 0 { 1 } else { frame.running_sum };
            graph.node_mut(node).num_paths = num_paths;
            state[node] = VisitState::Done;
            tracing::debug!(node, num_paths, "paths to exit");
        }
    }
}
