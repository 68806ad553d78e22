//! Chord increments: what each chord adds to the path-sum register
//!
//! The spanning tree makes the event count of every tree edge a linear
//! combination of chord events. A single traversal of the tree propagates
//! those combinations so that, at runtime, the chord increments summed
//! along any executed path reproduce the path's edge-value sum, i.e. its
//! unique id.

use crate::numbering::{EdgeId, PathGraph};

/// Relative direction of two edges sharing an endpoint
///
/// Returns +1 when `a` is absent (the traversal root) or when the edges
/// chain head-to-tail; -1 when they meet tail-to-tail or head-to-head.
///
/// # Panics
/// Panics when the edges share no endpoint; callers only ever compare
/// edges incident to the same node.
pub fn dir(graph: &PathGraph, a: Option<EdgeId>, b: EdgeId) -> i64 {
    let Some(a) = a else { return 1 };
    let (ea, eb) = (graph.edge(a), graph.edge(b));

    assert!(
        ea.head == eb.tail || ea.tail == eb.head || ea.head == eb.head || ea.tail == eb.tail,
        "edges {} and {} share no endpoint",
        a,
        b
    );

    if ea.tail == eb.head || ea.head == eb.tail {
        1
    } else {
        -1
    }
}

/// Compute the runtime increment of every chord
///
/// Walks the spanning tree from the entry, carrying the accumulated event
/// count and the arrival edge; at each node every incident chord picks up
/// the signed event count. A final pass adds each chord's own edge value.
///
/// The tree walk uses an explicit stack, so procedure size does not bound
/// recursion depth. Worst case O((V + E) * chords): each chord is touched
/// once per node it is incident to.
pub fn compute_chord_increments(graph: &mut PathGraph) {
    for id in 0..graph.edge_count() {
        if graph.edge(id).is_chord {
            graph.edge_mut(id).increment = 0;
        }
    }

    // (events, node, arrival tree edge); the arrival edge is None only at
    // the entry
    let mut stack: Vec<(i64, usize, Option<EdgeId>)> = vec![(0, graph.entry(), None)];
    while let Some((events, node, arrival)) = stack.pop() {
        let in_edges = graph.node(node).in_edges.clone();
        let out_edges = graph.node(node).out_edges.clone();

        for &f in &in_edges {
            if !graph.edge(f).is_chord && Some(f) != arrival {
                let next = dir(graph, arrival, f) * events + graph.edge(f).edge_val;
                stack.push((next, graph.edge(f).tail, Some(f)));
            }
        }
        for &f in &out_edges {
            if !graph.edge(f).is_chord && Some(f) != arrival {
                let next = dir(graph, arrival, f) * events + graph.edge(f).edge_val;
                stack.push((next, graph.edge(f).head, Some(f)));
            }
        }

        // Every chord incident to this node absorbs the signed events
        for f in in_edges.into_iter().chain(out_edges) {
            if graph.edge(f).is_chord {
                let delta = dir(graph, arrival, f) * events;
                graph.edge_mut(f).increment += delta;
            }
        }
    }

    for id in 0..graph.edge_count() {
        if graph.edge(id).is_chord {
            let val = graph.edge(id).edge_val;
            graph.edge_mut(id).increment += val;
        }
    }
}
