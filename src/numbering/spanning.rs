//! Closure edge and spanning-tree selection
//!
//! The synthetic exit-to-entry edge makes the graph strongly connected so
//! tree/chord classification is uniform. The tree itself is picked
//! greedily over the edge list in insertion order, treating the graph as
//! undirected; edges left out are the chords that will carry runtime
//! increments.

use crate::numbering::PathGraph;

/// Add the synthetic exit-to-entry closure edge
///
/// Value 0, no annotation, tree edge by default. Must run after
/// valuation and before spanning-tree selection.
pub fn add_closure_edge(graph: &mut PathGraph) {
    let (entry, exit) = (graph.entry(), graph.exit());
    let edge = graph.add_edge(exit, entry);
    graph.set_closure(edge);
}

/// Select the spanning tree and designate chords
///
/// The visited flag doubles as "node already in the tree". Entry and exit
/// are seeded into the tree; each edge whose endpoints are not both in the
/// tree yet joins it, the closure edge always stays a tree edge, and every
/// remaining edge becomes a chord. Increments are cleared on all edges.
///
/// The edge iteration order is the insertion order of import plus closure,
/// so the outcome is deterministic for a deterministic CFG.
pub fn choose_spanning_tree(graph: &mut PathGraph) {
    graph.init_dfs();
    let (entry, exit) = (graph.entry(), graph.exit());
    graph.node_mut(entry).visited = true;
    graph.node_mut(exit).visited = true;

    let closure = graph.closure_edge();
    for id in 0..graph.edge_count() {
        let (tail, head) = {
            let e = graph.edge(id);
            (e.tail, e.head)
        };
        graph.edge_mut(id).increment = 0;

        if !graph.node(tail).visited || !graph.node(head).visited {
            // At least one endpoint is new, so the edge joins the tree
            graph.node_mut(tail).visited = true;
            graph.node_mut(head).visited = true;
            graph.edge_mut(id).is_chord = false;
        } else if Some(id) == closure {
            graph.edge_mut(id).is_chord = false;
        } else {
            graph.edge_mut(id).is_chord = true;
        }
    }
}
