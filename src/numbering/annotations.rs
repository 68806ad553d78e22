//! Annotation placement: deciding which edges carry instrumentation
//!
//! Two worklist passes pin down where the path-sum register is
//! initialized and where it is read out. Dummy pairs encode the loop
//! wrap-around: an initialization landing on a synthetic entry-side dummy
//! is moved onto its exit-side match as a reset, so the store happens on
//! the real back-edge. A final sweep turns every remaining chord with a
//! nonzero increment into a plain register increment.

use crate::numbering::{Annotation, PathGraph};

/// Decide the annotation of every edge
///
/// Forward pass from the entry places initializations, backward pass from
/// the exit places readouts, the sweep places increments. Must run after
/// chord increments are solved.
///
/// # Panics
/// Panics if a tree edge carries a reset without being dummy-matched;
/// resets are only ever moved onto dummy edges.
pub fn associate_annotations(graph: &mut PathGraph) {
    place_inits(graph);
    place_reads(graph);

    // Register increment code for all remaining chords
    for id in 0..graph.edge_count() {
        let e = graph.edge(id);
        if e.is_chord && !e.instrumented && e.increment != 0 {
            let e = graph.edge_mut(id);
            e.instrumented = true;
            e.annotation = Annotation::Incr;
            e.reset = 0;
        }
    }

    for e in graph.edges().filter(|e| e.instrumented) {
        tracing::debug!(
            tail = e.tail,
            head = e.head,
            kind = ?e.annotation,
            increment = e.increment,
            reset = e.reset,
            dummy = e.is_dummy(),
            "instrumented edge"
        );
    }
}

/// Forward pass: initialize the register as late as possible
///
/// A chord, or an edge into a join, must initialize right there; when the
/// edge is half of a dummy pair the initialization moves to the matching
/// half as a reset. An edge into a single-predecessor node defers the
/// decision to that node.
fn place_inits(graph: &mut PathGraph) {
    let mut worklist = vec![graph.entry()];

    while let Some(node) = worklist.pop() {
        let out_edges = graph.node(node).out_edges.clone();
        for id in out_edges {
            let (is_chord, head, dummy_match, increment) = {
                let e = graph.edge(id);
                (e.is_chord, e.head, e.dummy_match, e.increment)
            };

            if !is_chord && graph.node(head).in_edges.len() == 1 {
                // The successor sees only this edge; initialization can
                // wait until its own out-edges are decided
                worklist.push(head);
                continue;
            }

            match dummy_match {
                Some(m) => {
                    // Move the initialization onto the matching dummy
                    let matched = graph.edge_mut(m);
                    matched.reset = increment;
                    matched.carries_reset = true;
                    let e = graph.edge_mut(id);
                    e.instrumented = true;
                    e.increment = 0;
                    e.annotation = Annotation::None;
                }
                None => {
                    let e = graph.edge_mut(id);
                    e.instrumented = true;
                    e.annotation = Annotation::Init;
                }
            }
        }
    }
}

/// Backward pass: read the register as early as possible
///
/// Chords into the readout region both add their increment and emit the
/// sum. A tree edge carrying a reset must be a dummy; its readout stores
/// the reset afterwards. An edge out of a single-successor node defers to
/// that node; anything else is a plain readout of the accumulated sum.
fn place_reads(graph: &mut PathGraph) {
    let mut worklist = vec![graph.exit()];

    while let Some(node) = worklist.pop() {
        let in_edges = graph.node(node).in_edges.clone();
        for id in in_edges {
            let (is_chord, tail, carries_reset, dummy_match) = {
                let e = graph.edge(id);
                (e.is_chord, e.tail, e.carries_reset, e.dummy_match)
            };

            if is_chord {
                // Chords both adjust the sum and record it
                let e = graph.edge_mut(id);
                e.instrumented = true;
                e.annotation = Annotation::Read;
            } else if carries_reset {
                // A tree edge with a reinitialization value has to be a
                // dummy; a plain tree edge never reinitializes
                assert!(
                    dummy_match.is_some(),
                    "tree edge {} carries a reset but is not dummy-matched",
                    id
                );
                let e = graph.edge_mut(id);
                e.instrumented = true;
                e.annotation = Annotation::Read;
                e.increment = 0;
            } else if graph.node(tail).out_edges.len() == 1 {
                worklist.push(tail);
            } else {
                // No increment, no reset: a pure emit of the sum
                let e = graph.edge_mut(id);
                e.instrumented = true;
                e.annotation = Annotation::Read;
                e.increment = 0;
                e.reset = 0;
                e.carries_reset = false;
            }
        }
    }
}
