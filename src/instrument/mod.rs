//! Instrumentation emission over the annotated graph
//!
//! The numbering core never touches IR; this module walks the annotated
//! graph and drives an [`IrMutator`] implementation supplied by the IR
//! front end. Dummy-matched edges are projected back onto the real CFG
//! edge they stand for before any code is placed, so instrumentation only
//! ever lands on edges the program can execute.

use crate::cfg::BlockId;
use crate::numbering::{Annotation, PathEdge, PathGraph};

/// IR mutation capabilities the emitter drives
///
/// Implementations place code for one procedure. `split_edge` must return
/// the block instrumentation is inserted into: the tail when it has a
/// unique successor, the head when it has a unique predecessor, otherwise
/// a fresh block materialized on the edge. A `head` of None stands for
/// the procedure's exit; code then lands at the tail's terminator.
pub trait IrMutator {
    /// Locate (or create) the insertion block for an edge
    fn split_edge(&mut self, tail: BlockId, head: Option<BlockId>) -> BlockId;

    /// Allocate the 64-bit path-sum register, zeroed, and record the
    /// procedure entry
    fn emit_prologue(&mut self, proc_id: u32);

    /// Store `value` into the path-sum register
    fn emit_init(&mut self, block: BlockId, value: i64);

    /// Load the register, add `delta`, store back
    fn emit_increment(&mut self, block: BlockId, delta: i64);

    /// Load the register, add `increment` when nonzero, hand the sum to
    /// the runtime, then store `reset` when one is given
    fn emit_read(&mut self, block: BlockId, increment: i64, reset: Option<i64>, proc_id: u32);

    /// Record the procedure exit before the block's terminator
    fn emit_record_exit(&mut self, block: BlockId, proc_id: u32);
}

/// The real CFG edge an annotated edge stands for
///
/// Dummy halves are folded back onto the back-edge they replaced; a head
/// of None marks an edge into the synthetic exit, where instrumentation
/// goes at the tail's terminator.
pub fn resolve_cfg_edge(graph: &PathGraph, edge: &PathEdge) -> (BlockId, Option<BlockId>) {
    if let Some(m) = edge.dummy_match {
        let matched = graph.edge(m);
        if graph.node(edge.head).block.is_some() {
            // Entry-side half: the CFG edge runs from the matched latch
            // to this half's header
            (
                graph.node(matched.tail).block.expect("latch has a block"),
                graph.node(edge.head).block,
            )
        } else {
            // Exit-side half: from this half's latch to the matched
            // header
            (
                graph.node(edge.tail).block.expect("latch has a block"),
                graph.node(matched.head).block,
            )
        }
    } else {
        (
            graph.node(edge.tail).block.expect("only the exit lacks a block"),
            graph.node(edge.head).block,
        )
    }
}

/// Emit instrumentation for one annotated procedure
///
/// Walks the edges in insertion order, placing code for every non-NONE
/// annotation, then plants an exit record on every non-dummy edge into
/// the synthetic exit.
pub fn instrument_procedure(graph: &PathGraph, proc_id: u32, ir: &mut impl IrMutator) {
    ir.emit_prologue(proc_id);

    for edge in graph.edges() {
        if edge.annotation == Annotation::None {
            continue;
        }
        let (tail, head) = resolve_cfg_edge(graph, edge);
        let block = ir.split_edge(tail, head);
        match edge.annotation {
            Annotation::None => unreachable!(),
            Annotation::Init => ir.emit_init(block, edge.increment),
            Annotation::Incr => ir.emit_increment(block, edge.increment),
            Annotation::Read => {
                let reset = edge.carries_reset.then_some(edge.reset);
                ir.emit_read(block, edge.increment, reset, proc_id);
            }
        }
    }

    // Exit records go on real exits only; dummy halves into the exit are
    // loop back-edges, not procedure returns
    for &id in &graph.node(graph.exit()).in_edges {
        let edge = graph.edge(id);
        if !edge.is_dummy() {
            let block = graph
                .node(edge.tail)
                .block
                .expect("only the exit lacks a block");
            ir.emit_record_exit(block, proc_id);
        }
    }
}
