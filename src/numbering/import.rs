//! CFG import: materializing the numbering graph from a procedure
//!
//! Back-edges (a successor that dominates its predecessor, self-loops
//! included) are not copied; each one is replaced by a cross-linked dummy
//! pair `entry -> header` and `latch -> exit` so the resulting graph is a
//! DAG while every loop iteration still maps onto an entry-to-exit path.

use crate::cfg::{BlockId, Procedure};
use crate::numbering::{NodeId, PathGraph};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Capability set the importer consumes from a CFG provider
///
/// [`Procedure`] implements this; other IR front ends can supply their own
/// implementation.
pub trait CfgProvider {
    /// The distinguished entry block
    fn entry_block(&self) -> BlockId;
    /// All blocks of the procedure, in a deterministic order
    fn blocks(&self) -> Vec<BlockId>;
    /// Ordered successors of a block
    fn successors(&self, block: BlockId) -> Vec<BlockId>;
    /// Dominance oracle: true iff `a` dominates `b`
    fn dominates(&self, a: BlockId, b: BlockId) -> bool;
}

impl CfgProvider for Procedure {
    fn entry_block(&self) -> BlockId {
        Procedure::entry_block(self)
    }

    fn blocks(&self) -> Vec<BlockId> {
        Procedure::blocks(self)
    }

    fn successors(&self, block: BlockId) -> Vec<BlockId> {
        Procedure::successors(self, block)
    }

    fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        Procedure::dominates(self, a, b)
    }
}

/// Input-shape errors: the procedure is rejected, nothing is instrumented
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("block {0} is unreachable from the procedure entry")]
    UnreachableBlock(BlockId),
    #[error("block {block} lists unknown successor {successor}")]
    UnknownSuccessor { block: BlockId, successor: BlockId },
    #[error("block {0} branches back to the procedure entry")]
    EdgeToEntry(BlockId),
}

/// Materialize the numbering graph for a procedure
///
/// Creates the entry node (mirroring the entry block), one node per
/// reachable block, and a synthetic exit node. Every back-edge becomes a
/// dummy pair; blocks without successors flow into the exit. A successor
/// listed twice by the same block yields two distinct edges.
///
/// # Errors
/// Rejects procedures with blocks unreachable from the entry, successors
/// naming unknown blocks, or branches targeting the entry block (those
/// would need an entry-to-entry dummy self-loop; the source IR guarantees
/// the entry block has no predecessors).
pub fn build_path_graph(provider: &impl CfgProvider) -> Result<PathGraph, GraphError> {
    let mut graph = PathGraph::new();
    let mut node_of: HashMap<BlockId, NodeId> = HashMap::new();

    let entry_block = provider.entry_block();
    let entry = graph.add_node(Some(entry_block));
    let exit = graph.add_node(None);
    graph.set_endpoints(entry, exit);
    node_of.insert(entry_block, entry);

    let known: std::collections::HashSet<BlockId> = provider.blocks().into_iter().collect();

    // Breadth-first discovery from the entry; edges are created in the
    // order blocks are dequeued, which fixes the numbering downstream.
    let mut worklist = VecDeque::new();
    worklist.push_back(entry_block);
    while let Some(block) = worklist.pop_front() {
        let tail = node_of[&block];
        let successors = provider.successors(block);

        if successors.is_empty() {
            graph.add_edge(tail, exit);
            continue;
        }

        for succ in successors {
            if !known.contains(&succ) {
                return Err(GraphError::UnknownSuccessor { block, successor: succ });
            }
            if succ == entry_block {
                return Err(GraphError::EdgeToEntry(block));
            }
            let head = match node_of.get(&succ) {
                Some(&n) => n,
                None => {
                    let n = graph.add_node(Some(succ));
                    node_of.insert(succ, n);
                    worklist.push_back(succ);
                    n
                }
            };
            if provider.dominates(succ, block) {
                // Back-edge: replace with the matched dummy pair
                graph.add_dummy_pair(head, tail);
            } else {
                graph.add_edge(tail, head);
            }
        }
    }

    // Reject procedures with blocks the traversal never saw
    for block in provider.blocks() {
        if !node_of.contains_key(&block) {
            return Err(GraphError::UnreachableBlock(block));
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::procedure_from_edges;

    #[test]
    fn test_diamond_import_shape() {
        // 0 -> {1, 2} -> 3
        let proc_ = procedure_from_edges(&[
            (0, &[1, 2]),
            (1, &[3]),
            (2, &[3]),
            (3, &[]),
        ])
        .unwrap();
        let g = build_path_graph(&proc_).unwrap();

        // entry(=block 0), exit, blocks 1..3
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.node(g.entry()).block, Some(0));
        assert_eq!(g.node(g.exit()).block, None);
        // 4 CFG edges plus 3 -> exit
        assert_eq!(g.edge_count(), 5);
        assert!(g.edges().all(|e| !e.is_dummy()));
    }

    #[test]
    fn test_self_loop_becomes_dummy_pair() {
        // 0 -> 1, 1 -> {1, 2}, 2 exits
        let proc_ = procedure_from_edges(&[(0, &[1]), (1, &[1, 2]), (2, &[])]).unwrap();
        let g = build_path_graph(&proc_).unwrap();

        let dummies: Vec<_> = g.edges().filter(|e| e.is_dummy()).collect();
        assert_eq!(dummies.len(), 2);

        let from_entry = dummies.iter().find(|e| e.tail == g.entry()).unwrap();
        let to_exit = dummies.iter().find(|e| e.head == g.exit()).unwrap();
        assert_eq!(from_entry.dummy_match, Some(to_exit.id));
        assert_eq!(to_exit.dummy_match, Some(from_entry.id));
        // Both halves pivot on the loop header, block 1
        assert_eq!(g.node(from_entry.head).block, Some(1));
        assert_eq!(g.node(to_exit.tail).block, Some(1));
    }

    #[test]
    fn test_natural_loop_becomes_dummy_pair() {
        // 0 -> 1, 1 -> 2, 2 -> {1, 3}: 1 dominates 2, so 2 -> 1 is a
        // back-edge
        let proc_ =
            procedure_from_edges(&[(0, &[1]), (1, &[2]), (2, &[1, 3]), (3, &[])]).unwrap();
        let g = build_path_graph(&proc_).unwrap();

        let dummies: Vec<_> = g.edges().filter(|e| e.is_dummy()).collect();
        assert_eq!(dummies.len(), 2);
        let to_exit = dummies.iter().find(|e| e.head == g.exit()).unwrap();
        assert_eq!(g.node(to_exit.tail).block, Some(2));
    }

    #[test]
    fn test_two_latches_get_independent_pairs() {
        // Two back-edges into the same header, from latches 2 and 3
        let proc_ = procedure_from_edges(&[
            (0, &[1]),
            (1, &[2, 3]),
            (2, &[1, 4]),
            (3, &[1, 4]),
            (4, &[]),
        ])
        .unwrap();
        let g = build_path_graph(&proc_).unwrap();

        let dummies: Vec<_> = g.edges().filter(|e| e.is_dummy()).collect();
        assert_eq!(dummies.len(), 4);

        // Every half points back at its own sibling
        for e in &dummies {
            let m = g.edge(e.dummy_match.unwrap());
            assert_eq!(m.dummy_match, Some(e.id));
        }

        // The two exit-side halves come from distinct latches
        let latches: Vec<_> = dummies
            .iter()
            .filter(|e| e.head == g.exit())
            .map(|e| g.node(e.tail).block.unwrap())
            .collect();
        assert_eq!(latches.len(), 2);
        assert!(latches.contains(&2));
        assert!(latches.contains(&3));
    }

    #[test]
    fn test_repeated_successor_kept_distinct() {
        let proc_ = procedure_from_edges(&[(0, &[1, 1]), (1, &[])]).unwrap();
        let g = build_path_graph(&proc_).unwrap();

        let entry_out = &g.node(g.entry()).out_edges;
        assert_eq!(entry_out.len(), 2);
        assert_eq!(g.edge(entry_out[0]).head, g.edge(entry_out[1]).head);
        assert_ne!(entry_out[0], entry_out[1]);
    }

    #[test]
    fn test_unreachable_block_rejected() {
        // Block 2 has an edge into 1 but nothing reaches it from entry
        let proc_ = procedure_from_edges(&[(0, &[1]), (1, &[]), (2, &[1])]).unwrap();
        let err = build_path_graph(&proc_).unwrap_err();
        assert!(matches!(err, GraphError::UnreachableBlock(2)));
    }

    #[test]
    fn test_branch_to_entry_rejected() {
        let proc_ = procedure_from_edges(&[(0, &[1]), (1, &[0])]).unwrap();
        let err = build_path_graph(&proc_).unwrap_err();
        assert!(matches!(err, GraphError::EdgeToEntry(1)));
    }

    #[test]
    fn test_single_block_procedure() {
        let proc_ = procedure_from_edges(&[(0, &[])]).unwrap();
        let g = build_path_graph(&proc_).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        let only = g.edges().next().unwrap();
        assert_eq!(only.tail, g.entry());
        assert_eq!(only.head, g.exit());
    }
}
