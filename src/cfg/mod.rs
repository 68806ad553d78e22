// External CFG model consumed by the path numbering engine

pub mod dominators;

pub use dominators::DominatorTree;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Block identifier within a procedure
pub type BlockId = usize;

/// Control flow graph over block ids
///
/// Edge weights record the successor slot the edge came from, so two
/// branches to the same target stay distinguishable.
pub type Cfg = DiGraph<BlockId, usize>;

/// Description of a single basic block: its id and ordered successors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDesc {
    /// Unique identifier within the procedure
    pub id: BlockId,
    /// Ordered successor block ids; order is significant for numbering
    #[serde(default)]
    pub successors: Vec<BlockId>,
}

/// Description of a procedure as handed over by a CFG provider
///
/// This is the serialized form the CLI reads from JSON files; the library
/// entry point is [`Procedure::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureDesc {
    /// Optional human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Entry block id
    pub entry: BlockId,
    /// All basic blocks of the procedure
    pub blocks: Vec<BlockDesc>,
}

/// Errors raised while materializing a procedure description
#[derive(Debug, Error)]
pub enum CfgError {
    #[error("procedure has no blocks")]
    Empty,
    #[error("duplicate block id {0}")]
    DuplicateBlock(BlockId),
    #[error("entry block {0} is not among the procedure's blocks")]
    MissingEntry(BlockId),
    #[error("block {block} lists unknown successor {successor}")]
    UnknownSuccessor { block: BlockId, successor: BlockId },
}

/// A validated procedure: blocks, successor lists, and cached dominance
///
/// Owns a petgraph mirror of the block structure so that dominance can be
/// computed once with the Cooper et al. algorithm and queried cheaply
/// afterwards.
///
/// # Example
/// ```
/// use pathprof::cfg::{BlockDesc, Procedure, ProcedureDesc};
///
/// let desc = ProcedureDesc {
///     name: None,
///     entry: 0,
///     blocks: vec![
///         BlockDesc { id: 0, successors: vec![1] },
///         BlockDesc { id: 1, successors: vec![] },
///     ],
/// };
/// let proc_ = Procedure::new(desc).unwrap();
/// assert_eq!(proc_.entry_block(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Procedure {
    desc: ProcedureDesc,
    graph: Cfg,
    node_of: HashMap<BlockId, NodeIndex>,
    dom: Option<DominatorTree>,
}

impl Procedure {
    /// Validate a procedure description and build its dominance cache
    ///
    /// # Errors
    /// Returns a [`CfgError`] for empty procedures, duplicate block ids,
    /// a missing entry block, or successors naming unknown blocks.
    pub fn new(desc: ProcedureDesc) -> Result<Self, CfgError> {
        if desc.blocks.is_empty() {
            return Err(CfgError::Empty);
        }

        let mut graph = Cfg::new();
        let mut node_of = HashMap::new();
        for block in &desc.blocks {
            if node_of.contains_key(&block.id) {
                return Err(CfgError::DuplicateBlock(block.id));
            }
            let idx = graph.add_node(block.id);
            node_of.insert(block.id, idx);
        }

        let entry = *node_of
            .get(&desc.entry)
            .ok_or(CfgError::MissingEntry(desc.entry))?;

        for block in &desc.blocks {
            let tail = node_of[&block.id];
            for (slot, &succ) in block.successors.iter().enumerate() {
                let head = *node_of.get(&succ).ok_or(CfgError::UnknownSuccessor {
                    block: block.id,
                    successor: succ,
                })?;
                graph.add_edge(tail, head, slot);
            }
        }

        let dom = DominatorTree::new(&graph, entry);

        Ok(Self {
            desc,
            graph,
            node_of,
            dom,
        })
    }

    /// Procedure name, if the description carried one
    pub fn name(&self) -> Option<&str> {
        self.desc.name.as_deref()
    }

    /// The entry block id
    pub fn entry_block(&self) -> BlockId {
        self.desc.entry
    }

    /// All block ids in description order
    pub fn blocks(&self) -> Vec<BlockId> {
        self.desc.blocks.iter().map(|b| b.id).collect()
    }

    /// Ordered successors of a block
    ///
    /// Order is the declaration order from the procedure description, which
    /// fixes the numbering produced downstream.
    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.desc
            .blocks
            .iter()
            .find(|b| b.id == block)
            .map(|b| b.successors.clone())
            .unwrap_or_default()
    }

    /// Check whether block `a` dominates block `b`
    ///
    /// Every block dominates itself. Blocks unreachable from entry are
    /// dominated by nothing but themselves.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let (Some(na), Some(nb)) = (self.node_of.get(&a), self.node_of.get(&b)) else {
            return false;
        };
        self.dom
            .as_ref()
            .map(|dom| dom.dominates(*na, *nb))
            .unwrap_or(false)
    }

    /// The underlying petgraph mirror
    pub fn graph(&self) -> &Cfg {
        &self.graph
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.desc.blocks.len()
    }

    /// True when the procedure has no blocks (never after `new`)
    pub fn is_empty(&self) -> bool {
        self.desc.blocks.is_empty()
    }
}

/// Convenience constructor used pervasively in tests
///
/// Builds a procedure from `(id, successors)` pairs with the first block as
/// entry.
pub fn procedure_from_edges(blocks: &[(BlockId, &[BlockId])]) -> Result<Procedure, CfgError> {
    let desc = ProcedureDesc {
        name: None,
        entry: blocks.first().map(|(id, _)| *id).unwrap_or(0),
        blocks: blocks
            .iter()
            .map(|(id, succs)| BlockDesc {
                id: *id,
                successors: succs.to_vec(),
            })
            .collect(),
    };
    Procedure::new(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Diamond: 0 -> {1, 2} -> 3
    fn create_diamond() -> Procedure {
        procedure_from_edges(&[
            (0, &[1, 2]),
            (1, &[3]),
            (2, &[3]),
            (3, &[]),
        ])
        .expect("valid procedure")
    }

    #[test]
    fn test_successor_order_preserved() {
        let proc_ = create_diamond();
        assert_eq!(proc_.successors(0), vec![1, 2]);
        assert_eq!(proc_.successors(3), Vec::<BlockId>::new());
    }

    #[test]
    fn test_dominates_diamond() {
        let proc_ = create_diamond();

        // Entry dominates everything
        assert!(proc_.dominates(0, 1));
        assert!(proc_.dominates(0, 2));
        assert!(proc_.dominates(0, 3));

        // Neither arm dominates the join
        assert!(!proc_.dominates(1, 3));
        assert!(!proc_.dominates(2, 3));

        // Reflexive
        assert!(proc_.dominates(3, 3));
    }

    #[test]
    fn test_dominates_self_loop() {
        // 0 -> 1, 1 -> {1, 2}: the header trivially dominates itself,
        // which is what marks 1 -> 1 as a back-edge downstream.
        let proc_ = procedure_from_edges(&[(0, &[1]), (1, &[1, 2]), (2, &[])]).unwrap();
        assert!(proc_.dominates(1, 1));
        assert!(proc_.dominates(1, 2));
        assert!(!proc_.dominates(2, 1));
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let err = procedure_from_edges(&[(0, &[1]), (1, &[]), (1, &[])]).unwrap_err();
        assert!(matches!(err, CfgError::DuplicateBlock(1)));
    }

    #[test]
    fn test_unknown_successor_rejected() {
        let err = procedure_from_edges(&[(0, &[7])]).unwrap_err();
        assert!(matches!(
            err,
            CfgError::UnknownSuccessor { block: 0, successor: 7 }
        ));
    }

    #[test]
    fn test_missing_entry_rejected() {
        let desc = ProcedureDesc {
            name: None,
            entry: 9,
            blocks: vec![BlockDesc { id: 0, successors: vec![] }],
        };
        assert!(matches!(Procedure::new(desc), Err(CfgError::MissingEntry(9))));
    }

    #[test]
    fn test_empty_rejected() {
        let desc = ProcedureDesc { name: None, entry: 0, blocks: vec![] };
        assert!(matches!(Procedure::new(desc), Err(CfgError::Empty)));
    }

    #[test]
    fn test_parallel_successors_kept_distinct() {
        // A two-armed branch to the same target keeps two edges
        let proc_ = procedure_from_edges(&[(0, &[1, 1]), (1, &[])]).unwrap();
        assert_eq!(proc_.successors(0), vec![1, 1]);
        assert_eq!(proc_.graph().edge_count(), 2);
    }

    #[test]
    fn test_desc_round_trips_through_json() {
        let desc = ProcedureDesc {
            name: Some("diamond".to_string()),
            entry: 0,
            blocks: vec![
                BlockDesc { id: 0, successors: vec![1, 2] },
                BlockDesc { id: 1, successors: vec![3] },
                BlockDesc { id: 2, successors: vec![3] },
                BlockDesc { id: 3, successors: vec![] },
            ],
        };
        let json = serde_json::to_string(&desc).unwrap();
        let back: ProcedureDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entry, 0);
        assert_eq!(back.blocks.len(), 4);
        assert_eq!(back.blocks[0].successors, vec![1, 2]);
    }
}
