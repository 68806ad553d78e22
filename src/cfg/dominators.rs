//! Dominance queries for the back-edge test
//!
//! Immediate dominators come from petgraph's Cooper-Harvey-Kennedy
//! implementation; on top of them the tree is flattened into preorder
//! intervals. A node's interval encloses the intervals of everything it
//! dominates, so `dominates` is two integer comparisons instead of a
//! walk up the idom chain, and an unset interval doubles as the
//! unreachable marker.

use crate::cfg::Cfg;
use petgraph::algo::dominators::simple_fast;
use petgraph::graph::NodeIndex;

/// Dominator tree of a CFG, flattened for O(1) dominance checks
#[derive(Debug, Clone)]
pub struct DominatorTree {
    root: NodeIndex,
    /// Immediate dominator per node index; None for the root and for
    /// nodes the entry never reaches
    idom: Vec<Option<NodeIndex>>,
    /// Preorder (enter, leave) interval per node index; None marks a
    /// node that is unreachable from the root
    span: Vec<Option<(u32, u32)>>,
}

impl DominatorTree {
    /// Build the tree for `cfg` rooted at `entry`
    ///
    /// Returns None for an empty CFG. Cost is the simple_fast solve,
    /// O(|V|^2) worst case, plus one linear sweep to lay out the
    /// intervals.
    pub fn new(cfg: &Cfg, entry: NodeIndex) -> Option<Self> {
        if cfg.node_count() == 0 {
            return None;
        }

        let solved = simple_fast(cfg, entry);

        let mut idom = vec![None; cfg.node_count()];
        let mut in_tree: Vec<Vec<NodeIndex>> = vec![Vec::new(); cfg.node_count()];
        for node in cfg.node_indices() {
            if let Some(parent) = solved.immediate_dominator(node) {
                idom[node.index()] = Some(parent);
                in_tree[parent.index()].push(node);
            }
        }

        // Flatten: give each node the clock range covering its subtree
        let mut span: Vec<Option<(u32, u32)>> = vec![None; cfg.node_count()];
        let mut clock = 0u32;
        let mut agenda = vec![(entry, false)];
        while let Some((node, leaving)) = agenda.pop() {
            if leaving {
                if let Some(range) = span[node.index()].as_mut() {
                    range.1 = clock;
                }
            } else {
                span[node.index()] = Some((clock, clock));
                agenda.push((node, true));
                for &child in &in_tree[node.index()] {
                    agenda.push((child, false));
                }
            }
            clock += 1;
        }

        Some(Self { root: entry, idom, span })
    }

    /// The root of the tree, the CFG entry it was built from
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// The immediate dominator of a node
    ///
    /// None for the root and for unreachable nodes; use
    /// [`DominatorTree::is_reachable`] to tell the two apart.
    pub fn immediate_dominator(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Whether the root reached this node when the tree was built
    pub fn is_reachable(&self, node: NodeIndex) -> bool {
        matches!(self.span.get(node.index()), Some(Some(_)))
    }

    /// Whether `a` dominates `b`
    ///
    /// True exactly when `a`'s preorder interval encloses `b`'s, which
    /// makes the check reflexive for reachable nodes. Any query
    /// touching an unreachable node is false.
    pub fn dominates(&self, a: NodeIndex, b: NodeIndex) -> bool {
        let at = self.span.get(a.index()).copied().flatten();
        let bt = self.span.get(b.index()).copied().flatten();
        match (at, bt) {
            (Some((a_enter, a_leave)), Some((b_enter, b_leave))) => {
                a_enter <= b_enter && b_leave <= a_leave
            }
            _ => false,
        }
    }

    /// Whether `a` dominates `b` and the two differ
    pub fn strictly_dominates(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.dominates(a, b) && a != b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Cfg;

    /// Create a simple diamond CFG:
    ///     0 (entry)
    ///    / \
    ///   1   2
    ///    \ /
    ///     3
    fn create_diamond_cfg() -> (Cfg, Vec<NodeIndex>) {
        let mut g = Cfg::new();
        let n: Vec<NodeIndex> = (0..4).map(|id| g.add_node(id)).collect();
        g.add_edge(n[0], n[1], 0);
        g.add_edge(n[0], n[2], 1);
        g.add_edge(n[1], n[3], 0);
        g.add_edge(n[2], n[3], 0);
        (g, n)
    }

    #[test]
    fn test_immediate_dominators_diamond() {
        let (cfg, n) = create_diamond_cfg();
        let dom = DominatorTree::new(&cfg, n[0]).expect("non-empty CFG");

        assert_eq!(dom.root(), n[0]);
        assert_eq!(dom.immediate_dominator(n[0]), None);
        assert_eq!(dom.immediate_dominator(n[1]), Some(n[0]));
        assert_eq!(dom.immediate_dominator(n[2]), Some(n[0]));
        // The join is dominated by the branch, not by either arm
        assert_eq!(dom.immediate_dominator(n[3]), Some(n[0]));
    }

    #[test]
    fn test_dominates_diamond() {
        let (cfg, n) = create_diamond_cfg();
        let dom = DominatorTree::new(&cfg, n[0]).expect("non-empty CFG");

        assert!(dom.dominates(n[0], n[0]));
        assert!(dom.dominates(n[0], n[1]));
        assert!(dom.dominates(n[0], n[3]));
        assert!(!dom.dominates(n[1], n[0]));
        assert!(!dom.dominates(n[1], n[3]));
        assert!(dom.dominates(n[3], n[3]));
    }

    #[test]
    fn test_strictly_dominates() {
        let (cfg, n) = create_diamond_cfg();
        let dom = DominatorTree::new(&cfg, n[0]).expect("non-empty CFG");

        assert!(dom.strictly_dominates(n[0], n[1]));
        assert!(!dom.strictly_dominates(n[0], n[0]));
    }

    #[test]
    fn test_intervals_nest_along_a_chain() {
        // Linear: 0 -> 1 -> 2 -> 3; every prefix block dominates every
        // later one
        let mut g = Cfg::new();
        let n: Vec<NodeIndex> = (0..4).map(|id| g.add_node(id)).collect();
        g.add_edge(n[0], n[1], 0);
        g.add_edge(n[1], n[2], 0);
        g.add_edge(n[2], n[3], 0);

        let dom = DominatorTree::new(&g, n[0]).expect("non-empty CFG");
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(dom.dominates(n[i], n[j]), i <= j, "{} vs {}", i, j);
            }
        }
        assert_eq!(dom.immediate_dominator(n[3]), Some(n[2]));
    }

    #[test]
    fn test_loop_header_dominates_latch() {
        // 0 -> 1, 1 -> 2, 2 -> 1 (back-edge), 1 -> 3
        let mut g = Cfg::new();
        let n: Vec<NodeIndex> = (0..4).map(|id| g.add_node(id)).collect();
        g.add_edge(n[0], n[1], 0);
        g.add_edge(n[1], n[2], 0);
        g.add_edge(n[2], n[1], 0);
        g.add_edge(n[1], n[3], 1);

        let dom = DominatorTree::new(&g, n[0]).expect("non-empty CFG");
        assert!(dom.dominates(n[1], n[2]));
        assert!(!dom.dominates(n[2], n[1]));
    }

    #[test]
    fn test_unreachable_node_has_no_interval() {
        let mut g = Cfg::new();
        let a = g.add_node(0);
        let b = g.add_node(1);
        let orphan = g.add_node(2);
        g.add_edge(a, b, 0);

        let dom = DominatorTree::new(&g, a).expect("non-empty CFG");
        assert!(dom.is_reachable(b));
        assert!(!dom.is_reachable(orphan));
        assert!(!dom.dominates(a, orphan));
        assert!(!dom.dominates(orphan, orphan));
    }

    #[test]
    fn test_empty_cfg() {
        let g = Cfg::new();
        assert!(DominatorTree::new(&g, NodeIndex::new(0)).is_none());
    }
}
