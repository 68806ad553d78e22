//! Path regeneration: turning a recorded id back into basic blocks
//!
//! Greedy descent from the entry: at every node take the outgoing edge
//! with the largest value not exceeding what is left of the id. Dummy
//! edges that leave the entry are synthetic transitions, so the entry
//! node is not part of a path that resumes at a loop header.

use crate::cfg::BlockId;
use crate::numbering::PathGraph;

/// Reconstruct the block sequence of a recorded path id
///
/// Valid ids are `0..graph.num_paths()`. A node is appended to the output
/// unless it is left through a dummy edge that does not land on the exit;
/// the exit itself, having no underlying block, is never part of the
/// output.
///
/// # Panics
/// Panics when `path_id` is out of range: the greedy descent runs out of
/// candidate edges before reaching the exit. Callers holding untrusted
/// ids must check against [`PathGraph::num_paths`] first.
pub fn regenerate_path(graph: &PathGraph, path_id: u64) -> Vec<BlockId> {
    assert!(
        path_id < graph.num_paths(),
        "path id {} is out of range: the procedure has {} paths",
        path_id,
        graph.num_paths()
    );

    let mut remaining = path_id;
    let mut blocks = Vec::new();
    let mut current = graph.entry();

    while current != graph.exit() {
        // Of all edges leaving the current node, pick the one with the
        // greatest value not exceeding the remaining id
        let mut chosen = None;
        let mut largest: i64 = -1;
        for &id in &graph.node(current).out_edges {
            let edge = graph.edge(id);
            if edge.edge_val > largest && edge.edge_val as u64 <= remaining {
                largest = edge.edge_val;
                chosen = Some(id);
            }
        }

        let Some(chosen) = chosen else {
            panic!(
                "path id {} is out of range: no candidate edge at node {} \
                 with {} remaining",
                path_id, current, remaining
            );
        };

        let edge = graph.edge(chosen);
        remaining -= edge.edge_val as u64;

        if !edge.is_dummy() || edge.head == graph.exit() {
            // A real transition, or the dummy closing a loop segment:
            // the current node belongs to the path
            let block = graph
                .node(current)
                .block
                .expect("only the exit lacks a block");
            blocks.push(block);
        }

        current = edge.head;
    }

    debug_assert_eq!(remaining, 0, "a valid id is consumed exactly");
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::procedure_from_edges;
    use crate::numbering::build_path_graph;

    fn ready_graph(blocks: &[(usize, &[usize])]) -> PathGraph {
        let proc_ = procedure_from_edges(blocks).unwrap();
        let mut g = build_path_graph(&proc_).unwrap();
        g.mark_annotations();
        g
    }

    #[test]
    fn test_diamond_round_trip() {
        let g = ready_graph(&[(0, &[1, 2]), (1, &[3]), (2, &[3]), (3, &[])]);
        assert_eq!(regenerate_path(&g, 0), vec![0, 1, 3]);
        assert_eq!(regenerate_path(&g, 1), vec![0, 2, 3]);
    }

    #[test]
    fn test_loop_segments() {
        // 0 -> 1, 1 -> {1, 2}: ids cover the four loop segments
        let g = ready_graph(&[(0, &[1]), (1, &[1, 2]), (2, &[])]);
        assert_eq!(g.num_paths(), 4);

        let paths: Vec<Vec<usize>> =
            (0..g.num_paths()).map(|id| regenerate_path(&g, id)).collect();

        // Entering the loop records the entry block; resuming at the
        // header does not
        assert!(paths.contains(&vec![0, 1, 2]));
        assert!(paths.contains(&vec![0, 1]));
        assert!(paths.contains(&vec![1, 2]));
        assert!(paths.contains(&vec![1]));
    }

    #[test]
    fn test_straight_line() {
        let g = ready_graph(&[(0, &[1]), (1, &[2]), (2, &[])]);
        assert_eq!(regenerate_path(&g, 0), vec![0, 1, 2]);
    }

    #[test]
    fn test_all_ids_distinct_blocks_in_cfg_order() {
        let g = ready_graph(&[
            (0, &[1, 2]),
            (1, &[3, 4]),
            (2, &[3]),
            (3, &[5]),
            (4, &[5]),
            (5, &[]),
        ]);
        assert_eq!(g.num_paths(), 3);

        let mut seen = std::collections::HashSet::new();
        for id in 0..g.num_paths() {
            let blocks = regenerate_path(&g, id);
            assert!(blocks.len() >= 2);
            assert_eq!(blocks[0], 0, "every path starts at the entry block");
            assert!(seen.insert(blocks.clone()), "ids map to distinct paths");
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_id_panics() {
        let g = ready_graph(&[(0, &[1, 2]), (1, &[3]), (2, &[3]), (3, &[])]);
        regenerate_path(&g, 99);
    }
}
