//! Profile database: joining a profile file with a numbering graph
//!
//! Once a profile is loaded, setting a procedure context regenerates
//! every recorded path id into its block sequence and accumulates
//! per-block and per-edge execution frequencies. Hot-path queries rank
//! the regenerated paths by normalized execution frequency.

use crate::cfg::BlockId;
use crate::numbering::{regenerate_path, PathGraph};
use crate::profile::{read_profile, ProcProfile, ProfileError};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// A regenerated path annotated with its execution statistics
#[derive(Debug, Clone)]
pub struct AnnotatedPath {
    /// The recorded Ball-Larus path id
    pub path_id: u64,
    /// Blocks of the path in execution order
    pub blocks: Vec<BlockId>,
    /// Raw execution count from the profile
    pub exec_count: u32,
    /// Count normalized over the procedure's total executions
    pub exec_freq: f64,
}

/// Errors raised by profile-database queries
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("procedure {0} is not in the profile")]
    UnknownProcedure(u32),
    #[error("recorded path id {id} exceeds the {num_paths} paths of procedure {proc_id}")]
    StalePathId { proc_id: u32, id: u64, num_paths: u64 },
}

/// Per-procedure query context built by [`ProfileDb::set_context`]
#[derive(Debug, Clone)]
struct ProcContext {
    function_id: u32,
    paths: Vec<AnnotatedPath>,
    block_freq: HashMap<BlockId, u64>,
    edge_freq: HashMap<(BlockId, BlockId), u64>,
}

/// Queryable view over a recorded profile
#[derive(Debug)]
pub struct ProfileDb {
    procs: Vec<ProcProfile>,
    context: Option<ProcContext>,
}

impl ProfileDb {
    /// Load a profile file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let mut file = File::open(path)?;
        let procs = read_profile(&mut file)?;
        Ok(Self { procs, context: None })
    }

    /// Build a database from already-parsed procedure tables
    pub fn from_procs(procs: Vec<ProcProfile>) -> Self {
        Self { procs, context: None }
    }

    /// True iff the procedure recorded at least one path execution
    pub fn was_called(&self, proc_id: u32) -> bool {
        self.procs
            .iter()
            .find(|p| p.function_id == proc_id)
            .map(|p| !p.paths.is_empty())
            .unwrap_or(false)
    }

    /// Procedure ids covered by the profile's header table
    pub fn procedures(&self) -> impl Iterator<Item = &ProcProfile> {
        self.procs.iter()
    }

    /// Set the query context to one procedure
    ///
    /// Regenerates every recorded path through `graph` and accumulates
    /// block and edge frequencies. Queries below answer for this
    /// procedure until the context is cleared or replaced.
    ///
    /// # Errors
    /// Fails when the procedure is absent from the profile or a recorded
    /// id does not fit the graph (a stale profile against a changed
    /// procedure).
    pub fn set_context(&mut self, proc_id: u32, graph: &PathGraph) -> Result<(), DbError> {
        let proc_ = self
            .procs
            .iter()
            .find(|p| p.function_id == proc_id)
            .ok_or(DbError::UnknownProcedure(proc_id))?;

        let total: u64 = proc_.paths.iter().map(|r| r.exec_count as u64).sum();
        let mut paths = Vec::with_capacity(proc_.paths.len());
        let mut block_freq: HashMap<BlockId, u64> = HashMap::new();
        let mut edge_freq: HashMap<(BlockId, BlockId), u64> = HashMap::new();

        for record in &proc_.paths {
            if record.path_id >= graph.num_paths() {
                return Err(DbError::StalePathId {
                    proc_id,
                    id: record.path_id,
                    num_paths: graph.num_paths(),
                });
            }
            let blocks = regenerate_path(graph, record.path_id);
            let count = record.exec_count as u64;

            for &block in &blocks {
                *block_freq.entry(block).or_insert(0) += count;
            }
            for pair in blocks.windows(2) {
                *edge_freq.entry((pair[0], pair[1])).or_insert(0) += count;
            }

            paths.push(AnnotatedPath {
                path_id: record.path_id,
                blocks,
                exec_count: record.exec_count,
                exec_freq: if total > 0 { count as f64 / total as f64 } else { 0.0 },
            });
        }

        // Hottest first; ties resolved by id for stable output
        paths.sort_by(|a, b| {
            b.exec_freq
                .partial_cmp(&a.exec_freq)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.path_id.cmp(&b.path_id))
        });

        self.context = Some(ProcContext { function_id: proc_id, paths, block_freq, edge_freq });
        Ok(())
    }

    /// Drop the per-procedure context
    pub fn clear_context(&mut self) {
        self.context = None;
    }

    /// The procedure the context is set to, if any
    pub fn context_procedure(&self) -> Option<u32> {
        self.context.as_ref().map(|c| c.function_id)
    }

    /// How often the block executed in the profile run
    ///
    /// Zero without a context or for blocks the run never touched.
    pub fn block_frequency(&self, block: BlockId) -> u64 {
        self.context
            .as_ref()
            .and_then(|c| c.block_freq.get(&block).copied())
            .unwrap_or(0)
    }

    /// How often the edge was taken in the profile run
    pub fn edge_frequency(&self, src: BlockId, dst: BlockId) -> u64 {
        self.context
            .as_ref()
            .and_then(|c| c.edge_freq.get(&(src, dst)).copied())
            .unwrap_or(0)
    }

    /// All regenerated paths of the context, hottest first
    pub fn paths(&self) -> &[AnnotatedPath] {
        self.context.as_ref().map(|c| c.paths.as_slice()).unwrap_or(&[])
    }

    /// The hottest paths whose combined frequency crosses `threshold`
    ///
    /// Walks the frequency-sorted paths and stops as soon as the
    /// cumulative normalized frequency reaches the threshold, so a
    /// threshold of 0.9 yields the smallest hot set covering 90% of the
    /// procedure's executions.
    pub fn hot_paths(&self, threshold: f64) -> Vec<&AnnotatedPath> {
        let mut hot = Vec::new();
        let mut cumulative = 0.0;
        for path in self.paths() {
            hot.push(path);
            cumulative += path.exec_freq;
            if cumulative >= threshold {
                break;
            }
        }
        hot
    }
}
