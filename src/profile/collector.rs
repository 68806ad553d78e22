//! Runtime accumulation of `(path id, count)` pairs
//!
//! The instrumented program funnels its three runtime entry points into a
//! [`PathCollector`]. The collector owns all profiling state explicitly:
//! which procedure was entered first, the highest procedure id seen, and
//! one ordered path-count map per procedure. The profile is flushed
//! exactly once, when the first-entered procedure exits.

use crate::profile::{write_profile, ProfileError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Process-wide profiling state with a single owner
///
/// Single-threaded by design: the instrumented programs this serves are
/// not concurrent, and the non-goal of lock-protected accumulation keeps
/// the hot `record_path_sum` path a plain map update.
#[derive(Debug)]
pub struct PathCollector {
    output: PathBuf,
    first_proc: Option<u32>,
    max_proc_id: u32,
    counts: Vec<BTreeMap<u64, u32>>,
    flushed: bool,
}

impl PathCollector {
    /// Create a collector that will flush to `output`
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            first_proc: None,
            max_proc_id: 0,
            counts: Vec::new(),
            flushed: false,
        }
    }

    /// Runtime entry point: a procedure was entered
    ///
    /// The first procedure ever entered becomes the flush key.
    pub fn record_entry(&mut self, proc_id: u32) {
        if self.first_proc.is_none() {
            self.first_proc = Some(proc_id);
        }
    }

    /// Runtime entry point: a path readout fired
    pub fn record_path_sum(&mut self, path_id: u64, proc_id: u32) {
        let idx = proc_id as usize;
        if idx >= self.counts.len() {
            self.counts.resize_with(idx + 1, BTreeMap::new);
        }
        *self.counts[idx].entry(path_id).or_insert(0) += 1;
        if proc_id > self.max_proc_id {
            self.max_proc_id = proc_id;
        }
    }

    /// Runtime entry point: a procedure is about to return
    ///
    /// Writes the profile when `proc_id` is the first-entered procedure;
    /// later exits of the same procedure do not rewrite it. The file is
    /// serialized to a buffer first so a failed write never leaves a
    /// partial profile behind.
    ///
    /// Returns true when this call flushed the profile.
    pub fn record_exit(&mut self, proc_id: u32) -> Result<bool, ProfileError> {
        if self.flushed || self.first_proc != Some(proc_id) {
            return Ok(false);
        }

        let mut bytes = Vec::new();
        write_profile(&mut bytes, self.tables())?;
        fs::write(&self.output, &bytes)?;
        self.flushed = true;
        tracing::debug!(path = %self.output.display(), bytes = bytes.len(), "profile flushed");
        Ok(true)
    }

    /// The per-procedure tables covering `0..=max_proc_id`
    fn tables(&self) -> &[BTreeMap<u64, u32>] {
        let len = (self.max_proc_id as usize + 1).min(self.counts.len());
        &self.counts[..len]
    }

    /// Where the profile is (or will be) written
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// True once the profile has been written
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::read_profile;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_flush_keyed_on_first_procedure() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("prof.res");
        let mut collector = PathCollector::new(&out);

        collector.record_entry(4);
        collector.record_entry(9);
        collector.record_path_sum(1, 4);
        collector.record_path_sum(0, 9);

        // Exiting a later procedure does not flush
        assert!(!collector.record_exit(9).unwrap());
        assert!(!out.exists());

        // Exiting the first-entered procedure does
        assert!(collector.record_exit(4).unwrap());
        assert!(out.exists());
    }

    #[test]
    fn test_flush_happens_once() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("prof.res");
        let mut collector = PathCollector::new(&out);

        collector.record_entry(0);
        collector.record_path_sum(0, 0);
        assert!(collector.record_exit(0).unwrap());

        // A second exit of the same procedure is a no-op
        collector.record_path_sum(1, 0);
        assert!(!collector.record_exit(0).unwrap());

        let procs = read_profile(&mut File::open(&out).unwrap()).unwrap();
        assert_eq!(procs[0].paths.len(), 1);
    }

    #[test]
    fn test_counts_accumulate() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("prof.res");
        let mut collector = PathCollector::new(&out);

        collector.record_entry(0);
        collector.record_path_sum(0, 0);
        collector.record_path_sum(0, 0);
        collector.record_path_sum(2, 0);
        collector.record_exit(0).unwrap();

        let procs = read_profile(&mut File::open(&out).unwrap()).unwrap();
        assert_eq!(procs.len(), 1);
        let paths = &procs[0].paths;
        assert_eq!(paths.len(), 2);
        assert_eq!((paths[0].path_id, paths[0].exec_count), (0, 2));
        assert_eq!((paths[1].path_id, paths[1].exec_count), (2, 1));
    }

    #[test]
    fn test_sparse_procedure_ids() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("prof.res");
        let mut collector = PathCollector::new(&out);

        collector.record_entry(0);
        collector.record_path_sum(5, 2);
        collector.record_exit(0).unwrap();

        let procs = read_profile(&mut File::open(&out).unwrap()).unwrap();
        // Headers cover every id up to the highest seen
        assert_eq!(procs.len(), 3);
        assert!(procs[0].paths.is_empty());
        assert!(procs[1].paths.is_empty());
        assert_eq!(procs[2].paths[0].path_id, 5);
    }

    #[test]
    fn test_unopenable_output_surfaces_error() {
        let mut collector = PathCollector::new("/nonexistent-dir/prof.res");
        collector.record_entry(0);
        collector.record_path_sum(0, 0);
        let err = collector.record_exit(0).unwrap_err();
        assert!(matches!(err, ProfileError::Io(_)));
        assert!(!collector.is_flushed());
    }
}
