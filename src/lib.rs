// Pathprof: Ball-Larus path profiling engine
//
// Numbers the acyclic control-flow paths of a procedure so each one is
// identified by the sum of edge constants traversed at runtime, places
// the minimal chord instrumentation that maintains that sum, and replays
// recorded ids back into block sequences.

#![allow(dead_code)]

pub mod cfg;
pub mod cli;
pub mod instrument;
pub mod numbering;
pub mod output;
pub mod profile;

pub use cfg::{BlockId, Procedure, ProcedureDesc};
pub use instrument::{instrument_procedure, IrMutator};
pub use numbering::{build_path_graph, regenerate_path, Annotation, CfgProvider, PathGraph};
pub use profile::{PathCollector, ProfileDb};
