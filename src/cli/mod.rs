// CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};

/// Pathprof - Ball-Larus path profiling engine
///
/// Numbers the acyclic paths of a procedure's control-flow graph, places
/// the minimal instrumentation that makes every executed path identify
/// itself by an integer, and replays recorded path ids back into block
/// sequences.
#[derive(Parser, Debug, Clone)]
#[command(name = "pathprof")]
#[command(author, version, about)]
pub struct Cli {
    /// Output format
    #[arg(global = true, long, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Human,
    /// Compact JSON for programmatic consumption
    Json,
    /// Formatted JSON with indentation
    Pretty,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Number the paths of a procedure and show each id's block sequence
    Paths(PathsArgs),

    /// Show the per-edge instrumentation plan for a procedure
    Annotate(AnnotateArgs),

    /// Show the contents of a recorded profile file
    Dump(DumpArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PathsArgs {
    /// Procedure description (JSON file with entry and blocks)
    #[arg(long)]
    pub cfg: String,

    /// Show only this path id
    #[arg(long)]
    pub id: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct AnnotateArgs {
    /// Procedure description (JSON file with entry and blocks)
    #[arg(long)]
    pub cfg: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DumpArgs {
    /// Profile file written by the runtime
    #[arg(long, env = "PATHPROF_PROFILE")]
    pub profile: String,

    /// Procedure description to replay path ids against
    #[arg(long)]
    pub cfg: Option<String>,

    /// Procedure id the CFG description belongs to
    #[arg(long, default_value_t = 0)]
    pub proc_id: u32,

    /// Report the hottest paths covering this fraction of executions
    #[arg(long)]
    pub hot: Option<f64>,
}

pub mod cmds {
    use super::{AnnotateArgs, Cli, DumpArgs, OutputFormat, PathsArgs};
    use crate::cfg::{Procedure, ProcedureDesc};
    use crate::numbering::{build_path_graph, regenerate_path, Annotation, PathGraph};
    use crate::output;
    use crate::profile::ProfileDb;
    use anyhow::{Context, Result};
    use serde_json::json;

    /// Load and number a procedure from a JSON description file
    fn load_graph(path: &str) -> Result<(Procedure, PathGraph)> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read procedure description {}", path))?;
        let desc: ProcedureDesc = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse procedure description {}", path))?;
        let proc_ = Procedure::new(desc).context("invalid procedure description")?;
        let mut graph = build_path_graph(&proc_)
            .context("procedure rejected: cannot build numbering graph")?;
        graph.mark_annotations();
        Ok((proc_, graph))
    }

    fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<()> {
        let text = match format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };
        println!("{}", text);
        Ok(())
    }

    pub fn paths(args: &PathsArgs, cli: &Cli) -> Result<()> {
        let (proc_, graph) = load_graph(&args.cfg)?;
        let num_paths = graph.num_paths();

        let ids: Vec<u64> = match args.id {
            Some(id) => {
                if id >= num_paths {
                    anyhow::bail!("path id {} out of range ({} paths)", id, num_paths);
                }
                vec![id]
            }
            None => (0..num_paths).collect(),
        };

        let listed: Vec<(u64, Vec<usize>)> = ids
            .into_iter()
            .map(|id| (id, regenerate_path(&graph, id)))
            .collect();

        match cli.output {
            OutputFormat::Human => {
                if let Some(name) = proc_.name() {
                    output::header(&format!("Paths of {}", name));
                }
                println!("Acyclic paths: {}", num_paths);
                for (id, blocks) in &listed {
                    let rendered: Vec<String> =
                        blocks.iter().map(|b| b.to_string()).collect();
                    println!("  {:>6}: {}", id, rendered.join(" -> "));
                }
            }
            OutputFormat::Json | OutputFormat::Pretty => {
                let value = json!({
                    "procedure": proc_.name(),
                    "num_paths": num_paths,
                    "paths": listed
                        .iter()
                        .map(|(id, blocks)| json!({ "id": id, "blocks": blocks }))
                        .collect::<Vec<_>>(),
                });
                print_json(&value, cli.output)?;
            }
        }
        Ok(())
    }

    pub fn annotate(args: &AnnotateArgs, cli: &Cli) -> Result<()> {
        let (proc_, graph) = load_graph(&args.cfg)?;

        let rows: Vec<_> = graph
            .edges()
            .filter(|e| e.annotation != Annotation::None)
            .map(|e| {
                let (tail, head) = crate::instrument::resolve_cfg_edge(&graph, e);
                (tail, head, e)
            })
            .collect();

        match cli.output {
            OutputFormat::Human => {
                if let Some(name) = proc_.name() {
                    output::header(&format!("Instrumentation for {}", name));
                }
                println!("Instrumented edges: {}", rows.len());
                for (tail, head, e) in &rows {
                    let target = head
                        .map(|h| h.to_string())
                        .unwrap_or_else(|| "exit".to_string());
                    let reset = if e.carries_reset {
                        format!(", reset {}", e.reset)
                    } else {
                        String::new()
                    };
                    println!(
                        "  {} -> {}: {:?} (increment {}{})",
                        tail, target, e.annotation, e.increment, reset
                    );
                }
            }
            OutputFormat::Json | OutputFormat::Pretty => {
                let value = json!({
                    "procedure": proc_.name(),
                    "num_paths": graph.num_paths(),
                    "edges": rows
                        .iter()
                        .map(|(tail, head, e)| json!({
                            "tail": tail,
                            "head": head,
                            "kind": format!("{:?}", e.annotation),
                            "increment": e.increment,
                            "reset": e.carries_reset.then_some(e.reset),
                        }))
                        .collect::<Vec<_>>(),
                });
                print_json(&value, cli.output)?;
            }
        }
        Ok(())
    }

    pub fn dump(args: &DumpArgs, cli: &Cli) -> Result<()> {
        let mut db = ProfileDb::open(&args.profile)
            .with_context(|| format!("failed to load profile {}", args.profile))?;

        if db.procedures().next().is_none() {
            output::status(output::Level::Info, "profile records no procedures");
        }
        if args.hot.is_some() && args.cfg.is_none() {
            output::status(
                output::Level::Warn,
                "--hot needs --cfg to replay path ids; ignoring",
            );
        }

        // With a CFG at hand the ids can be replayed into block sequences
        let graph = match &args.cfg {
            Some(path) => {
                let (_, graph) = load_graph(path)?;
                db.set_context(args.proc_id, &graph)
                    .context("profile does not match the procedure description")?;
                Some(graph)
            }
            None => None,
        };

        match cli.output {
            OutputFormat::Human => {
                for proc_ in db.procedures() {
                    println!(
                        "Procedure {}: {} distinct paths",
                        proc_.function_id,
                        proc_.paths.len()
                    );
                    for record in &proc_.paths {
                        println!(
                            "  path {:>6}: {} executions",
                            record.path_id, record.exec_count
                        );
                    }
                }
                if graph.is_some() {
                    output::header("Replayed paths");
                    for path in db.paths() {
                        let rendered: Vec<String> =
                            path.blocks.iter().map(|b| b.to_string()).collect();
                        println!(
                            "  path {:>6} ({:>5.1}%): {}",
                            path.path_id,
                            path.exec_freq * 100.0,
                            rendered.join(" -> ")
                        );
                    }
                    if let Some(threshold) = args.hot {
                        output::header(&format!("Hot paths covering {:.0}%", threshold * 100.0));
                        for path in db.hot_paths(threshold) {
                            println!(
                                "  path {:>6}: {} executions",
                                path.path_id, path.exec_count
                            );
                        }
                    }
                }
            }
            OutputFormat::Json | OutputFormat::Pretty => {
                let procs: Vec<_> = db
                    .procedures()
                    .map(|p| {
                        json!({
                            "function_id": p.function_id,
                            "paths": p.paths
                                .iter()
                                .map(|r| json!({
                                    "id": r.path_id,
                                    "count": r.exec_count,
                                }))
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let replayed: Vec<_> = db
                    .paths()
                    .iter()
                    .map(|p| {
                        json!({
                            "id": p.path_id,
                            "blocks": p.blocks,
                            "count": p.exec_count,
                            "frequency": p.exec_freq,
                        })
                    })
                    .collect();
                let hot: Option<Vec<u64>> = args.hot.map(|threshold| {
                    db.hot_paths(threshold).iter().map(|p| p.path_id).collect()
                });
                let value = json!({
                    "procedures": procs,
                    "replayed": replayed,
                    "hot": hot,
                });
                print_json(&value, cli.output)?;
            }
        }
        Ok(())
    }
}
