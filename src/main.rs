// Pathprof: Ball-Larus path profiling engine
//
// Numbers a procedure's acyclic control-flow paths, shows the resulting
// instrumentation plan, and dumps recorded profiles.

#![allow(dead_code)]

use anyhow::Result;
use clap::Parser;

mod cfg;
mod cli;
mod instrument;
mod numbering;
mod output;
mod profile;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    if let Err(err) = run_command(cli) {
        output::status(output::Level::Error, &format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Paths(ref args) => cli::cmds::paths(args, &cli),
        Commands::Annotate(ref args) => cli::cmds::annotate(args, &cli),
        Commands::Dump(ref args) => cli::cmds::dump(args, &cli),
    }
}
