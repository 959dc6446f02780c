// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Raw clap CLI structure, parsed before [`super::validator`] runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "flowcraft", about = "Composable data-processing pipeline engine", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true)]
    pub verbose: bool,

    /// Global engine config (worker defaults, spill directory, buffer sizes).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub cpu_threads: Option<usize>,

    #[arg(long)]
    pub io_threads: Option<usize>,

    /// Depth of the internal blocking queues bridging sync and async pipes.
    #[arg(long, default_value_t = 64)]
    pub channel_depth: usize,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Assembles and drains the pipeline described by a graph config.
    Run {
        graph: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Parses and validates a graph config without running it.
    Validate { graph: PathBuf },
    /// Runs one shuffle worker, taking its index from the graph's worker list.
    ShuffleWorker {
        graph: PathBuf,
        #[arg(long)]
        worker_index: usize,
    },
    /// Measures end-to-end throughput of a graph config over synthetic input.
    Benchmark {
        graph: PathBuf,
        #[arg(long, default_value_t = 3)]
        iterations: usize,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
