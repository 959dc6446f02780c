// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Secure CLI handling: parse with clap, then validate every path and
//! free-form string before anything downstream sees it.

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub cpu_threads: Option<usize>,
    pub io_threads: Option<usize>,
    pub channel_depth: usize,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run { graph: PathBuf, workers: Option<usize> },
    Validate { graph: PathBuf },
    ShuffleWorker { graph: PathBuf, worker_index: usize },
    Benchmark { graph: PathBuf, iterations: usize },
}

pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(parse_cli())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = match &cli.config {
        Some(path) => Some(SecureArgParser::validate_path(&path.to_string_lossy())?),
        None => None,
    };

    if cli.channel_depth == 0 {
        return Err(ParseError::InvalidValue { arg: "channel-depth".into(), reason: "must be greater than 0".into() });
    }
    if let Some(threads) = cli.cpu_threads {
        if threads == 0 || threads > 128 {
            return Err(ParseError::InvalidValue { arg: "cpu-threads".into(), reason: "must be between 1 and 128".into() });
        }
    }
    if let Some(threads) = cli.io_threads {
        if threads == 0 || threads > 256 {
            return Err(ParseError::InvalidValue { arg: "io-threads".into(), reason: "must be between 1 and 256".into() });
        }
    }

    let command = match cli.command {
        Commands::Run { graph, workers } => {
            let graph = SecureArgParser::validate_path(&graph.to_string_lossy())?;
            if let Some(w) = workers {
                if w == 0 || w > 128 {
                    return Err(ParseError::InvalidValue { arg: "workers".into(), reason: "must be between 1 and 128".into() });
                }
            }
            ValidatedCommand::Run { graph, workers }
        }
        Commands::Validate { graph } => ValidatedCommand::Validate { graph: SecureArgParser::validate_path(&graph.to_string_lossy())? },
        Commands::ShuffleWorker { graph, worker_index } => {
            ValidatedCommand::ShuffleWorker { graph: SecureArgParser::validate_path(&graph.to_string_lossy())?, worker_index }
        }
        Commands::Benchmark { graph, iterations } => {
            if iterations == 0 || iterations > 1000 {
                return Err(ParseError::InvalidValue { arg: "iterations".into(), reason: "must be between 1 and 1000".into() });
            }
            ValidatedCommand::Benchmark { graph: SecureArgParser::validate_path(&graph.to_string_lossy())?, iterations }
        }
    };

    Ok(ValidatedCli { command, verbose: cli.verbose, config, cpu_threads: cli.cpu_threads, io_threads: cli.io_threads, channel_depth: cli.channel_depth })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_channel_depth() {
        let cli = Cli {
            command: Commands::Validate { graph: PathBuf::from("ignored") },
            verbose: false,
            config: None,
            cpu_threads: None,
            io_threads: None,
            channel_depth: 0,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { arg, .. }) if arg == "channel-depth"));
    }

    #[test]
    fn rejects_out_of_range_cpu_threads() {
        let cli = Cli {
            command: Commands::Validate { graph: PathBuf::from("ignored") },
            verbose: false,
            config: None,
            cpu_threads: Some(0),
            io_threads: None,
            channel_depth: 64,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { arg, .. }) if arg == "cpu-threads"));
    }
}
