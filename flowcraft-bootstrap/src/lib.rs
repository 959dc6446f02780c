// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! Sits outside the engine proper and handles everything a pipeline
//! engine itself should never know about: CLI argument parsing and
//! validation, structured logging setup, OS-level platform queries, and
//! coordinated graceful shutdown.
//!
//! - `cli` — secure argument parsing (parse with clap, then validate)
//! - `logger` — bootstrap-phase logging, independent of the engine's own
//!   `tracing` usage so CLI wiring errors can be reported before the
//!   subscriber is installed
//! - `platform` — OS abstraction (page size, CPU count, elevated-privilege
//!   check) behind one trait, Unix and Windows implementations
//! - `shutdown` — cancellation token plus grace-period enforcement for
//!   in-flight shuffle workers and spill cleanup
//! - `signals` — installs the OS Ctrl-C/SIGTERM handler that drives the
//!   shutdown coordinator
//! - `exit_code` — mapping from engine errors to POSIX-style exit codes

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::{result_to_exit_code, ExitCode};
pub use shutdown::{CancellationToken, ShutdownCoordinator};

/// Parses and security-validates CLI arguments. Clap handles `--help` and
/// `--version` internally and exits the process before this returns.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}

/// Installs the `tracing` subscriber used for the lifetime of the process.
/// Verbosity follows `RUST_LOG` when set, otherwise `verbose`.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
