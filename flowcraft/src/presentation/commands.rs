// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Maps a validated CLI command onto an application-layer use case.

use std::path::Path;
use std::time::Instant;

use flowcraft_domain::{PipelineError, PipelineResult};
use flowcraft_bootstrap::{CancellationToken, ValidatedCommand};

use crate::application::{parse_graph, run_graph, run_shuffle_worker, GraphConfig};

fn load_graph(path: &Path) -> PipelineResult<GraphConfig> {
    let text = std::fs::read_to_string(path).map_err(PipelineError::from)?;
    parse_graph(&text)
}

/// Maps a validated command onto its use case. `shutdown` is checked
/// wherever this layer controls a loop of otherwise-uninterruptible work
/// (today, just `benchmark`'s iteration loop and the start of a shuffle
/// worker's run) — a single `run_graph` call itself runs to completion
/// once started.
pub fn dispatch(command: ValidatedCommand, shutdown: CancellationToken) -> PipelineResult<()> {
    match command {
        ValidatedCommand::Run { graph, .. } => {
            let graph = load_graph(&graph)?;
            let count = run_graph(&graph)?;
            tracing::info!(items = count, "pipeline run complete");
            Ok(())
        }
        ValidatedCommand::Validate { graph } => {
            load_graph(&graph)?;
            tracing::info!("graph config is valid");
            Ok(())
        }
        ValidatedCommand::ShuffleWorker { graph, worker_index } => {
            if shutdown.is_cancelled() {
                return Err(PipelineError::cancelled("shutdown requested before shuffle worker started"));
            }
            let graph = load_graph(&graph)?;
            let count = run_shuffle_worker(&graph, worker_index)?;
            tracing::info!(worker_index, items = count, "shuffle worker complete");
            Ok(())
        }
        ValidatedCommand::Benchmark { graph, iterations } => {
            let graph = load_graph(&graph)?;
            let mut total = std::time::Duration::ZERO;
            let mut items = 0u64;
            let mut completed = 0u32;
            for _ in 0..iterations {
                if shutdown.is_cancelled() {
                    tracing::warn!(completed, iterations, "benchmark interrupted by shutdown");
                    break;
                }
                let start = Instant::now();
                items = run_graph(&graph)?;
                total += start.elapsed();
                completed += 1;
            }
            if completed == 0 {
                return Err(PipelineError::cancelled("shutdown requested before any benchmark iteration ran"));
            }
            let avg = total / completed;
            tracing::info!(iterations = completed, items, avg_ms = avg.as_millis() as u64, "benchmark complete");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcraft_bootstrap::ShutdownCoordinator;
    use std::time::Duration;

    fn write_minimal_graph(dir: &std::path::Path) -> std::path::PathBuf {
        let input = dir.join("in.jsonl");
        std::fs::write(&input, "{\"n\":1}\n{\"n\":2}\n").unwrap();
        let graph_path = dir.join("graph.yaml");
        std::fs::write(
            &graph_path,
            format!("source:\n  type: file\n  path: {}\nsink:\n  type: file\n  path: {}\n", input.display(), dir.join("out.jsonl").display()),
        )
        .unwrap();
        graph_path
    }

    #[test]
    fn shuffle_worker_rejects_an_already_cancelled_token() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_minimal_graph(dir.path());

        let coordinator = ShutdownCoordinator::default();
        coordinator.initiate_shutdown();

        let err = dispatch(ValidatedCommand::ShuffleWorker { graph, worker_index: 0 }, coordinator.token()).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled(_)));
    }

    #[test]
    fn benchmark_stops_early_once_shutdown_is_requested() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_minimal_graph(dir.path());

        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();

        let err = dispatch(ValidatedCommand::Benchmark { graph, iterations: 10 }, coordinator.token()).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled(_)));
    }

    #[test]
    fn validate_ignores_an_uncancelled_token() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_minimal_graph(dir.path());

        dispatch(ValidatedCommand::Validate { graph }, ShutdownCoordinator::default().token()).unwrap();
    }
}
