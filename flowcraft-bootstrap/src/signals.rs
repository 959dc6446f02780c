// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Installs the OS signal handler that drives a [`ShutdownCoordinator`].
//! Runs on its own background thread with a small current-thread runtime
//! so the caller's `main` stays synchronous.

use crate::shutdown::ShutdownCoordinator;

/// Spawns a background thread that waits for Ctrl-C (and, on Unix, SIGTERM)
/// and calls `coordinator.initiate_shutdown()` the first time one arrives.
/// The thread exits once a signal fires; a second signal before the grace
/// period elapses is handled by the process's default disposition.
pub fn install(coordinator: &ShutdownCoordinator) {
    let coordinator = coordinator.clone();
    std::thread::Builder::new()
        .name("flowcraft-signal-handler".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("could not start signal handler runtime: {e}");
                    return;
                }
            };
            runtime.block_on(wait_for_signal());
            coordinator.initiate_shutdown();
        })
        .expect("spawning the signal handler thread should not fail");
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("could not install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
        _ = terminate.recv() => tracing::info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received ctrl-c");
}
