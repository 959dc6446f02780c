// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Runs a fixed-size pool of worker closures against a shared task queue
//! (`§4.8`). The first task to fail cancels the rest: workers stop pulling
//! new tasks once a failure has been recorded, but tasks already in flight
//! are allowed to finish rather than being killed mid-execution — this
//! keeps the model interruption-safe without needing cooperative
//! cancellation checks inside every task body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use flowcraft_domain::{PipelineError, PipelineResult};
use rayon::prelude::*;

/// Runs `task` once for every item in `items` across a thread pool sized to
/// `worker_count` (0 lets rayon pick its default), stopping early once any
/// task returns an error. Returns the first error encountered, if any.
pub fn run_parallel<I, F>(items: Vec<I>, worker_count: usize, task: F) -> PipelineResult<()>
where
    I: Send,
    F: Fn(I) -> PipelineResult<()> + Send + Sync,
{
    let cancelled = AtomicBool::new(false);
    let first_error: Mutex<Option<PipelineError>> = Mutex::new(None);

    let run = || {
        items.into_par_iter().for_each(|item| {
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            if let Err(err) = task(item) {
                if !cancelled.swap(true, Ordering::AcqRel) {
                    *first_error.lock().unwrap() = Some(err);
                }
            }
        });
    };

    if worker_count == 0 {
        run();
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .map_err(|e| PipelineError::internal(format!("building worker pool: {e}")))?;
        pool.install(run);
    }

    match first_error.into_inner().unwrap() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn runs_every_task_when_none_fail() {
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = completed.clone();
        run_parallel(vec![1, 2, 3, 4], 2, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn returns_first_error_and_cancels_remaining() {
        let result = run_parallel(vec![1, 2, 3], 1, |item| {
            if item == 2 {
                Err(PipelineError::internal("boom"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }
}
