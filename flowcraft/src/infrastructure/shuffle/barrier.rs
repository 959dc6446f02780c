// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Completion barrier for the shuffle (`§4.10`): a worker is done only once
//! it has both finished sending to every peer and received an
//! end-of-stream from every peer. `arrive()` is called once per peer as
//! their `EndOfStream` frame lands; `wait()` blocks until `expected` arrivals
//! have been recorded.

use std::sync::{Condvar, Mutex};

pub struct CompletionBarrier {
    expected: usize,
    state: Mutex<usize>,
    condvar: Condvar,
}

impl CompletionBarrier {
    pub fn new(expected: usize) -> Self {
        Self { expected, state: Mutex::new(0), condvar: Condvar::new() }
    }

    /// Records one peer's arrival. Returns `true` if this arrival completed
    /// the barrier.
    pub fn arrive(&self) -> bool {
        let mut count = self.state.lock().unwrap();
        *count += 1;
        let complete = *count >= self.expected;
        if complete {
            self.condvar.notify_all();
        }
        complete
    }

    pub fn wait(&self) {
        let mut count = self.state.lock().unwrap();
        while *count < self.expected {
            count = self.condvar.wait(count).unwrap();
        }
    }

    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let (guard, result) = self
            .condvar
            .wait_timeout_while(self.state.lock().unwrap(), timeout, |count| *count < self.expected)
            .unwrap();
        drop(guard);
        !result.timed_out()
    }
}
