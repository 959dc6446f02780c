// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Lifecycle state machine shared by every pipe family.
//!
//! `Unstarted -> Working -> {Done | Error}`, and from `Done`/`Error` only
//! `-> Closed` via `close()`. `Closed` is terminal. Any other transition is a
//! programming error and `PipeState::transition` panics rather than silently
//! accepting it — lifecycle violations should surface in tests, not at 3am.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Unstarted = 0,
    Working = 1,
    Done = 2,
    Error = 3,
    Closed = 4,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LifecycleState::Unstarted,
            1 => LifecycleState::Working,
            2 => LifecycleState::Done,
            3 => LifecycleState::Error,
            4 => LifecycleState::Closed,
            _ => unreachable!("invalid lifecycle state byte {v}"),
        }
    }
}

/// Atomic holder for a pipe's lifecycle state, shared between the sync
/// caller thread and any background worker threads an async pipe owns.
#[derive(Debug)]
pub struct PipeState(AtomicU8);

impl Default for PipeState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipeState {
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Unstarted as u8))
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `Unstarted -> Working`. Panics if called twice.
    pub fn start(&self) {
        let prev = self.0.swap(LifecycleState::Working as u8, Ordering::AcqRel);
        assert_eq!(
            LifecycleState::from_u8(prev),
            LifecycleState::Unstarted,
            "start() called from state other than Unstarted"
        );
    }

    /// First caller to reach a terminal state wins; later callers are told
    /// they lost the race. This backs the async "exactly one of done/error"
    /// invariant: both code paths call this and only the winner notifies.
    pub fn finish(&self, outcome: LifecycleState) -> bool {
        debug_assert!(matches!(outcome, LifecycleState::Done | LifecycleState::Error));
        self.0
            .compare_exchange(
                LifecycleState::Working as u8,
                outcome as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `Done`/`Error` -> `Closed`. Idempotent: closing twice is a no-op
    /// reported via the return value rather than a panic, since `close()`
    /// itself is documented idempotent.
    pub fn close(&self) -> bool {
        let prev = self.0.swap(LifecycleState::Closed as u8, Ordering::AcqRel);
        !matches!(LifecycleState::from_u8(prev), LifecycleState::Closed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.get(), LifecycleState::Done | LifecycleState::Error | LifecycleState::Closed)
    }
}
