// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A lock-free bounded queue used as the hand-off point between a producer
//! thread and a consumer thread in the sync/async bridges (`§4.12`). Backed
//! by [`crossbeam::queue::ArrayQueue`] (a lock-free ring buffer); blocking
//! waits use a yield-then-sleep backoff instead of a condvar so a consumer
//! that's about to get data doesn't pay for a kernel wakeup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::queue::ArrayQueue;

/// Spin via `yield_now()` this many times before falling back to sleeping.
const YIELD_MAX: u32 = 64;
/// First sleep duration once yielding hasn't produced anything.
const SLEEP_INITIAL_MS: u64 = 1;
/// Sleep duration doubles on every empty wakeup, capped here.
const SLEEP_MAX_MS: u64 = 1024;

pub struct BlockingQueue<T> {
    inner: ArrayQueue<T>,
    closed: AtomicBool,
}

/// Outcome of a blocking pop: either an item, or the queue was closed and
/// drained (no more items will ever arrive).
pub enum PopOutcome<T> {
    Item(T),
    Closed,
}

impl<T> BlockingQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self { inner: ArrayQueue::new(capacity.max(1)), closed: AtomicBool::new(false) }
    }

    /// Non-blocking push. Returns the item back on failure (queue full or
    /// closed) so the caller can apply backpressure.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        if self.closed.load(Ordering::Acquire) {
            return Err(item);
        }
        self.inner.push(item)
    }

    /// Blocks the calling thread until there is room, or the queue is
    /// closed (in which case the item is handed back, unsent).
    pub fn push_blocking(&self, mut item: T) -> Result<(), T> {
        let mut yields = 0u32;
        let mut sleep_ms = SLEEP_INITIAL_MS;
        loop {
            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    if self.closed.load(Ordering::Acquire) {
                        return Err(returned);
                    }
                    item = returned;
                    backoff(&mut yields, &mut sleep_ms);
                }
            }
        }
    }

    /// Marks the queue closed: no further pushes are accepted, but items
    /// already queued remain poppable until drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Blocks until an item is available or the queue is closed and empty.
    pub fn pop_blocking(&self) -> PopOutcome<T> {
        let mut yields = 0u32;
        let mut sleep_ms = SLEEP_INITIAL_MS;
        loop {
            if let Some(item) = self.inner.pop() {
                return PopOutcome::Item(item);
            }
            if self.closed.load(Ordering::Acquire) && self.inner.is_empty() {
                return PopOutcome::Closed;
            }
            backoff(&mut yields, &mut sleep_ms);
        }
    }
}

fn backoff(yields: &mut u32, sleep_ms: &mut u64) {
    if *yields < YIELD_MAX {
        std::thread::yield_now();
        *yields += 1;
    } else {
        std::thread::sleep(Duration::from_millis(*sleep_ms));
        *sleep_ms = (*sleep_ms * 2).min(SLEEP_MAX_MS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn push_then_pop_round_trips() {
        let queue = BlockingQueue::new(4);
        queue.try_push(1).unwrap();
        match queue.pop_blocking() {
            PopOutcome::Item(v) => assert_eq!(v, 1),
            PopOutcome::Closed => panic!("expected an item"),
        }
    }

    #[test]
    fn pop_blocking_unblocks_on_close() {
        let queue: Arc<BlockingQueue<i32>> = Arc::new(BlockingQueue::new(4));
        let reader = {
            let queue = queue.clone();
            std::thread::spawn(move || matches!(queue.pop_blocking(), PopOutcome::Closed))
        };
        std::thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(reader.join().unwrap());
    }

    #[test]
    fn push_blocking_waits_for_room_then_fails_after_close() {
        let queue: Arc<BlockingQueue<i32>> = Arc::new(BlockingQueue::new(1));
        queue.try_push(1).unwrap();
        let writer = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.push_blocking(2))
        };
        std::thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(writer.join().unwrap().is_err());
    }
}
