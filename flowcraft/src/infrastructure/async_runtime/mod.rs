// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The async runtime (`§4.8`, `§4.12`): the lock-free blocking queue, the
//! sync/async bridges, async-native operators, and the parallel task
//! processor.

pub mod async_ops;
pub mod blocking_queue;
pub mod bridge;
pub mod parallel_task_processor;

pub use async_ops::{AsyncFilter, AsyncHead, AsyncMap, AsyncTimeout, AsyncUnion};
pub use blocking_queue::{BlockingQueue, PopOutcome};
pub use bridge::{AsyncToSync, SyncToAsync};
pub use parallel_task_processor::run_parallel;
