// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Distributed-shuffle configuration: the peer worker list, local port,
//! partition function, and on-wire codec.

use std::sync::Arc;

/// `(host, port)` for one shuffle peer. Workers are canonically ordered by
/// this pair; worker `i` in the sorted list owns partition `i`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerAddress {
    pub host: String,
    pub port: u16,
}

impl WorkerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Drives one worker's participation in a distributed shuffle.
pub struct ShuffleConfig<T> {
    /// All workers, canonically sorted by `(host, port)`. `workers[my_index]`
    /// must equal the worker's own advertised address.
    pub workers: Vec<WorkerAddress>,
    pub my_index: usize,
    pub local_port: u16,
    partition_fn: Arc<dyn Fn(&T) -> usize + Send + Sync>,
}

impl<T> Clone for ShuffleConfig<T> {
    fn clone(&self) -> Self {
        Self {
            workers: self.workers.clone(),
            my_index: self.my_index,
            local_port: self.local_port,
            partition_fn: self.partition_fn.clone(),
        }
    }
}

impl<T> ShuffleConfig<T> {
    pub fn new(
        mut workers: Vec<WorkerAddress>,
        my_index: usize,
        local_port: u16,
        partition_fn: impl Fn(&T) -> usize + Send + Sync + 'static,
    ) -> Self {
        workers.sort();
        Self { workers, my_index, local_port, partition_fn: Arc::new(partition_fn) }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Shard id of `item`, `partition_fn(item) mod N`.
    pub fn shard_of(&self, item: &T) -> usize {
        (self.partition_fn)(item) % self.worker_count().max(1)
    }

    pub fn my_address(&self) -> &WorkerAddress {
        &self.workers[self.my_index]
    }
}

/// Default partition function: a stable hash of the item, for any `T: Hash`.
pub fn default_partition_fn<T: std::hash::Hash>(item: &T) -> usize {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    item.hash(&mut hasher);
    hasher.finish() as usize
}
