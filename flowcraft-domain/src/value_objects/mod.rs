// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod join;
pub mod reductor;
pub mod shard;
pub mod shuffle_config;

pub use join::{JoinMode, JoinRecord};
pub use reductor::ReductorConfig;
pub use shard::ShardSpecifier;
pub use shuffle_config::{default_partition_fn, ShuffleConfig, WorkerAddress};
