// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Terminal pipes (`§4.9`): the sinks a pipeline's graph finally drains
//! into — a plain consumer, file/list writers, and sharded writers.

pub mod consumer;
pub mod sharder;
pub mod writer;

pub use consumer::Consumer;
pub use sharder::{hash_selector, shard_output_paths, ShardSelector, Sharder};
pub use writer::{FileWriter, ListFileWriter};
