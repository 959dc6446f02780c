// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Use cases built on top of `infrastructure`: parsing and running a
//! declarative pipeline graph.

pub mod graph_config;

pub use graph_config::{parse_graph, run_graph, run_shuffle_worker, GraphConfig, OperatorConfig, ShuffleTopology, SinkConfig, SourceConfig};
