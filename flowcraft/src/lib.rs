// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Flowcraft
//!
//! A composable data-processing pipeline engine: sync and async pipes over
//! the contracts in `flowcraft-domain`, external sort, hash-based
//! reduction with partitioned spill, sorted and hash joins, sorted
//! set-algebra, an async runtime with a lock-free blocking queue, terminal
//! sinks, and a distributed shuffle transport over TCP.
//!
//! - `infrastructure` — every concrete pipe: sources, operators,
//!   reduce/sort/join, the async runtime, terminal sinks, codecs, the
//!   shuffle transport
//! - `application` — use cases built on top of infrastructure (running a
//!   declarative pipeline graph)
//! - `presentation` — maps a validated CLI command onto an application use
//!   case; the binary target is a thin wrapper around this module

pub mod application;
pub mod infrastructure;
pub mod presentation;
