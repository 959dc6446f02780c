// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete pipe implementations against the contracts in `flowcraft-domain`:
//! sources, intermediate operators, reduction/sort/join engines, the async
//! runtime, terminal sinks, the distributed shuffle transport, codecs, and
//! small standalone helpers.

pub mod async_runtime;
pub mod aux;
pub mod codec;
pub mod operators;
pub mod reduce;
pub mod shuffle;
pub mod sources;
pub mod terminal;
