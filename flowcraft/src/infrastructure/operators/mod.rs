// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Intermediate sync operators: map, filter, head, skip, sampler, callback,
//! progress points, concat, and the compound-pipe facade (`§4.1`, `§4.2`).

pub mod compound;
pub mod concat;
pub mod transform;

pub use compound::CompoundPipe;
pub use concat::Concat;
pub use transform::{Callback, Filter, Head, Map, ProgressPoint, Sampler, Skip};
