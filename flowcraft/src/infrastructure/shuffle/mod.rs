// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The distributed shuffle (`§4.10`): repartitions a pipeline's output
//! across a fixed set of worker processes by key, over plain TCP. A
//! [`ShuffleExchange`] is the whole thing end to end; [`frame`] and
//! [`barrier`] are its wire-format and completion-tracking building blocks.

pub mod barrier;
pub mod exchange;
pub mod frame;

pub use barrier::CompletionBarrier;
pub use exchange::ShuffleExchange;
pub use frame::{read_frame, write_frame, Frame};
