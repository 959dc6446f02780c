// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete codecs: a newline-delimited JSON codec (the engine's generic
//! default), a line-oriented text codec, a fixed-width integer codec, and
//! the stream wrappers (buffering + gzip/zstd) they all share.

pub mod integer;
pub mod json;
pub mod stream;
pub mod text;

pub use integer::{Endianness, Int64ByteArrayCodec, Int64Codec, Int64DecoderFactory, Int64EncoderFactory};
pub use json::JsonCodecImpl;
pub use stream::{open_read_stream, open_write_stream, FinishableWrite};
pub use text::{TextCodec, TextDecoderFactory, TextEncoderFactory};
