// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The pipe kernel: lifecycle, progress, and the three pipe family traits.

pub mod bucket;
pub mod codec;
pub mod pipe;
pub mod progress;
pub mod state;

pub use bucket::{BlobMeta, Bucket, SizedStream};
pub use codec::{ByteArrayCodec, Codec, Compression, Decoder, DecoderFactory, Encoder, EncoderFactory, ReadOptions, WriteOptions};
pub use pipe::{AsyncListener, AsyncPipe, BasePipe, SyncPipe, TerminalPipe};
pub use progress::ProgressCell;
pub use state::{LifecycleState, PipeState};
