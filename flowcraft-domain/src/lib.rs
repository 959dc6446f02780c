// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Flowcraft Domain
//!
//! Core contracts for the flowcraft pipeline engine, with no implementation
//! bias: the pipe kernel traits (`SyncPipe`, `AsyncPipe`, `TerminalPipe`),
//! the lifecycle state machine, the error taxonomy, the codec framework's
//! abstract factories, and the shared value objects (`ShardSpecifier`,
//! `JoinRecord`, `ReductorConfig`, `ShuffleConfig`).
//!
//! Everything in this crate is a contract an outer crate implements or
//! consumes — there is no I/O, no threading, and no concrete codec here.
//! `flowcraft` builds the actual sources, operators, and terminal pipes on
//! top of it.

pub mod contracts;
pub mod error;
pub mod value_objects;

pub use contracts::{
    AsyncListener, AsyncPipe, BasePipe, BlobMeta, Bucket, ByteArrayCodec, Codec, Compression, Decoder, DecoderFactory,
    Encoder, EncoderFactory, LifecycleState, PipeState, ProgressCell, ReadOptions, SizedStream, SyncPipe,
    TerminalPipe, WriteOptions,
};
pub use error::{PipelineError, PipelineResult};
pub use value_objects::{default_partition_fn, JoinMode, JoinRecord, ReductorConfig, ShardSpecifier, ShuffleConfig, WorkerAddress};
