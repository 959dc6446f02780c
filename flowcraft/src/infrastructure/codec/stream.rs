// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Buffering and compression wrappers shared by every streaming codec.
//!
//! These functions are the one place that knows how to turn a
//! [`ReadOptions`]/[`WriteOptions`] pair into an actual `Read`/`Write` chain.
//! Every file source, file writer, and spill file goes through here so that
//! buffer sizing and compression selection stay in one spot.

use flowcraft_domain::{Compression, PipelineError, PipelineResult, ReadOptions, WriteOptions};
use std::io::{BufReader, BufWriter, Read, Write};

/// Wraps `reader` with buffering and, if requested, decompression.
pub fn open_read_stream(reader: Box<dyn Read + Send>, options: &ReadOptions) -> PipelineResult<Box<dyn Read + Send>> {
    let buffered: Box<dyn Read + Send> = Box::new(BufReader::with_capacity(options.buffer_size, reader));
    match options.compression {
        Compression::None => Ok(buffered),
        Compression::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(buffered))),
        Compression::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(buffered)
                .map_err(|e| PipelineError::io(format!("opening zstd stream: {e}")))?;
            Ok(Box::new(decoder))
        }
    }
}

/// A write stream that must be explicitly finished so trailing compression
/// frames get flushed before the underlying file is closed.
pub trait FinishableWrite: Write + Send {
    fn finish_stream(self: Box<Self>) -> PipelineResult<()>;
}

struct PassthroughWriter<W: Write + Send>(W);

impl<W: Write + Send> Write for PassthroughWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Send + 'static> FinishableWrite for PassthroughWriter<W> {
    fn finish_stream(mut self: Box<Self>) -> PipelineResult<()> {
        self.0.flush()?;
        Ok(())
    }
}

struct GzFinisher<W: Write + Send>(flate2::write::GzEncoder<W>);

impl<W: Write + Send> Write for GzFinisher<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Send + 'static> FinishableWrite for GzFinisher<W> {
    fn finish_stream(self: Box<Self>) -> PipelineResult<()> {
        self.0.finish().map_err(|e| PipelineError::io(format!("finishing gzip stream: {e}")))?;
        Ok(())
    }
}

struct ZstdFinisher<'a, W: Write + Send>(zstd::stream::write::Encoder<'a, W>);

impl<W: Write + Send> Write for ZstdFinisher<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Send + 'static> FinishableWrite for ZstdFinisher<'_, W> {
    fn finish_stream(self: Box<Self>) -> PipelineResult<()> {
        self.0.finish().map_err(|e| PipelineError::io(format!("finishing zstd stream: {e}")))?;
        Ok(())
    }
}

/// Wraps `writer` with buffering and, if requested, compression. The
/// returned stream must have `finish_stream` called on it (not just
/// dropped) so compressed trailers are written.
pub fn open_write_stream(writer: Box<dyn Write + Send>, options: &WriteOptions) -> PipelineResult<Box<dyn FinishableWrite>> {
    let buffered = BufWriter::with_capacity(options.buffer_size, writer);
    match options.compression {
        Compression::None => Ok(Box::new(PassthroughWriter(buffered))),
        Compression::Gzip => {
            let level = flate2::Compression::new(options.compression_level.clamp(0, 9) as u32);
            Ok(Box::new(GzFinisher(flate2::write::GzEncoder::new(buffered, level))))
        }
        Compression::Zstd => {
            let encoder = zstd::stream::write::Encoder::new(buffered, options.compression_level)
                .map_err(|e| PipelineError::io(format!("opening zstd stream: {e}")))?;
            Ok(Box::new(ZstdFinisher(encoder)))
        }
    }
}
