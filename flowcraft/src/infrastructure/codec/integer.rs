// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Byte-oriented fixed-width integer codec. Used for compact spill files and
//! as the canonical example of a non-text binary codec.

use crate::infrastructure::codec::stream::{open_read_stream, open_write_stream, FinishableWrite};
use flowcraft_domain::{ByteArrayCodec, Codec, Decoder, DecoderFactory, Encoder, EncoderFactory, PipelineError, PipelineResult, ReadOptions, WriteOptions};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

struct Int64Decoder {
    stream: Box<dyn Read + Send>,
    endianness: Endianness,
}

impl Decoder<i64> for Int64Decoder {
    fn decode_next(&mut self) -> PipelineResult<Option<i64>> {
        let mut buf = [0u8; 8];
        match self.stream.read_exact(&mut buf) {
            Ok(()) => Ok(Some(match self.endianness {
                Endianness::Little => i64::from_le_bytes(buf),
                Endianness::Big => i64::from_be_bytes(buf),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(PipelineError::from(e)),
        }
    }
}

pub struct Int64DecoderFactory {
    pub endianness: Endianness,
}

impl DecoderFactory<i64> for Int64DecoderFactory {
    fn open(&self, reader: Box<dyn Read + Send>, options: &ReadOptions) -> PipelineResult<Box<dyn Decoder<i64>>> {
        let stream = open_read_stream(reader, options)?;
        Ok(Box::new(Int64Decoder { stream, endianness: self.endianness }))
    }
}

struct Int64Encoder {
    stream: Box<dyn FinishableWrite>,
    endianness: Endianness,
}

impl Encoder<i64> for Int64Encoder {
    fn encode(&mut self, item: &i64) -> PipelineResult<()> {
        let bytes = match self.endianness {
            Endianness::Little => item.to_le_bytes(),
            Endianness::Big => item.to_be_bytes(),
        };
        self.stream.write_all(&bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        self.stream.flush()?;
        Ok(())
    }
}

pub struct Int64EncoderFactory {
    pub endianness: Endianness,
}

impl EncoderFactory<i64> for Int64EncoderFactory {
    fn open(&self, writer: Box<dyn Write + Send>, options: &WriteOptions) -> PipelineResult<Box<dyn Encoder<i64>>> {
        let stream = open_write_stream(writer, options)?;
        Ok(Box::new(Int64Encoder { stream, endianness: self.endianness }))
    }
}

/// Stateless single-item variant used by spill files and shuffle frames.
pub struct Int64ByteArrayCodec {
    pub endianness: Endianness,
}

impl ByteArrayCodec<i64> for Int64ByteArrayCodec {
    fn encode(&self, item: &i64) -> PipelineResult<Vec<u8>> {
        Ok(match self.endianness {
            Endianness::Little => item.to_le_bytes().to_vec(),
            Endianness::Big => item.to_be_bytes().to_vec(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> PipelineResult<i64> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| PipelineError::validation("int64 frame must be 8 bytes"))?;
        Ok(match self.endianness {
            Endianness::Little => i64::from_le_bytes(arr),
            Endianness::Big => i64::from_be_bytes(arr),
        })
    }
}

/// Bundles the three `i64` codec pieces behind the `Codec<i64>` trait.
pub struct Int64Codec {
    encoder_factory: Int64EncoderFactory,
    decoder_factory: Int64DecoderFactory,
    byte_array: Int64ByteArrayCodec,
}

impl Int64Codec {
    pub fn new(endianness: Endianness) -> Self {
        Self {
            encoder_factory: Int64EncoderFactory { endianness },
            decoder_factory: Int64DecoderFactory { endianness },
            byte_array: Int64ByteArrayCodec { endianness },
        }
    }
}

impl Codec<i64> for Int64Codec {
    fn encoder_factory(&self) -> &dyn EncoderFactory<i64> {
        &self.encoder_factory
    }

    fn decoder_factory(&self) -> &dyn DecoderFactory<i64> {
        &self.decoder_factory
    }

    fn byte_array(&self) -> &dyn ByteArrayCodec<i64> {
        &self.byte_array
    }
}
