// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Newline-delimited JSON codec. This is the engine's default generic codec:
//! anything `Serialize + DeserializeOwned` can flow through sort, the
//! hash-reductor's spill files, and the shuffle transport without a
//! hand-written wire format. Plug-in points exist for Avro/Protobuf/CSV
//! implementations that would replace this for production workloads.

use crate::infrastructure::codec::stream::{open_read_stream, open_write_stream, FinishableWrite};
use flowcraft_domain::{ByteArrayCodec, Codec, Decoder, DecoderFactory, Encoder, EncoderFactory, PipelineError, PipelineResult, ReadOptions, WriteOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, BufReader, Read, Write};
use std::marker::PhantomData;

struct JsonDecoder<T> {
    lines: std::io::Lines<BufReader<Box<dyn Read + Send>>>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned + Send> Decoder<T> for JsonDecoder<T> {
    fn decode_next(&mut self) -> PipelineResult<Option<T>> {
        loop {
            match self.lines.next() {
                None => return Ok(None),
                Some(Err(e)) => return Err(PipelineError::from(e)),
                Some(Ok(line)) if line.is_empty() => continue,
                Some(Ok(line)) => return Ok(Some(serde_json::from_str(&line)?)),
            }
        }
    }
}

struct JsonDecoderFactory<T>(PhantomData<T>);

impl<T: DeserializeOwned + Send + Sync + 'static> DecoderFactory<T> for JsonDecoderFactory<T> {
    fn open(&self, reader: Box<dyn Read + Send>, options: &ReadOptions) -> PipelineResult<Box<dyn Decoder<T>>> {
        let stream = open_read_stream(reader, options)?;
        Ok(Box::new(JsonDecoder { lines: BufReader::new(stream).lines(), _marker: PhantomData }))
    }
}

struct JsonEncoder<T> {
    stream: Box<dyn FinishableWrite>,
    _marker: PhantomData<T>,
}

impl<T: Serialize + Send> Encoder<T> for JsonEncoder<T> {
    fn encode(&mut self, item: &T) -> PipelineResult<()> {
        let line = serde_json::to_string(item)?;
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        self.stream.flush()?;
        Ok(())
    }
}

struct JsonEncoderFactory<T>(PhantomData<T>);

impl<T: Serialize + Send + Sync + 'static> EncoderFactory<T> for JsonEncoderFactory<T> {
    fn open(&self, writer: Box<dyn Write + Send>, options: &WriteOptions) -> PipelineResult<Box<dyn Encoder<T>>> {
        let stream = open_write_stream(writer, options)?;
        Ok(Box::new(JsonEncoder { stream, _marker: PhantomData }))
    }
}

struct JsonByteArray<T>(PhantomData<T>);

impl<T: Serialize + DeserializeOwned + Send + Sync> ByteArrayCodec<T> for JsonByteArray<T> {
    fn encode(&self, item: &T) -> PipelineResult<Vec<u8>> {
        Ok(serde_json::to_vec(item)?)
    }

    fn decode(&self, bytes: &[u8]) -> PipelineResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub struct JsonCodecImpl<T> {
    encoder_factory: JsonEncoderFactory<T>,
    decoder_factory: JsonDecoderFactory<T>,
    byte_array: JsonByteArray<T>,
}

impl<T> Default for JsonCodecImpl<T> {
    fn default() -> Self {
        Self {
            encoder_factory: JsonEncoderFactory(PhantomData),
            decoder_factory: JsonDecoderFactory(PhantomData),
            byte_array: JsonByteArray(PhantomData),
        }
    }
}

impl<T: Serialize + DeserializeOwned + Send + Sync + 'static> Codec<T> for JsonCodecImpl<T> {
    fn encoder_factory(&self) -> &dyn EncoderFactory<T> {
        &self.encoder_factory
    }

    fn decoder_factory(&self) -> &dyn DecoderFactory<T> {
        &self.decoder_factory
    }

    fn byte_array(&self) -> &dyn ByteArrayCodec<T> {
        &self.byte_array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_array_round_trips() {
        let codec = JsonByteArray::<Vec<i32>>(PhantomData);
        let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), vec![1, 2, 3]);
    }
}
