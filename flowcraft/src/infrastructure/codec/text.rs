// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Line-delimited text codec: one `String` item per line, encoded under a
//! fixed character set (UTF-8; other charsets are a straightforward
//! extension point via `encoding_rs` if a caller needs them).

use crate::infrastructure::codec::stream::{open_read_stream, open_write_stream, FinishableWrite};
use flowcraft_domain::{Decoder, DecoderFactory, Encoder, EncoderFactory, PipelineError, PipelineResult, ReadOptions, WriteOptions};
use std::io::{BufRead, BufReader, Read, Write};

pub struct TextCodec;

struct TextDecoder {
    lines: std::io::Lines<BufReader<Box<dyn Read + Send>>>,
}

impl Decoder<String> for TextDecoder {
    fn decode_next(&mut self) -> PipelineResult<Option<String>> {
        match self.lines.next() {
            None => Ok(None),
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(PipelineError::validation(format!("text decode: {e}"))),
        }
    }
}

pub struct TextDecoderFactory;

impl DecoderFactory<String> for TextDecoderFactory {
    fn open(&self, reader: Box<dyn Read + Send>, options: &ReadOptions) -> PipelineResult<Box<dyn Decoder<String>>> {
        let stream = open_read_stream(reader, options)?;
        Ok(Box::new(TextDecoder { lines: BufReader::new(stream).lines() }))
    }
}

struct TextEncoder {
    stream: Box<dyn FinishableWrite>,
}

impl Encoder<String> for TextEncoder {
    fn encode(&mut self, item: &String) -> PipelineResult<()> {
        self.stream.write_all(item.as_bytes())?;
        self.stream.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        self.stream.flush()?;
        Ok(())
    }
}

pub struct TextEncoderFactory;

impl EncoderFactory<String> for TextEncoderFactory {
    fn open(&self, writer: Box<dyn Write + Send>, options: &WriteOptions) -> PipelineResult<Box<dyn Encoder<String>>> {
        let stream = open_write_stream(writer, options)?;
        Ok(Box::new(TextEncoder { stream }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn round_trips_lines() {
        let encoder_factory = TextEncoderFactory;
        let shared = SharedBuf::default();
        {
            let mut encoder = encoder_factory.open(Box::new(shared.clone()), &WriteOptions::default()).unwrap();
            for line in ["one", "two", "three"] {
                encoder.encode(&line.to_string()).unwrap();
            }
            encoder.finish().unwrap();
        }
        let bytes = shared.0.lock().unwrap().clone();

        let decoder_factory = TextDecoderFactory;
        let mut decoder = decoder_factory.open(Box::new(Cursor::new(bytes)), &ReadOptions::default()).unwrap();
        let mut out = Vec::new();
        while let Some(line) = decoder.decode_next().unwrap() {
            out.push(line);
        }
        assert_eq!(out, vec!["one", "two", "three"]);
    }
}
