// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Wire framing for the shuffle transport (`§4.10`): every frame is a
//! big-endian `i32` length prefix followed by that many payload bytes.
//! Two lengths are reserved as markers rather than real payload sizes:
//!
//! - `-1` signals end of stream, immediately followed by an `i64` total
//!   byte count the receiver can check against what it actually read.
//! - `-2` signals the sender aborted (a peer-side error); no trailer
//!   follows.
//!
//! Data frame payloads are LZ4-compressed on the wire (`lz4_flex`'s
//! block format, size-prefixed so the receiver doesn't need to guess an
//! output buffer size): the length prefix covers the *compressed* bytes,
//! and `Frame::Data` always holds the decompressed payload once read.

use std::io::{Read, Write};

use flowcraft_domain::{PipelineError, PipelineResult};

const EOS_MARKER: i32 = -1;
const ABORT_MARKER: i32 = -2;

pub enum Frame {
    Data(Vec<u8>),
    /// Carries the total byte count the sender pushed, for the receiver to
    /// cross-check.
    EndOfStream { total_bytes: u64 },
    Abort,
}

pub fn write_frame(writer: &mut impl Write, frame: &Frame) -> PipelineResult<()> {
    match frame {
        Frame::Data(bytes) => {
            let compressed = lz4_flex::block::compress_prepend_size(bytes);
            let len: i32 = compressed.len().try_into().map_err(|_| PipelineError::resource("frame exceeds i32::MAX bytes"))?;
            writer.write_all(&len.to_be_bytes())?;
            writer.write_all(&compressed)?;
        }
        Frame::EndOfStream { total_bytes } => {
            writer.write_all(&EOS_MARKER.to_be_bytes())?;
            writer.write_all(&total_bytes.to_be_bytes())?;
        }
        Frame::Abort => {
            writer.write_all(&ABORT_MARKER.to_be_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn read_frame(reader: &mut impl Read) -> PipelineResult<Option<Frame>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(PipelineError::from(e)),
    }
    let len = i32::from_be_bytes(len_bytes);
    match len {
        EOS_MARKER => {
            let mut total_bytes = [0u8; 8];
            reader.read_exact(&mut total_bytes)?;
            Ok(Some(Frame::EndOfStream { total_bytes: u64::from_be_bytes(total_bytes) }))
        }
        ABORT_MARKER => Ok(Some(Frame::Abort)),
        len if len < 0 => Err(PipelineError::validation(format!("unknown frame marker {len}"))),
        len => {
            let mut compressed = vec![0u8; len as usize];
            reader.read_exact(&mut compressed)?;
            let payload = lz4_flex::block::decompress_size_prepended(&compressed)
                .map_err(|e| PipelineError::validation(format!("corrupt lz4 frame: {e}")))?;
            Ok(Some(Frame::Data(payload)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_data_frames_then_end_of_stream() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Frame::Data(vec![1, 2, 3])).unwrap();
        write_frame(&mut buf, &Frame::Data(vec![4])).unwrap();
        write_frame(&mut buf, &Frame::EndOfStream { total_bytes: 4 }).unwrap();

        let mut cursor = Cursor::new(buf);
        match read_frame(&mut cursor).unwrap().unwrap() {
            Frame::Data(bytes) => assert_eq!(bytes, vec![1, 2, 3]),
            _ => panic!("expected data frame"),
        }
        match read_frame(&mut cursor).unwrap().unwrap() {
            Frame::Data(bytes) => assert_eq!(bytes, vec![4]),
            _ => panic!("expected data frame"),
        }
        match read_frame(&mut cursor).unwrap().unwrap() {
            Frame::EndOfStream { total_bytes } => assert_eq!(total_bytes, 4),
            _ => panic!("expected end-of-stream frame"),
        }
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn abort_frame_carries_no_trailer() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Frame::Abort).unwrap();
        write_frame(&mut buf, &Frame::Data(vec![9])).unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor).unwrap().unwrap(), Frame::Abort));
        assert!(matches!(read_frame(&mut cursor).unwrap().unwrap(), Frame::Data(_)));
    }
}
