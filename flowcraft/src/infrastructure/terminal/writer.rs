// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Terminal file writers: drive a `SyncPipe` to completion, encoding every
//! item through an [`EncoderFactory`] into a single output file.

use std::path::PathBuf;

use flowcraft_domain::{Encoder, EncoderFactory, PipelineError, PipelineResult, SyncPipe, TerminalPipe, WriteOptions};

pub struct FileWriter<T> {
    input: Box<dyn SyncPipe<Item = T>>,
    path: PathBuf,
    options: WriteOptions,
    encoder_factory: std::sync::Arc<dyn EncoderFactory<T>>,
}

impl<T> FileWriter<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, path: impl Into<PathBuf>, options: WriteOptions, encoder_factory: std::sync::Arc<dyn EncoderFactory<T>>) -> Self {
        Self { input, path: path.into(), options, encoder_factory }
    }
}

impl<T: Send> TerminalPipe for FileWriter<T> {
    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(PipelineError::from)?;
            }
        }
        let file = if self.options.append {
            std::fs::OpenOptions::new().create(true).append(true).open(&self.path)
        } else {
            std::fs::File::create(&self.path)
        }
        .map_err(|e| PipelineError::io(format!("opening {}: {e}", self.path.display())))?;

        let mut encoder = self.encoder_factory.open(Box::new(file), &self.options)?;
        let mut encode_err = None;
        while let Some(item) = self.input.next()? {
            if let Err(err) = encoder.encode(&item) {
                encode_err = Some(err);
                break;
            }
        }
        match encode_err {
            Some(err) => Err(err),
            None => encoder.finish(),
        }
    }

    fn progress(&self) -> f64 {
        self.input.progress()
    }

    fn close(&mut self) {
        self.input.close();
        if self.options.temp {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Writes one path per line — the plain-text complement to [`FileWriter`],
/// used for manifests and file lists rather than item payloads.
pub struct ListFileWriter {
    paths: Box<dyn SyncPipe<Item = String>>,
    output_path: PathBuf,
}

impl ListFileWriter {
    pub fn new(paths: Box<dyn SyncPipe<Item = String>>, output_path: impl Into<PathBuf>) -> Self {
        Self { paths, output_path: output_path.into() }
    }
}

impl TerminalPipe for ListFileWriter {
    fn start(&mut self) -> PipelineResult<()> {
        use std::io::Write;
        self.paths.start()?;
        let mut file = std::fs::File::create(&self.output_path).map_err(PipelineError::from)?;
        while let Some(path) = self.paths.next()? {
            writeln!(file, "{path}").map_err(PipelineError::from)?;
        }
        Ok(())
    }

    fn progress(&self) -> f64 {
        self.paths.progress()
    }

    fn close(&mut self) {
        self.paths.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::codec::text::TextEncoderFactory;
    use crate::infrastructure::sources::CollectionSource;

    #[test]
    fn writes_every_item_through_the_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut writer = FileWriter::new(
            Box::new(CollectionSource::new(vec!["a".to_string(), "b".to_string()])),
            &path,
            WriteOptions::default(),
            std::sync::Arc::new(TextEncoderFactory),
        );
        writer.start().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "a\nb\n");
    }

    #[test]
    fn temp_file_is_removed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.txt");
        let options = WriteOptions { temp: true, ..WriteOptions::default() };
        let mut writer = FileWriter::new(Box::new(CollectionSource::new(vec!["a".to_string()])), &path, options, std::sync::Arc::new(TextEncoderFactory));
        writer.start().unwrap();
        assert!(path.exists());
        writer.close();
        assert!(!path.exists());
    }

    #[test]
    fn list_file_writer_writes_one_path_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.txt");
        let mut writer = ListFileWriter::new(Box::new(CollectionSource::new(vec!["x".to_string(), "y".to_string()])), &path);
        writer.start().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "x\ny\n");
    }
}
