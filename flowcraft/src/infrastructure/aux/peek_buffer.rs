// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One-item lookahead buffer for `SyncPipe::peek()` implementations that
//! have no natural way to borrow a reference to their next item (reduce and
//! join operators pull whole rounds or drain partitions rather than holding
//! a borrowable slot). Mirrors the inline buffer `FileSource` and
//! `GeneratorSource` use, factored out since the same three lines would
//! otherwise repeat across every operator in this module.

use flowcraft_domain::PipelineResult;

pub struct PeekBuffer<T>(Option<Option<T>>);

impl<T> PeekBuffer<T> {
    pub fn new() -> Self {
        Self(None)
    }

    /// Drains the buffer if occupied, otherwise pulls directly.
    pub fn next(&mut self, pull: impl FnOnce() -> PipelineResult<Option<T>>) -> PipelineResult<Option<T>> {
        match self.0.take() {
            Some(buffered) => Ok(buffered),
            None => pull(),
        }
    }

    /// Fills the buffer via `pull` if empty, then returns a reference to it.
    pub fn peek(&mut self, pull: impl FnOnce() -> PipelineResult<Option<T>>) -> PipelineResult<Option<&T>> {
        if self.0.is_none() {
            self.0 = Some(pull()?);
        }
        Ok(self.0.as_ref().and_then(|o| o.as_ref()))
    }
}

impl<T> Default for PeekBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_is_idempotent_and_next_consumes_the_buffered_value() {
        let mut buf = PeekBuffer::new();
        let mut calls = 0;
        let mut pull = || {
            calls += 1;
            Ok(Some(calls))
        };

        assert_eq!(buf.peek(&mut pull).unwrap(), Some(&1));
        assert_eq!(buf.peek(&mut pull).unwrap(), Some(&1));
        assert_eq!(buf.next(&mut pull).unwrap(), Some(1));
        assert_eq!(buf.next(&mut pull).unwrap(), Some(2));
        assert_eq!(calls, 2);
    }
}
