// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The simplest terminal pipe: drains a `SyncPipe` to completion, invoking a
//! callback per item for side effects (counting, writing elsewhere,
//! forwarding to a channel) without any codec of its own.

use flowcraft_domain::{PipelineResult, SyncPipe, TerminalPipe};

pub struct Consumer<T> {
    input: Box<dyn SyncPipe<Item = T>>,
    on_item: Box<dyn FnMut(T) + Send>,
}

impl<T> Consumer<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, on_item: impl FnMut(T) + Send + 'static) -> Self {
        Self { input, on_item: Box::new(on_item) }
    }
}

impl<T: Send> TerminalPipe for Consumer<T> {
    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()?;
        while let Some(item) = self.input.next()? {
            (self.on_item)(item);
        }
        Ok(())
    }

    fn progress(&self) -> f64 {
        self.input.progress()
    }

    fn close(&mut self) {
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[test]
    fn drives_input_to_completion_invoking_callback_per_item() {
        let sum = Arc::new(AtomicI64::new(0));
        let counter = sum.clone();
        let mut consumer = Consumer::new(Box::new(CollectionSource::new(vec![1, 2, 3])), move |item: i32| {
            counter.fetch_add(item as i64, Ordering::SeqCst);
        });
        consumer.start().unwrap();
        assert_eq!(sum.load(Ordering::SeqCst), 6);
        assert_eq!(consumer.progress(), 1.0);
    }
}
