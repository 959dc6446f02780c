// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Chains several sync pipes of the same item type end to end, in order.

use flowcraft_domain::{BasePipe, PipelineResult, SyncPipe};

pub struct Concat<T> {
    inputs: Vec<Box<dyn SyncPipe<Item = T>>>,
    current: usize,
    started: Vec<bool>,
}

impl<T> Concat<T> {
    pub fn new(inputs: Vec<Box<dyn SyncPipe<Item = T>>>) -> Self {
        let len = inputs.len();
        Self { inputs, current: 0, started: vec![false; len] }
    }
}

impl<T: Send> BasePipe for Concat<T> {
    fn progress(&self) -> f64 {
        if self.inputs.is_empty() {
            return 1.0;
        }
        let done = self.current as f64;
        let current_fraction = self.inputs.get(self.current).map(|p| p.progress()).unwrap_or(1.0);
        ((done + current_fraction) / self.inputs.len() as f64).clamp(0.0, 1.0)
    }

    fn close(&mut self) {
        for input in &mut self.inputs {
            input.close();
        }
    }
}

impl<T: Send> SyncPipe for Concat<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        // Matches the kernel contract ("start() must recursively start all
        // inputs before returning") rather than lazily starting each input
        // as it becomes current.
        for (input, started) in self.inputs.iter_mut().zip(self.started.iter_mut()) {
            input.start()?;
            *started = true;
        }
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        while self.current < self.inputs.len() {
            match self.inputs[self.current].next()? {
                Some(item) => return Ok(Some(item)),
                None => {
                    self.inputs[self.current].close();
                    self.current += 1;
                }
            }
        }
        Ok(None)
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        if self.current < self.inputs.len() {
            self.inputs[self.current].peek()
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    #[test]
    fn concatenates_in_order() {
        let mut pipe = Concat::new(vec![
            Box::new(CollectionSource::new(vec![1, 2])) as Box<dyn SyncPipe<Item = i32>>,
            Box::new(CollectionSource::new(vec![3, 4])),
        ]);
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 4]);
    }
}
