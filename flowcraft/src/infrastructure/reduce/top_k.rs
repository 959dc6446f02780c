// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Top-K (`§4.6`): keeps the K largest items under a comparator. Peak
//! memory is bounded at O(K): a hand-rolled binary min-heap of capacity K
//! holds the current top-K candidates while the upstream is drained, so an
//! input of size n only ever keeps K items live instead of sorting all n.

use flowcraft_domain::{BasePipe, PipelineResult, ProgressCell, SyncPipe};

use crate::infrastructure::aux::PeekBuffer;

type Cmp<T> = dyn Fn(&T, &T) -> std::cmp::Ordering + Send;

fn sift_up<T>(heap: &mut [T], mut idx: usize, cmp: &Cmp<T>) {
    while idx > 0 {
        let parent = (idx - 1) / 2;
        if cmp(&heap[idx], &heap[parent]) == std::cmp::Ordering::Less {
            heap.swap(idx, parent);
            idx = parent;
        } else {
            break;
        }
    }
}

fn sift_down<T>(heap: &mut [T], mut idx: usize, cmp: &Cmp<T>) {
    let len = heap.len();
    loop {
        let left = 2 * idx + 1;
        let right = 2 * idx + 2;
        let mut smallest = idx;
        if left < len && cmp(&heap[left], &heap[smallest]) == std::cmp::Ordering::Less {
            smallest = left;
        }
        if right < len && cmp(&heap[right], &heap[smallest]) == std::cmp::Ordering::Less {
            smallest = right;
        }
        if smallest == idx {
            break;
        }
        heap.swap(idx, smallest);
        idx = smallest;
    }
}

/// Keeps the K largest items seen from `input`, under `comparator`
/// (ascending: `Less` means "ranks lower").
pub struct TopK<T: Send> {
    input: Box<dyn SyncPipe<Item = T>>,
    comparator: Box<Cmp<T>>,
    k: usize,
    progress: ProgressCell,
    output: Option<std::vec::IntoIter<T>>,
    peeked: PeekBuffer<T>,
}

impl<T: Send> TopK<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, comparator: Box<Cmp<T>>, k: usize) -> Self {
        Self { input, comparator, k: k.max(1), progress: ProgressCell::new(), output: None, peeked: PeekBuffer::new() }
    }
}

impl<T: Send> BasePipe for TopK<T> {
    fn progress(&self) -> f64 {
        self.progress.get()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send> SyncPipe for TopK<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()?;
        let cmp = self.comparator.as_ref();
        let mut heap: Vec<T> = Vec::with_capacity(self.k);
        while let Some(item) = self.input.next()? {
            if heap.len() < self.k {
                heap.push(item);
                let last = heap.len() - 1;
                sift_up(&mut heap, last, cmp);
            } else if cmp(&item, &heap[0]) == std::cmp::Ordering::Greater {
                heap[0] = item;
                sift_down(&mut heap, 0, cmp);
            }
        }
        heap.sort_by(|a, b| cmp(b, a));
        self.progress.complete();
        self.output = Some(heap.into_iter());
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        let output = &mut self.output;
        self.peeked.next(|| Ok(output.as_mut().and_then(|it| it.next())))
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        let output = &mut self.output;
        self.peeked.peek(|| Ok(output.as_mut().and_then(|it| it.next())))
    }
}
