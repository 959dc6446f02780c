// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Configuration bundle driving the hash-reductor (`§4.6`): a family
//! discriminator, an aggregator factory, an accumulation rule, and a
//! finalizer.

use crate::error::PipelineResult;
use std::sync::Arc;

/// `I -> K`, `K -> A`, `(A, I) -> ()` (fallible), `A -> O`, bundled so the
/// hash-reductor and sequence-reductor can both be driven by one shape.
pub struct ReductorConfig<I, K, A, O> {
    key_of: Arc<dyn Fn(&I) -> K + Send + Sync>,
    new_aggregator: Arc<dyn Fn(&K) -> A + Send + Sync>,
    accumulate: Arc<dyn Fn(&mut A, I) -> PipelineResult<()> + Send + Sync>,
    finalize: Arc<dyn Fn(A) -> O + Send + Sync>,
}

impl<I, K, A, O> Clone for ReductorConfig<I, K, A, O> {
    fn clone(&self) -> Self {
        Self {
            key_of: self.key_of.clone(),
            new_aggregator: self.new_aggregator.clone(),
            accumulate: self.accumulate.clone(),
            finalize: self.finalize.clone(),
        }
    }
}

impl<I, K, A, O> ReductorConfig<I, K, A, O> {
    pub fn new(
        key_of: impl Fn(&I) -> K + Send + Sync + 'static,
        new_aggregator: impl Fn(&K) -> A + Send + Sync + 'static,
        accumulate: impl Fn(&mut A, I) -> PipelineResult<()> + Send + Sync + 'static,
        finalize: impl Fn(A) -> O + Send + Sync + 'static,
    ) -> Self {
        Self {
            key_of: Arc::new(key_of),
            new_aggregator: Arc::new(new_aggregator),
            accumulate: Arc::new(accumulate),
            finalize: Arc::new(finalize),
        }
    }

    pub fn key_of(&self, item: &I) -> K {
        (self.key_of)(item)
    }

    pub fn new_aggregator(&self, key: &K) -> A {
        (self.new_aggregator)(key)
    }

    pub fn accumulate(&self, agg: &mut A, item: I) -> PipelineResult<()> {
        (self.accumulate)(agg, item)
    }

    pub fn finalize(&self, agg: A) -> O {
        (self.finalize)(agg)
    }
}
