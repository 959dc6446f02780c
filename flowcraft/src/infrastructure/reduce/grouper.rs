// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Grouping and deduplication (`§4.6`) are both special-case configurations
//! of the hash-reductor: grouping accumulates into a `Vec`, dedup
//! accumulates into "keep the first" and ignores the rest.

use flowcraft_domain::ReductorConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Builds a [`ReductorConfig`] that groups items of type `I` by `key_of`
/// into `(key, Vec<I>)` pairs.
pub fn group_by<I, K>(key_of: impl Fn(&I) -> K + Send + Sync + 'static) -> ReductorConfig<I, K, (K, Vec<I>), (K, Vec<I>)>
where
    I: Send + Clone + Serialize + DeserializeOwned + 'static,
    K: Send + Clone + std::hash::Hash + Eq + Serialize + DeserializeOwned + 'static,
{
    ReductorConfig::new(
        key_of,
        |key: &K| (key.clone(), Vec::new()),
        |agg: &mut (K, Vec<I>), item: I| {
            agg.1.push(item);
            Ok(())
        },
        |agg| agg,
    )
}

/// Builds a [`ReductorConfig`] that keeps only the first item seen for each
/// key, discarding the rest.
pub fn dedup_by<I, K>(key_of: impl Fn(&I) -> K + Send + Sync + 'static) -> ReductorConfig<I, K, Option<I>, I>
where
    I: Send + Clone + Serialize + DeserializeOwned + 'static,
    K: Send + Clone + std::hash::Hash + Eq + Serialize + DeserializeOwned + 'static,
{
    ReductorConfig::new(
        key_of,
        |_key: &K| None,
        |agg: &mut Option<I>, item: I| {
            if agg.is_none() {
                *agg = Some(item);
            }
            Ok(())
        },
        |agg: Option<I>| agg.expect("dedup_by always sees at least the item that created the aggregator"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::reduce::hash_reductor::HashReductor;
    use crate::infrastructure::sources::CollectionSource;
    use flowcraft_domain::SyncPipe;

    #[test]
    fn group_by_collects_values_per_key() {
        let input = Box::new(CollectionSource::new(vec![("a", 1), ("b", 2), ("a", 3)]));
        let config = group_by(|item: &(&'static str, i32)| item.0.to_string());
        let mut reductor = HashReductor::new(input, config, 4).unwrap();
        reductor.start().unwrap();
        let mut groups = Vec::new();
        while let Some((key, values)) = reductor.next().unwrap() {
            groups.push((key, values.into_iter().map(|(_, v)| v).collect::<Vec<_>>()));
        }
        groups.sort();
        assert_eq!(groups, vec![("a".to_string(), vec![1, 3]), ("b".to_string(), vec![2])]);
    }

    #[test]
    fn dedup_by_keeps_first_occurrence() {
        let input = Box::new(CollectionSource::new(vec![("a", 1), ("a", 2), ("b", 3)]));
        let config = dedup_by(|item: &(&'static str, i32)| item.0.to_string());
        let mut reductor = HashReductor::new(input, config, 4).unwrap();
        reductor.start().unwrap();
        let mut out = Vec::new();
        while let Some(item) = reductor.next().unwrap() {
            out.push(item);
        }
        out.sort_by_key(|(k, _)| k.clone());
        assert_eq!(out, vec![("a", 1), ("b", 3)]);
    }
}
