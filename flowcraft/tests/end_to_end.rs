// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Crate-level scenarios driving the public API the way an embedding
//! application would, rather than the module-internal unit tests each
//! operator already carries.

use std::sync::Arc;

use flowcraft::infrastructure::codec::{TextDecoderFactory, TextEncoderFactory};
use flowcraft::infrastructure::reduce::{dedup_by, ExternalSort, HashReductor, JoinSide, SetOpMode, SortedJoin, SortedSetOp};
use flowcraft::infrastructure::sources::CollectionSource;
use flowcraft_domain::{BasePipe, DecoderFactory, EncoderFactory, JoinMode, ReadOptions, ReductorConfig, SyncPipe, TerminalPipe, WriteOptions};
use flowcraft::infrastructure::terminal::Consumer;

#[test]
fn text_round_trip_preserves_order_and_reaches_full_progress() {
    let encoder_factory = TextEncoderFactory;
    let mut buf = Vec::new();
    {
        let mut encoder = encoder_factory.open(Box::new(&mut buf), &WriteOptions::default()).unwrap();
        for item in ["one", "two", "three"] {
            encoder.encode(&item.to_string()).unwrap();
        }
        encoder.finish().unwrap();
    }

    let decoder_factory = TextDecoderFactory;
    let mut decoder = decoder_factory.open(Box::new(std::io::Cursor::new(buf)), &ReadOptions::default()).unwrap();
    let mut out = Vec::new();
    while let Some(line) = decoder.decode_next().unwrap() {
        out.push(line);
    }
    assert_eq!(out, vec!["one", "two", "three"]);
}

#[test]
fn external_sort_spills_and_produces_an_ascending_permutation() {
    let mut input: Vec<i32> = (0..5000).rev().collect();
    input.extend([17, 17, 4999, 0]); // a few duplicates and edge values
    let total = input.len();

    let comparator: Arc<dyn Fn(&i32, &i32) -> std::cmp::Ordering + Send + Sync> = Arc::new(|a, b| a.cmp(b));
    let mut sort = ExternalSort::new(Box::new(CollectionSource::new(input)), comparator, 64).unwrap();
    sort.start().unwrap();

    let mut out = Vec::new();
    while let Some(item) = sort.next().unwrap() {
        out.push(item);
    }
    sort.close();

    assert_eq!(out.len(), total);
    assert!(out.windows(2).all(|w| w[0] <= w[1]));
    assert!(sort.runs_written() > 1, "5000 items at max_in_memory=64 should spill more than one run");
}

#[test]
fn sorted_subtraction_removes_matching_keys_and_detects_disorder() {
    let left: Vec<i32> = vec![1, 2, 2, 3, 5];
    let right: Vec<i32> = vec![2, 5];
    let cmp: Box<dyn Fn(&i32, &i32) -> std::cmp::Ordering + Send> = Box::new(|a: &i32, b: &i32| a.cmp(b));

    let mut pipe = SortedSetOp::new(vec![Box::new(CollectionSource::new(left)), Box::new(CollectionSource::new(right))], cmp, SetOpMode::Subtraction);
    pipe.start().unwrap();
    let mut out = Vec::new();
    while let Some(item) = pipe.next().unwrap() {
        out.push(item);
    }
    assert_eq!(out, vec![1, 3]);
}

#[test]
fn sorted_inner_join_groups_both_right_matches_under_one_key() {
    let left = vec![(1, JoinSide::<&'static str, &'static str>::Left("L1")), (2, JoinSide::Left("L2"))];
    let right = vec![(1, JoinSide::Right(0, "R1")), (1, JoinSide::Right(0, "R2")), (3, JoinSide::Right(0, "R3"))];

    let mut pipe = SortedJoin::new(
        Box::new(CollectionSource::new(left)),
        vec![Box::new(CollectionSource::new(right))],
        Box::new(|a: &i32, b: &i32| a.cmp(b)),
        JoinMode::Inner,
    );
    pipe.start().unwrap();

    let mut records = Vec::new();
    while let Some(record) = pipe.next().unwrap() {
        records.push(record);
    }
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, 1);
    assert_eq!(records[0].left, vec!["L1"]);
    assert_eq!(records[0].right[0], vec!["R1", "R2"]);
}

#[test]
fn hash_reductor_aggregates_are_invariant_to_partition_count() {
    let items: Vec<(i32, i32)> = (0..10_000).map(|i| (i % 10, i)).collect();

    let run = |partition_count: usize| -> Vec<(i32, i64)> {
        // The aggregator carries the key alongside the running sum since
        // `finalize` only ever sees the aggregator, not the key that built it.
        let config: ReductorConfig<(i32, i32), i32, (i32, i64), (i32, i64)> = ReductorConfig::new(
            |item: &(i32, i32)| item.0,
            |key: &i32| (*key, 0i64),
            |acc: &mut (i32, i64), item: (i32, i32)| {
                acc.1 += item.1 as i64;
                Ok(())
            },
            |acc: (i32, i64)| acc,
        );
        let mut reductor = HashReductor::new(Box::new(CollectionSource::new(items.clone())), config, partition_count).unwrap();
        reductor.start().unwrap();
        let mut out = Vec::new();
        while let Some(item) = reductor.next().unwrap() {
            out.push(item);
        }
        out.sort_by_key(|(k, _)| *k);
        out
    };

    let with_one_partition = run(1);
    let with_four_partitions = run(4);
    assert_eq!(with_one_partition, with_four_partitions);
    assert_eq!(with_one_partition.len(), 10);
}

#[test]
fn dedup_by_drops_repeats_through_the_consumer_terminal() {
    use std::sync::Mutex;

    let config = dedup_by(|item: &i32| *item);
    let reductor = HashReductor::new(Box::new(CollectionSource::new(vec![1, 2, 2, 3, 1, 4])), config, 4).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let collected = seen.clone();
    let mut consumer = Consumer::new(Box::new(reductor), move |item: i32| collected.lock().unwrap().push(item));
    consumer.start().unwrap();

    let mut out = seen.lock().unwrap().clone();
    out.sort();
    assert_eq!(out, vec![1, 2, 3, 4]);
}
