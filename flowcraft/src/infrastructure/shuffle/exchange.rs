// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The distributed shuffle (`§4.10`): every worker partitions its local
//! input by [`ShuffleConfig::shard_of`] and sends each item to whichever
//! peer owns that shard, while simultaneously receiving everyone else's
//! contribution to its own shard. A worker's final output is the union of
//! what it kept locally and what every peer sent it, streamed to the
//! caller as it arrives rather than materialized up front.
//!
//! Connections are established exactly once per peer pair: the
//! lower-indexed worker dials, the higher-indexed worker accepts. This
//! avoids a duplicate-connection race without needing a rendezvous step.
//! A worker is done once it has sent its own end-of-stream to every peer
//! and received one back from every peer — tracked by a
//! [`CompletionBarrier`].
//!
//! `start()` hands the whole protocol off to a background thread (the
//! same shape as [`super::super::async_runtime::bridge::SyncToAsync`]):
//! local items and everything a peer sends land in a shared queue that
//! `next()` drains, so a downstream stage can begin consuming this
//! worker's shard before the shuffle has finished.

use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flowcraft_domain::{BasePipe, Codec, PipelineError, PipelineResult, ProgressCell, ShuffleConfig, SyncPipe};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::barrier::CompletionBarrier;
use super::frame::{read_frame, write_frame, Frame};
use crate::infrastructure::async_runtime::blocking_queue::{BlockingQueue, PopOutcome};
use crate::infrastructure::aux::PeekBuffer;
use crate::infrastructure::codec::JsonCodecImpl;

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

enum ExchangeEvent<T> {
    Item(T),
    Error(PipelineError),
}

pub struct ShuffleExchange<T: Send + Serialize + DeserializeOwned + Sync + 'static> {
    config: ShuffleConfig<T>,
    codec: Arc<JsonCodecImpl<T>>,
    input: Option<Box<dyn SyncPipe<Item = T>>>,
    queue: Arc<BlockingQueue<ExchangeEvent<T>>>,
    driver: Option<std::thread::JoinHandle<()>>,
    progress: Arc<ProgressCell>,
    peeked: PeekBuffer<T>,
}

impl<T: Send + Serialize + DeserializeOwned + Sync + 'static> ShuffleExchange<T> {
    pub fn new(config: ShuffleConfig<T>, input: Box<dyn SyncPipe<Item = T>>) -> Self {
        Self {
            config,
            codec: Arc::new(JsonCodecImpl::default()),
            input: Some(input),
            queue: Arc::new(BlockingQueue::new(256)),
            driver: None,
            progress: Arc::new(ProgressCell::new()),
            peeked: PeekBuffer::new(),
        }
    }

    /// Workers accept connections strictly from lower-indexed peers; which
    /// slot an accepted connection fills is just "the next not-yet-claimed
    /// lower index" since TCP accept order isn't otherwise meaningful here.
    fn peer_index_for_accepted_connection(my_index: usize, outgoing: &[Option<Arc<BlockingQueue<Frame>>>]) -> usize {
        (0..my_index).find(|&i| outgoing[i].is_none()).unwrap_or(0)
    }
}

impl<T: Send + Serialize + DeserializeOwned + Sync + 'static> BasePipe for ShuffleExchange<T> {
    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn close(&mut self) {
        self.queue.close();
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
    }
}

impl<T: Send + Serialize + DeserializeOwned + Sync + 'static> SyncPipe for ShuffleExchange<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        let mut input = self.input.take().expect("start() called more than once");
        let config = self.config.clone();
        let codec = self.codec.clone();
        let queue = self.queue.clone();
        let progress = self.progress.clone();

        self.driver = Some(std::thread::spawn(move || {
            let outcome = drive_exchange(&config, &codec, &queue, &progress, input.as_mut());
            input.close();
            if let Err(err) = outcome {
                let _ = queue.push_blocking(ExchangeEvent::Error(err));
            }
            progress.complete();
            queue.close();
        }));
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        let queue = &self.queue;
        self.peeked.next(|| pull_event(queue))
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        let queue = &self.queue;
        self.peeked.peek(|| pull_event(queue))
    }
}

fn pull_event<T: Send>(queue: &BlockingQueue<ExchangeEvent<T>>) -> PipelineResult<Option<T>> {
    match queue.pop_blocking() {
        PopOutcome::Item(ExchangeEvent::Item(item)) => Ok(Some(item)),
        PopOutcome::Item(ExchangeEvent::Error(err)) => Err(err),
        PopOutcome::Closed => Ok(None),
    }
}

/// Runs the whole exchange protocol on the caller's (background) thread:
/// dial/accept every peer, drain `input` while routing each item either
/// into `queue` (this worker's own shard) or to the peer that owns it, then
/// wait for every peer's end-of-stream before returning.
fn drive_exchange<T: Send + Serialize + DeserializeOwned + Sync + 'static>(
    config: &ShuffleConfig<T>,
    codec: &Arc<JsonCodecImpl<T>>,
    queue: &Arc<BlockingQueue<ExchangeEvent<T>>>,
    progress: &ProgressCell,
    input: &mut dyn SyncPipe<Item = T>,
) -> PipelineResult<()> {
    let peer_count = config.worker_count().saturating_sub(1);
    let barrier = Arc::new(CompletionBarrier::new(peer_count));

    let listener = if peer_count > 0 { Some(TcpListener::bind(("0.0.0.0", config.local_port)).map_err(PipelineError::from)?) } else { None };

    let mut outgoing: Vec<Option<Arc<BlockingQueue<Frame>>>> = (0..config.worker_count()).map(|_| None).collect();
    let mut writer_handles = Vec::new();
    let mut reader_handles = Vec::new();

    for (peer_index, peer) in config.workers.iter().enumerate() {
        if peer_index == config.my_index {
            continue;
        }
        if peer_index > config.my_index {
            let stream = dial(&peer.socket_addr_string())?;
            let (reader, writer) = split(stream)?;
            let frame_queue = Arc::new(BlockingQueue::<Frame>::new(256));
            outgoing[peer_index] = Some(frame_queue.clone());
            writer_handles.push(spawn_writer(writer, frame_queue));
            reader_handles.push(spawn_reader(reader, codec.clone(), queue.clone(), barrier.clone()));
        }
    }

    if let Some(listener) = listener {
        for _ in 0..config.my_index.min(peer_count) {
            let (stream, _) = listener.accept().map_err(PipelineError::from)?;
            let (reader, writer) = split(stream)?;
            let frame_queue = Arc::new(BlockingQueue::<Frame>::new(256));
            reader_handles.push(spawn_reader(reader, codec.clone(), queue.clone(), barrier.clone()));
            writer_handles.push(spawn_writer(writer, frame_queue.clone()));
            let peer_index = ShuffleExchange::<T>::peer_index_for_accepted_connection(config.my_index, &outgoing);
            outgoing[peer_index] = Some(frame_queue);
        }
    }

    input.start()?;
    let mut sent_bytes = vec![0u64; config.worker_count()];
    let mut received = 0u64;
    while let Some(item) = input.next()? {
        let shard = config.shard_of(&item);
        if shard == config.my_index {
            received += 1;
            if queue.push_blocking(ExchangeEvent::Item(item)).is_err() {
                return Ok(());
            }
        } else if let Some(frame_queue) = &outgoing[shard] {
            let bytes = codec.byte_array().encode(&item)?;
            sent_bytes[shard] += bytes.len() as u64;
            let _ = frame_queue.push_blocking(Frame::Data(bytes));
        }
        progress.set((received as f64 / (received as f64 + 1.0)).min(0.99));
    }

    for (peer_index, frame_queue) in outgoing.iter().enumerate() {
        if let Some(frame_queue) = frame_queue {
            let _ = frame_queue.push_blocking(Frame::EndOfStream { total_bytes: sent_bytes[peer_index] });
            frame_queue.close();
        }
    }

    for handle in writer_handles {
        let _ = handle.join();
    }
    barrier.wait();
    for handle in reader_handles {
        handle.join().map_err(|_| PipelineError::internal("shuffle reader thread panicked"))??;
    }
    Ok(())
}

fn dial(addr: &str) -> PipelineResult<TcpStream> {
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(_) if Instant::now() < deadline => std::thread::sleep(CONNECT_RETRY_INTERVAL),
            Err(e) => return Err(PipelineError::io(format!("connecting to {addr}: {e}"))),
        }
    }
}

fn split(stream: TcpStream) -> PipelineResult<(BufReader<TcpStream>, BufWriter<TcpStream>)> {
    let write_half = stream.try_clone().map_err(PipelineError::from)?;
    Ok((BufReader::new(stream), BufWriter::new(write_half)))
}

fn spawn_writer(mut writer: BufWriter<TcpStream>, queue: Arc<BlockingQueue<Frame>>) -> std::thread::JoinHandle<PipelineResult<()>> {
    std::thread::spawn(move || loop {
        match queue.pop_blocking() {
            PopOutcome::Item(frame) => {
                let done = matches!(frame, Frame::EndOfStream { .. });
                write_frame(&mut writer, &frame)?;
                if done {
                    return Ok(());
                }
            }
            PopOutcome::Closed => return Ok(()),
        }
    })
}

fn spawn_reader<T: Send + DeserializeOwned + Serialize + Sync + 'static>(
    mut reader: BufReader<TcpStream>,
    codec: Arc<JsonCodecImpl<T>>,
    queue: Arc<BlockingQueue<ExchangeEvent<T>>>,
    barrier: Arc<CompletionBarrier>,
) -> std::thread::JoinHandle<PipelineResult<()>> {
    std::thread::spawn(move || loop {
        match read_frame(&mut reader)? {
            None | Some(Frame::Abort) => return Ok(()),
            Some(Frame::EndOfStream { .. }) => {
                barrier.arrive();
                return Ok(());
            }
            Some(Frame::Data(bytes)) => {
                let item = codec.byte_array().decode(&bytes)?;
                if queue.push_blocking(ExchangeEvent::Item(item)).is_err() {
                    return Ok(());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;
    use flowcraft_domain::WorkerAddress;

    fn find_free_port() -> u16 {
        std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap().local_addr().unwrap().port()
    }

    #[test]
    fn two_workers_exchange_their_shards() {
        let port_a = find_free_port();
        let port_b = find_free_port();
        let mut workers = vec![WorkerAddress::new("127.0.0.1", port_a), WorkerAddress::new("127.0.0.1", port_b)];
        workers.sort();
        let index_a = workers.iter().position(|w| w.port == port_a).unwrap();
        let index_b = workers.iter().position(|w| w.port == port_b).unwrap();

        let config_a = ShuffleConfig::new(workers.clone(), index_a, port_a, |item: &i32| *item as usize);
        let config_b = ShuffleConfig::new(workers, index_b, port_b, |item: &i32| *item as usize);

        let input_a = vec![10, 11, 12, 13];
        let input_b = vec![20, 21, 22, 23];
        let expected_for = |idx: usize| {
            let mut v: Vec<i32> = input_a.iter().chain(input_b.iter()).cloned().filter(|x| (*x as usize) % 2 == idx).collect();
            v.sort();
            v
        };

        let worker_a = {
            let input_a = input_a.clone();
            std::thread::spawn(move || -> PipelineResult<Vec<i32>> {
                let mut exchange = ShuffleExchange::new(config_a, Box::new(CollectionSource::new(input_a)));
                exchange.start()?;
                let mut out = Vec::new();
                while let Some(v) = exchange.next()? {
                    out.push(v);
                }
                Ok(out)
            })
        };
        let worker_b = {
            let input_b = input_b.clone();
            std::thread::spawn(move || -> PipelineResult<Vec<i32>> {
                let mut exchange = ShuffleExchange::new(config_b, Box::new(CollectionSource::new(input_b)));
                exchange.start()?;
                let mut out = Vec::new();
                while let Some(v) = exchange.next()? {
                    out.push(v);
                }
                Ok(out)
            })
        };

        let mut result_a = worker_a.join().unwrap().unwrap();
        let mut result_b = worker_b.join().unwrap().unwrap();
        result_a.sort();
        result_b.sort();
        assert_eq!(result_a, expected_for(index_a));
        assert_eq!(result_b, expected_for(index_b));
    }

    #[test]
    fn peek_matches_next_without_consuming() {
        let port = find_free_port();
        let workers = vec![WorkerAddress::new("127.0.0.1", port)];
        let config = ShuffleConfig::new(workers, 0, port, |item: &i32| *item as usize);
        let mut exchange = ShuffleExchange::new(config, Box::new(CollectionSource::new(vec![1, 2])));
        exchange.start().unwrap();
        assert_eq!(exchange.peek().unwrap(), Some(&1));
        assert_eq!(exchange.peek().unwrap(), Some(&1));
        assert_eq!(exchange.next().unwrap(), Some(1));
        assert_eq!(exchange.next().unwrap(), Some(2));
        assert_eq!(exchange.next().unwrap(), None);
    }
}
