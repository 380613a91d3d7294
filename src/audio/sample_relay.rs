//! Lock-free single-producer/single-consumer relay that moves audio samples from the audio thread
//! to the analyzer in fixed-size chunks.
//!
//! The producer never blocks and never allocates. When the consumer falls behind the oldest unread
//! chunk is thrown away to make room, so the consumer always sees the most recent audio.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ConfigError;

type Chunk = Box<[f32]>;

struct RelayShared {
    /// Committed chunks, oldest first
    filled: ArrayQueue<Chunk>,
    /// Empty chunks the producer can fill. Chunks only move between the two queues, so after
    /// creation nothing on either side allocates.
    spare: ArrayQueue<Chunk>,
    chunk_size: usize,
    dropped: AtomicUsize,
}

/// Create a connected producer/consumer pair. `capacity` is the number of chunks that can be
/// buffered before the oldest gets dropped and must be a power of two.
pub fn channel(
    chunk_size: usize,
    capacity: usize,
) -> Result<(RelayProducer, RelayConsumer), ConfigError> {
    if chunk_size == 0 || capacity == 0 || !capacity.is_power_of_two() {
        return Err(ConfigError::InvalidRelayGeometry {
            chunk_size,
            capacity,
        });
    }

    // `capacity` chunks can sit in `filled`, one is being staged by the producer and one can be
    // held by the consumer while it copies. The rest of the pool always has a spare left.
    let pool_size = capacity + 2;
    let spare = ArrayQueue::new(pool_size);
    for _ in 1..pool_size {
        let _ = spare.push(empty_chunk(chunk_size));
    }

    let shared = Arc::new(RelayShared {
        filled: ArrayQueue::new(capacity),
        spare,
        chunk_size,
        dropped: AtomicUsize::new(0),
    });

    let producer = RelayProducer {
        shared: shared.clone(),
        staging: Some(empty_chunk(chunk_size)),
        staged: 0,
    };
    let consumer = RelayConsumer {
        shared,
        scratch: vec![0.0; chunk_size],
    };

    Ok((producer, consumer))
}

fn empty_chunk(chunk_size: usize) -> Chunk {
    vec![0.0; chunk_size].into_boxed_slice()
}

/// Audio thread side of the relay
pub struct RelayProducer {
    shared: Arc<RelayShared>,
    /// Samples collected for the next chunk
    staging: Option<Chunk>,
    staged: usize,
}

impl RelayProducer {
    /// Append samples. Every time a full chunk has been collected it is committed to the relay.
    /// Real-time safe.
    pub fn push(&mut self, mut samples: &[f32]) {
        let chunk_size = self.shared.chunk_size;
        while !samples.is_empty() {
            let staging = match self.staging.take().or_else(|| self.shared.spare.pop()) {
                Some(staging) => self.staging.insert(staging),
                // Can't happen with the pool sized as above, but losing audio beats allocating
                None => {
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            let take = (chunk_size - self.staged).min(samples.len());
            staging[self.staged..self.staged + take].copy_from_slice(&samples[..take]);
            self.staged += take;
            samples = &samples[take..];

            if self.staged == chunk_size {
                self.commit();
                self.staged = 0;
            }
        }
    }

    /// Throw away a partially collected chunk, e.g. after a transport reset
    pub fn discard_partial(&mut self) {
        self.staged = 0;
    }

    pub fn chunk_size(&self) -> usize {
        self.shared.chunk_size
    }

    fn commit(&mut self) {
        let Some(chunk) = self.staging.take() else {
            return;
        };

        // When full the oldest chunk gets evicted and becomes the next staging buffer
        if let Some(evicted) = self.shared.filled.force_push(chunk) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            self.staging = Some(evicted);
        }
    }
}

/// Analyzer side of the relay
pub struct RelayConsumer {
    shared: Arc<RelayShared>,
    scratch: Vec<f32>,
}

impl RelayConsumer {
    /// Number of complete chunks waiting to be popped
    pub fn available_chunks(&self) -> usize {
        self.shared.filled.len()
    }

    /// Total chunks lost to overflow since the relay was created
    pub fn dropped_chunks(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn chunk_size(&self) -> usize {
        self.shared.chunk_size
    }

    pub fn capacity(&self) -> usize {
        self.shared.filled.capacity()
    }

    /// Take the oldest available chunk, or `None` when the relay is empty. Never waits.
    pub fn pop(&mut self) -> Option<&[f32]> {
        let chunk = self.shared.filled.pop()?;
        self.scratch.copy_from_slice(&chunk);
        // The pool has room for every chunk, this can't fail
        let _ = self.shared.spare.push(chunk);

        Some(self.scratch.as_slice())
    }
}

/// One relay per audio channel, the audio thread's end of the analyzer
pub struct SampleTap {
    producers: Vec<RelayProducer>,
}

impl SampleTap {
    /// Create `num_channels` relays. The consumers are handed to the analyzer, in channel order.
    pub fn new(
        num_channels: usize,
        chunk_size: usize,
        capacity: usize,
    ) -> Result<(Self, Vec<RelayConsumer>), ConfigError> {
        let (producers, consumers) = (0..num_channels)
            .map(|_| channel(chunk_size, capacity))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        Ok((Self { producers }, consumers))
    }

    pub fn num_channels(&self) -> usize {
        self.producers.len()
    }

    /// Samples for channels without a relay are ignored
    #[inline]
    pub fn push(&mut self, channel: usize, samples: &[f32]) {
        if let Some(producer) = self.producers.get_mut(channel) {
            producer.push(samples);
        }
    }

    pub fn discard_partial(&mut self) {
        for producer in self.producers.iter_mut() {
            producer.discard_partial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(value: f32, chunk_size: usize) -> Vec<f32> {
        vec![value; chunk_size]
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(channel(0, 8).is_err());
        assert!(channel(64, 0).is_err());
        assert_eq!(
            channel(64, 12).err(),
            Some(ConfigError::InvalidRelayGeometry {
                chunk_size: 64,
                capacity: 12
            })
        );
    }

    #[test]
    fn empty_relay_pops_nothing() {
        let (_producer, mut consumer) = channel(16, 4).unwrap();
        assert_eq!(consumer.available_chunks(), 0);
        assert!(consumer.pop().is_none());
    }

    #[test]
    fn partial_chunks_are_held_back() {
        let (mut producer, mut consumer) = channel(8, 4).unwrap();
        producer.push(&[1.0; 5]);
        assert_eq!(consumer.available_chunks(), 0);

        producer.push(&[2.0; 5]);
        assert_eq!(consumer.available_chunks(), 1);
        assert_eq!(
            consumer.pop().unwrap(),
            &[1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]
        );
        assert!(consumer.pop().is_none());
    }

    #[test]
    fn overflow_keeps_the_newest_chunks_in_order() {
        let (mut producer, mut consumer) = channel(4, 8).unwrap();
        for i in 0..21 {
            producer.push(&chunk(i as f32, 4));
        }

        assert_eq!(consumer.available_chunks(), 8);
        assert_eq!(consumer.dropped_chunks(), 13);

        let drained: Vec<f32> = std::iter::from_fn(|| consumer.pop().map(|c| c[0])).collect();
        assert_eq!(drained, (13..21).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn discarded_partial_chunk_is_never_committed() {
        let (mut producer, mut consumer) = channel(4, 2).unwrap();
        producer.push(&[9.0; 3]);
        producer.discard_partial();
        producer.push(&[1.0; 4]);

        assert_eq!(consumer.pop().unwrap(), &[1.0; 4]);
    }

    #[test]
    fn tap_routes_channels_to_their_own_relay() {
        let (mut tap, mut consumers) = SampleTap::new(2, 2, 4).unwrap();
        tap.push(0, &[1.0, 1.0]);
        tap.push(1, &[2.0, 2.0]);
        tap.push(5, &[3.0, 3.0]);

        assert_eq!(tap.num_channels(), 2);
        assert_eq!(consumers[0].pop().unwrap(), &[1.0, 1.0]);
        assert_eq!(consumers[1].pop().unwrap(), &[2.0, 2.0]);
        assert!(consumers[1].pop().is_none());
    }
}
