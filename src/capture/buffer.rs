//! Lock-free point channel between the sampler thread and the UI thread
//!
//! The sampler worker is the single producer, the UI thread the single
//! consumer. The channel only feeds the live preview: the worker keeps the
//! authoritative sequence itself, so a point lost to a full ring is missing
//! from the preview animation but never from the recording.

use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// A monitor-local cursor position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Counters shared by both halves of the channel
#[derive(Default)]
struct ChannelStats {
    dropped: AtomicU64,
}

/// Producer half (owned by the sampler thread)
pub struct PointProducer {
    producer: ringbuf::HeapProd<Point>,
    stats: Arc<ChannelStats>,
}

impl PointProducer {
    /// Push a point. Returns false if the ring was full and the point was lost.
    #[inline]
    pub fn push(&mut self, point: Point) -> bool {
        match self.producer.try_push(point) {
            Ok(()) => true,
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Consumer half (owned by the UI thread)
pub struct PointConsumer {
    consumer: ringbuf::HeapCons<Point>,
    stats: Arc<ChannelStats>,
}

impl PointConsumer {
    /// Move every available point, oldest first, into `out`.
    ///
    /// Returns how many points were appended.
    pub fn drain_into(&mut self, out: &mut Vec<Point>) -> usize {
        let before = out.len();
        while let Some(point) = self.consumer.try_pop() {
            out.push(point);
        }
        out.len() - before
    }

    /// Points lost because the ring was full
    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded SPSC channel for sampled points
pub fn point_channel(capacity: usize) -> (PointProducer, PointConsumer) {
    let rb = HeapRb::<Point>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    let stats = Arc::new(ChannelStats::default());

    (
        PointProducer {
            producer: prod,
            stats: Arc::clone(&stats),
        },
        PointConsumer {
            consumer: cons,
            stats,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let (mut producer, mut consumer) = point_channel(8);

        producer.push(Point::new(1, 1));
        producer.push(Point::new(2, 2));
        producer.push(Point::new(3, 3));

        let mut out = Vec::new();
        assert_eq!(consumer.drain_into(&mut out), 3);
        assert_eq!(out, vec![Point::new(1, 1), Point::new(2, 2), Point::new(3, 3)]);

        // Nothing left after a drain
        assert_eq!(consumer.drain_into(&mut out), 0);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_drain_appends_to_existing() {
        let (mut producer, mut consumer) = point_channel(4);
        let mut out = vec![Point::new(0, 0)];

        producer.push(Point::new(5, 6));
        consumer.drain_into(&mut out);

        assert_eq!(out, vec![Point::new(0, 0), Point::new(5, 6)]);
    }

    #[test]
    fn test_full_ring_drops_and_counts() {
        let (mut producer, mut consumer) = point_channel(2);

        assert!(producer.push(Point::new(1, 0)));
        assert!(producer.push(Point::new(2, 0)));
        assert!(!producer.push(Point::new(3, 0)));

        assert_eq!(consumer.dropped(), 1);

        let mut out = Vec::new();
        consumer.drain_into(&mut out);
        assert_eq!(out, vec![Point::new(1, 0), Point::new(2, 0)]);
    }
}
