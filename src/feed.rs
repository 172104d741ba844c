use std::collections::VecDeque;
use std::time::Instant;

/// Raw entries kept per feed before the oldest are evicted
pub const FEED_BUFFER_CAPACITY: usize = 50;

/// One raw event received on a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub feed_id: String,
    pub event: String,
    pub data: String,
    pub received_at: Instant,
}

/// Newest-first buffer of raw feed entries.
///
/// `add_entry` reports how many entries fell off the tail so the caller can
/// forward the count to `MetricsCollector::record_context_eviction`.
#[derive(Debug, Clone)]
pub struct BoundedFeedBuffer {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl BoundedFeedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend `entry`; returns the number of entries evicted from the tail.
    pub fn add_entry(&mut self, entry: FeedEntry) -> usize {
        self.entries.push_front(entry);
        let evicted = self.entries.len().saturating_sub(self.capacity);
        self.entries.truncate(self.capacity);
        evicted
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&FeedEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of payload lengths currently held.
    pub fn approx_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.data.len() as u64).sum()
    }

    /// Age of the oldest held entry in seconds, 0 when empty.
    pub fn oldest_age_secs(&self, now: Instant) -> f64 {
        self.entries
            .back()
            .map(|e| now.saturating_duration_since(e.received_at).as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl Default for BoundedFeedBuffer {
    fn default() -> Self {
        Self::new(FEED_BUFFER_CAPACITY)
    }
}
