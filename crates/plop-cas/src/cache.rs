//! Segmented LRU for decoded chunk plaintexts.
//!
//! Four segments of equal capacity. A new entry lands at the tail of the
//! probationary segment; a hit moves it one segment up, demoting that
//! segment's oldest entry downward; only the probationary segment evicts
//! out of the cache. One pass of sequential reads therefore cannot flush
//! entries that have been hit more than once.
//!
//! Entries are multi-megabyte chunks, so capacities stay in the tens and
//! the O(segment) bookkeeping below is noise next to a single fetch.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;

use plop_core::ContentAddress;

const SEGMENTS: usize = 4;

pub(crate) struct SegmentedLru {
    per_segment: usize,
    map: HashMap<ContentAddress, (usize, Bytes)>,
    order: [VecDeque<ContentAddress>; SEGMENTS],
}

impl SegmentedLru {
    /// `capacity` must be a positive multiple of four.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity >= SEGMENTS && capacity % SEGMENTS == 0,
            "cache capacity must be a positive multiple of {SEGMENTS}"
        );
        Self {
            per_segment: capacity / SEGMENTS,
            map: HashMap::with_capacity(capacity),
            order: Default::default(),
        }
    }

    pub fn get(&mut self, key: &ContentAddress) -> Option<Bytes> {
        let (segment, data) = self.map.get(key).map(|(s, d)| (*s, d.clone()))?;
        self.unlink(segment, key);
        let target = (segment + 1).min(SEGMENTS - 1);
        self.order[target].push_back(*key);
        if target != segment {
            self.map.get_mut(key).expect("entry present").0 = target;
            self.demote_overflow(target);
        }
        Some(data)
    }

    pub fn insert(&mut self, key: ContentAddress, data: Bytes) {
        if let Some(entry) = self.map.get_mut(&key) {
            // Same address means same bytes; just refresh recency.
            let segment = entry.0;
            entry.1 = data;
            self.unlink(segment, &key);
            self.order[segment].push_back(key);
            return;
        }
        self.map.insert(key, (0, data));
        self.order[0].push_back(key);
        self.demote_overflow(0);
    }

    /// Walks over-full segments downward, demoting each one's oldest
    /// entry; overflow of the bottom segment leaves the cache.
    fn demote_overflow(&mut self, from: usize) {
        let mut segment = from;
        loop {
            if self.order[segment].len() <= self.per_segment {
                return;
            }
            let victim = self.order[segment].pop_front().expect("segment over-full");
            if segment == 0 {
                self.map.remove(&victim);
                return;
            }
            segment -= 1;
            self.order[segment].push_back(victim);
            self.map.get_mut(&victim).expect("entry present").0 = segment;
        }
    }

    fn unlink(&mut self, segment: usize, key: &ContentAddress) {
        if let Some(pos) = self.order[segment].iter().position(|k| k == key) {
            self.order[segment].remove(pos);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.len()
    }
}
