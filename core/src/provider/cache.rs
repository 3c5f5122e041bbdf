use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

pub const DEFAULT_CACHE_CAPACITY: usize = 2048;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

struct Entry {
    value: i64,
    inserted_at: Instant,
}

struct Inner {
    map: HashMap<u64, Entry>,
    /// LRU order, least-recently-used at the front.
    order: VecDeque<u64>,
    capacity: usize,
    ttl: Duration,
}

/// Bounded LRU + TTL cache for block timestamps. Shared across every call on
/// one provider, guarded by a single mutex.
pub struct TimestampCache {
    inner: Mutex<Inner>,
}

impl TimestampCache {
    /// Zero capacity or TTL falls back to the defaults.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CACHE_CAPACITY } else { capacity };
        let ttl = if ttl.is_zero() { DEFAULT_CACHE_TTL } else { ttl };

        TimestampCache {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
                capacity,
                ttl,
            }),
        }
    }

    /// Returns a miss on expiry and deletes the expired entry.
    pub fn get(&self, block: u64) -> Option<i64> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = match inner.map.get(&block) {
            Some(entry) => entry.inserted_at.elapsed() >= inner.ttl,
            None => return None,
        };

        if expired {
            inner.remove(block);
            return None;
        }

        inner.touch(block);
        inner.map.get(&block).map(|entry| entry.value)
    }

    pub fn put(&self, block: u64, value: i64) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.map.insert(block, Entry { value, inserted_at: Instant::now() });
        inner.touch(block);
        inner.evict();
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn touch(&mut self, block: u64) {
        self.order.retain(|b| *b != block);
        self.order.push_back(block);
    }

    fn remove(&mut self, block: u64) {
        self.map.remove(&block);
        self.order.retain(|b| *b != block);
    }

    /// Expired entries leave first, scanning from the least-recently-used
    /// end; the remaining tail is trimmed until size fits capacity.
    fn evict(&mut self) {
        let ttl = self.ttl;
        let mut keep = VecDeque::with_capacity(self.order.len());
        while let Some(block) = self.order.pop_front() {
            let expired = self
                .map
                .get(&block)
                .map(|entry| entry.inserted_at.elapsed() >= ttl)
                .unwrap_or(true);
            if expired {
                self.map.remove(&block);
            } else {
                keep.push_back(block);
            }
        }
        self.order = keep;

        while self.map.len() > self.capacity {
            match self.order.pop_front() {
                Some(block) => {
                    self.map.remove(&block);
                }
                None => break,
            }
        }
    }
}
