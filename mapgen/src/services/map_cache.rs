//! Result cache
//!
//! Pure LRU bookkeeping with no knowledge of the worker, so it can be tested
//! on its own. Entries never expire; the least recently used key is evicted
//! once the capacity is reached.

use std::collections::{HashMap, VecDeque};

pub struct LruCache<V> {
    capacity: usize,
    entries: HashMap<String, V>,

    /// Keys from least to most recently used
    recency: VecDeque<String>,
}

impl<V: Clone> LruCache<V> {
    /// A capacity of zero is bumped to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
        }
    }

    /// Look up `key` and mark it as most recently used
    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    /// Insert or replace `key`, evicting the least recently used entry when full
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }

        self.recency.push_back(key);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
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

    fn touch(&mut self, key: &str) {
        if let Some(position) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(position) {
                self.recency.push_back(k);
            }
        }
    }
}
