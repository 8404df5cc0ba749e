//! A bounded read-through cache of serialized credits.
//!
//! The cache participates in the write batch: saves and removals staged in
//! a batch stay in pending overlays until the batch commits, so a rolled
//! back batch can never leak a stale read. Reads only ever see the
//! committed layer, mirroring what a KV read would return while the batch
//! is still unflushed.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use lru::LruCache;

use osprey_chain::transparent::OutPoint;

/// The maximum number of credits kept in memory.
const CAPACITY: usize = 10_000;

pub struct CoinCache {
    committed: LruCache<OutPoint, Vec<u8>>,
    pushes: HashMap<OutPoint, Vec<u8>>,
    unpushes: HashSet<OutPoint>,
}

impl CoinCache {
    pub fn new() -> CoinCache {
        CoinCache {
            committed: LruCache::new(NonZeroUsize::new(CAPACITY).expect("capacity is nonzero")),
            pushes: HashMap::new(),
            unpushes: HashSet::new(),
        }
    }

    /// Begin a batch: forget any overlays a previous batch left behind.
    pub fn start(&mut self) {
        self.pushes.clear();
        self.unpushes.clear();
    }

    /// Stage a credit save.
    pub fn push(&mut self, outpoint: OutPoint, raw: Vec<u8>) {
        self.unpushes.remove(&outpoint);
        self.pushes.insert(outpoint, raw);
    }

    /// Stage a credit removal.
    pub fn unpush(&mut self, outpoint: OutPoint) {
        self.pushes.remove(&outpoint);
        self.unpushes.insert(outpoint);
    }

    /// Populate the committed layer from a database read.
    pub fn set(&mut self, outpoint: OutPoint, raw: Vec<u8>) {
        self.committed.put(outpoint, raw);
    }

    /// A committed credit's raw bytes, if cached.
    pub fn get(&mut self, outpoint: &OutPoint) -> Option<Vec<u8>> {
        self.committed.get(outpoint).cloned()
    }

    pub fn has(&self, outpoint: &OutPoint) -> bool {
        self.committed.contains(outpoint)
    }

    /// Publish the staged overlays into the committed layer.
    pub fn commit(&mut self) {
        for outpoint in self.unpushes.drain() {
            self.committed.pop(&outpoint);
        }
        for (outpoint, raw) in self.pushes.drain() {
            self.committed.put(outpoint, raw);
        }
    }

    /// Discard the staged overlays.
    pub fn drop_pending(&mut self) {
        self.pushes.clear();
        self.unpushes.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.committed.len()
    }
}

impl Default for CoinCache {
    fn default() -> Self {
        CoinCache::new()
    }
}
