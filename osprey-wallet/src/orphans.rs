//! In-memory tracking of orphaned inputs.
//!
//! In SPV mode the wallet can see a spending transaction before the
//! transaction that funds it. When an input's prevout is unknown but its
//! unlock script reveals one of our addresses, the whole transaction is
//! stashed here until the funding transaction arrives.
//!
//! Orphan records live in an arena keyed by transaction hash with a
//! remaining-inputs counter, and a prevout-keyed adjacency points waiting
//! inputs back into the arena. The table is deliberately tiny: it is fed by
//! unverified network data, so when the cap is exceeded the whole table is
//! purged rather than letting a peer grow it.

use std::collections::HashMap;

use osprey_chain::transaction;
use osprey_chain::transparent::OutPoint;

use crate::records::TxRecord;

/// The maximum number of waiting orphan inputs across all transactions.
pub const MAX_ORPHANS: usize = 20;

struct OrphanTx {
    record: TxRecord,
    remaining: usize,
}

#[derive(Default)]
pub struct OrphanMap {
    txs: HashMap<transaction::Hash, OrphanTx>,
    waiting: HashMap<OutPoint, Vec<(transaction::Hash, u32)>>,
    total: usize,
}

impl OrphanMap {
    pub fn new() -> OrphanMap {
        OrphanMap::default()
    }

    /// The number of waiting orphan inputs.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Whether any orphan input is waiting on `outpoint`.
    pub fn has(&self, outpoint: &OutPoint) -> bool {
        self.waiting.contains_key(outpoint)
    }

    pub fn record(&self, hash: &transaction::Hash) -> Option<&TxRecord> {
        self.txs.get(hash).map(|orphan| &orphan.record)
    }

    /// Stash `record`, waiting on the given `(prevout, input index)` pairs.
    ///
    /// Returns `false` if the table overflowed; the caller is expected to
    /// [`purge`](OrphanMap::purge) in response.
    pub fn insert(&mut self, record: TxRecord, missing: Vec<(OutPoint, u32)>) -> bool {
        assert!(!missing.is_empty(), "an orphan has at least one orphan input");

        let hash = record.hash;
        let count = missing.len();

        for (prevout, index) in missing {
            self.waiting
                .entry(prevout)
                .or_insert_with(Vec::new)
                .push((hash, index));
        }
        self.txs.insert(
            hash,
            OrphanTx {
                record,
                remaining: count,
            },
        );
        self.total += count;

        self.total <= MAX_ORPHANS
    }

    /// Take every `(orphan hash, input index)` pair waiting on `outpoint`.
    ///
    /// The entries leave the waiting table immediately; the caller settles
    /// each one with [`satisfy`](OrphanMap::satisfy) or
    /// [`reject`](OrphanMap::reject).
    pub fn take_waiting(&mut self, outpoint: &OutPoint) -> Vec<(transaction::Hash, u32)> {
        let entries = self.waiting.remove(outpoint).unwrap_or_default();
        self.total -= entries.len();
        entries
    }

    /// Mark one of an orphan's inputs as resolved. Returns the record once
    /// no inputs remain.
    pub fn satisfy(&mut self, hash: &transaction::Hash) -> Option<TxRecord> {
        let orphan = self.txs.get_mut(hash)?;
        orphan.remaining -= 1;
        if orphan.remaining > 0 {
            return None;
        }
        self.txs.remove(hash).map(|orphan| orphan.record)
    }

    /// Drop an orphan that failed verification, along with any of its
    /// other waiting inputs.
    pub fn reject(&mut self, hash: &transaction::Hash) {
        if self.txs.remove(hash).is_none() {
            return;
        }
        for entries in self.waiting.values_mut() {
            let before = entries.len();
            entries.retain(|(waiting_hash, _)| waiting_hash != hash);
            self.total -= before - entries.len();
        }
        self.waiting.retain(|_, entries| !entries.is_empty());
    }

    /// Throw the entire table away, returning how many inputs were
    /// dropped.
    pub fn purge(&mut self) -> usize {
        let dropped = self.total;
        self.txs.clear();
        self.waiting.clear();
        self.total = 0;
        dropped
    }
}
