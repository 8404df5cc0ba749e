//! The per-wallet transaction database.
//!
//! Every write entry point follows the same protocol: `start` clones the
//! committed state into a pending copy and snapshots the coin cache, the
//! body stages KV puts and deletes while buffering events, and `commit`
//! flushes the batch atomically, swaps in the pending state, and publishes
//! the buffered events. An error anywhere in a body drops the batch and
//! leaves the wallet byte-for-byte untouched.
//!
//! Reads never see a pending batch; they observe committed state only.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use osprey_chain::block;
use osprey_chain::parameters::Network;
use osprey_chain::transaction::{self, Transaction};
use osprey_chain::transparent::{Address, Input, OutPoint, Output};
use osprey_chain::{BitcoinDeserialize, BitcoinSerialize};

use crate::coin_cache::CoinCache;
use crate::error::{Result, WalletError};
use crate::layout;
use crate::orphans::{OrphanMap, MAX_ORPHANS};
use crate::records::{
    Balance, BlockMeta, BlockRecord, Coin, Credit, Details, TxRecord, TxdbState,
};
use crate::wallet::{Path, PathResolver};
use crate::walletdb::{self, MapRecord, WalletDb};

/// Buffered events an event subscriber may lag behind by before it starts
/// missing them.
const EVENT_CAPACITY: usize = 64;

/// Behavioural switches for one wallet's transaction database.
#[derive(Clone, Copy, Debug, Default)]
pub struct TxdbOptions {
    /// Track orphaned inputs and resolve them when the funding transaction
    /// arrives (SPV mode).
    pub resolution: bool,
    /// Re-check an orphan input against the funding output before
    /// resolving it.
    pub verify: bool,
    /// The network used for address encoding.
    pub network: Network,
}

/// A notification published after a successful batch commit.
///
/// Events are buffered in program order while a batch is open and either
/// published all at once on commit or discarded with the batch.
#[derive(Clone, Debug)]
pub enum TxdbEvent {
    /// A transaction entered the wallet.
    Tx { record: TxRecord, details: Details },
    /// A tracked transaction was included in a block.
    Confirmed { record: TxRecord, details: Details },
    /// A confirmed transaction was disconnected by a reorg.
    Unconfirmed { record: TxRecord, details: Details },
    /// A transaction was erased.
    RemoveTx { record: TxRecord, details: Details },
    /// A transaction was erased because it conflicted with an incoming
    /// one.
    Conflict { record: TxRecord, details: Details },
    /// The wallet balance after a committed batch.
    Balance(Balance),
}

/// Options for a time- or height-ranged hash query. Bounds are inclusive.
#[derive(Clone, Copy, Debug)]
pub struct RangeQuery {
    pub start: u32,
    pub end: u32,
    pub limit: Option<usize>,
    pub reverse: bool,
}

impl Default for RangeQuery {
    fn default() -> Self {
        RangeQuery {
            start: 0,
            end: std::u32::MAX,
            limit: None,
            reverse: false,
        }
    }
}

struct Batch {
    ops: sled::Batch,
    pending: TxdbState,
    events: Vec<TxdbEvent>,
}

fn unix_now() -> u32 {
    chrono::Utc::now().timestamp() as u32
}

/// One wallet's transaction database.
pub struct Txdb {
    tree: sled::Tree,
    wid: u32,
    id: String,
    options: TxdbOptions,
    resolver: Arc<dyn PathResolver + Send + Sync>,
    state: TxdbState,
    tip: block::Height,
    cache: CoinCache,
    orphans: OrphanMap,
    locked: HashSet<OutPoint>,
    current: Option<Batch>,
    resolved: Vec<TxRecord>,
    events: broadcast::Sender<TxdbEvent>,
    clock: fn() -> u32,
}

impl Txdb {
    /// Open (or create) the transaction database of wallet `wid` inside
    /// the shared keyspace.
    pub fn open(
        wdb: &WalletDb,
        wid: u32,
        id: &str,
        options: TxdbOptions,
        resolver: Arc<dyn PathResolver + Send + Sync>,
    ) -> Result<Txdb> {
        let tree = wdb.tree();

        let state = match tree.get(layout::state(wid))? {
            Some(raw) => TxdbState::bitcoin_deserialize(&raw[..])?,
            None => {
                let state = TxdbState::default();
                tree.insert(layout::state(wid), state.bitcoin_serialize_to_vec()?)?;
                state
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Txdb {
            tree,
            wid,
            id: id.to_string(),
            options,
            resolver,
            state,
            tip: block::Height(0),
            cache: CoinCache::new(),
            orphans: OrphanMap::new(),
            locked: HashSet::new(),
            current: None,
            resolved: Vec::new(),
            events,
            clock: unix_now,
        })
    }

    pub fn wid(&self) -> u32 {
        self.wid
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe to committed events.
    pub fn subscribe(&self) -> broadcast::Receiver<TxdbEvent> {
        self.events.subscribe()
    }

    /// Record the chain tip height, used for confirmation counts.
    pub fn set_tip(&mut self, height: block::Height) {
        self.tip = height;
    }

    pub fn tip(&self) -> block::Height {
        self.tip
    }

    /// Override the timestamp source. The wallet stamps each transaction's
    /// first-seen time (`ps`) with this clock.
    pub fn set_clock(&mut self, clock: fn() -> u32) {
        self.clock = clock;
    }

    // ------------------------------------------------------------------
    // Batch protocol
    // ------------------------------------------------------------------

    fn start(&mut self) {
        assert!(self.current.is_none(), "one batch per wallet at a time");
        self.cache.start();
        self.current = Some(Batch {
            ops: sled::Batch::default(),
            pending: self.state,
            events: Vec::new(),
        });
    }

    fn batch(&mut self) -> &mut Batch {
        self.current.as_mut().expect("a batch is open")
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.batch().ops.insert(key, value);
    }

    fn del(&mut self, key: Vec<u8>) {
        self.batch().ops.remove(key);
    }

    fn pending_mut(&mut self) -> &mut TxdbState {
        &mut self.batch().pending
    }

    fn buffer(&mut self, event: TxdbEvent) {
        self.batch().events.push(event);
    }

    fn pending_balance(&mut self) -> Balance {
        self.batch().pending.balance()
    }

    /// Un-stage everything while keeping the batch open.
    fn clear(&mut self) {
        let state = self.state;
        self.cache.start();
        let batch = self.batch();
        batch.ops = sled::Batch::default();
        batch.pending = state;
        batch.events.clear();
    }

    fn drop_batch(&mut self) {
        self.current = None;
        self.cache.drop_pending();
    }

    fn commit(&mut self) -> Result<()> {
        let mut batch = self.current.take().expect("commit without an open batch");

        // A negative committed counter is a logic error, caught here by the
        // state serializer before anything hits disk.
        batch
            .ops
            .insert(layout::state(self.wid), batch.pending.bitcoin_serialize_to_vec()?);

        if let Err(error) = self.tree.apply_batch(batch.ops) {
            self.cache.drop_pending();
            return Err(error.into());
        }

        self.state = batch.pending;
        self.cache.commit();

        trace!(wid = self.wid, id = %self.id, "committed wallet batch");
        metrics::counter!("wallet.txdb.committed.batch.count", 1);
        metrics::gauge!("wallet.txdb.tx.count", self.state.tx as _);
        metrics::gauge!("wallet.txdb.balance.unconfirmed", self.state.unconfirmed as _);
        metrics::gauge!("wallet.txdb.balance.confirmed", self.state.confirmed as _);

        for event in batch.events.drain(..) {
            // Nobody listening is fine.
            let _ = self.events.send(event);
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    pub fn get_tx(&self, hash: &transaction::Hash) -> Result<Option<TxRecord>> {
        match self.tree.get(layout::tx(self.wid, hash))? {
            Some(raw) => Ok(Some(TxRecord::bitcoin_deserialize(&raw[..])?)),
            None => Ok(None),
        }
    }

    pub fn has_tx(&self, hash: &transaction::Hash) -> Result<bool> {
        Ok(self.tree.contains_key(layout::tx(self.wid, hash))?)
    }

    /// The credit for an outpoint, read through the coin cache.
    pub fn get_credit(
        &mut self,
        hash: &transaction::Hash,
        index: u32,
    ) -> Result<Option<Credit>> {
        let outpoint = OutPoint::new(*hash, index);

        if let Some(raw) = self.cache.get(&outpoint) {
            return Ok(Some(Credit::from_bytes(outpoint, &raw)?));
        }

        match self.tree.get(layout::credit(self.wid, hash, index))? {
            Some(raw) => {
                self.cache.set(outpoint, raw.to_vec());
                Ok(Some(Credit::from_bytes(outpoint, &raw)?))
            }
            None => Ok(None),
        }
    }

    /// The spender outpoint recorded for a spent output, if any spend has
    /// been observed.
    pub fn get_spent(
        &self,
        hash: &transaction::Hash,
        index: u32,
    ) -> Result<Option<OutPoint>> {
        match self.tree.get(layout::spent(self.wid, hash, index))? {
            Some(raw) => Ok(Some(OutPoint::bitcoin_deserialize(&raw[..])?)),
            None => Ok(None),
        }
    }

    /// Whether the spend recorded at `spender` carried one of our coins.
    pub fn has_spent_coin(&self, spender: &OutPoint) -> Result<bool> {
        Ok(self
            .tree
            .contains_key(layout::undo(self.wid, &spender.hash, spender.index))?)
    }

    /// The undo coin for a spent output, if both the spend and the coin
    /// are recorded.
    pub fn get_spent_coin(&self, hash: &transaction::Hash, index: u32) -> Result<Option<Coin>> {
        let spender = match self.get_spent(hash, index)? {
            Some(spender) => spender,
            None => return Ok(None),
        };

        let key = layout::undo(self.wid, &spender.hash, spender.index);
        match self.tree.get(key)? {
            Some(raw) => {
                let credit = Credit::from_bytes(OutPoint::new(*hash, index), &raw)?;
                Ok(Some(credit.coin))
            }
            None => Ok(None),
        }
    }

    /// The undo coins of `tx`, aligned with its inputs. Entries are `None`
    /// for inputs that never spent a wallet coin.
    pub fn get_spent_credits(&self, tx: &Transaction) -> Result<Vec<Option<Credit>>> {
        let mut credits: Vec<Option<Credit>> = vec![None; tx.inputs.len()];
        if tx.is_coinbase() {
            return Ok(credits);
        }

        let hash = tx.hash();
        for item in self.tree.scan_prefix(layout::undo_prefix(self.wid, &hash)) {
            let (key, raw) = item?;
            let (_, index) = layout::parse_outpoint_key(&key);
            let input = tx
                .inputs
                .get(index as usize)
                .expect("undo coins are keyed by an existing input");
            let prevout = input
                .outpoint()
                .expect("undo coins never belong to coinbase inputs");
            credits[index as usize] = Some(Credit::from_bytes(prevout, &raw)?);
        }

        Ok(credits)
    }

    pub fn get_block_record(&self, height: block::Height) -> Result<Option<BlockRecord>> {
        match self.tree.get(layout::block(self.wid, height.0))? {
            Some(raw) => Ok(Some(BlockRecord::bitcoin_deserialize(&raw[..])?)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Path resolution
    // ------------------------------------------------------------------

    fn output_path(&self, output: &Output) -> Option<Path> {
        let address = Address::from_output_script(&output.lock_script, self.options.network)?;
        self.resolver.path(&address)
    }

    fn coin_path(&self, coin: &Coin) -> Option<Path> {
        let address = coin.address(self.options.network)?;
        self.resolver.path(&address)
    }

    // ------------------------------------------------------------------
    // Credit plumbing
    // ------------------------------------------------------------------

    fn save_credit(&mut self, credit: &Credit, path: &Path) -> Result<()> {
        let outpoint = credit.coin.outpoint;
        let raw = credit.bitcoin_serialize_to_vec()?;

        self.put(
            layout::credit(self.wid, &outpoint.hash, outpoint.index),
            raw.clone(),
        );
        self.put(
            layout::account_credit(self.wid, path.account, &outpoint.hash, outpoint.index),
            Vec::new(),
        );
        self.cache.push(outpoint, raw);
        self.write_outpoint_map(&outpoint)
    }

    fn remove_credit(&mut self, credit: &Credit, path: &Path) -> Result<()> {
        let outpoint = credit.coin.outpoint;

        self.del(layout::credit(self.wid, &outpoint.hash, outpoint.index));
        self.del(layout::account_credit(
            self.wid,
            path.account,
            &outpoint.hash,
            outpoint.index,
        ));
        self.cache.unpush(outpoint);
        self.unwrite_outpoint_map(&outpoint)
    }

    /// Record a spend of `credit` by input `index` of `spender`: the spent
    /// marker plus the undo coin that lets a disconnect restore it.
    fn spend_credit(
        &mut self,
        credit: &Credit,
        spender: transaction::Hash,
        index: u32,
    ) -> Result<()> {
        let prevout = credit.coin.outpoint;
        let spender = OutPoint::new(spender, index);

        self.put(
            layout::spent(self.wid, &prevout.hash, prevout.index),
            spender.bitcoin_serialize_to_vec()?,
        );
        self.put(
            layout::undo(self.wid, &spender.hash, spender.index),
            credit.bitcoin_serialize_to_vec()?,
        );
        Ok(())
    }

    fn unspend_credit(
        &mut self,
        spender: transaction::Hash,
        index: u32,
        prevout: &OutPoint,
    ) -> Result<()> {
        self.del(layout::spent(self.wid, &prevout.hash, prevout.index));
        self.del(layout::undo(self.wid, &spender, index));
        Ok(())
    }

    /// Watch a prevout we don't own (yet): a bare spent marker, so a later
    /// arriving funding transaction can be matched back to its spender.
    fn write_input(
        &mut self,
        spender: transaction::Hash,
        index: u32,
        prevout: &OutPoint,
    ) -> Result<()> {
        let spender = OutPoint::new(spender, index);
        self.put(
            layout::spent(self.wid, &prevout.hash, prevout.index),
            spender.bitcoin_serialize_to_vec()?,
        );
        self.write_outpoint_map(prevout)
    }

    fn remove_input(&mut self, prevout: &OutPoint) -> Result<()> {
        self.del(layout::spent(self.wid, &prevout.hash, prevout.index));
        self.unwrite_outpoint_map(prevout)
    }

    /// Rewrite an undo coin's height after its funding transaction moved.
    fn update_spent_coin(
        &mut self,
        hash: &transaction::Hash,
        index: u32,
        height: Option<block::Height>,
    ) -> Result<()> {
        let prevout = OutPoint::new(*hash, index);
        let spender = match self.get_spent(hash, index)? {
            Some(spender) => spender,
            None => return Ok(()),
        };

        let key = layout::undo(self.wid, &spender.hash, spender.index);
        let raw = match self.tree.get(&key)? {
            Some(raw) => raw,
            None => return Ok(()),
        };

        let mut credit = Credit::from_bytes(prevout, &raw)?;
        credit.coin.height = height;
        self.put(key, credit.bitcoin_serialize_to_vec()?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Directory maps and block records
    // ------------------------------------------------------------------

    fn write_outpoint_map(&mut self, outpoint: &OutPoint) -> Result<()> {
        let key = walletdb::outpoint_map_key(outpoint);
        let mut map = match self.tree.get(&key)? {
            Some(raw) => MapRecord::bitcoin_deserialize(&raw[..])?,
            None => MapRecord::default(),
        };

        if map.add(self.wid) {
            self.put(key, map.bitcoin_serialize_to_vec()?);
        }
        Ok(())
    }

    fn unwrite_outpoint_map(&mut self, outpoint: &OutPoint) -> Result<()> {
        let key = walletdb::outpoint_map_key(outpoint);
        let mut map = match self.tree.get(&key)? {
            Some(raw) => MapRecord::bitcoin_deserialize(&raw[..])?,
            None => return Ok(()),
        };

        if !map.remove(self.wid) {
            return Ok(());
        }
        if map.is_empty() {
            self.del(key);
        } else {
            self.put(key, map.bitcoin_serialize_to_vec()?);
        }
        Ok(())
    }

    fn write_block_map(&mut self, height: u32) -> Result<()> {
        let key = walletdb::block_map_key(height);
        let mut map = match self.tree.get(&key)? {
            Some(raw) => MapRecord::bitcoin_deserialize(&raw[..])?,
            None => MapRecord::default(),
        };

        if map.add(self.wid) {
            self.put(key, map.bitcoin_serialize_to_vec()?);
        }
        Ok(())
    }

    fn unwrite_block_map(&mut self, height: u32) -> Result<()> {
        let key = walletdb::block_map_key(height);
        let mut map = match self.tree.get(&key)? {
            Some(raw) => MapRecord::bitcoin_deserialize(&raw[..])?,
            None => return Ok(()),
        };

        if !map.remove(self.wid) {
            return Ok(());
        }
        if map.is_empty() {
            self.del(key);
        } else {
            self.put(key, map.bitcoin_serialize_to_vec()?);
        }
        Ok(())
    }

    fn add_block(&mut self, hash: transaction::Hash, meta: &BlockMeta) -> Result<()> {
        let key = layout::block(self.wid, meta.height.0);
        let mut record = match self.tree.get(&key)? {
            Some(raw) => BlockRecord::bitcoin_deserialize(&raw[..])?,
            None => BlockRecord::new(meta),
        };

        if record.add(hash) {
            self.put(key, record.bitcoin_serialize_to_vec()?);
        }
        self.write_block_map(meta.height.0)
    }

    fn remove_block(&mut self, hash: &transaction::Hash, height: block::Height) -> Result<()> {
        let key = layout::block(self.wid, height.0);
        let mut record = match self.tree.get(&key)? {
            Some(raw) => BlockRecord::bitcoin_deserialize(&raw[..])?,
            None => return Ok(()),
        };

        if !record.remove(hash) {
            return Ok(());
        }
        if record.is_empty() {
            self.del(key);
            self.unwrite_block_map(height.0)?;
        } else {
            self.put(key, record.bitcoin_serialize_to_vec()?);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Write pipeline
    // ------------------------------------------------------------------

    /// Ingest a transaction, mempool (`block == None`) or confirmed.
    ///
    /// Returns the transaction's details when it touched the wallet, or
    /// `None` when it was ignored (foreign, replace-by-fee tainted, beaten
    /// by a confirmed conflict, or stashed as an orphan).
    pub fn add(&mut self, tx: &Transaction, block: Option<&BlockMeta>) -> Result<Option<Details>> {
        let hash = tx.hash();

        if let Some(existing) = self.get_tx(&hash)? {
            if existing.block.is_some() {
                // Already confirmed; nothing to do.
                return Ok(None);
            }
            let meta = match block {
                // Already pending; nothing to do.
                None => return Ok(None),
                Some(meta) => meta,
            };
            // Promote the pending transaction.
            return self.confirm_record(existing, meta).map(Some);
        }

        let record = TxRecord::from_tx(tx.clone(), block.copied(), (self.clock)());

        if self.options.resolution && block.is_none() && !tx.is_coinbase() {
            let missing = self.find_orphan_inputs(tx)?;
            if !missing.is_empty() {
                self.stash_orphan(record, missing);
                return Ok(None);
            }
        }

        self.start();
        let outcome = match self.add_body(&record, block) {
            Ok(details) => self.commit().map(|()| details),
            Err(error) => {
                self.drop_batch();
                Err(error)
            }
        };
        let result = match outcome {
            Ok(details) => details,
            Err(error) => {
                // Orphans settled by this body are gone from the table
                // either way; don't replay them after a failure.
                self.resolved.clear();
                return Err(error);
            }
        };

        // Re-add any orphans this transaction resolved, outside the
        // committed batch.
        while let Some(resolved) = self.resolved.pop() {
            debug!(hash = %resolved.hash, "re-adding resolved orphan");
            self.add(&resolved.tx, resolved.block.as_ref())?;
        }

        Ok(result)
    }

    fn add_body(
        &mut self,
        record: &TxRecord,
        block: Option<&BlockMeta>,
    ) -> Result<Option<Details>> {
        let tx = &record.tx;
        let hash = record.hash;

        if block.is_none() {
            if self.is_rbf(tx)? {
                // Index the hash so the taint propagates to descendants,
                // but ignore the transaction itself.
                self.put(layout::rbf(self.wid, &hash), Vec::new());
                warn!(hash = %hash, "ignoring replace-by-fee transaction");
                return Ok(None);
            }

            if !self.remove_conflicts(tx, true)? {
                // A confirmed double-spend wins outright.
                debug!(hash = %hash, "rejecting double spend of confirmed output");
                return Ok(None);
            }
        } else {
            self.remove_conflicts(tx, false)?;
            self.del(layout::rbf(self.wid, &hash));
        }

        self.insert(record)
    }

    /// Index a transaction. The caller has already resolved conflicts.
    fn insert(&mut self, record: &TxRecord) -> Result<Option<Details>> {
        let tx = record.tx.clone();
        let hash = record.hash;
        let height = record.height();
        let mut details = Details::new(record, self.options.network);
        let mut own = false;

        if !tx.is_coinbase() {
            for (i, input) in tx.inputs.iter().enumerate() {
                let prevout = match input.outpoint() {
                    Some(prevout) => prevout,
                    None => continue,
                };

                let mut credit = match self.get_credit(&prevout.hash, prevout.index)? {
                    Some(credit) => credit,
                    None => {
                        // Not our coin (or not known yet): watch the
                        // prevout so a later funding tx can resolve it.
                        self.write_input(hash, i as u32, &prevout)?;
                        continue;
                    }
                };

                let path = self
                    .coin_path(&credit.coin)
                    .expect("wallet credits always resolve to a path");
                details.set_input(i, Some(path.clone()), &credit.coin);

                self.spend_credit(&credit, hash, i as u32)?;

                let value = i64::from(credit.coin.value);
                self.pending_mut().add_coin(-1);
                self.pending_mut().add_unconfirmed(-value);

                if height.is_none() {
                    // A mempool spend must not alter the utxo state
                    // permanently: keep the credit, flagged.
                    credit.spent = true;
                    self.save_credit(&credit, &path)?;
                } else {
                    self.pending_mut().add_confirmed(-value);
                    self.remove_credit(&credit, &path)?;
                }

                own = true;
            }
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            let path = match self.output_path(output) {
                Some(path) => path,
                None => continue,
            };

            details.set_output(i, Some(path.clone()), output);

            // This output may already have a recorded spender.
            if self.resolve_input(hash, i as u32, height, output, &path)? {
                own = true;
                continue;
            }

            let credit = Credit::from_output(hash, i as u32, output, height, tx.is_coinbase());
            let value = i64::from(output.value);

            self.pending_mut().add_coin(1);
            self.pending_mut().add_unconfirmed(value);
            if height.is_some() {
                self.pending_mut().add_confirmed(value);
            }

            self.save_credit(&credit, &path)?;
            own = true;
        }

        if !own {
            // Not our transaction; un-stage the spent marker writes.
            self.clear();
            return Ok(None);
        }

        self.put(layout::tx(self.wid, &hash), record.bitcoin_serialize_to_vec()?);
        self.put(layout::by_time(self.wid, record.ps, &hash), Vec::new());

        match &record.block {
            None => self.put(layout::pending(self.wid, &hash), Vec::new()),
            Some(meta) => self.put(
                layout::by_height(self.wid, meta.height.0, &hash),
                Vec::new(),
            ),
        }

        for account in details.accounts() {
            self.put(layout::account_tx(self.wid, account, &hash), Vec::new());
            self.put(
                layout::account_time(self.wid, account, record.ps, &hash),
                Vec::new(),
            );
            match &record.block {
                None => self.put(layout::account_pending(self.wid, account, &hash), Vec::new()),
                Some(meta) => self.put(
                    layout::account_height(self.wid, account, meta.height.0, &hash),
                    Vec::new(),
                ),
            }
        }

        if let Some(meta) = &record.block {
            self.add_block(hash, meta)?;
        }

        self.pending_mut().add_tx(1);

        // Spending an outpoint releases any user lock on it.
        self.unlock_tx(&tx);

        if self.options.resolution {
            for (i, output) in tx.outputs.iter().enumerate() {
                self.collect_resolutions(OutPoint::new(hash, i as u32), output);
            }
        }

        trace!(hash = %hash, height = record.height_i32(), "indexed transaction");

        let balance = self.pending_balance();
        self.buffer(TxdbEvent::Tx {
            record: record.clone(),
            details: details.clone(),
        });
        self.buffer(TxdbEvent::Balance(balance));

        Ok(Some(details))
    }

    /// Re-attach an undo coin for an output that turns out to have a
    /// recorded spender.
    ///
    /// Returns true if a bare spent marker pointed at `(hash, index)`, in
    /// which case the credit bookkeeping has been done here.
    fn resolve_input(
        &mut self,
        hash: transaction::Hash,
        index: u32,
        height: Option<block::Height>,
        output: &Output,
        path: &Path,
    ) -> Result<bool> {
        let spender = match self.get_spent(&hash, index)? {
            Some(spender) => spender,
            None => return Ok(false),
        };

        // An undo coin means we already knew about this input.
        if self.has_spent_coin(&spender)? {
            return Ok(false);
        }

        let spender_record = self
            .get_tx(&spender.hash)?
            .expect("spent markers point at indexed transactions");

        let mut credit = Credit::from_output(hash, index, output, height, false);
        self.spend_credit(&credit, spender.hash, spender.index)?;

        if spender_record.block.is_none() {
            // The spender is in the mempool: materialize the coin as
            // mempool-spent.
            credit.spent = true;
            self.save_credit(&credit, path)?;

            if height.is_some() {
                self.pending_mut().add_confirmed(i64::from(output.value));
            }
        }

        Ok(true)
    }

    /// Mark a pending transaction as confirmed in `block`.
    pub fn confirm(&mut self, hash: &transaction::Hash, block: &BlockMeta) -> Result<Details> {
        let record = self
            .get_tx(hash)?
            .ok_or(WalletError::UnknownTransaction(*hash))?;
        if record.block.is_some() {
            return Err(WalletError::AlreadyConfirmed(*hash));
        }
        self.confirm_record(record, block)
    }

    fn confirm_record(&mut self, record: TxRecord, block: &BlockMeta) -> Result<Details> {
        self.start();
        match self.confirm_body(record, block) {
            Ok(details) => {
                self.commit()?;
                Ok(details)
            }
            Err(error) => {
                self.drop_batch();
                Err(error)
            }
        }
    }

    fn confirm_body(&mut self, mut record: TxRecord, meta: &BlockMeta) -> Result<Details> {
        record.set_block(*meta);

        let tx = record.tx.clone();
        let hash = record.hash;
        let height = meta.height;
        let mut details = Details::new(&record, self.options.network);

        if !tx.is_coinbase() {
            let credits = self.get_spent_credits(&tx)?;

            for (i, input) in tx.inputs.iter().enumerate() {
                let prevout = match input.outpoint() {
                    Some(prevout) => prevout,
                    None => continue,
                };

                let credit = match credits[i].clone() {
                    Some(credit) => credit,
                    None => {
                        // A credit that appeared after we first saw this
                        // transaction. Spend it now; it was never counted,
                        // so only the unconfirmed side needs adjusting.
                        match self.get_credit(&prevout.hash, prevout.index)? {
                            None => continue,
                            Some(credit) => {
                                self.spend_credit(&credit, hash, i as u32)?;
                                self.pending_mut().add_coin(-1);
                                self.pending_mut()
                                    .add_unconfirmed(-i64::from(credit.coin.value));
                                credit
                            }
                        }
                    }
                };

                let path = self
                    .coin_path(&credit.coin)
                    .expect("wallet credits always resolve to a path");
                details.set_input(i, Some(path.clone()), &credit.coin);

                // The spend is now on-chain; the credit can go entirely.
                self.pending_mut().add_confirmed(-i64::from(credit.coin.value));
                self.remove_credit(&credit, &path)?;
            }
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            let path = match self.output_path(output) {
                Some(path) => path,
                None => continue,
            };

            details.set_output(i, Some(path.clone()), output);

            let mut credit = match self.get_credit(&hash, i as u32)? {
                Some(credit) => credit,
                // Spent and swept by an already-confirmed spender.
                None => continue,
            };

            if credit.spent {
                self.update_spent_coin(&hash, i as u32, Some(height))?;
            }

            credit.coin.height = Some(height);
            self.pending_mut().add_confirmed(i64::from(output.value));
            self.save_credit(&credit, &path)?;
        }

        self.del(layout::rbf(self.wid, &hash));
        self.put(layout::tx(self.wid, &hash), record.bitcoin_serialize_to_vec()?);
        self.del(layout::pending(self.wid, &hash));
        self.put(layout::by_height(self.wid, height.0, &hash), Vec::new());

        for account in details.accounts() {
            self.del(layout::account_pending(self.wid, account, &hash));
            self.put(
                layout::account_height(self.wid, account, height.0, &hash),
                Vec::new(),
            );
        }

        self.add_block(hash, meta)?;

        trace!(hash = %hash, height = height.0, "confirmed transaction");

        let balance = self.pending_balance();
        self.buffer(TxdbEvent::Confirmed {
            record,
            details: details.clone(),
        });
        self.buffer(TxdbEvent::Balance(balance));

        Ok(details)
    }

    /// Disconnect a confirmed transaction after a reorg. The inverse of
    /// [`confirm`](Txdb::confirm).
    pub fn disconnect(&mut self, hash: &transaction::Hash) -> Result<Details> {
        let record = self
            .get_tx(hash)?
            .ok_or(WalletError::UnknownTransaction(*hash))?;
        if record.block.is_none() {
            return Err(WalletError::NotConfirmed(*hash));
        }

        self.start();
        match self.disconnect_body(record) {
            Ok(details) => {
                self.commit()?;
                Ok(details)
            }
            Err(error) => {
                self.drop_batch();
                Err(error)
            }
        }
    }

    fn disconnect_body(&mut self, mut record: TxRecord) -> Result<Details> {
        let meta = record
            .block
            .take()
            .expect("disconnect requires a confirmed record");
        let tx = record.tx.clone();
        let hash = record.hash;
        let height = meta.height;
        let mut details = Details::new(&record, self.options.network);

        if !tx.is_coinbase() {
            let credits = self.get_spent_credits(&tx)?;

            for (i, credit) in credits.into_iter().enumerate() {
                let mut credit = match credit {
                    Some(credit) => credit,
                    None => continue,
                };

                let path = self
                    .coin_path(&credit.coin)
                    .expect("wallet credits always resolve to a path");
                details.set_input(i, Some(path.clone()), &credit.coin);

                // The spend fell back into the mempool: the coin exists
                // again on-chain, but is still mempool-spent by this
                // transaction.
                self.pending_mut().add_confirmed(i64::from(credit.coin.value));
                credit.spent = true;
                self.save_credit(&credit, &path)?;
            }
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            let path = match self.output_path(output) {
                Some(path) => path,
                None => continue,
            };

            let mut credit = match self.get_credit(&hash, i as u32)? {
                Some(credit) => credit,
                None => {
                    // The credit is gone but an undo coin may survive;
                    // keep its height in sync.
                    self.update_spent_coin(&hash, i as u32, None)?;
                    continue;
                }
            };

            if credit.spent {
                self.update_spent_coin(&hash, i as u32, None)?;
            }

            details.set_output(i, Some(path.clone()), output);

            credit.coin.height = None;
            self.pending_mut().add_confirmed(-i64::from(output.value));
            self.save_credit(&credit, &path)?;
        }

        self.remove_block(&hash, height)?;

        self.put(layout::tx(self.wid, &hash), record.bitcoin_serialize_to_vec()?);
        self.put(layout::pending(self.wid, &hash), Vec::new());
        self.del(layout::by_height(self.wid, height.0, &hash));

        for account in details.accounts() {
            self.put(layout::account_pending(self.wid, account, &hash), Vec::new());
            self.del(layout::account_height(self.wid, account, height.0, &hash));
        }

        trace!(hash = %hash, height = height.0, "disconnected transaction");

        let balance = self.pending_balance();
        self.buffer(TxdbEvent::Unconfirmed {
            record,
            details: details.clone(),
        });
        self.buffer(TxdbEvent::Balance(balance));

        Ok(details)
    }

    /// Erase every trace of a transaction, spenders first.
    ///
    /// Returns `None` if the transaction is not indexed.
    pub fn remove(&mut self, hash: &transaction::Hash) -> Result<Option<Details>> {
        match self.get_tx(hash)? {
            Some(record) => self.remove_recursive(record).map(Some),
            None => Ok(None),
        }
    }

    /// Abandon a pending transaction.
    pub fn abandon(&mut self, hash: &transaction::Hash) -> Result<Details> {
        if !self.tree.contains_key(layout::pending(self.wid, hash))? {
            return Err(WalletError::NotPending(*hash));
        }
        Ok(self
            .remove(hash)?
            .expect("pending transactions are indexed"))
    }

    /// Remove every unconfirmed transaction first seen more than `age`
    /// seconds ago, returning the removed hashes.
    pub fn zap(&mut self, account: Option<u32>, age: u32) -> Result<Vec<transaction::Hash>> {
        let end = ((self.clock)()).saturating_sub(age);
        let query = RangeQuery {
            start: 0,
            end,
            limit: None,
            reverse: false,
        };

        let hashes = match account {
            Some(account) => self.get_account_range_hashes(account, &query)?,
            None => self.get_range_hashes(&query)?,
        };

        let mut zapped = Vec::new();
        for hash in hashes {
            let record = match self.get_tx(&hash)? {
                Some(record) => record,
                None => continue,
            };
            if record.block.is_some() {
                continue;
            }

            debug!(hash = %hash, "zapping stale pending transaction");
            self.remove_recursive(record)?;
            zapped.push(hash);
        }

        Ok(zapped)
    }

    fn remove_recursive(&mut self, record: TxRecord) -> Result<Details> {
        let hash = record.hash;

        // Erase spenders before spendees so balances unwind cleanly.
        for index in 0..record.tx.outputs.len() {
            let spender = match self.get_spent(&hash, index as u32)? {
                Some(spender) => spender,
                None => continue,
            };
            let spender_record = self
                .get_tx(&spender.hash)?
                .expect("spent markers point at indexed transactions");
            self.remove_recursive(spender_record)?;
        }

        self.start();
        match self.erase(&record) {
            Ok(details) => {
                self.commit()?;
                Ok(details)
            }
            Err(error) => {
                self.drop_batch();
                Err(error)
            }
        }
    }

    fn erase(&mut self, record: &TxRecord) -> Result<Details> {
        let tx = record.tx.clone();
        let hash = record.hash;
        let confirmed = record.block.is_some();
        let mut details = Details::new(record, self.options.network);

        if !tx.is_coinbase() {
            let credits = self.get_spent_credits(&tx)?;

            for (i, input) in tx.inputs.iter().enumerate() {
                let prevout = match input.outpoint() {
                    Some(prevout) => prevout,
                    None => continue,
                };

                let mut credit = match credits[i].clone() {
                    Some(credit) => credit,
                    None => {
                        // Just a watched prevout.
                        self.remove_input(&prevout)?;
                        continue;
                    }
                };

                let path = self
                    .coin_path(&credit.coin)
                    .expect("wallet credits always resolve to a path");
                details.set_input(i, Some(path.clone()), &credit.coin);

                let value = i64::from(credit.coin.value);
                self.pending_mut().add_coin(1);
                self.pending_mut().add_unconfirmed(value);
                if confirmed {
                    self.pending_mut().add_confirmed(value);
                }

                self.unspend_credit(hash, i as u32, &prevout)?;
                credit.spent = false;
                self.save_credit(&credit, &path)?;
            }
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            let path = match self.output_path(output) {
                Some(path) => path,
                None => continue,
            };

            details.set_output(i, Some(path.clone()), output);

            let credit = match self.get_credit(&hash, i as u32)? {
                Some(credit) => credit,
                // Never materialized (known spent at resolution time).
                None => continue,
            };

            let value = i64::from(output.value);
            self.pending_mut().add_coin(-1);
            self.pending_mut().add_unconfirmed(-value);
            if confirmed {
                self.pending_mut().add_confirmed(-value);
            }

            self.remove_credit(&credit, &path)?;
        }

        if let Some(meta) = &record.block {
            self.remove_block(&hash, meta.height)?;
        }

        self.del(layout::rbf(self.wid, &hash));
        self.del(layout::tx(self.wid, &hash));
        self.del(layout::by_time(self.wid, record.ps, &hash));

        match &record.block {
            None => self.del(layout::pending(self.wid, &hash)),
            Some(meta) => self.del(layout::by_height(self.wid, meta.height.0, &hash)),
        }

        for account in details.accounts() {
            self.del(layout::account_tx(self.wid, account, &hash));
            self.del(layout::account_time(self.wid, account, record.ps, &hash));
            match &record.block {
                None => self.del(layout::account_pending(self.wid, account, &hash)),
                Some(meta) => self.del(layout::account_height(
                    self.wid,
                    account,
                    meta.height.0,
                    &hash,
                )),
            }
        }

        self.pending_mut().add_tx(-1);

        trace!(hash = %hash, "erased transaction");

        let balance = self.pending_balance();
        self.buffer(TxdbEvent::RemoveTx {
            record: record.clone(),
            details: details.clone(),
        });
        self.buffer(TxdbEvent::Balance(balance));

        Ok(details)
    }

    /// Remove transactions double-spending any of `tx`'s inputs.
    ///
    /// With `unconfirmed_only`, a confirmed double-spender aborts instead:
    /// the chain has already decided, and the incoming transaction loses.
    /// Returns false on abort.
    fn remove_conflicts(&mut self, tx: &Transaction, unconfirmed_only: bool) -> Result<bool> {
        if tx.is_coinbase() {
            return Ok(true);
        }

        let hash = tx.hash();
        let mut spenders = Vec::new();

        // Gather all conflicting spenders before touching anything.
        for input in &tx.inputs {
            let prevout = match input.outpoint() {
                Some(prevout) => prevout,
                None => continue,
            };

            let spender = match self.get_spent(&prevout.hash, prevout.index)? {
                Some(spender) => spender,
                None => continue,
            };

            // Our own spend is not a conflict.
            if spender.hash == hash {
                continue;
            }

            let spender_record = self
                .get_tx(&spender.hash)?
                .expect("spent markers point at indexed transactions");

            if unconfirmed_only && spender_record.block.is_some() {
                return Ok(false);
            }

            spenders.push(spender_record);
        }

        for spender in spenders {
            self.remove_conflict(spender)?;
        }

        Ok(true)
    }

    /// Erase one conflicting spender (and everything that spends it).
    ///
    /// `remove_recursive` manages its own batches to bound memory, so the
    /// caller's batch is rotated around it: dropped here, restarted after.
    /// This is the only place a batch is rotated mid-operation.
    fn remove_conflict(&mut self, record: TxRecord) -> Result<Details> {
        warn!(hash = %record.hash, "removing conflicting transaction");

        self.drop_batch();
        let details = self.remove_recursive(record.clone())?;
        self.start();

        self.buffer(TxdbEvent::Conflict {
            record,
            details: details.clone(),
        });

        Ok(details)
    }

    /// Whether `tx` is replace-by-fee: it signals RBF itself, or spends
    /// any output of a transaction tainted under the `r` prefix.
    fn is_rbf(&self, tx: &Transaction) -> Result<bool> {
        if tx.signals_replace_by_fee() {
            return Ok(true);
        }

        for input in &tx.inputs {
            let prevout = match input.outpoint() {
                Some(prevout) => prevout,
                None => continue,
            };
            if self
                .tree
                .contains_key(layout::rbf(self.wid, &prevout.hash))?
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    // ------------------------------------------------------------------
    // Orphan handling (SPV)
    // ------------------------------------------------------------------

    /// Inputs of `tx` whose prevout is unknown but whose unlock script
    /// reveals one of our addresses.
    fn find_orphan_inputs(&mut self, tx: &Transaction) -> Result<Vec<(OutPoint, u32)>> {
        let mut missing = Vec::new();

        for (i, input) in tx.inputs.iter().enumerate() {
            let (prevout, unlock_script) = match input {
                Input::PrevOut {
                    outpoint,
                    unlock_script,
                    ..
                } => (*outpoint, unlock_script),
                Input::Coinbase { .. } => continue,
            };

            if self.get_credit(&prevout.hash, prevout.index)?.is_some() {
                continue;
            }
            if self.has_tx(&prevout.hash)? {
                // The funding tx is known and the output is not ours.
                continue;
            }

            let address = match Address::from_input_script(unlock_script, self.options.network) {
                Some(address) => address,
                None => continue,
            };
            if self.resolver.has(&address) {
                missing.push((prevout, i as u32));
            }
        }

        Ok(missing)
    }

    fn stash_orphan(&mut self, record: TxRecord, missing: Vec<(OutPoint, u32)>) {
        let hash = record.hash;
        debug!(hash = %hash, inputs = missing.len(), "stashing orphan transaction");

        if !self.orphans.insert(record, missing) {
            let dropped = self.orphans.purge();
            warn!(
                dropped,
                limit = MAX_ORPHANS,
                "orphan table overflowed, purging"
            );
        }
    }

    /// Settle orphan inputs waiting on a freshly indexed output. Fully
    /// resolved records queue up for re-adding after the commit.
    fn collect_resolutions(&mut self, outpoint: OutPoint, output: &Output) {
        for (orphan_hash, input_index) in self.orphans.take_waiting(&outpoint) {
            let verified = match self.orphans.record(&orphan_hash) {
                None => continue,
                Some(record) => {
                    let input = &record.tx.inputs[input_index as usize];
                    assert_eq!(
                        input.outpoint(),
                        Some(outpoint),
                        "orphan entries are keyed by their own prevout"
                    );
                    !self.options.verify || self.verify_orphan_input(input, output)
                }
            };

            if verified {
                if let Some(resolved) = self.orphans.satisfy(&orphan_hash) {
                    self.resolved.push(resolved);
                }
            } else {
                warn!(hash = %orphan_hash, "orphan failed verification, dropping");
                self.orphans.reject(&orphan_hash);
            }
        }
    }

    /// Structural stand-in for script verification: the address the input
    /// claims to spend from must be the address the output pays to.
    fn verify_orphan_input(&self, input: &Input, output: &Output) -> bool {
        let input_address = match input {
            Input::PrevOut { unlock_script, .. } => {
                Address::from_input_script(unlock_script, self.options.network)
            }
            Input::Coinbase { .. } => None,
        };
        let output_address = Address::from_output_script(&output.lock_script, self.options.network);

        match (input_address, output_address) {
            (Some(input_address), Some(output_address)) => input_address == output_address,
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Locked outpoints
    // ------------------------------------------------------------------

    /// Freeze an outpoint against coin selection. Locks are in-memory
    /// only; a restart clears them.
    pub fn lock_coin(&mut self, outpoint: OutPoint) -> bool {
        self.locked.insert(outpoint)
    }

    pub fn unlock_coin(&mut self, outpoint: &OutPoint) -> bool {
        self.locked.remove(outpoint)
    }

    pub fn is_locked(&self, outpoint: &OutPoint) -> bool {
        self.locked.contains(outpoint)
    }

    /// Lock every outpoint `tx` spends.
    pub fn lock_tx(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            if let Some(prevout) = input.outpoint() {
                self.lock_coin(prevout);
            }
        }
    }

    /// Release every outpoint `tx` spends.
    pub fn unlock_tx(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            if let Some(prevout) = input.outpoint() {
                self.unlock_coin(&prevout);
            }
        }
    }

    /// Strip locked coins from a candidate list.
    pub fn filter_locked(&self, coins: Vec<Coin>) -> Vec<Coin> {
        coins
            .into_iter()
            .filter(|coin| !self.is_locked(&coin.outpoint))
            .collect()
    }

    pub fn locked_outpoints(&self) -> Vec<OutPoint> {
        self.locked.iter().copied().collect()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn scan_hashes(&self, prefix: Vec<u8>) -> Result<Vec<transaction::Hash>> {
        let mut hashes = Vec::new();
        for item in self.tree.scan_prefix(prefix) {
            let (key, _) = item?;
            hashes.push(layout::parse_hash_key(&key));
        }
        Ok(hashes)
    }

    fn scan_account_hashes(&self, prefix: Vec<u8>) -> Result<Vec<transaction::Hash>> {
        let mut hashes = Vec::new();
        for item in self.tree.scan_prefix(prefix) {
            let (key, _) = item?;
            let (_, hash) = layout::parse_account_hash_key(&key);
            hashes.push(hash);
        }
        Ok(hashes)
    }

    fn ranged_hashes(
        &self,
        prefix: Vec<u8>,
        query: &RangeQuery,
        parse: fn(&[u8]) -> transaction::Hash,
    ) -> Result<Vec<transaction::Hash>> {
        let mut lower = prefix.clone();
        lower.extend_from_slice(&query.start.to_be_bytes());

        let upper = if query.end == std::u32::MAX {
            layout::prefix_successor(&prefix)
        } else {
            let mut upper = prefix;
            upper.extend_from_slice(&(query.end + 1).to_be_bytes());
            upper
        };

        let iter = if upper.is_empty() {
            self.tree.range(lower..)
        } else {
            self.tree.range(lower..upper)
        };

        let limit = query.limit.unwrap_or(std::usize::MAX);
        let mut hashes = Vec::new();

        if query.reverse {
            for item in iter.rev() {
                let (key, _) = item?;
                hashes.push(parse(&key));
                if hashes.len() >= limit {
                    break;
                }
            }
        } else {
            for item in iter {
                let (key, _) = item?;
                hashes.push(parse(&key));
                if hashes.len() >= limit {
                    break;
                }
            }
        }

        Ok(hashes)
    }

    /// Every transaction hash in the wallet, in hash order.
    pub fn get_history_hashes(&self) -> Result<Vec<transaction::Hash>> {
        self.scan_hashes(layout::table_prefix(self.wid, b't'))
    }

    pub fn get_account_history_hashes(&self, account: u32) -> Result<Vec<transaction::Hash>> {
        self.scan_account_hashes(layout::account_prefix(self.wid, b'T', account))
    }

    /// Every unconfirmed transaction hash.
    pub fn get_pending_hashes(&self) -> Result<Vec<transaction::Hash>> {
        self.scan_hashes(layout::table_prefix(self.wid, b'p'))
    }

    pub fn get_account_pending_hashes(&self, account: u32) -> Result<Vec<transaction::Hash>> {
        self.scan_account_hashes(layout::account_prefix(self.wid, b'P', account))
    }

    /// Transaction hashes first seen inside a time range.
    pub fn get_range_hashes(&self, query: &RangeQuery) -> Result<Vec<transaction::Hash>> {
        self.ranged_hashes(layout::table_prefix(self.wid, b'm'), query, |key| {
            layout::parse_ordered_key(key).1
        })
    }

    pub fn get_account_range_hashes(
        &self,
        account: u32,
        query: &RangeQuery,
    ) -> Result<Vec<transaction::Hash>> {
        self.ranged_hashes(
            layout::account_prefix(self.wid, b'M', account),
            query,
            |key| layout::parse_account_ordered_key(key).2,
        )
    }

    /// Confirmed transaction hashes inside a height range.
    pub fn get_height_range_hashes(&self, query: &RangeQuery) -> Result<Vec<transaction::Hash>> {
        self.ranged_hashes(layout::table_prefix(self.wid, b'h'), query, |key| {
            layout::parse_ordered_key(key).1
        })
    }

    pub fn get_account_height_range_hashes(
        &self,
        account: u32,
        query: &RangeQuery,
    ) -> Result<Vec<transaction::Hash>> {
        self.ranged_hashes(
            layout::account_prefix(self.wid, b'H', account),
            query,
            |key| layout::parse_account_ordered_key(key).2,
        )
    }

    /// Every transaction record in the wallet.
    pub fn get_history(&self) -> Result<Vec<TxRecord>> {
        let mut records = Vec::new();
        for hash in self.get_history_hashes()? {
            records.push(
                self.get_tx(&hash)?
                    .expect("history hashes point at indexed transactions"),
            );
        }
        Ok(records)
    }

    /// Every unconfirmed transaction record.
    pub fn get_pending(&self) -> Result<Vec<TxRecord>> {
        let mut records = Vec::new();
        for hash in self.get_pending_hashes()? {
            records.push(
                self.get_tx(&hash)?
                    .expect("pending hashes point at indexed transactions"),
            );
        }
        Ok(records)
    }

    /// Every credited outpoint.
    pub fn get_outpoints(&self) -> Result<Vec<OutPoint>> {
        let mut outpoints = Vec::new();
        for item in self.tree.scan_prefix(layout::table_prefix(self.wid, b'c')) {
            let (key, _) = item?;
            let (hash, index) = layout::parse_outpoint_key(&key);
            outpoints.push(OutPoint::new(hash, index));
        }
        Ok(outpoints)
    }

    pub fn get_account_outpoints(&self, account: u32) -> Result<Vec<OutPoint>> {
        let mut outpoints = Vec::new();
        for item in self
            .tree
            .scan_prefix(layout::account_prefix(self.wid, b'C', account))
        {
            let (key, _) = item?;
            let (_, hash, index) = layout::parse_account_outpoint_key(&key);
            outpoints.push(OutPoint::new(hash, index));
        }
        Ok(outpoints)
    }

    /// Every credit, populating the coin cache along the way.
    pub fn get_credits(&mut self) -> Result<Vec<Credit>> {
        let mut credits = Vec::new();
        for item in self.tree.scan_prefix(layout::table_prefix(self.wid, b'c')) {
            let (key, raw) = item?;
            let (hash, index) = layout::parse_outpoint_key(&key);
            let outpoint = OutPoint::new(hash, index);
            self.cache.set(outpoint, raw.to_vec());
            credits.push(Credit::from_bytes(outpoint, &raw)?);
        }
        Ok(credits)
    }

    pub fn get_account_credits(&mut self, account: u32) -> Result<Vec<Credit>> {
        let mut credits = Vec::new();
        for outpoint in self.get_account_outpoints(account)? {
            let credit = self
                .get_credit(&outpoint.hash, outpoint.index)?
                .expect("account credit keys mirror the credit table");
            credits.push(credit);
        }
        Ok(credits)
    }

    /// Spendable coins: credits that no mempool transaction spends.
    pub fn get_coins(&mut self) -> Result<Vec<Coin>> {
        Ok(self
            .get_credits()?
            .into_iter()
            .filter(|credit| !credit.spent)
            .map(|credit| credit.coin)
            .collect())
    }

    pub fn get_account_coins(&mut self, account: u32) -> Result<Vec<Coin>> {
        Ok(self
            .get_account_credits(account)?
            .into_iter()
            .filter(|credit| !credit.spent)
            .map(|credit| credit.coin)
            .collect())
    }

    /// The committed counters.
    pub fn get_state(&self) -> &TxdbState {
        &self.state
    }

    /// The wallet-wide balance, straight from the committed state.
    pub fn get_balance(&self) -> Balance {
        self.state.balance()
    }

    /// One account's balance, computed from its credits.
    pub fn get_account_balance(&mut self, account: u32) -> Result<Balance> {
        let mut balance = Balance {
            account: Some(account),
            tx: self.get_account_history_hashes(account)?.len() as i64,
            coin: 0,
            unconfirmed: 0,
            confirmed: 0,
        };

        for credit in self.get_account_credits(account)? {
            let value = i64::from(credit.coin.value);
            if !credit.spent {
                balance.coin += 1;
                balance.unconfirmed += value;
            }
            if credit.coin.height.is_some() {
                balance.confirmed += value;
            }
        }

        Ok(balance)
    }

    /// The coins `tx` spent, from undo coins, aligned with its inputs.
    pub fn fill_history(&self, tx: &Transaction) -> Result<Vec<Option<Coin>>> {
        Ok(self
            .get_spent_credits(tx)?
            .into_iter()
            .map(|credit| credit.map(|credit| credit.coin))
            .collect())
    }

    /// The wallet coins `tx` would spend, from the live credit table,
    /// aligned with its inputs.
    pub fn fill_coins(&mut self, tx: &Transaction) -> Result<Vec<Option<Coin>>> {
        let mut coins = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let coin = match input.outpoint() {
                Some(prevout) => self
                    .get_credit(&prevout.hash, prevout.index)?
                    .map(|credit| credit.coin),
                None => None,
            };
            coins.push(coin);
        }
        Ok(coins)
    }

    /// Every wallet-scoped key/value pair, for debugging.
    pub fn dump(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for item in self.tree.scan_prefix(layout::wallet_prefix(self.wid)) {
            let (key, value) = item?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    /// How many orphan inputs are waiting on funding transactions.
    pub fn orphan_inputs(&self) -> usize {
        self.orphans.len()
    }

    /// The full wallet view of one transaction.
    pub fn get_details(&mut self, hash: &transaction::Hash) -> Result<Option<Details>> {
        match self.get_tx(hash)? {
            Some(record) => Ok(Some(self.to_details(&record)?)),
            None => Ok(None),
        }
    }

    fn to_details(&mut self, record: &TxRecord) -> Result<Details> {
        let mut details = Details::new(record, self.options.network);

        let credits = self.get_spent_credits(&record.tx)?;
        for (i, credit) in credits.into_iter().enumerate() {
            if let Some(credit) = credit {
                let path = self.coin_path(&credit.coin);
                details.set_input(i, path, &credit.coin);
            }
        }

        let outputs = record.tx.outputs.clone();
        for (i, output) in outputs.iter().enumerate() {
            if let Some(path) = self.output_path(output) {
                details.set_output(i, Some(path), output);
            }
        }

        Ok(details)
    }
}
