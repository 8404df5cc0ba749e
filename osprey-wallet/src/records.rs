//! Wallet-local records and their database encodings.
//!
//! Everything in this module round-trips: the on-disk layout is part of the
//! wallet's compatibility surface, so the codecs are written out explicitly
//! rather than derived wherever a sentinel or length prefix is involved.

use std::collections::BTreeSet;
use std::io;

use osprey_chain::amount::Amount;
use osprey_chain::parameters::Network;
use osprey_chain::transparent::{Address, OutPoint, Output, Script};
use osprey_chain::{
    block, transaction, BitcoinDeserialize, BitcoinSerialize, SerializationError,
};
use osprey_chain::transaction::Transaction;

use crate::wallet::Path;

/// Chain attachment for a transaction: the containing block and the
/// transaction's position within it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockMeta {
    /// The hash of the containing block.
    pub hash: block::Hash,
    /// The height of the containing block.
    pub height: block::Height,
    /// The block timestamp.
    pub time: u32,
    /// The transaction's position in the block.
    pub index: u32,
}

/// A transaction as the wallet stores it: the canonical transaction plus
/// wallet-local metadata.
///
/// `ps` is the wallet-local Unix timestamp of first sight. It is stamped
/// once at ingest and never mutated afterwards, even across confirmation
/// and disconnection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxRecord {
    pub tx: Transaction,
    pub hash: transaction::Hash,
    pub ps: u32,
    pub block: Option<BlockMeta>,
}

impl TxRecord {
    pub fn from_tx(tx: Transaction, block: Option<BlockMeta>, ps: u32) -> TxRecord {
        let hash = tx.hash();
        TxRecord {
            tx,
            hash,
            ps,
            block,
        }
    }

    /// The record's height, with the on-disk convention that -1 encodes
    /// "not mined".
    pub fn height_i32(&self) -> i32 {
        match &self.block {
            Some(meta) => meta.height.0 as i32,
            None => -1,
        }
    }

    pub fn height(&self) -> Option<block::Height> {
        self.block.as_ref().map(|meta| meta.height)
    }

    pub fn set_block(&mut self, meta: BlockMeta) {
        self.block = Some(meta);
    }

    pub fn unset_block(&mut self) {
        self.block = None;
    }
}

impl BitcoinSerialize for TxRecord {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.tx.bitcoin_serialize(&mut writer)?;
        self.ps.bitcoin_serialize(&mut writer)?;
        match &self.block {
            None => (-1i32).bitcoin_serialize(&mut writer)?,
            Some(meta) => {
                (meta.height.0 as i32).bitcoin_serialize(&mut writer)?;
                meta.hash.bitcoin_serialize(&mut writer)?;
                meta.time.bitcoin_serialize(&mut writer)?;
                meta.index.bitcoin_serialize(&mut writer)?;
            }
        }
        Ok(())
    }
}

impl BitcoinDeserialize for TxRecord {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let tx = Transaction::bitcoin_deserialize(&mut reader)?;
        let ps = u32::bitcoin_deserialize(&mut reader)?;
        let height = i32::bitcoin_deserialize(&mut reader)?;
        let block = if height < 0 {
            None
        } else {
            let hash = block::Hash::bitcoin_deserialize(&mut reader)?;
            let time = u32::bitcoin_deserialize(&mut reader)?;
            let index = u32::bitcoin_deserialize(&mut reader)?;
            Some(BlockMeta {
                hash,
                height: block::Height(height as u32),
                time,
                index,
            })
        };
        let hash = tx.hash();
        Ok(TxRecord {
            tx,
            hash,
            ps,
            block,
        })
    }
}

/// An output materialized as a wallet coin.
///
/// The outpoint is carried by the database key, so the value codec skips
/// it; decoding therefore needs the outpoint supplied from the key (or, for
/// undo coins, from the spending input).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Coin {
    pub outpoint: OutPoint,
    pub value: Amount,
    pub height: Option<block::Height>,
    pub coinbase: bool,
    pub script: Script,
}

impl Coin {
    pub fn height_i32(&self) -> i32 {
        match self.height {
            Some(height) => height.0 as i32,
            None => -1,
        }
    }

    /// The address this coin pays to, if its script is standard.
    pub fn address(&self, network: Network) -> Option<Address> {
        Address::from_output_script(&self.script, network)
    }

    pub fn read<R: io::Read>(
        outpoint: OutPoint,
        mut reader: R,
    ) -> Result<Coin, SerializationError> {
        let value = Amount::bitcoin_deserialize(&mut reader)?;
        let height = i32::bitcoin_deserialize(&mut reader)?;
        let height = if height < 0 {
            None
        } else {
            Some(block::Height(height as u32))
        };
        let coinbase = bool::bitcoin_deserialize(&mut reader)?;
        let script = Script::bitcoin_deserialize(&mut reader)?;
        Ok(Coin {
            outpoint,
            value,
            height,
            coinbase,
            script,
        })
    }
}

impl BitcoinSerialize for Coin {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.value.bitcoin_serialize(&mut writer)?;
        self.height_i32().bitcoin_serialize(&mut writer)?;
        self.coinbase.bitcoin_serialize(&mut writer)?;
        self.script.bitcoin_serialize(&mut writer)?;
        Ok(())
    }
}

/// A wallet-owned output plus its mempool-spend flag.
///
/// `spent` means a mempool transaction spends this coin: the coin still
/// counts toward the confirmed balance, but is no longer spendable. The
/// credit is deleted outright once the spender confirms.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credit {
    pub coin: Coin,
    pub spent: bool,
}

impl Credit {
    pub fn from_output(
        hash: transaction::Hash,
        index: u32,
        output: &Output,
        height: Option<block::Height>,
        coinbase: bool,
    ) -> Credit {
        Credit {
            coin: Coin {
                outpoint: OutPoint::new(hash, index),
                value: output.value,
                height,
                coinbase,
                script: output.lock_script.clone(),
            },
            spent: false,
        }
    }

    pub fn read<R: io::Read>(
        outpoint: OutPoint,
        mut reader: R,
    ) -> Result<Credit, SerializationError> {
        let coin = Coin::read(outpoint, &mut reader)?;
        let spent = bool::bitcoin_deserialize(&mut reader)?;
        Ok(Credit { coin, spent })
    }

    pub fn from_bytes(outpoint: OutPoint, bytes: &[u8]) -> Result<Credit, SerializationError> {
        Credit::read(outpoint, bytes)
    }
}

impl BitcoinSerialize for Credit {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.coin.bitcoin_serialize(&mut writer)?;
        self.spent.bitcoin_serialize(&mut writer)?;
        Ok(())
    }
}

/// The wallet's view of one block: which of its transactions are ours.
///
/// A block record exists exactly as long as the wallet has at least one
/// confirmed transaction at its height.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockRecord {
    pub hash: block::Hash,
    pub height: block::Height,
    pub time: u32,
    pub hashes: Vec<transaction::Hash>,
}

impl BlockRecord {
    pub fn new(meta: &BlockMeta) -> BlockRecord {
        BlockRecord {
            hash: meta.hash,
            height: meta.height,
            time: meta.time,
            hashes: Vec::new(),
        }
    }

    /// Add a transaction hash; returns false if it was already present.
    pub fn add(&mut self, hash: transaction::Hash) -> bool {
        if self.hashes.contains(&hash) {
            return false;
        }
        self.hashes.push(hash);
        true
    }

    /// Remove a transaction hash; returns false if it was not present.
    pub fn remove(&mut self, hash: &transaction::Hash) -> bool {
        match self.hashes.iter().position(|have| have == hash) {
            Some(at) => {
                self.hashes.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl BitcoinSerialize for BlockRecord {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.hash.bitcoin_serialize(&mut writer)?;
        self.height.0.bitcoin_serialize(&mut writer)?;
        self.time.bitcoin_serialize(&mut writer)?;
        (self.hashes.len() as u32).bitcoin_serialize(&mut writer)?;
        for hash in &self.hashes {
            hash.bitcoin_serialize(&mut writer)?;
        }
        Ok(())
    }
}

impl BitcoinDeserialize for BlockRecord {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let hash = block::Hash::bitcoin_deserialize(&mut reader)?;
        let height = block::Height(u32::bitcoin_deserialize(&mut reader)?);
        let time = u32::bitcoin_deserialize(&mut reader)?;
        let count = u32::bitcoin_deserialize(&mut reader)?;
        let mut hashes = Vec::with_capacity(std::cmp::min(count as usize, 1024));
        for _ in 0..count {
            hashes.push(transaction::Hash::bitcoin_deserialize(&mut reader)?);
        }
        Ok(BlockRecord {
            hash,
            height,
            time,
            hashes,
        })
    }
}

/// The wallet's persisted counters, maintained in a committed copy and a
/// pending copy that replaces it atomically on batch commit.
///
/// The fields are signed so a batch body can move through transient
/// negatives, but a committed state is asserted non-negative when it is
/// serialized.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TxdbState {
    pub tx: i64,
    pub coin: i64,
    pub unconfirmed: i64,
    pub confirmed: i64,
}

impl TxdbState {
    pub fn add_tx(&mut self, delta: i64) {
        self.tx += delta;
    }

    pub fn add_coin(&mut self, delta: i64) {
        self.coin += delta;
    }

    pub fn add_unconfirmed(&mut self, delta: i64) {
        self.unconfirmed += delta;
    }

    pub fn add_confirmed(&mut self, delta: i64) {
        self.confirmed += delta;
    }

    /// The wallet-wide balance this state describes.
    pub fn balance(&self) -> Balance {
        Balance {
            account: None,
            tx: self.tx,
            coin: self.coin,
            unconfirmed: self.unconfirmed,
            confirmed: self.confirmed,
        }
    }
}

impl BitcoinSerialize for TxdbState {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        assert!(
            self.tx >= 0 && self.coin >= 0 && self.unconfirmed >= 0 && self.confirmed >= 0,
            "refusing to persist a negative wallet state"
        );
        (self.tx as u64).bitcoin_serialize(&mut writer)?;
        (self.coin as u64).bitcoin_serialize(&mut writer)?;
        (self.unconfirmed as u64).bitcoin_serialize(&mut writer)?;
        (self.confirmed as u64).bitcoin_serialize(&mut writer)?;
        Ok(())
    }
}

impl BitcoinDeserialize for TxdbState {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(TxdbState {
            tx: u64::bitcoin_deserialize(&mut reader)? as i64,
            coin: u64::bitcoin_deserialize(&mut reader)? as i64,
            unconfirmed: u64::bitcoin_deserialize(&mut reader)? as i64,
            confirmed: u64::bitcoin_deserialize(&mut reader)? as i64,
        })
    }
}

/// A balance snapshot, wallet-wide or for one account.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Balance {
    /// The account this balance covers; `None` means the whole wallet.
    pub account: Option<u32>,
    pub tx: i64,
    pub coin: i64,
    pub unconfirmed: i64,
    pub confirmed: i64,
}

/// One input or output of a transaction, as seen from the wallet.
///
/// Members of foreign inputs stay empty; members of foreign outputs carry
/// no path.
#[derive(Clone, Debug, Default)]
pub struct DetailsMember {
    pub value: Option<Amount>,
    pub address: Option<Address>,
    pub path: Option<Path>,
}

impl DetailsMember {
    pub fn is_ours(&self) -> bool {
        self.path.is_some()
    }
}

/// The wallet's full projection of one transaction, built during the write
/// pipeline and attached to every event.
#[derive(Clone, Debug)]
pub struct Details {
    pub hash: transaction::Hash,
    pub tx: Transaction,
    pub ps: u32,
    pub block: Option<BlockMeta>,
    pub inputs: Vec<DetailsMember>,
    pub outputs: Vec<DetailsMember>,
    network: Network,
}

impl Details {
    pub fn new(record: &TxRecord, network: Network) -> Details {
        Details {
            hash: record.hash,
            tx: record.tx.clone(),
            ps: record.ps,
            block: record.block,
            inputs: vec![DetailsMember::default(); record.tx.inputs.len()],
            outputs: vec![DetailsMember::default(); record.tx.outputs.len()],
            network,
        }
    }

    pub fn set_input(&mut self, index: usize, path: Option<Path>, coin: &Coin) {
        let member = &mut self.inputs[index];
        member.value = Some(coin.value);
        member.address = coin.address(self.network);
        member.path = path;
    }

    pub fn set_output(&mut self, index: usize, path: Option<Path>, output: &Output) {
        let member = &mut self.outputs[index];
        member.value = Some(output.value);
        member.address = Address::from_output_script(&output.lock_script, self.network);
        member.path = path;
    }

    /// The sorted set of wallet accounts this transaction touches.
    pub fn accounts(&self) -> Vec<u32> {
        let mut accounts = BTreeSet::new();
        for member in self.inputs.iter().chain(self.outputs.iter()) {
            if let Some(path) = &member.path {
                accounts.insert(path.account);
            }
        }
        accounts.into_iter().collect()
    }

    /// The fee this transaction paid, when every input value is known.
    pub fn fee(&self) -> Option<Amount> {
        if self.tx.is_coinbase() {
            return None;
        }

        let mut input_total = 0i64;
        for member in &self.inputs {
            input_total += i64::from(member.value?);
        }

        let output_total: i64 = self
            .tx
            .outputs
            .iter()
            .map(|output| i64::from(output.value))
            .sum();

        Some(Amount::from_sat(input_total - output_total))
    }

    /// The number of confirmations relative to the given chain tip.
    pub fn confirmations(&self, tip: block::Height) -> u32 {
        match &self.block {
            Some(meta) => tip.0.saturating_sub(meta.height.0) + 1,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osprey_chain::transaction::LockTime;
    use osprey_chain::transparent::Input;

    fn spend_tx() -> Transaction {
        Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint::new(transaction::Hash([9u8; 32]), 1),
                unlock_script: Script(vec![0x51]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::from_sat(50_000),
                lock_script: Script(vec![0x52]),
            }],
            LockTime::unlocked(),
        )
    }

    fn meta() -> BlockMeta {
        BlockMeta {
            hash: block::Hash([3u8; 32]),
            height: block::Height(120),
            time: 1_600_000_000,
            index: 2,
        }
    }

    #[test]
    fn tx_record_roundtrip() {
        osprey_test::init();

        for block in &[None, Some(meta())] {
            let record = TxRecord::from_tx(spend_tx(), *block, 1_555_555_555);
            let data = record.bitcoin_serialize_to_vec().unwrap();
            let decoded = TxRecord::bitcoin_deserialize(&data[..]).unwrap();
            assert_eq!(record, decoded);
        }
    }

    #[test]
    fn credit_roundtrip() {
        osprey_test::init();

        let outpoint = OutPoint::new(transaction::Hash([7u8; 32]), 0);
        for &(height, spent) in &[(None, false), (Some(block::Height(10)), true)] {
            let credit = Credit {
                coin: Coin {
                    outpoint,
                    value: Amount::from_sat(1_234),
                    height,
                    coinbase: height.is_some(),
                    script: Script(vec![0xaa, 0xbb]),
                },
                spent,
            };
            let data = credit.bitcoin_serialize_to_vec().unwrap();
            let decoded = Credit::from_bytes(outpoint, &data).unwrap();
            assert_eq!(credit, decoded);
        }
    }

    #[test]
    fn block_record_roundtrip() {
        osprey_test::init();

        let mut record = BlockRecord::new(&meta());
        assert!(record.add(transaction::Hash([1u8; 32])));
        assert!(record.add(transaction::Hash([2u8; 32])));
        assert!(!record.add(transaction::Hash([1u8; 32])));

        let data = record.bitcoin_serialize_to_vec().unwrap();
        let decoded = BlockRecord::bitcoin_deserialize(&data[..]).unwrap();
        assert_eq!(record, decoded);

        assert!(record.remove(&transaction::Hash([1u8; 32])));
        assert!(!record.remove(&transaction::Hash([1u8; 32])));
        assert!(!record.is_empty());
    }

    #[test]
    fn state_roundtrip() {
        osprey_test::init();

        let state = TxdbState {
            tx: 3,
            coin: 2,
            unconfirmed: 5_000_000_000,
            confirmed: 2_500_000_000,
        };
        let data = state.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(data.len(), 32);
        let decoded = TxdbState::bitcoin_deserialize(&data[..]).unwrap();
        assert_eq!(state, decoded);
    }

    #[test]
    #[should_panic(expected = "negative wallet state")]
    fn negative_state_does_not_persist() {
        let state = TxdbState {
            tx: 1,
            coin: 0,
            unconfirmed: -1,
            confirmed: 0,
        };
        let _ = state.bitcoin_serialize_to_vec();
    }

    #[test]
    fn fee_requires_resolved_inputs() {
        osprey_test::init();

        let record = TxRecord::from_tx(spend_tx(), None, 0);
        let mut details = Details::new(&record, Network::Regtest);
        assert_eq!(details.fee(), None);

        let coin = Coin {
            outpoint: OutPoint::new(transaction::Hash([9u8; 32]), 1),
            value: Amount::from_sat(60_000),
            height: Some(block::Height(5)),
            coinbase: false,
            script: Script(vec![0x51]),
        };
        details.set_input(0, None, &coin);
        assert_eq!(details.fee(), Some(Amount::from_sat(10_000)));
    }
}
