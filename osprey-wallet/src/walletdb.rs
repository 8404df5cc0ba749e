//! The shared wallet directory.
//!
//! All wallets of one node live in a single sled keyspace. Alongside the
//! per-wallet tables (see [`crate::layout`]) the directory keeps two global
//! maps: which wallets reference a given outpoint, and which wallets have
//! transactions at a given block height. The node uses them to route
//! incoming transactions and block disconnects to the wallets that care.
//!
//! Map mutations are staged inside the owning wallet's write batch, so a
//! rolled back batch leaves the directory untouched.

use std::io;

use osprey_chain::parameters::Network;
use osprey_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use osprey_chain::transparent::OutPoint;

use crate::config::Config;
use crate::error::Result;

/// The tree holding every wallet and the directory maps.
const TREE_NAME: &[u8] = b"wallet";

/// Namespace byte for outpoint map keys.
const OUTPOINT_MAP: u8 = b'o';

/// Namespace byte for block map keys.
const BLOCK_MAP: u8 = b'b';

/// The key of the outpoint map entry for `outpoint`.
pub fn outpoint_map_key(outpoint: &OutPoint) -> Vec<u8> {
    let mut key = Vec::with_capacity(37);
    key.push(OUTPOINT_MAP);
    key.extend_from_slice(&outpoint.hash.0);
    key.extend_from_slice(&outpoint.index.to_be_bytes());
    key
}

/// The key of the block map entry for `height`.
pub fn block_map_key(height: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(BLOCK_MAP);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// A set of wallet ids interested in one outpoint or height.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MapRecord {
    pub wids: Vec<u32>,
}

impl MapRecord {
    /// Add a wallet id, keeping the set sorted. Returns false if it was
    /// already present.
    pub fn add(&mut self, wid: u32) -> bool {
        match self.wids.binary_search(&wid) {
            Ok(_) => false,
            Err(at) => {
                self.wids.insert(at, wid);
                true
            }
        }
    }

    /// Remove a wallet id. Returns false if it was not present.
    pub fn remove(&mut self, wid: u32) -> bool {
        match self.wids.binary_search(&wid) {
            Ok(at) => {
                self.wids.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wids.is_empty()
    }
}

impl BitcoinSerialize for MapRecord {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> std::result::Result<(), io::Error> {
        (self.wids.len() as u32).bitcoin_serialize(&mut writer)?;
        for wid in &self.wids {
            wid.bitcoin_serialize(&mut writer)?;
        }
        Ok(())
    }
}

impl BitcoinDeserialize for MapRecord {
    fn bitcoin_deserialize<R: io::Read>(
        mut reader: R,
    ) -> std::result::Result<Self, SerializationError> {
        let count = u32::bitcoin_deserialize(&mut reader)?;
        let mut wids = Vec::with_capacity(std::cmp::min(count as usize, 1024));
        for _ in 0..count {
            wids.push(u32::bitcoin_deserialize(&mut reader)?);
        }
        Ok(MapRecord { wids })
    }
}

/// The handle owning the node's wallet keyspace.
pub struct WalletDb {
    db: sled::Db,
    tree: sled::Tree,
    network: Network,
}

impl WalletDb {
    pub fn open(config: &Config, network: Network) -> Result<WalletDb> {
        let db = config.sled_config(network).open()?;
        let tree = db.open_tree(TREE_NAME)?;

        Ok(WalletDb { db, tree, network })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// A handle to the shared keyspace, for a wallet's transaction
    /// database.
    pub fn tree(&self) -> sled::Tree {
        self.tree.clone()
    }

    /// The wallets referencing `outpoint`.
    pub fn get_outpoint_map(&self, outpoint: &OutPoint) -> Result<Option<MapRecord>> {
        match self.tree.get(outpoint_map_key(outpoint))? {
            Some(raw) => Ok(Some(MapRecord::bitcoin_deserialize(&raw[..])?)),
            None => Ok(None),
        }
    }

    /// The wallets holding confirmed transactions at `height`.
    pub fn get_block_map(&self, height: u32) -> Result<Option<MapRecord>> {
        match self.tree.get(block_map_key(height))? {
            Some(raw) => Ok(Some(MapRecord::bitcoin_deserialize(&raw[..])?)),
            None => Ok(None),
        }
    }

    /// Flush sled's dirty pages to disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}
