//! Wallet-side interfaces the transaction database consumes.
//!
//! Key derivation and address generation live elsewhere; the database only
//! needs to ask "is this address ours, and which account does it belong
//! to?". That question is the [`PathResolver`] trait.

use std::collections::HashMap;

use osprey_chain::parameters::Network;
use osprey_chain::transparent::Address;

/// The derivation slot of a wallet address.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Path {
    /// The human-readable account name.
    pub name: String,
    /// The account index.
    pub account: u32,
    /// The branch (0 receive, 1 change).
    pub branch: u32,
    /// The address index within the branch.
    pub index: u32,
}

impl Path {
    pub fn new(name: &str, account: u32, branch: u32, index: u32) -> Path {
        Path {
            name: name.to_string(),
            account,
            branch,
            index,
        }
    }
}

/// Maps addresses to wallet paths.
pub trait PathResolver {
    /// The path of `address`, or `None` if the address is not ours.
    fn path(&self, address: &Address) -> Option<Path>;

    /// Whether `address` belongs to this wallet.
    fn has(&self, address: &Address) -> bool {
        self.path(address).is_some()
    }
}

/// A fixed, in-memory address book.
///
/// Enough of a keyring for watch-only wallets and tests; a real wallet
/// resolves paths out of its key derivation state instead.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyring {
    paths: HashMap<Address, Path>,
}

impl MemoryKeyring {
    pub fn new() -> MemoryKeyring {
        MemoryKeyring::default()
    }

    /// Register `address` at the given path, replacing any previous entry.
    pub fn insert(&mut self, address: Address, path: Path) {
        self.paths.insert(address, path);
    }

    /// Register a synthetic address for tests and return it.
    pub fn derive(&mut self, network: Network, name: &str, account: u32, index: u32) -> Address {
        let mut pub_key_hash = [0u8; 20];
        pub_key_hash[..4].copy_from_slice(&account.to_be_bytes());
        pub_key_hash[4..8].copy_from_slice(&index.to_be_bytes());
        pub_key_hash[8..12].copy_from_slice(&(self.paths.len() as u32).to_be_bytes());

        let address = Address::PayToPublicKeyHash {
            network,
            pub_key_hash,
        };
        self.insert(address, Path::new(name, account, 0, index));
        address
    }
}

impl PathResolver for MemoryKeyring {
    fn path(&self, address: &Address) -> Option<Path> {
        self.paths.get(address).cloned()
    }
}
