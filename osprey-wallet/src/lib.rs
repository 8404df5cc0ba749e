//! The osprey wallet transaction database.
//!
//! This crate maintains a per-wallet, persistent index of Bitcoin
//! transactions on top of a shared sled keyspace: which outputs belong to
//! the wallet, which of them are spent or merely spent-in-mempool, how the
//! balance moves as transactions confirm, disconnect, or conflict, and a
//! set of secondary indexes for historical queries.
//!
//! The database has two categories of methods:
//!
//! - *write* entry points ([`txdb::Txdb::add`], `confirm`, `disconnect`,
//!   `remove`, `abandon`, `zap`) that stage mutations in an atomic batch and
//!   publish buffered events after a successful flush;
//! - *read* queries that only ever observe committed state.
//!
//! There is at most one open batch per wallet; `&mut self` on the write
//! entry points enforces the single-writer rule at compile time.

mod coin_cache;
mod config;
mod orphans;

pub mod error;
pub mod layout;
pub mod records;
pub mod txdb;
pub mod wallet;
pub mod walletdb;

pub use config::Config;
pub use error::WalletError;
pub use txdb::{RangeQuery, Txdb, TxdbEvent, TxdbOptions};
pub use walletdb::WalletDb;
