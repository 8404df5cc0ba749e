//! Wallet database errors.

use displaydoc::Display;
use thiserror::Error;

use osprey_chain::{transaction, SerializationError};

/// An error working against the wallet database.
///
/// Corrupted-store conditions (a missing undo coin or credit that a
/// well-formed database must contain) are deliberately *not* represented
/// here: those are asserted, because no caller can meaningfully recover
/// from a faulty store.
#[derive(Debug, Display, Error)]
pub enum WalletError {
    /// database error: {0}
    Database(#[from] sled::Error),
    /// serialization error: {0}
    Serialization(#[from] SerializationError),
    /// io error: {0}
    Io(#[from] std::io::Error),
    /// transaction {0} is not in the wallet
    UnknownTransaction(transaction::Hash),
    /// transaction {0} is already confirmed
    AlreadyConfirmed(transaction::Hash),
    /// transaction {0} is not confirmed
    NotConfirmed(transaction::Hash),
    /// transaction {0} is not pending
    NotPending(transaction::Hash),
}

pub type Result<T> = std::result::Result<T, WalletError>;
