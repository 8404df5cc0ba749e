//! Contains impls of `BitcoinSerialize`, `BitcoinDeserialize` for the
//! transaction types, so that all of the serialization logic is in one place.

use std::io::Read;

use crate::serialization::{BitcoinDeserialize, SerializationError};

/// The maximum size of a transaction (excluding the witness) in bytes.
pub const MAX_TX_SIZE: u64 = 1_000_000;

use super::*;
use crate::transparent;

/// Deserializes a transaction, calculating and caching its TxID.
impl BitcoinDeserialize for Transaction {
    fn bitcoin_deserialize<R: std::io::Read>(src: R) -> Result<Self, SerializationError> {
        // Put a sanity limit of 1 MB (a whole block) on the size of a
        // transaction to protect against DOS attacks
        let mut src = src.take(MAX_TX_SIZE);
        let version = i32::bitcoin_deserialize(&mut src)?;
        let inputs = <Vec<transparent::Input>>::bitcoin_deserialize(&mut src)?;
        let outputs = <Vec<transparent::Output>>::bitcoin_deserialize(&mut src)?;
        let locktime = LockTime::bitcoin_deserialize(&mut src)?;
        let mut tx = Transaction {
            version,
            inputs,
            outputs,
            locktime,
            hash: Cached::new(),
        };
        // Calculate and cache the TxID.
        let own_hash = tx.hash();
        tx.hash = Cached::from(own_hash);
        Ok(tx)
    }
}
