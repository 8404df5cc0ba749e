//! Chain primitives for the osprey wallet: transactions, transparent
//! inputs and outputs, amounts, block identifiers, and the
//! consensus-critical serialization helpers they share.

#[macro_use]
extern crate serde;

pub mod amount;
pub mod block;
pub mod cached;
pub mod compactint;
pub mod parameters;
pub mod serialization;
pub mod transaction;
pub mod transparent;

pub use cached::Cached;
pub use serialization::{
    BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize, SerializationError,
};
