//! Block identifiers (hashes and heights).
//!
//! The wallet never validates blocks; it only records which block a
//! transaction was mined in, so hashes and heights are all it needs.

mod hash;

pub use hash::Hash;

use crate::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The height of a block in the chain, counting from the genesis block.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Height(pub u32);

impl Height {
    /// The largest representable height.
    ///
    /// Heights at or above the locktime threshold (500 million) would be
    /// ambiguous with timestamps, so the chain never reaches them.
    pub const MAX: Height = Height(499_999_999);
}

impl BitcoinSerialize for Height {
    fn bitcoin_serialize<W>(&self, target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Height {
    fn bitcoin_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Height(u32::bitcoin_deserialize(reader)?))
    }
}

#[cfg(any(test, feature = "proptest-impl"))]
impl proptest::arbitrary::Arbitrary for Height {
    type Parameters = ();

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::*;
        (0..=Height::MAX.0).prop_map(Height).boxed()
    }

    type Strategy = proptest::strategy::BoxedStrategy<Self>;
}
