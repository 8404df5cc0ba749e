//! Transaction and balance amounts, denominated in satoshis.

use crate::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// One bitcoin, in satoshis.
pub const COIN: i64 = 100_000_000;

/// The monetary supply cap, in satoshis.
pub const MAX_MONEY: i64 = 21_000_000 * COIN;

/// An amount of satoshis.
///
/// The wire format is a signed 64-bit little-endian integer, matching the
/// output value field of a transaction.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
    pub fn from_sat(sat: i64) -> Amount {
        Amount(sat)
    }

    pub fn zero() -> Amount {
        Amount(0)
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> i64 {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BitcoinSerialize for Amount {
    fn bitcoin_serialize<W>(&self, target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Amount {
    fn bitcoin_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Amount(i64::bitcoin_deserialize(reader)?))
    }
}

#[cfg(any(test, feature = "proptest-impl"))]
impl proptest::arbitrary::Arbitrary for Amount {
    type Parameters = ();

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::*;
        (0..MAX_MONEY).prop_map(Amount).boxed()
    }

    type Strategy = proptest::strategy::BoxedStrategy<Self>;
}
