use std::io;

use crate::block;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// A transaction lock time.
///
/// The raw encoding is a u32; values below 500 million are interpreted as
/// block heights, values at or above it as Unix timestamps.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LockTime {
    /// Unlocked at a given block height.
    Height(block::Height),
    /// Unlocked at a given Unix time.
    Time(u32),
}

impl LockTime {
    /// The smallest raw value interpreted as a timestamp rather than a
    /// height.
    pub const MIN_TIMESTAMP: u32 = 500_000_000;

    /// A lock time that does not lock anything: height zero.
    pub fn unlocked() -> LockTime {
        LockTime::Height(block::Height(0))
    }
}

impl BitcoinSerialize for LockTime {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            LockTime::Height(block::Height(height)) => {
                writer.write_u32::<LittleEndian>(*height)?
            }
            LockTime::Time(time) => writer.write_u32::<LittleEndian>(*time)?,
        }
        Ok(())
    }
}

impl BitcoinDeserialize for LockTime {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let raw = reader.read_u32::<LittleEndian>()?;
        if raw < LockTime::MIN_TIMESTAMP {
            Ok(LockTime::Height(block::Height(raw)))
        } else {
            Ok(LockTime::Time(raw))
        }
    }
}
