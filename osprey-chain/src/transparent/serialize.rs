//! Serialization impls for inputs, which have a tagged wire layout: a
//! coinbase input is encoded as a spend of the null outpoint.

use std::io;

use super::{CoinbaseData, Input, OutPoint, Script};
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::transaction;

impl BitcoinSerialize for Input {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => {
                outpoint.bitcoin_serialize(&mut writer)?;
                unlock_script.bitcoin_serialize(&mut writer)?;
                sequence.bitcoin_serialize(&mut writer)?;
            }
            Input::Coinbase { data, sequence } => {
                writer.write_all(&[0u8; 32])?;
                std::u32::MAX.bitcoin_serialize(&mut writer)?;
                data.bitcoin_serialize(&mut writer)?;
                sequence.bitcoin_serialize(&mut writer)?;
            }
        }
        Ok(())
    }
}

impl BitcoinDeserialize for Input {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let hash = transaction::Hash::bitcoin_deserialize(&mut reader)?;
        let index = u32::bitcoin_deserialize(&mut reader)?;
        let outpoint = OutPoint { hash, index };

        if outpoint.is_null() {
            let data = CoinbaseData::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::Coinbase { data, sequence })
        } else {
            let unlock_script = Script::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            })
        }
    }
}
