use proptest::prelude::*;

use super::*;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize};

proptest! {
    #[test]
    fn input_roundtrip(input in any::<Input>()) {
        osprey_test::init();

        let data = input.bitcoin_serialize_to_vec().expect("input should serialize");
        let input2 = Input::bitcoin_deserialize(&data[..]).expect("randomized input should deserialize");

        prop_assert_eq![input, input2];
    }

    #[test]
    fn output_roundtrip(output in any::<Output>()) {
        osprey_test::init();

        let data = output.bitcoin_serialize_to_vec().expect("output should serialize");
        let output2 = Output::bitcoin_deserialize(&data[..]).expect("randomized output should deserialize");

        prop_assert_eq![output, output2];
    }

    #[test]
    fn outpoint_roundtrip(outpoint in any::<OutPoint>()) {
        osprey_test::init();

        let data = outpoint.bitcoin_serialize_to_vec().expect("outpoint should serialize");
        let outpoint2 = OutPoint::bitcoin_deserialize(&data[..]).expect("randomized outpoint should deserialize");

        prop_assert_eq![outpoint, outpoint2];
    }
}
