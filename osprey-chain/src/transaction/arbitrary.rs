use proptest::{arbitrary::any, collection::vec, prelude::*};

use crate::block;
use crate::cached::Cached;
use crate::transparent;

use super::{LockTime, Transaction};

impl Arbitrary for LockTime {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        prop_oneof![
            (0..=block::Height::MAX.0).prop_map(|n| LockTime::Height(block::Height(n))),
            (LockTime::MIN_TIMESTAMP..=std::u32::MAX).prop_map(LockTime::Time),
        ]
        .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for Transaction {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            1..3i32,
            vec(any::<transparent::Input>(), 1..10),
            vec(any::<transparent::Output>(), 0..10),
            any::<LockTime>(),
        )
            .prop_map(|(version, inputs, outputs, locktime)| Transaction {
                version,
                inputs,
                outputs,
                locktime,
                hash: Cached::new(),
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
