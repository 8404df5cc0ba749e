//! End-to-end scenarios for the wallet transaction database, driven through
//! the public API against an ephemeral store.

use std::sync::Arc;

use tempdir::TempDir;
use tokio::sync::broadcast;

use osprey_chain::amount::Amount;
use osprey_chain::block;
use osprey_chain::parameters::Network;
use osprey_chain::transaction::{self, LockTime, Transaction};
use osprey_chain::transparent::{
    Address, CoinbaseData, Input, OutPoint, Output, Script, ToAddressWithNetwork,
};
use osprey_wallet::error::WalletError;
use osprey_wallet::layout;
use osprey_wallet::records::BlockMeta;
use osprey_wallet::wallet::{MemoryKeyring, Path};
use osprey_wallet::{Config, RangeQuery, Txdb, TxdbEvent, TxdbOptions, WalletDb};

const COIN: i64 = 100_000_000;
const SEQUENCE_FINAL: u32 = 0xffff_ffff;

fn early_clock() -> u32 {
    1_000
}

fn late_clock() -> u32 {
    1_000_000
}

/// The redeem script backing the SPV test address; deliberately not a
/// valid public key so input-script extraction takes the P2SH route.
fn spv_redeem() -> Script {
    Script(vec![0x01, 0x02, 0x03])
}

struct TestWallet {
    // Keep the store directory and sled handle alive for the duration of
    // the test.
    _dir: TempDir,
    wdb: WalletDb,
    txdb: Txdb,
    addresses: Vec<Address>,
    spv_address: Address,
}

fn wallet_with(mut options: TxdbOptions, wid: u32) -> TestWallet {
    osprey_test::init();

    options.network = Network::Regtest;

    let dir = TempDir::new("osprey-wallet-test").expect("temp dir");
    let config = Config {
        cache_dir: dir.path().to_path_buf(),
        ephemeral: true,
    };
    let wdb = WalletDb::open(&config, Network::Regtest).expect("ephemeral wallet db opens");

    let mut keyring = MemoryKeyring::new();
    let addresses: Vec<Address> = (0..4)
        .map(|index| keyring.derive(Network::Regtest, "default", 0, index))
        .collect();
    let savings = keyring.derive(Network::Regtest, "savings", 1, 0);

    let spv_address = spv_redeem().to_address(Network::Regtest);
    keyring.insert(spv_address, Path::new("default", 0, 0, 99));

    let mut addresses = addresses;
    addresses.push(savings);

    let mut txdb = Txdb::open(&wdb, wid, "primary", options, Arc::new(keyring))
        .expect("txdb opens");
    txdb.set_clock(early_clock);

    TestWallet {
        _dir: dir,
        wdb,
        txdb,
        addresses,
        spv_address,
    }
}

fn wallet() -> TestWallet {
    wallet_with(TxdbOptions::default(), 1)
}

fn meta(height: u32, seed: u8, index: u32) -> BlockMeta {
    BlockMeta {
        hash: block::Hash([seed; 32]),
        height: block::Height(height),
        time: 1_600_000_000 + height,
        index,
    }
}

/// A transaction funding `address` from a prevout the wallet has never
/// seen.
fn fund(address: &Address, value: i64, seed: u8) -> Transaction {
    Transaction::new(
        1,
        vec![Input::PrevOut {
            outpoint: OutPoint::new(transaction::Hash([seed; 32]), 0),
            unlock_script: Script(Vec::new()),
            sequence: SEQUENCE_FINAL,
        }],
        vec![Output {
            value: Amount::from_sat(value),
            lock_script: address.to_output_script(),
        }],
        LockTime::unlocked(),
    )
}

fn spend(prevout: OutPoint, pays: &[(&Address, i64)], sequence: u32) -> Transaction {
    Transaction::new(
        1,
        vec![Input::PrevOut {
            outpoint: prevout,
            unlock_script: Script(Vec::new()),
            sequence,
        }],
        pays.iter()
            .map(|(address, value)| Output {
                value: Amount::from_sat(*value),
                lock_script: address.to_output_script(),
            })
            .collect(),
        LockTime::unlocked(),
    )
}

fn assert_balance(txdb: &Txdb, tx: i64, coin: i64, unconfirmed: i64, confirmed: i64) {
    let balance = txdb.get_balance();
    assert_eq!(
        (balance.tx, balance.coin, balance.unconfirmed, balance.confirmed),
        (tx, coin, unconfirmed, confirmed),
    );
}

/// Check the invariants that must hold on every committed state.
fn audit(txdb: &mut Txdb) {
    let balance = txdb.get_balance();
    let credits = txdb.get_credits().expect("credits scan");

    let unconfirmed: i64 = credits
        .iter()
        .filter(|credit| !credit.spent)
        .map(|credit| i64::from(credit.coin.value))
        .sum();
    let confirmed: i64 = credits
        .iter()
        .filter(|credit| credit.coin.height.is_some())
        .map(|credit| i64::from(credit.coin.value))
        .sum();

    assert_eq!(balance.unconfirmed, unconfirmed);
    assert_eq!(balance.confirmed, confirmed);
    assert_eq!(
        balance.coin as usize,
        credits.iter().filter(|credit| !credit.spent).count(),
    );

    let history = txdb.get_history_hashes().expect("history scan");
    assert_eq!(balance.tx as usize, history.len());

    // Exactly one of pending / height-indexed per transaction.
    let pending = txdb.get_pending_hashes().expect("pending scan");
    let mined = txdb
        .get_height_range_hashes(&RangeQuery::default())
        .expect("height scan");
    assert_eq!(pending.len() + mined.len(), history.len());
    for hash in &pending {
        assert!(!mined.contains(hash));
    }

    // Every credit is mirrored in its account table.
    let outpoints = txdb.get_outpoints().expect("outpoint scan");
    assert_eq!(outpoints.len(), credits.len());
}

fn drain(receiver: &mut broadcast::Receiver<TxdbEvent>) -> Vec<TxdbEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn fresh_insert_and_confirm() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();

    // Scenario: fresh mempool insert.
    let details = w.txdb.add(&tx, None).expect("add").expect("ours");
    assert!(details.outputs[0].is_ours());
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 0);
    assert_eq!(w.txdb.get_pending_hashes().unwrap(), vec![hash]);
    assert!(w
        .txdb
        .get_height_range_hashes(&RangeQuery::default())
        .unwrap()
        .is_empty());
    audit(&mut w.txdb);

    // Scenario: the same transaction confirms at height 100.
    let block_meta = meta(100, 0xb1, 0);
    w.txdb.confirm(&hash, &block_meta).expect("confirm");
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 50 * COIN);
    assert!(w.txdb.get_pending_hashes().unwrap().is_empty());
    assert_eq!(
        w.txdb
            .get_height_range_hashes(&RangeQuery::default())
            .unwrap(),
        vec![hash],
    );

    let record = w
        .txdb
        .get_block_record(block::Height(100))
        .unwrap()
        .expect("block record exists");
    assert_eq!(record.hashes, vec![hash]);
    audit(&mut w.txdb);

    // Confirming twice is a caller error.
    match w.txdb.confirm(&hash, &block_meta) {
        Err(WalletError::AlreadyConfirmed(_)) => {}
        other => panic!("expected AlreadyConfirmed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn mempool_spend_of_confirmed_coin_and_spender_confirm() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).expect("add").expect("ours");
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 50 * COIN);

    // Scenario: a mempool transaction spends the confirmed coin, sending
    // 25 BTC back to the wallet and 25 BTC to fees.
    let spender = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[1], 25 * COIN)],
        SEQUENCE_FINAL,
    );
    let spender_hash = spender.hash();
    let details = w.txdb.add(&spender, None).expect("add").expect("ours");
    assert_eq!(details.fee(), Some(Amount::from_sat(25 * COIN)));

    assert_balance(&w.txdb, 2, 1, 25 * COIN, 50 * COIN);
    let credits = w.txdb.get_credits().unwrap();
    assert_eq!(credits.len(), 2);
    let parent = credits
        .iter()
        .find(|credit| credit.coin.outpoint == OutPoint::new(hash, 0))
        .expect("spent parent still present");
    assert!(parent.spent);

    // The spendable set excludes the mempool-spent parent.
    let coins = w.txdb.get_coins().unwrap();
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].outpoint, OutPoint::new(spender_hash, 0));

    // The undo coin exists and reconstructs the parent coin.
    let undo = w.txdb.fill_history(&spender).unwrap();
    assert_eq!(undo[0].as_ref().unwrap().value, Amount::from_sat(50 * COIN));
    audit(&mut w.txdb);

    // Scenario: the spender confirms; the parent credit is deleted
    // outright.
    w.txdb
        .confirm(&spender_hash, &meta(101, 0xb2, 1))
        .expect("confirm spender");
    assert_balance(&w.txdb, 2, 1, 25 * COIN, 25 * COIN);
    let credits = w.txdb.get_credits().unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].coin.outpoint, OutPoint::new(spender_hash, 0));
    audit(&mut w.txdb);
}

#[test]
fn mempool_double_spend_is_resolved_by_recursion() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let mut events = w.txdb.subscribe();

    let a = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[1], 20 * COIN)],
        SEQUENCE_FINAL,
    );
    let b = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[2], 21 * COIN)],
        SEQUENCE_FINAL,
    );

    w.txdb.add(&a, None).unwrap().unwrap();
    assert_balance(&w.txdb, 2, 1, 20 * COIN, 50 * COIN);

    // Scenario: B double-spends A's input; A is recursively erased and a
    // conflict event fires for it.
    w.txdb.add(&b, None).unwrap().unwrap();

    assert!(w.txdb.get_tx(&a.hash()).unwrap().is_none());
    assert!(w.txdb.get_tx(&b.hash()).unwrap().is_some());
    assert_balance(&w.txdb, 2, 1, 21 * COIN, 50 * COIN);
    audit(&mut w.txdb);

    let seen = drain(&mut events);
    let conflicted: Vec<transaction::Hash> = seen
        .iter()
        .filter_map(|event| match event {
            TxdbEvent::Conflict { record, .. } => Some(record.hash),
            _ => None,
        })
        .collect();
    assert_eq!(conflicted, vec![a.hash()]);
}

#[test]
fn confirmed_double_spend_wins_outright() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let a = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[1], 20 * COIN)],
        SEQUENCE_FINAL,
    );
    w.txdb.add(&a, None).unwrap().unwrap();
    w.txdb.confirm(&a.hash(), &meta(101, 0xb2, 0)).unwrap();

    let c = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[2], 19 * COIN)],
        SEQUENCE_FINAL,
    );
    assert!(w.txdb.add(&c, None).unwrap().is_none());
    assert!(w.txdb.get_tx(&c.hash()).unwrap().is_none());
    assert!(w.txdb.get_tx(&a.hash()).unwrap().is_some());
    audit(&mut w.txdb);
}

#[test]
fn disconnect_restores_mempool_state() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(120, 0xb7, 0))).unwrap().unwrap();
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 50 * COIN);

    // Scenario: reorg disconnect.
    w.txdb.disconnect(&hash).expect("disconnect");
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 0);
    assert_eq!(w.txdb.get_pending_hashes().unwrap(), vec![hash]);
    assert!(w.txdb.get_block_record(block::Height(120)).unwrap().is_none());

    let credits = w.txdb.get_credits().unwrap();
    assert_eq!(credits[0].coin.height, None);
    audit(&mut w.txdb);

    // Disconnecting a mempool transaction is a caller error.
    match w.txdb.disconnect(&hash) {
        Err(WalletError::NotConfirmed(_)) => {}
        other => panic!("expected NotConfirmed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn confirm_then_disconnect_restores_post_insert_state() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let spender = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[1], 25 * COIN)],
        SEQUENCE_FINAL,
    );
    let spender_hash = spender.hash();
    w.txdb.add(&spender, None).unwrap().unwrap();

    let before = w.txdb.dump().unwrap();
    w.txdb.confirm(&spender_hash, &meta(101, 0xb2, 0)).unwrap();
    w.txdb.disconnect(&spender_hash).unwrap();
    let after = w.txdb.dump().unwrap();

    assert_eq!(before, after);
    audit(&mut w.txdb);
}

#[test]
fn add_then_erase_is_byte_identical() {
    let mut w = wallet();
    let before = w.txdb.dump().unwrap();

    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    w.txdb.add(&tx, None).unwrap().unwrap();
    assert!(w.txdb.remove(&tx.hash()).unwrap().is_some());

    let after = w.txdb.dump().unwrap();
    assert_eq!(before, after);
    assert!(w
        .wdb
        .get_outpoint_map(&OutPoint::new(tx.hash(), 0))
        .unwrap()
        .is_none());
}

#[test]
fn direct_confirmed_add_matches_insert_then_confirm() {
    // Two wallets over the same keyring: one ingests mempool-then-confirm,
    // the other ingests the confirmed transaction directly.
    let mut one = wallet_with(TxdbOptions::default(), 1);
    let mut two = wallet_with(TxdbOptions::default(), 2);

    let block_meta = meta(100, 0xb1, 0);

    let tx1 = fund(&one.addresses[0], 50 * COIN, 0xf0);
    one.txdb.add(&tx1, None).unwrap().unwrap();
    one.txdb.confirm(&tx1.hash(), &block_meta).unwrap();

    let tx2 = fund(&two.addresses[0], 50 * COIN, 0xf0);
    two.txdb.add(&tx2, Some(&block_meta)).unwrap().unwrap();

    // Keys differ only in the embedded wallet id.
    fn strip_wid(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<(Vec<u8>, Vec<u8>)> {
        entries
            .into_iter()
            .map(|(key, value)| {
                let mut stripped = vec![key[0]];
                stripped.extend_from_slice(&key[5..]);
                (stripped, value)
            })
            .collect()
    }

    assert_eq!(
        strip_wid(one.txdb.dump().unwrap()),
        strip_wid(two.txdb.dump().unwrap()),
    );
}

#[test]
fn rbf_taint_propagates_until_confirmation() {
    let mut w = wallet();

    // T1 signals replace-by-fee via a low sequence number.
    let t1 = Transaction::new(
        1,
        vec![Input::PrevOut {
            outpoint: OutPoint::new(transaction::Hash([0xa0; 32]), 0),
            unlock_script: Script(Vec::new()),
            sequence: 0,
        }],
        vec![Output {
            value: Amount::from_sat(50 * COIN),
            lock_script: w.addresses[0].to_output_script(),
        }],
        LockTime::unlocked(),
    );
    let t1_hash = t1.hash();

    assert!(w.txdb.add(&t1, None).unwrap().is_none());
    assert!(w.txdb.get_tx(&t1_hash).unwrap().is_none());
    assert_balance(&w.txdb, 0, 0, 0, 0);

    // T2 does not signal, but spends tainted T1.
    let t2 = spend(
        OutPoint::new(t1_hash, 0),
        &[(&w.addresses[1], 40 * COIN)],
        SEQUENCE_FINAL,
    );
    assert!(w.txdb.add(&t2, None).unwrap().is_none());
    assert!(w.txdb.get_tx(&t2.hash()).unwrap().is_none());

    // T1 confirms; its taint is cleared and it is indexed.
    w.txdb.add(&t1, Some(&meta(150, 0xb9, 0))).unwrap().unwrap();
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 50 * COIN);

    let keys: Vec<Vec<u8>> = w.txdb.dump().unwrap().into_iter().map(|(key, _)| key).collect();
    assert!(!keys.contains(&layout::rbf(1, &t1_hash)));
    assert!(keys.contains(&layout::rbf(1, &t2.hash())));

    // With the parent taint gone, T2 can now enter the mempool index.
    w.txdb.add(&t2, None).unwrap().unwrap();
    assert_balance(&w.txdb, 2, 1, 40 * COIN, 50 * COIN);
    audit(&mut w.txdb);
}

#[test]
fn orphan_input_resolves_when_funding_tx_arrives() {
    let mut w = wallet_with(
        TxdbOptions {
            resolution: true,
            verify: true,
            network: Network::Regtest,
        },
        1,
    );

    let funding = fund(&w.spv_address, 50 * COIN, 0xf0);
    let funding_hash = funding.hash();

    // The spender arrives first: its input reveals our address on the
    // unlock script, so it is stashed rather than dropped.
    let mut unlock = vec![spv_redeem().0.len() as u8];
    unlock.extend_from_slice(&spv_redeem().0);
    let spender = Transaction::new(
        1,
        vec![Input::PrevOut {
            outpoint: OutPoint::new(funding_hash, 0),
            unlock_script: Script(unlock),
            sequence: SEQUENCE_FINAL,
        }],
        vec![Output {
            value: Amount::from_sat(30 * COIN),
            lock_script: w.addresses[1].to_output_script(),
        }],
        LockTime::unlocked(),
    );

    assert!(w.txdb.add(&spender, None).unwrap().is_none());
    assert_eq!(w.txdb.orphan_inputs(), 1);
    assert!(w.txdb.get_tx(&spender.hash()).unwrap().is_none());

    // The funding transaction arrives: the orphan is verified, un-stashed
    // and inserted.
    w.txdb.add(&funding, None).unwrap().unwrap();
    assert_eq!(w.txdb.orphan_inputs(), 0);
    assert!(w.txdb.get_tx(&spender.hash()).unwrap().is_some());
    assert_balance(&w.txdb, 2, 1, 30 * COIN, 0);
    audit(&mut w.txdb);
}

#[test]
fn orphan_table_overflow_purges_everything() {
    let mut w = wallet_with(
        TxdbOptions {
            resolution: true,
            verify: false,
            network: Network::Regtest,
        },
        1,
    );

    let mut unlock = vec![spv_redeem().0.len() as u8];
    unlock.extend_from_slice(&spv_redeem().0);

    for seed in 0..20u8 {
        let orphan = spend(
            OutPoint::new(transaction::Hash([seed; 32]), 0),
            &[(&w.addresses[0], COIN)],
            SEQUENCE_FINAL,
        );
        let orphan = Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint::new(transaction::Hash([seed; 32]), 0),
                unlock_script: Script(unlock.clone()),
                sequence: SEQUENCE_FINAL,
            }],
            orphan.outputs.clone(),
            LockTime::unlocked(),
        );
        assert!(w.txdb.add(&orphan, None).unwrap().is_none());
    }
    assert_eq!(w.txdb.orphan_inputs(), 20);

    let last = Transaction::new(
        1,
        vec![Input::PrevOut {
            outpoint: OutPoint::new(transaction::Hash([0xee; 32]), 0),
            unlock_script: Script(unlock),
            sequence: SEQUENCE_FINAL,
        }],
        vec![Output {
            value: Amount::from_sat(COIN),
            lock_script: w.addresses[0].to_output_script(),
        }],
        LockTime::unlocked(),
    );
    assert!(w.txdb.add(&last, None).unwrap().is_none());
    assert_eq!(w.txdb.orphan_inputs(), 0);
}

#[test]
fn abandon_requires_a_pending_transaction() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();

    w.txdb.add(&tx, None).unwrap().unwrap();
    w.txdb.abandon(&hash).expect("abandon pending");
    assert!(w.txdb.get_tx(&hash).unwrap().is_none());
    assert_balance(&w.txdb, 0, 0, 0, 0);

    match w.txdb.abandon(&hash) {
        Err(WalletError::NotPending(_)) => {}
        other => panic!("expected NotPending, got {:?}", other.map(|_| ())),
    }

    let confirmed = fund(&w.addresses[1], 10 * COIN, 0xf1);
    w.txdb.add(&confirmed, Some(&meta(90, 0xb0, 0))).unwrap().unwrap();
    match w.txdb.abandon(&confirmed.hash()) {
        Err(WalletError::NotPending(_)) => {}
        other => panic!("expected NotPending, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn zap_removes_stale_pending_transactions() {
    let mut w = wallet();

    let stale = fund(&w.addresses[0], 10 * COIN, 0xf0);
    w.txdb.add(&stale, None).unwrap().unwrap();

    let mined = fund(&w.addresses[1], 20 * COIN, 0xf1);
    w.txdb.add(&mined, Some(&meta(90, 0xb0, 0))).unwrap().unwrap();

    w.txdb.set_clock(late_clock);
    let zapped = w.txdb.zap(None, 600_000).expect("zap");

    assert_eq!(zapped, vec![stale.hash()]);
    assert!(w.txdb.get_tx(&stale.hash()).unwrap().is_none());
    assert!(w.txdb.get_tx(&mined.hash()).unwrap().is_some());
    audit(&mut w.txdb);
}

#[test]
fn locked_outpoints_are_transient_and_release_on_spend() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let outpoint = OutPoint::new(hash, 0);
    assert!(w.txdb.lock_coin(outpoint));
    assert!(w.txdb.is_locked(&outpoint));
    assert_eq!(w.txdb.locked_outpoints(), vec![outpoint]);

    let coins = w.txdb.get_coins().unwrap();
    assert!(w.txdb.filter_locked(coins).is_empty());

    // Ingesting a spend of the locked outpoint releases the lock.
    let spender = spend(outpoint, &[(&w.addresses[1], 25 * COIN)], SEQUENCE_FINAL);
    w.txdb.add(&spender, None).unwrap().unwrap();
    assert!(!w.txdb.is_locked(&outpoint));
}

#[test]
fn account_queries_partition_the_wallet() {
    let mut w = wallet();
    let default_addr = w.addresses[0];
    let savings_addr = w.addresses[4];

    let to_default = fund(&default_addr, 50 * COIN, 0xf0);
    w.txdb.add(&to_default, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let to_savings = fund(&savings_addr, 10 * COIN, 0xf1);
    w.txdb.add(&to_savings, None).unwrap().unwrap();

    let default_balance = w.txdb.get_account_balance(0).unwrap();
    assert_eq!(default_balance.tx, 1);
    assert_eq!(default_balance.coin, 1);
    assert_eq!(default_balance.unconfirmed, 50 * COIN);
    assert_eq!(default_balance.confirmed, 50 * COIN);

    let savings_balance = w.txdb.get_account_balance(1).unwrap();
    assert_eq!(savings_balance.tx, 1);
    assert_eq!(savings_balance.unconfirmed, 10 * COIN);
    assert_eq!(savings_balance.confirmed, 0);

    assert_eq!(
        w.txdb.get_account_history_hashes(0).unwrap(),
        vec![to_default.hash()],
    );
    assert_eq!(
        w.txdb.get_account_pending_hashes(1).unwrap(),
        vec![to_savings.hash()],
    );
    assert_eq!(
        w.txdb
            .get_account_height_range_hashes(0, &RangeQuery::default())
            .unwrap(),
        vec![to_default.hash()],
    );
    assert_eq!(w.txdb.get_account_coins(1).unwrap().len(), 1);
}

#[test]
fn range_queries_honor_bounds_limit_and_reverse() {
    let mut w = wallet();

    let low = fund(&w.addresses[0], COIN, 0xf0);
    w.txdb.add(&low, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let mid = fund(&w.addresses[1], COIN, 0xf1);
    w.txdb.add(&mid, Some(&meta(200, 0xb2, 0))).unwrap().unwrap();

    let high = fund(&w.addresses[2], COIN, 0xf2);
    w.txdb.add(&high, Some(&meta(300, 0xb3, 0))).unwrap().unwrap();

    let forward = w
        .txdb
        .get_height_range_hashes(&RangeQuery {
            start: 150,
            end: 300,
            limit: None,
            reverse: false,
        })
        .unwrap();
    assert_eq!(forward, vec![mid.hash(), high.hash()]);

    let reverse = w
        .txdb
        .get_height_range_hashes(&RangeQuery {
            start: 0,
            end: 300,
            limit: Some(2),
            reverse: true,
        })
        .unwrap();
    assert_eq!(reverse, vec![high.hash(), mid.hash()]);

    // All three share the same first-seen timestamp.
    let by_time = w.txdb.get_range_hashes(&RangeQuery::default()).unwrap();
    assert_eq!(by_time.len(), 3);
    assert!(w
        .txdb
        .get_range_hashes(&RangeQuery {
            start: early_clock() + 1,
            end: std::u32::MAX,
            limit: None,
            reverse: false,
        })
        .unwrap()
        .is_empty());
}

#[test]
fn coinbase_credits_are_flagged() {
    let mut w = wallet();

    let coinbase = Transaction::new(
        1,
        vec![Input::Coinbase {
            data: CoinbaseData::new(vec![0x01, 0x02]),
            sequence: SEQUENCE_FINAL,
        }],
        vec![Output {
            value: Amount::from_sat(50 * COIN),
            lock_script: w.addresses[0].to_output_script(),
        }],
        LockTime::unlocked(),
    );

    let details = w
        .txdb
        .add(&coinbase, Some(&meta(1, 0xb1, 0)))
        .unwrap()
        .unwrap();
    assert_eq!(details.fee(), None);

    let credits = w.txdb.get_credits().unwrap();
    assert!(credits[0].coin.coinbase);
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 50 * COIN);
    audit(&mut w.txdb);
}

#[test]
fn details_resolve_history_and_confirmations() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();

    let spender = spend(
        OutPoint::new(hash, 0),
        &[(&w.addresses[1], 25 * COIN)],
        SEQUENCE_FINAL,
    );
    let spender_hash = spender.hash();
    w.txdb.add(&spender, None).unwrap().unwrap();
    w.txdb.confirm(&spender_hash, &meta(101, 0xb2, 0)).unwrap();

    w.txdb.set_tip(block::Height(110));

    let details = w
        .txdb
        .get_details(&spender_hash)
        .unwrap()
        .expect("details for indexed tx");
    assert_eq!(details.fee(), Some(Amount::from_sat(25 * COIN)));
    assert_eq!(details.confirmations(w.txdb.tip()), 10);
    assert_eq!(details.accounts(), vec![0]);
    assert!(details.inputs[0].is_ours());
    assert_eq!(
        details.inputs[0].value,
        Some(Amount::from_sat(50 * COIN)),
    );

    // Unknown hashes are a benign no-match.
    assert!(w
        .txdb
        .get_details(&transaction::Hash([0xde; 32]))
        .unwrap()
        .is_none());
}

#[test]
fn promoting_a_pending_transaction_confirms_it() {
    let mut w = wallet();
    let tx = fund(&w.addresses[0], 50 * COIN, 0xf0);
    let hash = tx.hash();

    w.txdb.add(&tx, None).unwrap().unwrap();

    // Re-adding with a block promotes rather than re-inserting.
    w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().unwrap();
    assert_balance(&w.txdb, 1, 1, 50 * COIN, 50 * COIN);

    // Re-adding a confirmed transaction is a no-op.
    assert!(w.txdb.add(&tx, Some(&meta(100, 0xb1, 0))).unwrap().is_none());
    assert!(w.txdb.add(&tx, None).unwrap().is_none());
    assert!(w.txdb.get_tx(&hash).unwrap().is_some());
    audit(&mut w.txdb);
}
