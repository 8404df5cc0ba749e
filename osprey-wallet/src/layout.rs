//! Key layout for the wallet keyspace.
//!
//! Every wallet-scoped key starts with the namespace byte `t` followed by
//! the wallet id in big-endian, so a prefix scan stays inside one wallet.
//! The next byte selects the table:
//!
//! ```text
//! t[hash]                -> extended tx record
//! c[hash][index]         -> credit
//! d[hash][index]         -> undo coin, by spender outpoint
//! s[hash][index]         -> spent marker, value is the spender outpoint
//! p[hash]                -> pending (unconfirmed) flag
//! m[ps][hash]            -> tx by first-seen time
//! h[height][hash]        -> tx by height
//! T[account][hash]       -> tx by account
//! P[account][hash]       -> pending tx by account
//! M[account][ps][hash]   -> tx by account and first-seen time
//! H[account][height][hash] -> tx by account and height
//! C[account][hash][index] -> credit by account
//! r[hash]                -> replace-by-fee marker
//! b[height]              -> block record
//! R                      -> wallet balance state
//! ```
//!
//! Every ordered integer is big-endian so that lexicographic key order is
//! numeric order, which is what makes the range queries work.

use osprey_chain::transaction;

/// The namespace byte that starts every wallet-scoped key.
pub const NAMESPACE: u8 = 0x74;

/// Position of the table tag, after the namespace byte and the wallet id.
const TAG: usize = 5;

/// Length of the fixed key header: namespace, wallet id, tag.
const HEADER: usize = 6;

fn key(wid: u32, tag: u8, cap: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(HEADER + cap);
    key.push(NAMESPACE);
    key.extend_from_slice(&wid.to_be_bytes());
    key.push(tag);
    key
}

/// The prefix covering every key of one wallet.
pub fn wallet_prefix(wid: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(TAG);
    key.push(NAMESPACE);
    key.extend_from_slice(&wid.to_be_bytes());
    key
}

/// The prefix covering one table of one wallet.
pub fn table_prefix(wid: u32, tag: u8) -> Vec<u8> {
    key(wid, tag, 0)
}

pub fn tx(wid: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b't', 32);
    key.extend_from_slice(&hash.0);
    key
}

pub fn credit(wid: u32, hash: &transaction::Hash, index: u32) -> Vec<u8> {
    let mut key = key(wid, b'c', 36);
    key.extend_from_slice(&hash.0);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

pub fn undo(wid: u32, hash: &transaction::Hash, index: u32) -> Vec<u8> {
    let mut key = key(wid, b'd', 36);
    key.extend_from_slice(&hash.0);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// The prefix covering the undo coins of one spender.
pub fn undo_prefix(wid: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'd', 32);
    key.extend_from_slice(&hash.0);
    key
}

pub fn spent(wid: u32, hash: &transaction::Hash, index: u32) -> Vec<u8> {
    let mut key = key(wid, b's', 36);
    key.extend_from_slice(&hash.0);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

pub fn pending(wid: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'p', 32);
    key.extend_from_slice(&hash.0);
    key
}

pub fn by_time(wid: u32, ps: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'm', 36);
    key.extend_from_slice(&ps.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key
}

pub fn by_height(wid: u32, height: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'h', 36);
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key
}

pub fn account_tx(wid: u32, account: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'T', 36);
    key.extend_from_slice(&account.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key
}

pub fn account_pending(wid: u32, account: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'P', 36);
    key.extend_from_slice(&account.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key
}

pub fn account_time(wid: u32, account: u32, ps: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'M', 40);
    key.extend_from_slice(&account.to_be_bytes());
    key.extend_from_slice(&ps.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key
}

pub fn account_height(wid: u32, account: u32, height: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'H', 40);
    key.extend_from_slice(&account.to_be_bytes());
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key
}

pub fn account_credit(wid: u32, account: u32, hash: &transaction::Hash, index: u32) -> Vec<u8> {
    let mut key = key(wid, b'C', 40);
    key.extend_from_slice(&account.to_be_bytes());
    key.extend_from_slice(&hash.0);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// The prefix covering one account's tagged table (`T`, `P`, `M`, `H` or
/// `C`).
pub fn account_prefix(wid: u32, tag: u8, account: u32) -> Vec<u8> {
    let mut key = key(wid, tag, 4);
    key.extend_from_slice(&account.to_be_bytes());
    key
}

pub fn rbf(wid: u32, hash: &transaction::Hash) -> Vec<u8> {
    let mut key = key(wid, b'r', 32);
    key.extend_from_slice(&hash.0);
    key
}

pub fn block(wid: u32, height: u32) -> Vec<u8> {
    let mut key = key(wid, b'b', 4);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn state(wid: u32) -> Vec<u8> {
    key(wid, b'R', 0)
}

fn read_hash(bytes: &[u8]) -> transaction::Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(bytes);
    transaction::Hash(hash)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_be_bytes(buf)
}

/// Recover the hash from a `t`, `p` or `r` key.
pub fn parse_hash_key(key: &[u8]) -> transaction::Hash {
    assert_eq!(key.len(), HEADER + 32, "malformed hash key");
    read_hash(&key[HEADER..])
}

/// Recover the outpoint from a `c`, `d` or `s` key.
pub fn parse_outpoint_key(key: &[u8]) -> (transaction::Hash, u32) {
    assert_eq!(key.len(), HEADER + 36, "malformed outpoint key");
    (read_hash(&key[HEADER..HEADER + 32]), read_u32(&key[HEADER + 32..]))
}

/// Recover `(ps, hash)` from an `m` key, or `(height, hash)` from an `h`
/// key.
pub fn parse_ordered_key(key: &[u8]) -> (u32, transaction::Hash) {
    assert_eq!(key.len(), HEADER + 36, "malformed ordered key");
    (read_u32(&key[HEADER..HEADER + 4]), read_hash(&key[HEADER + 4..]))
}

/// Recover `(account, hash)` from a `T` or `P` key.
pub fn parse_account_hash_key(key: &[u8]) -> (u32, transaction::Hash) {
    parse_ordered_key(key)
}

/// Recover `(account, ps, hash)` from an `M` key, or `(account, height,
/// hash)` from an `H` key.
pub fn parse_account_ordered_key(key: &[u8]) -> (u32, u32, transaction::Hash) {
    assert_eq!(key.len(), HEADER + 40, "malformed account ordered key");
    (
        read_u32(&key[HEADER..HEADER + 4]),
        read_u32(&key[HEADER + 4..HEADER + 8]),
        read_hash(&key[HEADER + 8..]),
    )
}

/// Recover `(account, hash, index)` from a `C` key.
pub fn parse_account_outpoint_key(key: &[u8]) -> (u32, transaction::Hash, u32) {
    assert_eq!(key.len(), HEADER + 40, "malformed account outpoint key");
    (
        read_u32(&key[HEADER..HEADER + 4]),
        read_hash(&key[HEADER + 4..HEADER + 36]),
        read_u32(&key[HEADER + 36..]),
    )
}

/// Recover the height from a `b` key.
pub fn parse_block_key(key: &[u8]) -> u32 {
    assert_eq!(key.len(), HEADER + 4, "malformed block key");
    read_u32(&key[HEADER..])
}

/// The smallest key strictly greater than every key starting with
/// `prefix`.
///
/// An empty result means the prefix is all `0xff` bytes and the range is
/// unbounded above.
pub fn prefix_successor(prefix: &[u8]) -> Vec<u8> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.last_mut() {
        if *last == 0xff {
            bound.pop();
        } else {
            *last += 1;
            return bound;
        }
    }
    bound
}
