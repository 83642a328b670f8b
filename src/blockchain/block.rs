use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::transaction::Transaction;

/// `previous_hash` of the genesis block; never computed.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
pub const GENESIS_PROOF: u64 = 100;

/// A single block in the chain. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64, // Unix timestamp (UTC)
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
    /// Sum of the contained transaction sizes.
    pub size: u64,
    pub miner_id: String,
}

impl Block {
    /// The genesis block. Every field is fixed so all nodes share it.
    pub fn genesis() -> Self {
        Self {
            index: 1,
            timestamp: 0,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            size: 0,
            miner_id: String::new(),
        }
    }

    /// Build the block that follows `last` once `proof` has been found for it.
    pub fn forge(last: &Block, transactions: Vec<Transaction>, proof: u64, miner_id: &str) -> Self {
        Self {
            index: last.index + 1,
            timestamp: Utc::now().timestamp(),
            size: total_size(&transactions),
            transactions,
            proof,
            previous_hash: last.hash(),
            miner_id: miner_id.to_string(),
        }
    }

    /// SHA-256 (lowercase hex) of the canonical serialization: compact JSON
    /// with object keys sorted at every level.
    pub fn hash(&self) -> String {
        let value = serde_json::to_value(self).expect("serialize block");
        let mut hasher = Sha256::new();
        hasher.update(canonical_json(&value).as_bytes());
        hex::encode(hasher.finalize())
    }
}

pub fn total_size(transactions: &[Transaction]) -> u64 {
    transactions.iter().map(|t| u64::from(t.size)).sum()
}

/// Compact JSON with lexicographically sorted object keys. Independent of
/// the map type serde_json was built with.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_HASH: &str = "622ecca03fde9a063b2bbf9ee88be2c5375d430384be0a01e1c0659a1e1833d6";

    fn sample_block() -> Block {
        Block {
            index: 2,
            timestamp: 1_700_000_000,
            transactions: vec![Transaction {
                id: "abc".into(),
                sender: "alice".into(),
                recipient: "bob".into(),
                amount: 5,
                size: 40,
            }],
            proof: 7,
            previous_hash: GENESIS_HASH.into(),
            size: 40,
            miner_id: "w1".into(),
        }
    }

    #[test]
    fn genesis_hash_is_fixed() {
        assert_eq!(Block::genesis().hash(), GENESIS_HASH);
    }

    #[test]
    fn canonical_form_sorts_keys() {
        let json = canonical_json(&serde_json::to_value(sample_block()).unwrap());
        assert_eq!(
            json,
            format!(
                r#"{{"index":2,"miner_id":"w1","previous_hash":"{GENESIS_HASH}","proof":7,"size":40,"timestamp":1700000000,"transactions":[{{"amount":5,"id":"abc","recipient":"bob","sender":"alice","size":40}}]}}"#
            )
        );
    }

    #[test]
    fn hash_matches_reference_digest() {
        // Digest produced by an independent sorted-keys JSON encoder.
        assert_eq!(
            sample_block().hash(),
            "7dbcd33665731f801ca3a78954d069b0e5a8476dc79581d4a2becf061cf4e7e4"
        );
    }

    #[test]
    fn hash_is_deterministic() {
        let b = sample_block();
        assert_eq!(b.hash(), b.hash());
        assert_eq!(b.hash(), b.clone().hash());
    }

    #[test]
    fn hash_depends_on_transaction_order() {
        let mut b = sample_block();
        b.transactions.push(Transaction {
            id: "def".into(),
            sender: "carol".into(),
            recipient: "dave".into(),
            amount: 1,
            size: 10,
        });
        let before = b.hash();
        b.transactions.reverse();
        assert_ne!(before, b.hash());
    }

    #[test]
    fn forge_links_to_last_block() {
        let genesis = Block::genesis();
        let txs = vec![
            Transaction::new("a".into(), "b".into(), 1, 30),
            Transaction::new("c".into(), "d".into(), 2, 12),
        ];
        let b = Block::forge(&genesis, txs, 173, "miner-1");
        assert_eq!(b.index, 2);
        assert_eq!(b.previous_hash, GENESIS_HASH);
        assert_eq!(b.size, 42);
        assert_eq!(b.miner_id, "miner-1");
    }
}
