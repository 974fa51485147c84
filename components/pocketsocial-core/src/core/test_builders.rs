use std::cell::RefCell;
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::script::{Builder, PushBytesBuf};
use pocketnet_types::{RawTransactionData, RawTxOut, TransactionIdentifier, TxKind};
use serde_json::Value;

use crate::db::ratings::RatingsReader;

pub struct TestTransactionBuilder {
    txid: String,
    timestamp: i64,
    outputs: Vec<RawTxOut>,
}

impl TestTransactionBuilder {
    pub fn new() -> Self {
        TestTransactionBuilder {
            txid: "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735".to_string(),
            timestamp: 1_586_785_200,
            outputs: vec![],
        }
    }

    pub fn txid(mut self, txid: &str) -> Self {
        self.txid = txid.to_string();
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn add_output(mut self, value: u64, script_pubkey: &str) -> Self {
        self.outputs.push(RawTxOut {
            value,
            script_pubkey: script_pubkey.to_string(),
        });
        self
    }

    /// Appends an `OP_RETURN` output pushing each hex token as one datum, the
    /// way social transactions carry their discriminator.
    pub fn add_op_return_output(mut self, hex_tokens: &[&str]) -> Self {
        let mut builder = Builder::new().push_opcode(OP_RETURN);
        for token in hex_tokens {
            let data = PushBytesBuf::try_from(hex::decode(token).unwrap()).unwrap();
            builder = builder.push_slice(data);
        }
        let script = builder.into_script();
        self.outputs.push(RawTxOut {
            value: 0,
            script_pubkey: format!("0x{}", hex::encode(script.as_bytes())),
        });
        self
    }

    pub fn build(self) -> RawTransactionData {
        RawTransactionData {
            transaction_identifier: TransactionIdentifier::new(&self.txid),
            timestamp: self.timestamp,
            outputs: self.outputs,
        }
    }
}

pub struct TestEnvelopeBuilder {
    table: String,
    payload: Value,
}

impl TestEnvelopeBuilder {
    pub fn new(table: &str, payload: Value) -> Self {
        TestEnvelopeBuilder {
            table: table.to_string(),
            payload,
        }
    }

    pub fn build(self) -> Value {
        serde_json::json!({
            "t": self.table,
            "d": BASE64.encode(serde_json::to_vec(&self.payload).unwrap()),
        })
    }
}

/// Arguments of the last `score_content_count` query, recorded so tests can
/// assert on counted addresses, value sets and windows.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedScoreQuery {
    pub score_kind: TxKind,
    pub score_address_hash: String,
    pub content_address_hash: String,
    pub as_of_height: u64,
    pub excluding_txid: String,
    pub window_end_time: i64,
    pub values: Vec<i64>,
    pub window_seconds: i64,
}

/// Scripted ratings port for consensus tests.
pub struct TestRatingsStore {
    reputation: HashMap<i64, i64>,
    likers: HashMap<i64, i64>,
    score_count: Option<i64>,
    unavailable: bool,
    pub last_score_query: RefCell<Option<RecordedScoreQuery>>,
}

impl TestRatingsStore {
    pub fn new() -> Self {
        TestRatingsStore {
            reputation: HashMap::new(),
            likers: HashMap::new(),
            score_count: Some(0),
            unavailable: false,
            last_score_query: RefCell::new(None),
        }
    }

    pub fn with_reputation(mut self, address_id: i64, value: i64) -> Self {
        self.reputation.insert(address_id, value);
        self
    }

    pub fn with_likers(mut self, address_id: i64, value: i64) -> Self {
        self.likers.insert(address_id, value);
        self
    }

    pub fn with_score_count(mut self, count: i64) -> Self {
        self.score_count = Some(count);
        self
    }

    pub fn with_score_count_unavailable(mut self) -> Self {
        self.score_count = None;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl RatingsReader for TestRatingsStore {
    fn user_reputation(&self, address_id: i64, _as_of_height: u64) -> Result<Option<i64>, String> {
        if self.unavailable {
            return Err("store unavailable".to_string());
        }
        Ok(self.reputation.get(&address_id).copied())
    }

    fn user_likers_count(
        &self,
        address_id: i64,
        _as_of_height: u64,
    ) -> Result<Option<i64>, String> {
        if self.unavailable {
            return Err("store unavailable".to_string());
        }
        // A liker-less account is still an account: absent means zero here,
        // absence of the account itself is modeled through `reputation`.
        Ok(Some(self.likers.get(&address_id).copied().unwrap_or(0)))
    }

    fn score_content_count(
        &self,
        score_kind: TxKind,
        score_address_hash: &str,
        content_address_hash: &str,
        as_of_height: u64,
        excluding_txid: &str,
        window_end_time: i64,
        values: &[i64],
        window_seconds: i64,
    ) -> Result<Option<i64>, String> {
        if self.unavailable {
            return Err("store unavailable".to_string());
        }
        *self.last_score_query.borrow_mut() = Some(RecordedScoreQuery {
            score_kind,
            score_address_hash: score_address_hash.to_string(),
            content_address_hash: content_address_hash.to_string(),
            as_of_height,
            excluding_txid: excluding_txid.to_string(),
            window_end_time,
            values: values.to_vec(),
            window_seconds,
        });
        Ok(self.score_count)
    }
}
