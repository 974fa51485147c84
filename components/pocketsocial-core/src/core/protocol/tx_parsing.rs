use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bitcoin::script::{Instruction, ScriptBuf};
use pocketnet_types::{
    try_get_i64, try_get_str, AccountUserData, BlockIdentifier, BlockingData, ComplainData,
    ContentCommentData, ContentPostData, RawTransactionData, ScoreCommentData, ScorePostData,
    SocialPayload, SocialTransaction, SubscriptionData, TransactionIdentifier, TxKind, OR_BLOCKING,
    OR_COMMENT, OR_COMMENT_DELETE, OR_COMMENT_EDIT, OR_COMMENT_SCORE, OR_COMPLAIN,
    OR_MESSAGE_SERVER, OR_POST, OR_POSTEDIT, OR_SCORE, OR_SERVER_PING, OR_SUBSCRIBE,
    OR_SUBSCRIBEPRIVATE, OR_UNBLOCKING, OR_UNSUBSCRIBE, OR_USERINFO, OR_VIDEO, OR_VIDEO_SERVER,
};
use serde_json::Value;
use std::fmt::Display;

use crate::try_warn;
use crate::utils::Context;

/// Per-transaction materialization failure. Both variants are non-fatal: the
/// transaction is not ingested by the social layer and block processing
/// continues.
#[derive(Debug, Clone, PartialEq)]
pub enum TxDecodeError {
    /// Payload or envelope malformed.
    Decode(String),
    /// Discriminator not recognized.
    UnknownKind(String),
}

impl Display for TxDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TxDecodeError::Decode(e) => write!(f, "unable to decode payload: {}", e),
            TxDecodeError::UnknownKind(tag) => write!(f, "unknown kind {}", tag),
        }
    }
}

/// Classifies a raw chain transaction by the `OP_RETURN` discriminator in its
/// first output. Total: any byte sequence that does not resolve yields
/// `TxKind::NotSupported`.
pub fn classify_from_chain(tx: &RawTransactionData) -> TxKind {
    let Some(txout) = tx.outputs.first() else {
        return TxKind::NotSupported;
    };
    let raw = txout
        .script_pubkey
        .strip_prefix("0x")
        .unwrap_or(&txout.script_pubkey);
    let Ok(script_bytes) = hex::decode(raw) else {
        return TxKind::NotSupported;
    };
    let vasm = script_asm_tokens(&ScriptBuf::from_bytes(script_bytes));
    match vasm.as_slice() {
        [op_return, tag, ..] if op_return == "OP_RETURN" => convert_op_return_tag(tag),
        _ => TxKind::NotSupported,
    }
}

/// Disassembles a script into whitespace-free asm tokens: opcodes by name,
/// data pushes as hex. A malformed tail truncates the token stream rather
/// than failing.
fn script_asm_tokens(script: &ScriptBuf) -> Vec<String> {
    let mut tokens = vec![];
    for instruction in script.instructions() {
        match instruction {
            Ok(Instruction::Op(op)) => tokens.push(op.to_string()),
            Ok(Instruction::PushBytes(push)) => tokens.push(hex::encode(push.as_bytes())),
            Err(_) => break,
        }
    }
    tokens
}

fn convert_op_return_tag(tag: &str) -> TxKind {
    match tag {
        OR_POST | OR_POSTEDIT => TxKind::ContentPost,
        OR_VIDEO => TxKind::ContentVideo,
        OR_SERVER_PING => TxKind::ContentServerping,
        OR_SCORE => TxKind::ActionScorePost,
        OR_COMPLAIN => TxKind::ActionComplain,
        OR_SUBSCRIBE => TxKind::ActionSubscribe,
        OR_SUBSCRIBEPRIVATE => TxKind::ActionSubscribePrivate,
        OR_UNSUBSCRIBE => TxKind::ActionSubscribeCancel,
        OR_USERINFO => TxKind::AccountUser,
        OR_VIDEO_SERVER => TxKind::AccountVideoServer,
        OR_MESSAGE_SERVER => TxKind::AccountMessageServer,
        OR_BLOCKING => TxKind::ActionBlocking,
        OR_UNBLOCKING => TxKind::ActionBlockingCancel,
        OR_COMMENT | OR_COMMENT_EDIT => TxKind::ContentComment,
        OR_COMMENT_DELETE => TxKind::ContentCommentDelete,
        OR_COMMENT_SCORE => TxKind::ActionScoreComment,
        _ => TxKind::NotSupported,
    }
}

/// Classifies a historical record stored by table name. `Blocking` and
/// `Subscribes` are split further by payload flags; a flag of the wrong JSON
/// type counts as absent.
pub fn classify_from_legacy(table: &str, payload: &Value) -> TxKind {
    match table {
        "Users" => TxKind::AccountUser,
        "Posts" => TxKind::ContentPost,
        "Comment" => TxKind::ContentComment,
        "Scores" => TxKind::ActionScorePost,
        "CommentScores" => TxKind::ActionScoreComment,
        "Complains" => TxKind::ActionComplain,
        "Blocking" => {
            if legacy_flag(payload, "unblocking") {
                TxKind::ActionBlockingCancel
            } else {
                TxKind::ActionBlocking
            }
        }
        "Subscribes" => {
            if legacy_flag(payload, "unsubscribe") {
                TxKind::ActionSubscribeCancel
            } else if legacy_flag(payload, "private") {
                TxKind::ActionSubscribePrivate
            } else {
                TxKind::ActionSubscribe
            }
        }
        _ => TxKind::NotSupported,
    }
}

fn legacy_flag(src: &Value, key: &str) -> bool {
    matches!(src.get(key), Some(Value::Bool(true)))
}

/// Builds the typed model for one payload envelope `{"t": <table>, "d":
/// <base64(payload-json)>}`. Returns `Ok(None)` for kinds the social layer
/// recognizes but does not materialize.
pub fn build_instance(
    txid: &TransactionIdentifier,
    envelope: &Value,
) -> Result<Option<SocialTransaction>, TxDecodeError> {
    let table = try_get_str(envelope, "t")
        .map_err(TxDecodeError::Decode)?
        .ok_or(TxDecodeError::Decode("missing envelope field t".to_string()))?;
    let encoded = try_get_str(envelope, "d")
        .map_err(TxDecodeError::Decode)?
        .ok_or(TxDecodeError::Decode("missing envelope field d".to_string()))?;
    let decoded = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| TxDecodeError::Decode(format!("envelope field d: {}", e)))?;
    let payload_src: Value = serde_json::from_slice(&decoded)
        .map_err(|e| TxDecodeError::Decode(format!("payload json: {}", e)))?;

    let payload = match classify_from_legacy(&table, &payload_src) {
        TxKind::AccountUser => SocialPayload::User(
            AccountUserData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ContentPost => SocialPayload::Post(
            ContentPostData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ContentComment => SocialPayload::Comment(
            ContentCommentData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ContentCommentDelete => SocialPayload::CommentDelete(
            ContentCommentData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionScorePost => SocialPayload::ScorePost(
            ScorePostData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionScoreComment => SocialPayload::ScoreComment(
            ScoreCommentData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionSubscribe => SocialPayload::Subscribe(
            SubscriptionData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionSubscribePrivate => SocialPayload::SubscribePrivate(
            SubscriptionData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionSubscribeCancel => SocialPayload::SubscribeCancel(
            SubscriptionData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionBlocking => SocialPayload::Blocking(
            BlockingData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionBlockingCancel => SocialPayload::BlockingCancel(
            BlockingData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::ActionComplain => SocialPayload::Complain(
            ComplainData::from_json(&payload_src).map_err(TxDecodeError::Decode)?,
        ),
        TxKind::AccountVideoServer
        | TxKind::AccountMessageServer
        | TxKind::ContentVideo
        | TxKind::ContentTranslate
        | TxKind::ContentServerping => return Ok(None),
        TxKind::NotSupported => return Err(TxDecodeError::UnknownKind(table)),
    };

    let time = try_get_i64(&payload_src, "time")
        .map_err(TxDecodeError::Decode)?
        .unwrap_or(0);
    Ok(Some(SocialTransaction::new(txid.clone(), time, payload)))
}

/// Inverse of `build_instance`: re-serializes a materialized transaction into
/// its payload envelope. Only kinds with a historical table representation
/// serialize; comment deletion exists on-chain only.
pub fn serialize_instance(tx: &SocialTransaction) -> Result<Value, String> {
    let table = legacy_table_for_kind(tx.kind())
        .ok_or(format!("kind {} has no table representation", tx.kind().tag()))?;
    let mut payload = tx.payload.to_json();
    payload["time"] = serde_json::json!(tx.time);
    match tx.payload {
        SocialPayload::SubscribePrivate(_) => payload["private"] = serde_json::json!(true),
        SocialPayload::SubscribeCancel(_) => payload["unsubscribe"] = serde_json::json!(true),
        SocialPayload::BlockingCancel(_) => payload["unblocking"] = serde_json::json!(true),
        _ => {}
    }
    let bytes =
        serde_json::to_vec(&payload).map_err(|e| format!("unable to serialize payload: {}", e))?;
    Ok(serde_json::json!({
        "t": table,
        "d": BASE64.encode(&bytes),
    }))
}

fn legacy_table_for_kind(kind: TxKind) -> Option<&'static str> {
    match kind {
        TxKind::AccountUser => Some("Users"),
        TxKind::ContentPost => Some("Posts"),
        TxKind::ContentComment => Some("Comment"),
        TxKind::ActionScorePost => Some("Scores"),
        TxKind::ActionScoreComment => Some("CommentScores"),
        TxKind::ActionSubscribe | TxKind::ActionSubscribePrivate | TxKind::ActionSubscribeCancel => {
            Some("Subscribes")
        }
        TxKind::ActionBlocking | TxKind::ActionBlockingCancel => Some("Blocking"),
        TxKind::ActionComplain => Some("Complains"),
        _ => None,
    }
}

/// Decodes the out-of-band social payload of one block: a JSON object keyed
/// by chain txid, each value a JSON string holding a payload envelope.
/// Entries that fail to decode or classify are skipped, never fatal.
pub fn deserialize_block(
    block_identifier: &BlockIdentifier,
    src: &str,
    ctx: &Context,
) -> Vec<SocialTransaction> {
    let parsed: Value = match serde_json::from_str(src) {
        Ok(parsed) => parsed,
        Err(e) => {
            try_warn!(
                ctx,
                "Unable to parse social payload at {}: {}",
                block_identifier,
                e
            );
            return vec![];
        }
    };
    let Some(entries) = parsed.as_object() else {
        try_warn!(ctx, "Social payload at {} is not an object", block_identifier);
        return vec![];
    };

    let mut social_txn = vec![];
    for (txid, entry_src) in entries.iter() {
        let Some(entry_str) = entry_src.as_str() else {
            try_warn!(ctx, "Social payload entry {} is not a string", txid);
            continue;
        };
        let envelope: Value = match serde_json::from_str(entry_str) {
            Ok(envelope) => envelope,
            Err(e) => {
                try_warn!(ctx, "Social payload entry {} malformed: {}", txid, e);
                continue;
            }
        };
        match build_instance(&TransactionIdentifier::new(txid), &envelope) {
            Ok(Some(tx)) => social_txn.push(tx),
            Ok(None) => {}
            Err(e) => {
                try_warn!(ctx, "Social tx {} skipped: {}", txid, e);
            }
        }
    }
    social_txn
}

#[cfg(test)]
mod test {
    use pocketnet_types::{
        BlockIdentifier, SocialPayload, TransactionIdentifier, TxKind, OR_COMMENT_SCORE, OR_POST,
        OR_POSTEDIT, OR_SCORE, OR_UNBLOCKING, OR_USERINFO,
    };
    use serde_json::json;
    use test_case::test_case;

    use crate::core::test_builders::{TestEnvelopeBuilder, TestTransactionBuilder};
    use crate::utils::Context;

    use super::{
        build_instance, classify_from_chain, classify_from_legacy, deserialize_block,
        serialize_instance, TxDecodeError,
    };

    #[test]
    fn classifies_comment_score_from_op_return() {
        let tx = TestTransactionBuilder::new()
            .add_op_return_output(&[OR_COMMENT_SCORE, "deadbeef"])
            .build();
        assert_eq!(classify_from_chain(&tx), TxKind::ActionScoreComment);
    }

    #[test_case(OR_POST => TxKind::ContentPost)]
    #[test_case(OR_POSTEDIT => TxKind::ContentPost)]
    #[test_case(OR_SCORE => TxKind::ActionScorePost)]
    #[test_case(OR_USERINFO => TxKind::AccountUser)]
    #[test_case(OR_UNBLOCKING => TxKind::ActionBlockingCancel)]
    #[test_case("00ff00" => TxKind::NotSupported)]
    fn classifies_op_return_tags(tag: &str) -> TxKind {
        let tx = TestTransactionBuilder::new()
            .add_op_return_output(&[tag])
            .build();
        classify_from_chain(&tx)
    }

    #[test]
    fn classification_is_total_over_arbitrary_scripts() {
        let scripts = [
            "",
            "0x",
            "6a",
            "0x6a",
            "not-hex-at-all",
            "0x76a914000000000000000000000000000000000000000088ac",
            "0x6aff",
            "0x6a4d",
        ];
        for script in scripts {
            let tx = TestTransactionBuilder::new()
                .add_output(0, script)
                .build();
            assert_eq!(classify_from_chain(&tx), TxKind::NotSupported);
        }
        let no_outputs = TestTransactionBuilder::new().build();
        assert_eq!(classify_from_chain(&no_outputs), TxKind::NotSupported);
    }

    #[test_case("Users", json!({}) => TxKind::AccountUser)]
    #[test_case("Scores", json!({}) => TxKind::ActionScorePost)]
    #[test_case("CommentScores", json!({}) => TxKind::ActionScoreComment)]
    #[test_case("Blocking", json!({}) => TxKind::ActionBlocking)]
    #[test_case("Blocking", json!({"unblocking": true}) => TxKind::ActionBlockingCancel)]
    #[test_case("Blocking", json!({"unblocking": "yes"}) => TxKind::ActionBlocking; "non boolean flag counts as absent")]
    #[test_case("Subscribes", json!({"unsubscribe": false, "private": true}) => TxKind::ActionSubscribePrivate)]
    #[test_case("Subscribes", json!({"unsubscribe": true, "private": true}) => TxKind::ActionSubscribeCancel)]
    #[test_case("Subscribes", json!({}) => TxKind::ActionSubscribe)]
    #[test_case("Reposts", json!({}) => TxKind::NotSupported)]
    fn classifies_legacy_tables(table: &str, payload: serde_json::Value) -> TxKind {
        classify_from_legacy(table, &payload)
    }

    #[test]
    fn builds_comment_score_instance() {
        let envelope = TestEnvelopeBuilder::new(
            "CommentScores",
            json!({
                "address": "PScorer",
                "commentid": "ab01",
                "value": 1,
                "time": 1586785200,
            }),
        )
        .build();
        let txid = TransactionIdentifier::new("aa11");
        let tx = build_instance(&txid, &envelope).unwrap().unwrap();
        assert_eq!(tx.kind(), TxKind::ActionScoreComment);
        assert_eq!(tx.time, 1586785200);
        let SocialPayload::ScoreComment(ref score) = tx.payload else {
            panic!();
        };
        assert_eq!(score.comment_tx_hash, "ab01");
        assert_eq!(score.value, 1);
    }

    #[test]
    fn build_reports_unknown_table() {
        let envelope = TestEnvelopeBuilder::new("Reposts", json!({})).build();
        let txid = TransactionIdentifier::new("aa11");
        assert_eq!(
            build_instance(&txid, &envelope),
            Err(TxDecodeError::UnknownKind("Reposts".to_string()))
        );
    }

    #[test]
    fn build_reports_malformed_payload() {
        let envelope = json!({ "t": "Scores", "d": "not base64!!" });
        let txid = TransactionIdentifier::new("aa11");
        assert!(matches!(
            build_instance(&txid, &envelope),
            Err(TxDecodeError::Decode(_))
        ));
    }

    #[test]
    fn materialization_round_trips() {
        let envelope = TestEnvelopeBuilder::new(
            "Subscribes",
            json!({
                "address": "PSource",
                "address_to": "PTarget",
                "private": true,
                "time": 100,
            }),
        )
        .build();
        let txid = TransactionIdentifier::new("aa11");
        let tx = build_instance(&txid, &envelope).unwrap().unwrap();
        assert_eq!(tx.kind(), TxKind::ActionSubscribePrivate);

        let reserialized = serialize_instance(&tx).unwrap();
        let rebuilt = build_instance(&txid, &reserialized).unwrap().unwrap();
        assert_eq!(rebuilt, tx);
    }

    #[test]
    fn block_decode_skips_bad_entries() {
        let ctx = Context::empty();
        let score_envelope = TestEnvelopeBuilder::new(
            "Scores",
            json!({ "address": "PScorer", "posttxid": "cc01", "value": 5, "time": 7 }),
        )
        .build();
        let unknown_envelope = TestEnvelopeBuilder::new("Reposts", json!({})).build();
        let blob = json!({
            "aa01": score_envelope.to_string(),
            "aa02": unknown_envelope.to_string(),
            "aa03": "not json",
            "aa04": 42,
        })
        .to_string();

        let block = BlockIdentifier {
            index: 1000,
            hash: "0xff".to_string(),
        };
        let social_txn = deserialize_block(&block, &blob, &ctx);
        assert_eq!(social_txn.len(), 1);
        assert_eq!(social_txn[0].kind(), TxKind::ActionScorePost);
        assert_eq!(social_txn[0].txid, TransactionIdentifier::new("aa01"));
    }
}
