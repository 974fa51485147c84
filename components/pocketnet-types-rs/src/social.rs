use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::TransactionIdentifier;

// OP_RETURN discriminators carried in the first output of a social
// transaction. Data pushes render as hex when the script is disassembled, so
// the tags are the hex encodings of the historical ASCII names.
pub const OR_POST: &str = "7368617265"; // share
pub const OR_POSTEDIT: &str = "736861726565646974"; // shareedit
pub const OR_VIDEO: &str = "766964656f"; // video
pub const OR_SERVER_PING: &str = "73657276657250696e67"; // serverPing
pub const OR_SCORE: &str = "7570766f74655368617265"; // upvoteShare
pub const OR_COMPLAIN: &str = "636f6d706c61696e5368617265"; // complainShare
pub const OR_SUBSCRIBE: &str = "737562736372696265"; // subscribe
pub const OR_SUBSCRIBEPRIVATE: &str = "73756273637269626550726976617465"; // subscribePrivate
pub const OR_UNSUBSCRIBE: &str = "756e737562736372696265"; // unsubscribe
pub const OR_USERINFO: &str = "75736572496e666f"; // userInfo
pub const OR_VIDEO_SERVER: &str = "766964656f536572766572"; // videoServer
pub const OR_MESSAGE_SERVER: &str = "6d657373616765536572766572"; // messageServer
pub const OR_BLOCKING: &str = "626c6f636b696e67"; // blocking
pub const OR_UNBLOCKING: &str = "756e626c6f636b696e67"; // unblocking
pub const OR_COMMENT: &str = "636f6d6d656e74"; // comment
pub const OR_COMMENT_EDIT: &str = "636f6d6d656e7445646974"; // commentEdit
pub const OR_COMMENT_DELETE: &str = "636f6d6d656e7444656c657465"; // commentDelete
pub const OR_COMMENT_SCORE: &str = "636f6d6d656e7453636f7265"; // commentScore

/// The closed set of social transaction kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    AccountUser,
    AccountVideoServer,
    AccountMessageServer,
    ContentPost,
    ContentVideo,
    ContentTranslate,
    ContentServerping,
    ContentComment,
    ContentCommentDelete,
    ActionScorePost,
    ActionScoreComment,
    ActionSubscribe,
    ActionSubscribePrivate,
    ActionSubscribeCancel,
    ActionBlocking,
    ActionBlockingCancel,
    ActionComplain,
    NotSupported,
}

impl TxKind {
    /// Stable textual tag, suitable for indexing and logging.
    pub fn tag(&self) -> &'static str {
        self.into()
    }
}

pub fn try_get_str(src: &Value, key: &str) -> Result<Option<String>, String> {
    match src.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("field {} is not a string", key)),
    }
}

pub fn try_get_i64(src: &Value, key: &str) -> Result<Option<i64>, String> {
    match src.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or(format!("field {} is out of range", key)),
        Some(_) => Err(format!("field {} is not an integer", key)),
    }
}

pub fn try_get_str_vec(src: &Value, key: &str) -> Result<Vec<String>, String> {
    match src.get(key) {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items.iter() {
                match item {
                    Value::String(s) => values.push(s.clone()),
                    _ => return Err(format!("field {} is not an array of strings", key)),
                }
            }
            Ok(values)
        }
        Some(_) => Err(format!("field {} is not an array of strings", key)),
    }
}

fn required_str(src: &Value, key: &str) -> Result<String, String> {
    try_get_str(src, key)?.ok_or(format!("missing required field {}", key))
}

fn required_i64(src: &Value, key: &str) -> Result<i64, String> {
    try_get_i64(src, key)?.ok_or(format!("missing required field {}", key))
}

/// Account registration / profile update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountUserData {
    pub address: String,
    pub referrer: Option<String>,
    pub name: Option<String>,
    pub lang: Option<String>,
    pub avatar: Option<String>,
    pub about: Option<String>,
    pub url: Option<String>,
}

impl AccountUserData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(AccountUserData {
            address: required_str(src, "address")?,
            referrer: try_get_str(src, "referrer")?,
            name: try_get_str(src, "name")?,
            lang: try_get_str(src, "lang")?,
            avatar: try_get_str(src, "avatar")?,
            about: try_get_str(src, "about")?,
            url: try_get_str(src, "url")?,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut result = serde_json::json!({ "address": self.address });
        push_opt_str(&mut result, "referrer", &self.referrer);
        push_opt_str(&mut result, "name", &self.name);
        push_opt_str(&mut result, "lang", &self.lang);
        push_opt_str(&mut result, "avatar", &self.avatar);
        push_opt_str(&mut result, "about", &self.about);
        push_opt_str(&mut result, "url", &self.url);
        result
    }
}

/// Post content. Also covers edits: an edit recomputes a fresh content hash
/// and carries the original's hash in `root_tx_hash`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentPostData {
    pub address: String,
    pub root_tx_hash: Option<String>,
    pub relay_tx_hash: Option<String>,
    pub lang: Option<String>,
    pub caption: Option<String>,
    pub message: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub url: Option<String>,
    pub settings: Option<String>,
}

impl ContentPostData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(ContentPostData {
            address: required_str(src, "address")?,
            root_tx_hash: try_get_str(src, "txidEdit")?,
            relay_tx_hash: try_get_str(src, "txidRepost")?,
            lang: try_get_str(src, "lang")?,
            caption: try_get_str(src, "caption")?,
            message: try_get_str(src, "message")?,
            tags: try_get_str_vec(src, "tags")?,
            images: try_get_str_vec(src, "images")?,
            url: try_get_str(src, "url")?,
            settings: try_get_str(src, "settings")?,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut result = serde_json::json!({ "address": self.address });
        push_opt_str(&mut result, "txidEdit", &self.root_tx_hash);
        push_opt_str(&mut result, "txidRepost", &self.relay_tx_hash);
        push_opt_str(&mut result, "lang", &self.lang);
        push_opt_str(&mut result, "caption", &self.caption);
        push_opt_str(&mut result, "message", &self.message);
        if !self.tags.is_empty() {
            result["tags"] = serde_json::json!(self.tags);
        }
        if !self.images.is_empty() {
            result["images"] = serde_json::json!(self.images);
        }
        push_opt_str(&mut result, "url", &self.url);
        push_opt_str(&mut result, "settings", &self.settings);
        result
    }
}

/// Comment content, shared by comment creation, edit and delete.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentCommentData {
    pub address: String,
    pub root_tx_hash: Option<String>,
    pub lang: Option<String>,
    pub post_tx_hash: Option<String>,
    pub message: Option<String>,
    pub parent_tx_hash: Option<String>,
    pub answer_tx_hash: Option<String>,
}

impl ContentCommentData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(ContentCommentData {
            address: required_str(src, "address")?,
            root_tx_hash: try_get_str(src, "otxid")?,
            lang: try_get_str(src, "lang")?,
            post_tx_hash: try_get_str(src, "postid")?,
            message: try_get_str(src, "msg")?,
            parent_tx_hash: try_get_str(src, "parentid")?,
            answer_tx_hash: try_get_str(src, "answerid")?,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut result = serde_json::json!({ "address": self.address });
        push_opt_str(&mut result, "otxid", &self.root_tx_hash);
        push_opt_str(&mut result, "lang", &self.lang);
        push_opt_str(&mut result, "postid", &self.post_tx_hash);
        push_opt_str(&mut result, "msg", &self.message);
        push_opt_str(&mut result, "parentid", &self.parent_tx_hash);
        push_opt_str(&mut result, "answerid", &self.answer_tx_hash);
        result
    }
}

/// Rating of a post, value in 1..=5.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScorePostData {
    pub address: String,
    pub content_tx_hash: String,
    pub value: i64,
}

impl ScorePostData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(ScorePostData {
            address: required_str(src, "address")?,
            content_tx_hash: required_str(src, "posttxid")?,
            value: required_i64(src, "value")?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "address": self.address,
            "posttxid": self.content_tx_hash,
            "value": self.value,
        })
    }
}

/// Rating of a comment, value in {-1, 1}.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreCommentData {
    pub address: String,
    pub comment_tx_hash: String,
    pub value: i64,
}

impl ScoreCommentData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(ScoreCommentData {
            address: required_str(src, "address")?,
            comment_tx_hash: required_str(src, "commentid")?,
            value: required_i64(src, "value")?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "address": self.address,
            "commentid": self.comment_tx_hash,
            "value": self.value,
        })
    }
}

/// Subscription edge between two accounts, shared by the subscribe,
/// subscribe-private and unsubscribe kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubscriptionData {
    pub address: String,
    pub address_to: String,
    pub lang: Option<String>,
}

impl SubscriptionData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(SubscriptionData {
            address: required_str(src, "address")?,
            address_to: required_str(src, "address_to")?,
            lang: try_get_str(src, "lang")?,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut result = serde_json::json!({
            "address": self.address,
            "address_to": self.address_to,
        });
        push_opt_str(&mut result, "lang", &self.lang);
        result
    }
}

/// Blocking edge between two accounts, shared by blocking and unblocking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockingData {
    pub address: String,
    pub address_to: String,
    pub lang: Option<String>,
}

impl BlockingData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(BlockingData {
            address: required_str(src, "address")?,
            address_to: required_str(src, "address_to")?,
            lang: try_get_str(src, "lang")?,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut result = serde_json::json!({
            "address": self.address,
            "address_to": self.address_to,
        });
        push_opt_str(&mut result, "lang", &self.lang);
        result
    }
}

/// Complaint about a piece of content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplainData {
    pub address: String,
    pub content_tx_hash: String,
    pub reason: i64,
}

impl ComplainData {
    pub fn from_json(src: &Value) -> Result<Self, String> {
        Ok(ComplainData {
            address: required_str(src, "address")?,
            content_tx_hash: required_str(src, "posttxid")?,
            reason: required_i64(src, "reason")?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "address": self.address,
            "posttxid": self.content_tx_hash,
            "reason": self.reason,
        })
    }
}

/// Tagged sum of the kind-specific payloads. Consumers pattern-match; there
/// is no virtual dispatch anywhere in the model.
#[derive(Debug, Clone, PartialEq)]
pub enum SocialPayload {
    User(AccountUserData),
    Post(ContentPostData),
    Comment(ContentCommentData),
    CommentDelete(ContentCommentData),
    ScorePost(ScorePostData),
    ScoreComment(ScoreCommentData),
    Subscribe(SubscriptionData),
    SubscribePrivate(SubscriptionData),
    SubscribeCancel(SubscriptionData),
    Blocking(BlockingData),
    BlockingCancel(BlockingData),
    Complain(ComplainData),
}

impl SocialPayload {
    pub fn kind(&self) -> TxKind {
        match self {
            SocialPayload::User(_) => TxKind::AccountUser,
            SocialPayload::Post(_) => TxKind::ContentPost,
            SocialPayload::Comment(_) => TxKind::ContentComment,
            SocialPayload::CommentDelete(_) => TxKind::ContentCommentDelete,
            SocialPayload::ScorePost(_) => TxKind::ActionScorePost,
            SocialPayload::ScoreComment(_) => TxKind::ActionScoreComment,
            SocialPayload::Subscribe(_) => TxKind::ActionSubscribe,
            SocialPayload::SubscribePrivate(_) => TxKind::ActionSubscribePrivate,
            SocialPayload::SubscribeCancel(_) => TxKind::ActionSubscribeCancel,
            SocialPayload::Blocking(_) => TxKind::ActionBlocking,
            SocialPayload::BlockingCancel(_) => TxKind::ActionBlockingCancel,
            SocialPayload::Complain(_) => TxKind::ActionComplain,
        }
    }

    /// Author / source address of the payload.
    pub fn address(&self) -> &str {
        match self {
            SocialPayload::User(data) => &data.address,
            SocialPayload::Post(data) => &data.address,
            SocialPayload::Comment(data) | SocialPayload::CommentDelete(data) => &data.address,
            SocialPayload::ScorePost(data) => &data.address,
            SocialPayload::ScoreComment(data) => &data.address,
            SocialPayload::Subscribe(data)
            | SocialPayload::SubscribePrivate(data)
            | SocialPayload::SubscribeCancel(data) => &data.address,
            SocialPayload::Blocking(data) | SocialPayload::BlockingCancel(data) => &data.address,
            SocialPayload::Complain(data) => &data.address,
        }
    }

    /// Root content id for post/comment payloads; `None` elsewhere.
    pub fn root_tx_hash(&self) -> Option<&str> {
        match self {
            SocialPayload::Post(data) => data.root_tx_hash.as_deref(),
            SocialPayload::Comment(data) | SocialPayload::CommentDelete(data) => {
                data.root_tx_hash.as_deref()
            }
            _ => None,
        }
    }

    /// The canonical byte string the content hash is computed over. Only the
    /// fixed per-kind field subset enters here; presentation fields never do.
    /// Absent optionals contribute the empty string, integers render in
    /// decimal.
    pub fn canonical_string(&self) -> String {
        let mut data = String::new();
        match self {
            SocialPayload::User(user) => {
                push_opt(&mut data, &user.referrer);
                push_opt(&mut data, &user.name);
                push_opt(&mut data, &user.avatar);
                push_opt(&mut data, &user.about);
                push_opt(&mut data, &user.url);
                push_opt(&mut data, &user.lang);
            }
            SocialPayload::Post(post) => {
                push_opt(&mut data, &post.url);
                push_opt(&mut data, &post.caption);
                push_opt(&mut data, &post.message);
                data.push_str(&post.tags.join(","));
                data.push_str(&post.images.join(","));
                push_opt(&mut data, &post.settings);
            }
            SocialPayload::Comment(comment) | SocialPayload::CommentDelete(comment) => {
                push_opt(&mut data, &comment.post_tx_hash);
                push_opt(&mut data, &comment.message);
                push_opt(&mut data, &comment.parent_tx_hash);
                push_opt(&mut data, &comment.answer_tx_hash);
            }
            SocialPayload::ScorePost(score) => {
                data.push_str(&score.content_tx_hash);
                data.push_str(&score.value.to_string());
            }
            SocialPayload::ScoreComment(score) => {
                data.push_str(&score.comment_tx_hash);
                data.push_str(&score.value.to_string());
            }
            SocialPayload::Subscribe(sub)
            | SocialPayload::SubscribePrivate(sub)
            | SocialPayload::SubscribeCancel(sub) => {
                data.push_str(&sub.address_to);
            }
            SocialPayload::Blocking(blocking) | SocialPayload::BlockingCancel(blocking) => {
                data.push_str(&blocking.address_to);
            }
            SocialPayload::Complain(complain) => {
                data.push_str(&complain.content_tx_hash);
                data.push_str(&complain.reason.to_string());
            }
        }
        data
    }

    /// Canonical content hash: SHA-256 over the canonical string, truncated
    /// to 20 bytes, hex-encoded. Two materializations of the same payload
    /// produce byte-identical canonical strings and therefore the same hash.
    pub fn canonical_hash(&self) -> String {
        let digest = Sha256::digest(self.canonical_string().as_bytes());
        hex::encode(&digest[..20])
    }

    pub fn to_json(&self) -> Value {
        match self {
            SocialPayload::User(data) => data.to_json(),
            SocialPayload::Post(data) => data.to_json(),
            SocialPayload::Comment(data) | SocialPayload::CommentDelete(data) => data.to_json(),
            SocialPayload::ScorePost(data) => data.to_json(),
            SocialPayload::ScoreComment(data) => data.to_json(),
            SocialPayload::Subscribe(data)
            | SocialPayload::SubscribePrivate(data)
            | SocialPayload::SubscribeCancel(data) => data.to_json(),
            SocialPayload::Blocking(data) | SocialPayload::BlockingCancel(data) => data.to_json(),
            SocialPayload::Complain(data) => data.to_json(),
        }
    }
}

/// A materialized social transaction: the chain txid it rode in on, its
/// time, the domain-computed content hash and the typed payload. Constructed
/// by the materializer, validated by consensus, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialTransaction {
    pub txid: TransactionIdentifier,
    pub time: i64,
    pub hash: String,
    pub payload: SocialPayload,
}

impl SocialTransaction {
    pub fn new(txid: TransactionIdentifier, time: i64, payload: SocialPayload) -> Self {
        let hash = payload.canonical_hash();
        SocialTransaction {
            txid,
            time,
            hash,
            payload,
        }
    }

    pub fn kind(&self) -> TxKind {
        self.payload.kind()
    }

    /// An edit carries the original content's hash as its root while its own
    /// hash covers the revised fields.
    pub fn is_edit(&self) -> bool {
        match self.payload.root_tx_hash() {
            Some(root) => root != self.hash,
            None => false,
        }
    }
}

/// The tuple the reputation checks operate on. Address ids are the store's
/// numeric surrogates, hashes are the textual addresses; historical
/// checkpoints count by one or the other, so both travel together.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreData {
    pub score_type: TxKind,
    pub score_address_id: i64,
    pub score_address_hash: String,
    pub content_address_id: i64,
    pub content_address_hash: String,
    pub content_tx_hash: String,
    pub value: i64,
}

fn push_opt(data: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        data.push_str(value);
    }
}

fn push_opt_str(result: &mut Value, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        result[key] = Value::String(value.clone());
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{
        ContentPostData, ScoreCommentData, SocialPayload, SocialTransaction, TxKind,
    };
    use crate::TransactionIdentifier;

    #[test]
    fn kind_tags_are_stable_and_unique() {
        use strum::IntoEnumIterator;
        let tags: Vec<&str> = TxKind::iter().map(|kind| kind.tag()).collect();
        let unique: std::collections::HashSet<&&str> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
        assert_eq!(TxKind::ActionScorePost.tag(), "ACTION_SCORE_POST");
        assert_eq!(TxKind::ContentCommentDelete.tag(), "CONTENT_COMMENT_DELETE");
    }

    #[test]
    fn comment_score_canonical_string_concatenates_txid_and_value() {
        let payload = SocialPayload::ScoreComment(ScoreCommentData {
            address: "PScore".to_string(),
            comment_tx_hash: "ab01".to_string(),
            value: -1,
        });
        assert_eq!(payload.canonical_string(), "ab01-1");
        assert_eq!(payload.canonical_hash().len(), 40);
    }

    #[test]
    fn canonical_hash_ignores_presentation_fields() {
        let src_a = json!({
            "address": "PAuthor",
            "caption": "title",
            "message": "body",
            "lang": "en",
        });
        let src_b = json!({
            "address": "PSomeoneElse",
            "caption": "title",
            "message": "body",
            "lang": "ru",
            "someFutureField": true,
        });
        let a = SocialPayload::Post(ContentPostData::from_json(&src_a).unwrap());
        let b = SocialPayload::Post(ContentPostData::from_json(&src_b).unwrap());
        assert_eq!(a.canonical_hash(), b.canonical_hash());
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let src = json!({ "address": "PAuthor", "caption": 42 });
        assert!(ContentPostData::from_json(&src).is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let src = json!({ "caption": "no author" });
        assert!(ContentPostData::from_json(&src).is_err());
    }

    #[test]
    fn edit_detection_compares_root_against_self_hash() {
        let original_payload = SocialPayload::Post(ContentPostData {
            address: "PAuthor".to_string(),
            message: Some("v1".to_string()),
            ..Default::default()
        });
        let original_hash = original_payload.canonical_hash();

        let original = SocialTransaction::new(
            TransactionIdentifier::new("aa"),
            100,
            SocialPayload::Post(ContentPostData {
                address: "PAuthor".to_string(),
                message: Some("v1".to_string()),
                root_tx_hash: Some(original_hash.clone()),
                ..Default::default()
            }),
        );
        assert!(!original.is_edit());

        let edit = SocialTransaction::new(
            TransactionIdentifier::new("bb"),
            200,
            SocialPayload::Post(ContentPostData {
                address: "PAuthor".to_string(),
                message: Some("v2".to_string()),
                root_tx_hash: Some(original_hash),
                ..Default::default()
            }),
        );
        assert!(edit.is_edit());
        assert_eq!(edit.kind(), TxKind::ContentPost);
    }
}
