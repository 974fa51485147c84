use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// BlockIdentifier uniquely identifies a block in a particular network.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BlockIdentifier {
    /// Also known as the block height.
    pub index: u64,
    pub hash: String,
}

impl BlockIdentifier {
    pub fn get_hash_bytes_str(&self) -> &str {
        &self.hash[2..]
    }

    pub fn get_hash_bytes(&self) -> Vec<u8> {
        hex::decode(self.get_hash_bytes_str()).unwrap()
    }
}

impl Display for BlockIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Block #{}", self.index)
    }
}

impl Hash for BlockIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl Ord for BlockIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.index, &other.hash).cmp(&(self.index, &self.hash))
    }
}

impl PartialOrd for BlockIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(other.cmp(self))
    }
}

impl PartialEq for BlockIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for BlockIdentifier {}

/// The transaction_identifier uniquely identifies a transaction in a particular
/// network and block or in the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Hash, PartialOrd, Ord)]
pub struct TransactionIdentifier {
    pub hash: String,
}

impl TransactionIdentifier {
    pub fn new(txid: &str) -> Self {
        let lowercased_txid = txid.to_lowercase();
        Self {
            hash: match lowercased_txid.starts_with("0x") {
                true => lowercased_txid,
                false => format!("0x{}", lowercased_txid),
            },
        }
    }

    pub fn get_hash_bytes_str(&self) -> &str {
        &self.hash[2..]
    }

    pub fn get_hash_bytes(&self) -> Vec<u8> {
        hex::decode(self.get_hash_bytes_str()).unwrap()
    }
}

impl Display for TransactionIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Raw view of a transaction output, with the locking script as a 0x-prefixed
/// hex string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawTxOut {
    pub value: u64,
    pub script_pubkey: String,
}

impl RawTxOut {
    pub fn get_script_bytes_str(&self) -> &str {
        &self.script_pubkey[2..]
    }

    pub fn get_script_bytes(&self) -> Vec<u8> {
        hex::decode(self.get_script_bytes_str()).unwrap()
    }
}

/// Raw view of a chain transaction, restricted to the parts the social layer
/// inspects. The block-processing pipeline of the host chain produces these.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawTransactionData {
    pub transaction_identifier: TransactionIdentifier,
    /// Transaction time, in seconds since the Unix Epoch.
    pub timestamp: i64,
    pub outputs: Vec<RawTxOut>,
}

#[cfg(test)]
mod test {
    use super::{BlockIdentifier, TransactionIdentifier};

    #[test]
    fn normalizes_txid_casing_and_prefix() {
        let txid = TransactionIdentifier::new("ABCDEF0123");
        assert_eq!(txid.hash, "0xabcdef0123");
        assert_eq!(txid.get_hash_bytes_str(), "abcdef0123");

        let already_prefixed = TransactionIdentifier::new("0xabcdef0123");
        assert_eq!(already_prefixed, txid);
    }

    #[test]
    fn orders_blocks_by_descending_index() {
        let older = BlockIdentifier {
            index: 1,
            hash: "0x01".to_string(),
        };
        let newer = BlockIdentifier {
            index: 2,
            hash: "0x02".to_string(),
        };
        assert!(newer < older);
    }
}
