use pocketnet_types::TxKind;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

pub const RATING_ACCOUNT: i64 = 0;
pub const RATING_ACCOUNT_LIKERS: i64 = 1;

/// Read-only query port the consensus engine consumes. Every query must be
/// snapshot-consistent with the chain state strictly below the height under
/// validation; `Ok(None)` means no data, `Err` means the store failed.
/// Callers treat both as grounds to deny a reputation modification.
pub trait RatingsReader {
    /// Cached reputation of an address as of the given height.
    fn user_reputation(&self, address_id: i64, as_of_height: u64) -> Result<Option<i64>, String>;

    /// Number of distinct likers of an address as of the given height.
    fn user_likers_count(&self, address_id: i64, as_of_height: u64) -> Result<Option<i64>, String>;

    /// Number of prior scores of `score_kind` from one address to another
    /// with `value` in `values`, inside the trailing `window_seconds` window
    /// ending at `window_end_time`, excluding the transaction currently being
    /// validated.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<Option<i64>, String>;
}

/// Ratings port over the node-local SQLite index. Statements are prepared
/// once and reused; rusqlite resets and finalizes them on drop, so every exit
/// path releases its handle.
pub struct SqliteRatingsReader {
    conn: Connection,
}

impl SqliteRatingsReader {
    pub fn new(conn: Connection) -> Self {
        SqliteRatingsReader { conn }
    }
}

impl RatingsReader for SqliteRatingsReader {
    fn user_reputation(&self, address_id: i64, as_of_height: u64) -> Result<Option<i64>, String> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT value FROM ratings
                 WHERE rating_type = ?1 AND address_id = ?2 AND height < ?3
                 ORDER BY height DESC LIMIT 1",
            )
            .map_err(|e| format!("unable to prepare ratings query: {}", e))?;
        stmt.query_row(
            params![RATING_ACCOUNT, address_id, as_of_height as i64],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("unable to query ratings: {}", e))
    }

    // Likers accumulate one row per liker, so the count is well defined even
    // for accounts nobody liked yet.
    fn user_likers_count(&self, address_id: i64, as_of_height: u64) -> Result<Option<i64>, String> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT COUNT(*) FROM ratings
                 WHERE rating_type = ?1 AND address_id = ?2 AND height < ?3",
            )
            .map_err(|e| format!("unable to prepare likers query: {}", e))?;
        let count: i64 = stmt
            .query_row(
                params![RATING_ACCOUNT_LIKERS, address_id, as_of_height as i64],
                |row| row.get(0),
            )
            .map_err(|e| format!("unable to query likers: {}", e))?;
        Ok(Some(count))
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
        if values.is_empty() {
            return Ok(Some(0));
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM scores
             WHERE score_type = ? AND score_address_hash = ? AND content_address_hash = ?
               AND height < ? AND tx_hash != ? AND time >= ?
               AND value IN ({})",
            placeholders
        );
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| format!("unable to prepare scores query: {}", e))?;

        let mut bindings: Vec<SqlValue> = vec![
            SqlValue::Text(score_kind.tag().to_string()),
            SqlValue::Text(score_address_hash.to_string()),
            SqlValue::Text(content_address_hash.to_string()),
            SqlValue::Integer(as_of_height as i64),
            SqlValue::Text(excluding_txid.to_string()),
            SqlValue::Integer(window_end_time - window_seconds),
        ];
        for value in values.iter() {
            bindings.push(SqlValue::Integer(*value));
        }

        let count: i64 = stmt
            .query_row(params_from_iter(bindings), |row| row.get(0))
            .map_err(|e| format!("unable to query scores: {}", e))?;
        Ok(Some(count))
    }
}
