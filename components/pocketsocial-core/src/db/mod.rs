pub mod ratings;

use rusqlite::{Connection, OpenFlags};

use crate::config::Config;
use crate::utils::Context;
use crate::{try_info, try_warn};

/// Opens the ratings index for the consensus engine. Readers never share a
/// connection with the host's writer; WAL gives each reader a consistent
/// snapshot while blocks are being applied.
pub fn open_ratings_db_readonly(config: &Config, ctx: &Context) -> Result<Connection, String> {
    let db_path = config.expected_ratings_db_path();
    let conn = Connection::open_with_flags(
        &db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| format!("unable to open ratings db {}: {}", db_path.display(), e))?;
    try_info!(ctx, "Ratings DB opened at {}", db_path.display());
    Ok(conn)
}

/// Opens the ratings index writable, creating the file if needed. Used by the
/// indexing host and by migrations; the consensus engine itself only reads.
pub fn open_ratings_db_rw(config: &Config, ctx: &Context) -> Result<Connection, String> {
    let working_dir = config.expected_cache_path();
    if let Err(e) = std::fs::create_dir_all(&working_dir) {
        try_warn!(ctx, "Unable to create working dir: {}", e);
    }
    let db_path = config.expected_ratings_db_path();
    let conn = Connection::open(&db_path)
        .map_err(|e| format!("unable to open ratings db {}: {}", db_path.display(), e))?;
    conn.pragma_update(None, "journal_mode", &"WAL")
        .map_err(|e| format!("unable to enable WAL: {}", e))?;
    Ok(conn)
}

pub fn migrate_ratings_db(conn: &Connection, ctx: &Context) -> Result<(), String> {
    try_info!(ctx, "Running ratings DB migrations");
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ratings (
            rating_type INTEGER NOT NULL,
            address_id INTEGER NOT NULL,
            height INTEGER NOT NULL,
            value INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS ratings_type_address_height
            ON ratings (rating_type, address_id, height);
        CREATE TABLE IF NOT EXISTS scores (
            score_type TEXT NOT NULL,
            tx_hash TEXT NOT NULL,
            score_address_hash TEXT NOT NULL,
            content_address_hash TEXT NOT NULL,
            value INTEGER NOT NULL,
            height INTEGER NOT NULL,
            time INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS scores_type_addresses_height
            ON scores (score_type, score_address_hash, content_address_hash, height);
        ",
    )
    .map_err(|e| format!("unable to migrate ratings db: {}", e))?;
    Ok(())
}
