//! Query preparation and SQL for the place index.

mod fts;

pub use fts::prepare_fts_query;

/// Schema for a place index database.
///
/// `places_fts` is contentless: it only carries the tokens and the rowid that
/// joins back to `places`. Region names are stored as a JSON array in
/// `places` and space-joined in the FTS column.
pub const CREATE_SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS places (
        pk INTEGER PRIMARY KEY,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        lat REAL NOT NULL,
        lon REAL NOT NULL,
        region_names TEXT NOT NULL
    );
    CREATE VIRTUAL TABLE IF NOT EXISTS places_fts USING fts5(
        name,
        region_names,
        content = '',
        tokenize = 'porter unicode61 remove_diacritics 2'
    );
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

pub const INSERT_PLACE_SQL: &str = r#"
    INSERT INTO places (id, name, lat, lon, region_names)
    VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const INSERT_PLACE_FTS_SQL: &str = r#"
    INSERT INTO places_fts (rowid, name, region_names)
    VALUES (?1, ?2, ?3)
"#;

pub const UPSERT_METADATA_SQL: &str = r#"
    INSERT INTO metadata (key, value) VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#;

/// SQL query for searching places.
///
/// BM25 is lower-is-better; the name column weighs more than region names.
/// Equal ranks fall back to insertion order.
pub const SEARCH_PLACES_SQL: &str = r#"
    SELECT
        rowid,
        bm25(places_fts, 10.0, 1.0) AS bm25_score
    FROM places_fts
    WHERE places_fts MATCH ?1
    ORDER BY bm25_score, rowid
    LIMIT ?2
"#;

pub const GET_PLACE_SQL: &str = r#"
    SELECT id, name, lat, lon, region_names
    FROM places
    WHERE rowid = ?1
"#;

/// Convert a BM25 rank into a relevance score (larger = better).
pub fn relevance_score(bm25_score: f64) -> f64 {
    -bm25_score
}
