//! SQLite FTS5 place index.
//!
//! [`PlaceIndex`] is the read-only searchable collection the resolver queries.
//! [`PlaceIndexWriter`] materializes place records into a new index, either on
//! disk or in memory.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::{
    prepare_fts_query, relevance_score, CREATE_SCHEMA_SQL, GET_PLACE_SQL, INSERT_PLACE_FTS_SQL,
    INSERT_PLACE_SQL, SEARCH_PLACES_SQL, UPSERT_METADATA_SQL,
};
use crate::types::{PlaceRecord, PlaceRef, SearchHit};

/// Maximum number of hits returned by [`PlaceLookup::search`].
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// The two operations the resolver needs from a place index.
pub trait PlaceLookup {
    /// Ranked hits for `text`, most relevant first. Possibly empty.
    fn search(&self, text: &str) -> Result<Vec<SearchHit>>;

    /// Fetch the record behind a hit.
    fn get_record(&self, place: PlaceRef) -> Result<Option<PlaceRecord>>;

    /// The single most relevant hit for `text`.
    fn top_hit(&self, text: &str) -> Result<Option<SearchHit>> {
        Ok(self.search(text)?.into_iter().next())
    }
}

/// A place index backed by a SQLite connection.
pub struct PlaceIndex {
    conn: Connection,
}

impl PlaceIndex {
    /// Open an index file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // Configure for read-only performance
        conn.execute_batch(
            "PRAGMA cache_size = -64000; -- 64MB
             PRAGMA mmap_size = 268435456; -- 256MB
             PRAGMA temp_store = MEMORY;",
        )?;

        debug!(path = %path.display(), "opened place index");
        Ok(Self { conn })
    }

    /// Build an in-memory index holding `records`.
    pub fn from_records<'a, I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a PlaceRecord>,
    {
        let mut writer = PlaceIndexWriter::in_memory()?;
        writer.insert_all(records)?;
        writer.finish()
    }

    /// Up to `limit` hits for `text`, most relevant first.
    pub fn search_with_limit(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let fts_query = prepare_fts_query(text);

        if fts_query.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(SEARCH_PLACES_SQL)?;
        let hits = stmt
            .query_map(params![fts_query, limit], |row| {
                let bm25_score: f64 = row.get(1)?;
                Ok(SearchHit {
                    place: PlaceRef(row.get(0)?),
                    score: relevance_score(bm25_score),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(hits)
    }

    /// Get the number of records in the places table.
    pub fn count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM places", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get metadata value by key.
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let result: std::result::Result<String, _> = self.conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl PlaceLookup for PlaceIndex {
    fn search(&self, text: &str) -> Result<Vec<SearchHit>> {
        self.search_with_limit(text, DEFAULT_SEARCH_LIMIT)
    }

    fn get_record(&self, place: PlaceRef) -> Result<Option<PlaceRecord>> {
        let mut stmt = self.conn.prepare_cached(GET_PLACE_SQL)?;
        let result = stmt.query_row([place.0], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        });

        let (id, name, lat, lon, regions_json) = match result {
            Ok(columns) => columns,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(PlaceRecord {
            id,
            name,
            lat,
            lon,
            region_names: serde_json::from_str(&regions_json)?,
        }))
    }

    fn top_hit(&self, text: &str) -> Result<Option<SearchHit>> {
        Ok(self.search_with_limit(text, 1)?.into_iter().next())
    }
}

/// Writes place records into a new or existing index.
pub struct PlaceIndexWriter {
    conn: Connection,
    inserted: u64,
}

impl PlaceIndexWriter {
    /// Create an index file at `path`, or append to an existing one.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_SCHEMA_SQL)?;
        Ok(Self { conn, inserted: 0 })
    }

    /// Insert one record. Records are searchable in insertion order for ties.
    pub fn insert(&mut self, record: &PlaceRecord) -> Result<PlaceRef> {
        let place = insert_record(&self.conn, record)?;
        self.inserted += 1;
        Ok(place)
    }

    /// Insert records in a single transaction. Returns how many were written.
    pub fn insert_all<'a, I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = &'a PlaceRecord>,
    {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        for record in records {
            insert_record(&tx, record)?;
            written += 1;
        }
        tx.commit()?;

        self.inserted += written;
        Ok(written)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(UPSERT_METADATA_SQL, [key, value])?;
        Ok(())
    }

    /// Record the total place count and hand the connection over as a
    /// searchable index.
    pub fn finish(self) -> Result<PlaceIndex> {
        let index = PlaceIndex { conn: self.conn };
        let total = index.count()?;
        index
            .conn
            .execute(UPSERT_METADATA_SQL, ["record_count", total.to_string().as_str()])?;
        debug!(inserted = self.inserted, total, "place index written");
        Ok(index)
    }
}

fn insert_record(conn: &Connection, record: &PlaceRecord) -> Result<PlaceRef> {
    if !record.lat.is_finite() || !record.lon.is_finite() {
        return Err(Error::InvalidRecord {
            id: record.id.clone(),
            reason: format!("non-finite coordinate ({}, {})", record.lat, record.lon),
        });
    }

    let regions_json = serde_json::to_string(&record.region_names)?;
    conn.execute(
        INSERT_PLACE_SQL,
        params![record.id, record.name, record.lat, record.lon, regions_json],
    )?;
    let rowid = conn.last_insert_rowid();

    conn.execute(
        INSERT_PLACE_FTS_SQL,
        params![rowid, record.name, record.region_names.join(" ")],
    )?;

    Ok(PlaceRef(rowid))
}
