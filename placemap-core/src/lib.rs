//! PlaceMap Core
//!
//! Turns spreadsheet rows into map points. Each row is located either from
//! two coordinate columns or by looking up a place-name column in a SQLite
//! FTS5 place index.

pub mod config;
pub mod error;
pub mod index;
pub mod points;
pub mod popup;
pub mod query;
pub mod resolver;
pub mod session;
pub mod source;
pub mod types;

pub use config::MapConfig;
pub use error::{Error, Result};
pub use index::{PlaceIndex, PlaceIndexWriter, PlaceLookup};
pub use points::{resolve_points, BatchSummary, PointBuilder};
pub use resolver::{FailureKind, LocationResolver, ResolveFailure};
pub use session::{MapPayload, MapPoint, MapSession};
pub use source::{CsvRowSource, RowBatch, RowSource, StaticRowSource};
pub use types::{
    Coordinate, PlaceRecord, PlaceRef, ResolutionStrategy, ResolvedPoint, Row, SearchHit,
};
