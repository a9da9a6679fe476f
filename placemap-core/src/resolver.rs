//! Location resolver: turns one row into an optional coordinate.
//!
//! Direct flow:      lat column + lon column → leading-number parse → reject 0/NaN
//! Place-name flow:  name column → index top hit → place record → coordinate

use thiserror::Error;

use crate::error::Error;
use crate::index::{PlaceIndex, PlaceLookup};
use crate::types::{Coordinate, ResolutionStrategy, Row};

/// Why a row did not resolve. Row-local and never fatal.
#[derive(Debug, Error)]
pub enum ResolveFailure {
    #[error("no resolution strategy configured")]
    MissingStrategy,

    #[error("column {column:?} holds no usable coordinate ({value:?})")]
    UnparsableCoordinate {
        column: String,
        value: Option<String>,
    },

    #[error("column {column:?} is empty")]
    EmptyQueryText { column: String },

    #[error("no place matches {query:?}")]
    NoSearchMatch { query: String },

    #[error("place name lookup configured without a place index")]
    IndexUnavailable,

    #[error("place index query for {query:?} failed: {source}")]
    IndexQuery {
        query: String,
        #[source]
        source: Error,
    },
}

/// Failure category, used for batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    MissingStrategy,
    UnparsableCoordinate,
    EmptyQueryText,
    NoSearchMatch,
    IndexUnavailable,
    IndexQuery,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingStrategy => "missing_strategy",
            Self::UnparsableCoordinate => "unparsable_coordinate",
            Self::EmptyQueryText => "empty_query_text",
            Self::NoSearchMatch => "no_search_match",
            Self::IndexUnavailable => "index_unavailable",
            Self::IndexQuery => "index_query",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResolveFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingStrategy => FailureKind::MissingStrategy,
            Self::UnparsableCoordinate { .. } => FailureKind::UnparsableCoordinate,
            Self::EmptyQueryText { .. } => FailureKind::EmptyQueryText,
            Self::NoSearchMatch { .. } => FailureKind::NoSearchMatch,
            Self::IndexUnavailable => FailureKind::IndexUnavailable,
            Self::IndexQuery { .. } => FailureKind::IndexQuery,
        }
    }
}

/// Resolves rows with one fixed strategy.
///
/// The place index is borrowed explicitly; it is only consulted for
/// [`ResolutionStrategy::PlaceNameLookup`].
pub struct LocationResolver<'a, L: ?Sized = PlaceIndex> {
    strategy: Option<ResolutionStrategy>,
    index: Option<&'a L>,
}

impl<'a, L: PlaceLookup + ?Sized> LocationResolver<'a, L> {
    pub fn new(strategy: Option<ResolutionStrategy>, index: Option<&'a L>) -> Self {
        Self { strategy, index }
    }

    pub fn strategy(&self) -> Option<&ResolutionStrategy> {
        self.strategy.as_ref()
    }

    /// Coordinate for `row`, or `None` if it cannot be resolved.
    pub fn resolve(&self, row: &Row) -> Option<Coordinate> {
        self.try_resolve(row).ok()
    }

    /// Like [`resolve`](Self::resolve), but reports why a row failed.
    pub fn try_resolve(&self, row: &Row) -> Result<Coordinate, ResolveFailure> {
        match &self.strategy {
            None => Err(ResolveFailure::MissingStrategy),
            Some(ResolutionStrategy::DirectCoordinates {
                lat_column,
                lon_column,
            }) => {
                let lat = coordinate_column(row, lat_column)?;
                let lon = coordinate_column(row, lon_column)?;
                Ok(Coordinate::new(lat, lon))
            }
            Some(ResolutionStrategy::PlaceNameLookup { name_column }) => {
                self.lookup_place(row, name_column)
            }
        }
    }

    fn lookup_place(&self, row: &Row, column: &str) -> Result<Coordinate, ResolveFailure> {
        let text = row.get(column).unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ResolveFailure::EmptyQueryText {
                column: column.to_string(),
            });
        }

        let index = self.index.ok_or(ResolveFailure::IndexUnavailable)?;
        let query_failed = |source| ResolveFailure::IndexQuery {
            query: text.to_string(),
            source,
        };
        let no_match = || ResolveFailure::NoSearchMatch {
            query: text.to_string(),
        };

        let hit = index.top_hit(text).map_err(query_failed)?.ok_or_else(no_match)?;
        let record = index
            .get_record(hit.place)
            .map_err(query_failed)?
            .ok_or_else(no_match)?;

        Ok(record.coordinate())
    }
}

fn coordinate_column(row: &Row, column: &str) -> Result<f64, ResolveFailure> {
    let value = row.get(column);
    value
        .and_then(parse_coordinate)
        .ok_or_else(|| ResolveFailure::UnparsableCoordinate {
            column: column.to_string(),
            value: value.map(str::to_string),
        })
}

/// Parse a coordinate component.
///
/// Zero, NaN and non-finite values count as absent, so a true 0.0 on either
/// axis never resolves.
pub fn parse_coordinate(text: &str) -> Option<f64> {
    parse_leading_float(text).filter(|value| value.is_finite() && *value != 0.0)
}

/// Parse the longest decimal number at the start of `text`.
///
/// Leading whitespace is skipped and anything after the number is ignored,
/// so `"51.1 N"` parses as `51.1` and `"abc"` does not parse.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digits += frac_end - (end + 1);
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::types::{PlaceRecord, PlaceRef, SearchHit};

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("51.1"), Some(51.1));
        assert_eq!(parse_leading_float("  -17.25"), Some(-17.25));
        assert_eq!(parse_leading_float("51.1 N"), Some(51.1));
        assert_eq!(parse_leading_float("1,5"), Some(1.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("5."), Some(5.0));
        assert_eq!(parse_leading_float("1e3"), Some(1000.0));
        assert_eq!(parse_leading_float("2e"), Some(2.0));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float(""), None);
    }

    #[test]
    fn test_parse_coordinate_rejects_falsy_values() {
        assert_eq!(parse_coordinate("0"), None);
        assert_eq!(parse_coordinate("-0.0"), None);
        assert_eq!(parse_coordinate("0x10"), None);
        assert_eq!(parse_coordinate("1e400"), None);
        assert_eq!(parse_coordinate("17.0"), Some(17.0));
    }

    #[test]
    fn test_direct_coordinates() {
        let resolver: LocationResolver<'_> =
            LocationResolver::new(Some(ResolutionStrategy::direct("lat", "lon")), None);

        let row = Row::from([("lat", "51.1"), ("lon", "17.0")]);
        assert_eq!(resolver.resolve(&row), Some(Coordinate::new(51.1, 17.0)));

        let zero = Row::from([("lat", "0"), ("lon", "17.0")]);
        let err = resolver.try_resolve(&zero).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnparsableCoordinate);

        let missing = Row::from([("lat", "51.1")]);
        assert!(matches!(
            resolver.try_resolve(&missing),
            Err(ResolveFailure::UnparsableCoordinate { value: None, .. })
        ));
    }

    #[test]
    fn test_missing_strategy_always_fails() {
        let resolver: LocationResolver<'_> = LocationResolver::new(None, None);
        let row = Row::from([("lat", "51.1"), ("lon", "17.0"), ("city", "Wrocław")]);
        assert_eq!(
            resolver.try_resolve(&row).unwrap_err().kind(),
            FailureKind::MissingStrategy
        );
    }

    #[test]
    fn test_place_name_without_index() {
        let resolver: LocationResolver<'_> =
            LocationResolver::new(Some(ResolutionStrategy::place_name("city")), None);
        let row = Row::from([("city", "Wrocław")]);
        assert_eq!(
            resolver.try_resolve(&row).unwrap_err().kind(),
            FailureKind::IndexUnavailable
        );
    }

    struct BrokenIndex;

    impl PlaceLookup for BrokenIndex {
        fn search(&self, _text: &str) -> Result<Vec<SearchHit>> {
            Err(Error::Task("index went away".to_string()))
        }

        fn get_record(&self, _place: PlaceRef) -> Result<Option<PlaceRecord>> {
            Ok(None)
        }
    }

    #[test]
    fn test_index_error_is_row_local() {
        let index = BrokenIndex;
        let resolver =
            LocationResolver::new(Some(ResolutionStrategy::place_name("city")), Some(&index));
        let row = Row::from([("city", "Wrocław")]);

        assert_eq!(resolver.resolve(&row), None);
        assert_eq!(
            resolver.try_resolve(&row).unwrap_err().kind(),
            FailureKind::IndexQuery
        );
    }

    struct DanglingIndex;

    impl PlaceLookup for DanglingIndex {
        fn search(&self, _text: &str) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit {
                place: PlaceRef(7),
                score: 1.0,
            }])
        }

        fn get_record(&self, _place: PlaceRef) -> Result<Option<PlaceRecord>> {
            Ok(None)
        }
    }

    #[test]
    fn test_dangling_hit_counts_as_no_match() {
        let index = DanglingIndex;
        let resolver =
            LocationResolver::new(Some(ResolutionStrategy::place_name("city")), Some(&index));
        let row = Row::from([("city", "Atlantis")]);
        assert_eq!(
            resolver.try_resolve(&row).unwrap_err().kind(),
            FailureKind::NoSearchMatch
        );
    }
}
