//! Shared data types: rows, places, strategies and resolved points.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One record from the row source, keyed by column name.
///
/// Values are kept as the raw strings the source produced. Rows compare by
/// value, which is what the point builder uses to detect changed input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// How a row is turned into a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Parse latitude and longitude straight from two columns.
    DirectCoordinates {
        lat_column: String,
        lon_column: String,
    },
    /// Look up the free text of one column in the place index.
    PlaceNameLookup { name_column: String },
}

impl ResolutionStrategy {
    pub fn direct(lat_column: impl Into<String>, lon_column: impl Into<String>) -> Self {
        Self::DirectCoordinates {
            lat_column: lat_column.into(),
            lon_column: lon_column.into(),
        }
    }

    pub fn place_name(name_column: impl Into<String>) -> Self {
        Self::PlaceNameLookup {
            name_column: name_column.into(),
        }
    }

    /// Whether this strategy needs a place index to resolve rows.
    pub fn needs_index(&self) -> bool {
        matches!(self, Self::PlaceNameLookup { .. })
    }
}

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A named place stored in the place index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Enclosing regions, most specific first (e.g. ["Lower Silesia", "Poland"]).
    #[serde(default)]
    pub region_names: Vec<String>,
}

impl PlaceRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lon,
            region_names: Vec::new(),
        }
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.region_names = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Index-internal reference to a place record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceRef(pub i64);

/// One ranked search hit. Larger scores are more relevant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub place: PlaceRef,
    pub score: f64,
}

/// A row paired with the coordinate it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPoint {
    pub lat: f64,
    pub lon: f64,
    pub source_row: Row,
}

impl ResolvedPoint {
    pub fn new(coordinate: Coordinate, source_row: Row) -> Self {
        Self {
            lat: coordinate.lat,
            lon: coordinate.lon,
            source_row,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_compare_by_value() {
        let a = Row::from([("lat", "51.1"), ("lon", "17.0")]);
        let mut b = Row::new();
        b.insert("lon", "17.0");
        b.insert("lat", "51.1");

        assert_eq!(a, b);
        assert_eq!(a.get("lat"), Some("51.1"));
        assert_eq!(a.get("name"), None);
    }

    #[test]
    fn test_strategy_serializes_tagged() {
        let json = serde_json::to_value(ResolutionStrategy::place_name("city")).unwrap();
        assert_eq!(json["kind"], "place_name_lookup");
        assert_eq!(json["name_column"], "city");
    }
}
