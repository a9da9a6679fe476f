//! Map configuration: which sheet, how to locate rows, which columns to show.
//!
//! Configuration usually arrives as URL query parameters, e.g.
//! `?id=1AbC&coordsLabels=lat,lon&labels=name,website`.

use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::Result;
use crate::types::ResolutionStrategy;

/// User-facing map configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    /// Opaque identifier of the spreadsheet the rows come from.
    #[serde(default, alias = "id")]
    pub sheet_id: Option<String>,
    /// Latitude and longitude column names.
    #[serde(default)]
    pub coords_labels: Option<Vec<String>>,
    /// Column holding a free-text place name.
    #[serde(default)]
    pub location_label: Option<String>,
    /// Columns shown in each popup, in order.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl MapConfig {
    /// Parse a query string, with or without the leading `?`.
    ///
    /// Unknown parameters are ignored and empty values count as absent.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut config = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "id" | "sheetId" => config.sheet_id = non_empty(&value),
                "coordsLabels" => config.coords_labels = non_empty_list(&value),
                "locationLabel" => config.location_label = non_empty(&value),
                "labels" => config.labels = split_list(&value),
                _ => {}
            }
        }

        config
    }

    /// Parse the query part of a full URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    pub fn with_sheet_id(mut self, sheet_id: impl Into<String>) -> Self {
        self.sheet_id = Some(sheet_id.into());
        self
    }

    /// Set coordinate columns from a comma-joined list.
    pub fn with_coords_labels(mut self, labels: &str) -> Self {
        self.coords_labels = non_empty_list(labels);
        self
    }

    pub fn with_location_label(mut self, label: impl Into<String>) -> Self {
        self.location_label = non_empty(&label.into());
        self
    }

    /// Set popup columns from a comma-joined list.
    pub fn with_labels(mut self, labels: &str) -> Self {
        self.labels = split_list(labels);
        self
    }

    /// The strategy these settings select.
    ///
    /// Coordinate columns win over a location column; with neither there is
    /// no strategy and no row resolves. A single coordinate column leaves the
    /// longitude column empty, which never resolves either.
    pub fn strategy(&self) -> Option<ResolutionStrategy> {
        if let Some(coords) = &self.coords_labels {
            let lat = coords.first().cloned().unwrap_or_default();
            let lon = coords.get(1).cloned().unwrap_or_default();
            return Some(ResolutionStrategy::direct(lat, lon));
        }

        self.location_label
            .as_ref()
            .map(|column| ResolutionStrategy::place_name(column.as_str()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Split a comma-joined list of column names.
///
/// Names are kept exactly as written, surrounding spaces included, so a
/// column called `" lat"` stays selectable. Empty items are skipped.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_list(value: &str) -> Option<Vec<String>> {
    let items = split_list(value);
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_query() {
        let config =
            MapConfig::from_query("?id=1AbC&coordsLabels=lat,lon&labels=name,website,&zoom=13");

        assert_eq!(
            config,
            MapConfig {
                sheet_id: Some("1AbC".to_string()),
                coords_labels: Some(vec!["lat".to_string(), "lon".to_string()]),
                location_label: None,
                labels: vec!["name".to_string(), "website".to_string()],
            }
        );
        assert_eq!(config.strategy(), Some(ResolutionStrategy::direct("lat", "lon")));
    }

    #[test]
    fn test_column_names_keep_surrounding_spaces() {
        let config = MapConfig::from_query("coordsLabels=%20lat,Lon%20&labels=name,%20site");

        assert_eq!(config.strategy(), Some(ResolutionStrategy::direct(" lat", "Lon ")));
        assert_eq!(config.labels, vec!["name".to_string(), " site".to_string()]);
    }

    #[test]
    fn test_coords_take_precedence_over_location() {
        let config = MapConfig::from_query("coordsLabels=y,x&locationLabel=city");
        assert_eq!(config.strategy(), Some(ResolutionStrategy::direct("y", "x")));
    }

    #[test]
    fn test_location_label_strategy() {
        let config = MapConfig::from_query("locationLabel=city&coordsLabels=");
        assert_eq!(config.strategy(), Some(ResolutionStrategy::place_name("city")));
    }

    #[test]
    fn test_no_strategy() {
        assert_eq!(MapConfig::from_query("id=abc&labels=name").strategy(), None);
        assert_eq!(MapConfig::default().strategy(), None);
    }

    #[test]
    fn test_single_coordinate_column() {
        let config = MapConfig::default().with_coords_labels("lat");
        assert_eq!(config.strategy(), Some(ResolutionStrategy::direct("lat", "")));
    }

    #[test]
    fn test_from_url() {
        let config =
            MapConfig::from_url("https://example.org/map?sheetId=xyz&locationLabel=Miasto").unwrap();
        assert_eq!(config.sheet_id.as_deref(), Some("xyz"));
        assert_eq!(config.strategy(), Some(ResolutionStrategy::place_name("Miasto")));

        assert!(MapConfig::from_url("not a url").is_err());
    }

    #[test]
    fn test_deserialize_json() {
        let config: MapConfig = serde_json::from_str(
            r#"{"id": "abc", "locationLabel": "city", "labels": ["name"]}"#,
        )
        .unwrap();
        assert_eq!(config.sheet_id.as_deref(), Some("abc"));
        assert_eq!(config.labels, vec!["name".to_string()]);
    }
}
