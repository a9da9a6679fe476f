//! A map session: configuration, place index and current points.

use serde::Serialize;
use tracing::debug;

use crate::config::MapConfig;
use crate::error::Result;
use crate::index::{PlaceIndex, PlaceLookup};
use crate::points::{BatchSummary, PointBuilder};
use crate::popup::{popup_rows, PopupRow};
use crate::source::{RowBatch, RowSource};
use crate::types::{ResolvedPoint, Row};

/// Owns everything needed to keep a map's points current.
///
/// The place index is loaded once and lives as long as the session. It is
/// only handed to the resolver when the configured strategy needs it.
pub struct MapSession {
    config: MapConfig,
    index: Option<PlaceIndex>,
    builder: PointBuilder,
}

impl MapSession {
    pub fn new(config: MapConfig, index: Option<PlaceIndex>) -> Self {
        let builder = PointBuilder::new(config.strategy());
        Self {
            config,
            index,
            builder,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Replace the configuration. Points recompute on the next batch if the
    /// strategy changed.
    pub fn set_config(&mut self, config: MapConfig) {
        self.builder.set_strategy(config.strategy());
        self.config = config;
    }

    /// Fetch from `source` and refresh points. Returns whether they changed.
    pub async fn refresh(&mut self, source: &dyn RowSource) -> Result<bool> {
        let batch = source.fetch().await?;
        Ok(self.apply(&batch))
    }

    /// Refresh points from an already fetched batch.
    pub fn apply(&mut self, batch: &RowBatch) -> bool {
        let index = self
            .index
            .as_ref()
            .filter(|_| self.builder.strategy().is_some_and(|s| s.needs_index()))
            .map(|index| index as &dyn PlaceLookup);

        let changed = self.builder.update(batch, index);
        if !changed {
            debug!("points unchanged");
        }
        changed
    }

    pub fn points(&self) -> &[ResolvedPoint] {
        self.builder.points()
    }

    pub fn summary(&self) -> &BatchSummary {
        self.builder.summary()
    }

    pub fn labels(&self) -> &[String] {
        &self.config.labels
    }

    /// Points and popups in the shape presentation consumes.
    pub fn payload(&self) -> MapPayload {
        MapPayload {
            sheet_id: self.config.sheet_id.clone(),
            labels: self.config.labels.clone(),
            points: self
                .points()
                .iter()
                .map(|point| MapPoint {
                    lat: point.lat,
                    lon: point.lon,
                    popup: popup_rows(&point.source_row, &self.config.labels),
                    row: point.source_row.clone(),
                })
                .collect(),
        }
    }
}

/// Output handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct MapPayload {
    pub sheet_id: Option<String>,
    pub labels: Vec<String>,
    pub points: Vec<MapPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub popup: Vec<PopupRow>,
    pub row: Row,
}
