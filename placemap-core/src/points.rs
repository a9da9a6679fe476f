//! Point builder: resolves a whole batch of rows into map points.
//!
//! Rows resolve independently and failed rows are dropped, so the output is
//! a stable filter of the input. [`PointBuilder`] adds recompute-on-change
//! and discards completions from superseded batches.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::index::PlaceLookup;
use crate::resolver::{FailureKind, LocationResolver, ResolveFailure};
use crate::source::RowBatch;
use crate::types::{ResolutionStrategy, ResolvedPoint, Row};

/// Counts from one batch resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub dropped: BTreeMap<FailureKind, usize>,
}

impl BatchSummary {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Resolve every row, keeping input order among the rows that resolve.
pub fn resolve_points<L: PlaceLookup + ?Sized>(
    resolver: &LocationResolver<'_, L>,
    rows: &[Row],
) -> Vec<ResolvedPoint> {
    resolve_points_with_summary(resolver, rows).0
}

/// [`resolve_points`] plus per-failure-kind drop counts.
pub fn resolve_points_with_summary<L: PlaceLookup + ?Sized>(
    resolver: &LocationResolver<'_, L>,
    rows: &[Row],
) -> (Vec<ResolvedPoint>, BatchSummary) {
    let mut summary = BatchSummary {
        total: rows.len(),
        ..Default::default()
    };

    let points: Vec<ResolvedPoint> = rows
        .iter()
        .enumerate()
        .filter_map(|(position, row)| match resolver.try_resolve(row) {
            Ok(coordinate) => Some(ResolvedPoint::new(coordinate, row.clone())),
            Err(failure) => {
                record_drop(&mut summary, position, &failure);
                None
            }
        })
        .collect();

    summary.resolved = points.len();
    (points, summary)
}

fn record_drop(summary: &mut BatchSummary, position: usize, failure: &ResolveFailure) {
    match failure {
        ResolveFailure::IndexQuery { .. } => warn!(row = position, "dropping row: {failure}"),
        _ => debug!(row = position, kind = %failure.kind(), "dropping row: {failure}"),
    }
    *summary.dropped.entry(failure.kind()).or_default() += 1;
}

/// A batch accepted for resolution, tagged with its generation.
#[derive(Debug, Clone)]
pub struct BatchTicket {
    generation: u64,
    rows: Arc<[Row]>,
    strategy: Option<ResolutionStrategy>,
}

impl BatchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Resolve the ticket's rows with the strategy captured at `begin`.
    pub fn run(&self, index: Option<&dyn PlaceLookup>) -> BatchOutcome {
        let resolver = LocationResolver::new(self.strategy.clone(), index);
        let (points, summary) = resolve_points_with_summary(&resolver, &self.rows);
        BatchOutcome {
            generation: self.generation,
            points,
            summary,
        }
    }
}

/// The result of running a [`BatchTicket`].
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    generation: u64,
    pub points: Vec<ResolvedPoint>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds the current points and decides when they must be recomputed.
///
/// Points are recomputed when the rows change by value or the strategy
/// changes. Every recomputation bumps the generation; only the outcome of
/// the latest generation is accepted.
#[derive(Debug, Default)]
pub struct PointBuilder {
    strategy: Option<ResolutionStrategy>,
    requested: Option<Arc<[Row]>>,
    generation: u64,
    completed: u64,
    points: Vec<ResolvedPoint>,
    summary: BatchSummary,
}

impl PointBuilder {
    pub fn new(strategy: Option<ResolutionStrategy>) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn strategy(&self) -> Option<&ResolutionStrategy> {
        self.strategy.as_ref()
    }

    /// Swap the strategy. The next [`begin`](Self::begin) recomputes if it changed.
    pub fn set_strategy(&mut self, strategy: Option<ResolutionStrategy>) -> bool {
        if self.strategy == strategy {
            return false;
        }
        self.strategy = strategy;
        self.requested = None;
        true
    }

    /// Accept `batch` for resolution if it needs one.
    ///
    /// Returns `None` while the batch is still loading, or when its rows equal
    /// the last accepted rows under the same strategy.
    pub fn begin(&mut self, batch: &RowBatch) -> Option<BatchTicket> {
        if batch.loading {
            debug!("row source still loading; skipping");
            return None;
        }

        if self
            .requested
            .as_deref()
            .is_some_and(|rows| rows == batch.rows.as_slice())
        {
            return None;
        }

        let rows: Arc<[Row]> = batch.rows.clone().into();
        self.generation += 1;
        self.requested = Some(Arc::clone(&rows));

        Some(BatchTicket {
            generation: self.generation,
            rows,
            strategy: self.strategy.clone(),
        })
    }

    /// Store `outcome` if it belongs to the latest generation.
    ///
    /// Returns `false` and keeps the current points for a stale outcome.
    pub fn complete(&mut self, outcome: BatchOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                current = self.generation,
                "discarding stale point batch"
            );
            return false;
        }

        info!(
            generation = outcome.generation,
            total = outcome.summary.total,
            resolved = outcome.summary.resolved,
            dropped = outcome.summary.dropped_total(),
            "points updated"
        );

        self.completed = outcome.generation;
        self.points = outcome.points;
        self.summary = outcome.summary;
        true
    }

    /// Begin, run and complete in one step. Returns whether points changed.
    pub fn update(&mut self, batch: &RowBatch, index: Option<&dyn PlaceLookup>) -> bool {
        match self.begin(batch) {
            Some(ticket) => self.complete(ticket.run(index)),
            None => false,
        }
    }

    pub fn points(&self) -> &[ResolvedPoint] {
        &self.points
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    /// Generation of the points currently held (0 before the first batch).
    pub fn generation(&self) -> u64 {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn direct() -> Option<ResolutionStrategy> {
        Some(ResolutionStrategy::direct("lat", "lon"))
    }

    fn row(lat: &str, lon: &str, name: &str) -> Row {
        Row::from([("lat", lat), ("lon", lon), ("name", name)])
    }

    #[test]
    fn test_summary_counts_drops_by_kind() {
        let resolver: LocationResolver<'_> = LocationResolver::new(direct(), None);
        let rows = vec![row("51.1", "17.0", "A"), row("0", "17.0", "B"), row("x", "1", "C")];

        let (points, summary) = resolve_points_with_summary(&resolver, &rows);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].coordinate(), Coordinate::new(51.1, 17.0));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.dropped.get(&FailureKind::UnparsableCoordinate), Some(&2));
    }

    #[test]
    fn test_unchanged_rows_do_not_recompute() {
        let mut builder = PointBuilder::new(direct());
        let batch = RowBatch::loaded(vec![row("51.1", "17.0", "A")]);

        assert!(builder.update(&batch, None));
        assert_eq!(builder.generation(), 1);

        let same = RowBatch::loaded(vec![row("51.1", "17.0", "A")]);
        assert!(!builder.update(&same, None));
        assert_eq!(builder.generation(), 1);
        assert_eq!(builder.points().len(), 1);
    }

    #[test]
    fn test_loading_batch_is_skipped() {
        let mut builder = PointBuilder::new(direct());
        assert!(builder.begin(&RowBatch::loading()).is_none());
        assert!(builder.points().is_empty());
        assert_eq!(builder.generation(), 0);
    }

    #[test]
    fn test_strategy_change_recomputes() {
        let mut builder = PointBuilder::new(direct());
        let batch = RowBatch::loaded(vec![Row::from([
            ("lat", "51.1"),
            ("lon", "17.0"),
            ("y", "5"),
            ("x", "6"),
        ])]);

        assert!(builder.update(&batch, None));
        assert_eq!(builder.points()[0].coordinate(), Coordinate::new(51.1, 17.0));

        assert!(builder.set_strategy(Some(ResolutionStrategy::direct("y", "x"))));
        assert!(!builder.set_strategy(Some(ResolutionStrategy::direct("y", "x"))));
        assert!(builder.update(&batch, None));
        assert_eq!(builder.points()[0].coordinate(), Coordinate::new(5.0, 6.0));
    }

    #[test]
    fn test_stale_outcome_is_discarded() {
        let mut builder = PointBuilder::new(direct());

        let older = builder
            .begin(&RowBatch::loaded(vec![row("10", "10", "old")]))
            .unwrap();
        let newer = builder
            .begin(&RowBatch::loaded(vec![row("20", "20", "new")]))
            .unwrap();
        assert!(newer.generation() > older.generation());

        let newer_outcome = newer.run(None);
        let older_outcome = older.run(None);

        assert!(builder.complete(newer_outcome));
        assert!(!builder.complete(older_outcome));
        assert_eq!(builder.points().len(), 1);
        assert_eq!(builder.points()[0].source_row.get("name"), Some("new"));
        assert_eq!(builder.generation(), 2);
    }
}
