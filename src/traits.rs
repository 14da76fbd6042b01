// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::collections::HashMap;
use thiserror::Error;

use crate::row::{Header, Row};

/// Error type for summary operations
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summary not ready: {0}")]
    NotReady(String),
    #[error("Column not found: {0}")]
    UnknownColumn(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Core streaming-summary trait - defines the ingestion interface shared by
/// every row-level summary structure in this crate.
///
/// A summary is constructed empty (or bulk-built from a [`LineSource`]) and
/// then kept current by feeding it one record at a time. The first record
/// given to a summary that has no header yet is captured as the header and is
/// not counted as a data row.
///
/// # Requirements
///
/// Implementations must maintain the following invariants:
/// - **Monotone counters**: `total_rows` never decreases.
/// - **Bounded samples**: the stored sample never exceeds its current target
///   capacity, however many rows have been ingested.
/// - **Uniformity**: stored rows are a statistically uniform draw from all
///   rows seen so far, not merely the most recent ones.
///
/// [`LineSource`]: crate::source::LineSource
pub trait StreamSummary {
    /// Ingests one pre-split data record.
    fn ingest_row(&mut self, row: Row) -> Result<(), SummaryError>;

    /// Ingests one raw delimited line, splitting and trimming it first.
    ///
    /// Empty lines are ignored. Values containing the delimiter are not
    /// supported (no quoting or escaping).
    fn ingest_line(&mut self, line: &str) -> Result<(), SummaryError>;

    /// True number of data rows ever admitted, including rows long since
    /// evicted from the sample.
    fn total_rows(&self) -> u64;

    /// The captured column header, if any record has been seen.
    fn header(&self) -> Option<&Header>;

    /// Whether the summary holds enough state to answer queries.
    fn is_ready(&self) -> bool;
}

/// Approximate aggregation over a summary's stored rows.
///
/// All three operations resolve column names against the captured header once
/// per query, skip values that do not parse as finite numbers, and project the
/// sample-level statistic back to the population with the structure's own
/// scale correction. Queries fail with [`SummaryError::NotReady`] when the
/// sample is empty and [`SummaryError::UnknownColumn`] when the named column
/// is absent from the header.
pub trait ApproxAggregate: StreamSummary {
    /// Estimated population sum of a numeric column. Returns 0.0 when the
    /// sample holds no numeric values in that column.
    fn approx_sum(&self, column: &str) -> Result<f64, SummaryError>;

    /// Estimated population average of a numeric column, or `None` when the
    /// sample holds no numeric values in that column. Averages are
    /// scale-invariant, so no population correction is applied.
    fn approx_avg(&self, column: &str) -> Result<Option<f64>, SummaryError>;

    /// Estimated per-group population sums of `agg_column`, keyed by the
    /// values of `group_column`. Returns an empty map when the sample holds
    /// no numeric values.
    fn approx_group_by(
        &self,
        group_column: &str,
        agg_column: &str,
    ) -> Result<HashMap<String, f64>, SummaryError>;
}
