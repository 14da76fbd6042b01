// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::row::{numeric_field, parse_line, Header, Row};
use crate::source::{read_line, LineSource};
use crate::traits::{ApproxAggregate, StreamSummary, SummaryError};

/// StratifiedSampler - Per-Stratum Bernoulli Sampling Summary
///
/// Partitions the stream by the value of a designated stratum column and
/// admits each row into its stratum's sample independently with fixed
/// probability `fraction`. Strata are created lazily on first sight of a key.
/// Unlike the reservoir samplers there is no target size and no replacement;
/// each stratum's sample simply grows at the sampling rate.
///
/// # Key Properties
///
/// - **Per-Key Coverage**: Every stratum seen in the stream is represented,
///   including rare keys a global sample could miss entirely.
/// - **Uniform Rate**: A single global `fraction` applies to every stratum,
///   so all stratum sums scale by the same `1/fraction` factor. This is only
///   unbiased because the rate is uniform; per-stratum weighting is not
///   attempted.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    stratum_column: String,
    fraction: f64,
    total_rows: u64,
    header: Option<Header>,
    strata: BTreeMap<String, Vec<Row>>,
    rng: StdRng,
}

/// Read-only snapshot of a [`StratifiedSampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratifiedStatus {
    pub total_rows: u64,
    pub stratum_column: String,
    /// Sampled row count per stratum key.
    pub strata: BTreeMap<String, usize>,
    pub columns: Option<Vec<String>>,
}

impl StratifiedSampler {
    /// Creates an empty sampler stratified on `stratum_column`, admitting
    /// rows with probability `fraction`.
    pub fn new(stratum_column: impl Into<String>, fraction: f64) -> Result<Self, SummaryError> {
        Self::with_rng(stratum_column.into(), fraction, StdRng::from_os_rng())
    }

    /// Creates a sampler with a deterministic RNG seed.
    pub fn with_seed(
        stratum_column: impl Into<String>,
        fraction: f64,
        seed: u64,
    ) -> Result<Self, SummaryError> {
        Self::with_rng(stratum_column.into(), fraction, StdRng::seed_from_u64(seed))
    }

    fn with_rng(stratum_column: String, fraction: f64, rng: StdRng) -> Result<Self, SummaryError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(SummaryError::InvalidConfig(format!(
                "sample fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if stratum_column.is_empty() {
            return Err(SummaryError::InvalidConfig(
                "stratum column name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            stratum_column,
            fraction,
            total_rows: 0,
            header: None,
            strata: BTreeMap::new(),
            rng,
        })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn stratum_column(&self) -> &str {
        &self.stratum_column
    }

    /// Number of strata seen so far (sampled or not).
    pub fn stratum_count(&self) -> usize {
        self.strata.len()
    }

    /// Total sampled rows across all strata.
    pub fn sampled_rows(&self) -> usize {
        self.strata.values().map(|rows| rows.len()).sum()
    }

    pub fn status(&self) -> StratifiedStatus {
        StratifiedStatus {
            total_rows: self.total_rows,
            stratum_column: self.stratum_column.clone(),
            strata: self
                .strata
                .iter()
                .map(|(k, rows)| (k.clone(), rows.len()))
                .collect(),
            columns: self.header.as_ref().map(|h| h.columns().to_vec()),
        }
    }

    /// Rebuilds the sampler from a full historical source in a single pass.
    /// On failure the sampler is left unchanged.
    pub fn build(&mut self, source: &dyn LineSource) -> Result<(), SummaryError> {
        let mut fresh = Self::with_rng(
            self.stratum_column.clone(),
            self.fraction,
            self.rng.clone(),
        )?;
        for line in source.scan()? {
            let line = read_line(line)?;
            fresh.ingest_line(&line)?;
        }
        self.total_rows = fresh.total_rows;
        self.header = fresh.header;
        self.strata = fresh.strata;
        // Keep the advanced RNG state so a later build draws fresh coins.
        self.rng = fresh.rng;
        tracing::info!(
            total_rows = self.total_rows,
            strata = self.strata.len(),
            "stratified sampler built"
        );
        Ok(())
    }

    fn require_header(&self) -> Result<&Header, SummaryError> {
        self.header
            .as_ref()
            .ok_or_else(|| SummaryError::NotReady("header not captured yet".to_string()))
    }

    fn require_sample(&self) -> Result<(), SummaryError> {
        if self.strata.values().all(|rows| rows.is_empty()) {
            return Err(SummaryError::NotReady(
                "no rows sampled into any stratum yet".to_string(),
            ));
        }
        Ok(())
    }

    fn all_sampled(&self) -> impl Iterator<Item = &Row> {
        self.strata.values().flatten()
    }

    fn column_totals(&self, idx: usize) -> (f64, usize) {
        let mut sum = 0.0;
        let mut count = 0;
        for row in self.all_sampled() {
            if let Some(v) = numeric_field(row, idx) {
                sum += v;
                count += 1;
            }
        }
        (sum, count)
    }
}

impl StreamSummary for StratifiedSampler {
    fn ingest_row(&mut self, row: Row) -> Result<(), SummaryError> {
        if self.header.is_none() {
            self.header = Some(Header::new(row));
            return Ok(());
        }
        let idx = self.require_header()?.resolve(&self.stratum_column)?;
        let key = row.get(idx).cloned().unwrap_or_default();
        let stratum = self.strata.entry(key).or_default();
        if self.rng.random::<f64>() < self.fraction {
            stratum.push(row);
        }
        self.total_rows += 1;
        Ok(())
    }

    fn ingest_line(&mut self, line: &str) -> Result<(), SummaryError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.ingest_row(parse_line(line))
    }

    fn total_rows(&self) -> u64 {
        self.total_rows
    }

    fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    fn is_ready(&self) -> bool {
        self.strata.values().any(|rows| !rows.is_empty())
    }
}

impl ApproxAggregate for StratifiedSampler {
    fn approx_sum(&self, column: &str) -> Result<f64, SummaryError> {
        self.require_sample()?;
        let idx = self.require_header()?.resolve(column)?;
        let (sum, count) = self.column_totals(idx);
        if count == 0 {
            return Ok(0.0);
        }
        Ok(sum / self.fraction)
    }

    fn approx_avg(&self, column: &str) -> Result<Option<f64>, SummaryError> {
        self.require_sample()?;
        let idx = self.require_header()?.resolve(column)?;
        let (sum, count) = self.column_totals(idx);
        // (sum / fraction) / (count / fraction): the scale factors cancel at
        // a uniform sampling rate, leaving the plain sample mean.
        Ok((count > 0).then(|| sum / count as f64))
    }

    fn approx_group_by(
        &self,
        group_column: &str,
        agg_column: &str,
    ) -> Result<HashMap<String, f64>, SummaryError> {
        self.require_sample()?;
        let header = self.require_header()?;
        let group_idx = header.resolve(group_column)?;
        let agg_idx = header.resolve(agg_column)?;

        let mut result: HashMap<String, f64> = HashMap::new();
        for row in self.all_sampled() {
            let Some(value) = numeric_field(row, agg_idx) else {
                continue;
            };
            let key = row.get(group_idx).cloned().unwrap_or_default();
            *result.entry(key).or_insert(0.0) += value;
        }
        for v in result.values_mut() {
            *v /= self.fraction;
        }
        Ok(result)
    }
}
