// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::row::{column_sum, numeric_field, parse_line, Header, Row};
use crate::source::{read_line, LineSource};
use crate::traits::{ApproxAggregate, StreamSummary, SummaryError};

/// ReservoirSampler - Uniform Row Sampling Summary
///
/// Maintains a single uniform random sample of the rows seen so far, sized as
/// a fraction of the stream: `K = max(1, ceil(N * fraction))`. The sample is
/// kept current with an Algorithm R variant whose target size is recomputed
/// from the running row count, so it grows in proportion to the stream.
///
/// # Key Properties
///
/// - **Bounded Memory**: Holds at most `K` rows regardless of stream length.
/// - **Uniform**: The sample is a statistically uniform draw from all rows
///   seen so far, not a window of recent ones.
/// - **Resizing K**: Recomputing `K` online makes a row's inclusion
///   probability depend on where in the stream it arrived, unlike a textbook
///   fixed-K reservoir. This is the intended trade for a fraction-based
///   target under unknown stream length.
///
/// # Example
///
/// ```
/// use stream_summaries::{ReservoirSampler, StreamSummary, ApproxAggregate};
///
/// let mut sampler = ReservoirSampler::new(0.5).unwrap();
/// sampler.ingest_line("id,salary").unwrap(); // first record becomes the header
/// sampler.ingest_line("1,100").unwrap();
/// sampler.ingest_line("2,200").unwrap();
///
/// assert_eq!(sampler.total_rows(), 2);
/// let avg = sampler.approx_avg("salary").unwrap().unwrap();
/// assert!((100.0..=200.0).contains(&avg));
/// ```
#[derive(Debug, Clone)]
pub struct ReservoirSampler {
    fraction: f64,
    total_rows: u64,
    header: Option<Header>,
    sample: Vec<Row>,
    rng: StdRng,
}

/// Read-only snapshot of a [`ReservoirSampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirStatus {
    pub total_rows: u64,
    pub sample_size: usize,
    pub target_size: usize,
    pub columns: Option<Vec<String>>,
}

impl ReservoirSampler {
    /// Creates an empty sampler keeping roughly `fraction` of the stream.
    ///
    /// `fraction` must lie strictly between 0 and 1.
    pub fn new(fraction: f64) -> Result<Self, SummaryError> {
        Self::with_rng(fraction, StdRng::from_os_rng())
    }

    /// Creates a sampler with a deterministic RNG seed, for reproducible
    /// sampling in tests.
    pub fn with_seed(fraction: f64, seed: u64) -> Result<Self, SummaryError> {
        Self::with_rng(fraction, StdRng::seed_from_u64(seed))
    }

    fn with_rng(fraction: f64, rng: StdRng) -> Result<Self, SummaryError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(SummaryError::InvalidConfig(format!(
                "sample fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        Ok(Self {
            fraction,
            total_rows: 0,
            header: None,
            sample: Vec::new(),
            rng,
        })
    }

    /// Current target sample size: `max(1, ceil(N * fraction))`.
    pub fn target_size(&self) -> usize {
        target_from(self.total_rows, self.fraction)
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn sample_size(&self) -> usize {
        self.sample.len()
    }

    /// The rows currently held in the sample.
    pub fn sample(&self) -> &[Row] {
        &self.sample
    }

    pub fn status(&self) -> ReservoirStatus {
        ReservoirStatus {
            total_rows: self.total_rows,
            sample_size: self.sample.len(),
            target_size: self.target_size(),
            columns: self.header.as_ref().map(|h| h.columns().to_vec()),
        }
    }

    /// Rebuilds the sampler from a full historical source.
    ///
    /// Two phases: one pass to capture the header and count rows, fixing
    /// `K` from the final count, then a replay pass that reservoir-samples
    /// with that `K`. On success all prior state is replaced; on failure the
    /// sampler is left unchanged.
    pub fn build(&mut self, source: &dyn LineSource) -> Result<(), SummaryError> {
        let mut header: Option<Header> = None;
        let mut total: u64 = 0;
        for line in source.scan()? {
            let line = read_line(line)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if header.is_none() {
                header = Some(Header::from_line(line));
                continue;
            }
            total += 1;
        }

        let k = target_from(total, self.fraction);
        let mut sample: Vec<Row> = Vec::with_capacity(k);
        let mut seen: u64 = 0;
        let mut replay_header = false;
        for line in source.scan()? {
            let line = read_line(line)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !replay_header {
                replay_header = true;
                continue;
            }
            let row = parse_line(line);
            seen += 1;
            if sample.len() < k {
                sample.push(row);
            } else {
                let j = self.rng.random_range(0..seen);
                if (j as usize) < k {
                    let slot = self.rng.random_range(0..k);
                    sample[slot] = row;
                }
            }
        }

        self.total_rows = seen;
        self.header = header;
        self.sample = sample;
        tracing::info!(total_rows = seen, target = k, "reservoir sampler built");
        Ok(())
    }

    fn require_header(&self) -> Result<&Header, SummaryError> {
        self.header
            .as_ref()
            .ok_or_else(|| SummaryError::NotReady("header not captured yet".to_string()))
    }

    fn require_sample(&self) -> Result<(), SummaryError> {
        if self.sample.is_empty() {
            return Err(SummaryError::NotReady("reservoir is empty".to_string()));
        }
        Ok(())
    }
}

impl StreamSummary for ReservoirSampler {
    fn ingest_row(&mut self, row: Row) -> Result<(), SummaryError> {
        if self.header.is_none() {
            self.header = Some(Header::new(row));
            return Ok(());
        }
        self.total_rows += 1;
        let k = self.target_size();
        if self.sample.len() < k {
            self.sample.push(row);
        } else {
            let j = self.rng.random_range(0..self.total_rows);
            if (j as usize) < k {
                let slot = self.rng.random_range(0..k);
                self.sample[slot] = row;
            }
        }
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
        !self.sample.is_empty()
    }
}

impl ApproxAggregate for ReservoirSampler {
    fn approx_sum(&self, column: &str) -> Result<f64, SummaryError> {
        self.require_sample()?;
        let idx = self.require_header()?.resolve(column)?;
        let (sum, count) = column_sum(&self.sample, idx);
        if count == 0 {
            return Ok(0.0);
        }
        Ok(sum / count as f64 * self.total_rows as f64)
    }

    fn approx_avg(&self, column: &str) -> Result<Option<f64>, SummaryError> {
        self.require_sample()?;
        let idx = self.require_header()?.resolve(column)?;
        let (sum, count) = column_sum(&self.sample, idx);
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

        let mut local: HashMap<String, f64> = HashMap::new();
        let mut sampled = 0usize;
        for row in &self.sample {
            let Some(value) = numeric_field(row, agg_idx) else {
                continue;
            };
            let key = row.get(group_idx).cloned().unwrap_or_default();
            sampled += 1;
            *local.entry(key).or_insert(0.0) += value;
        }
        if sampled == 0 {
            return Ok(HashMap::new());
        }
        let factor = self.total_rows as f64 / sampled as f64;
        Ok(local.into_iter().map(|(k, v)| (k, v * factor)).collect())
    }
}

pub(crate) fn target_from(total_rows: u64, fraction: f64) -> usize {
    let k = (total_rows as f64 * fraction).ceil() as usize;
    k.max(1)
}
