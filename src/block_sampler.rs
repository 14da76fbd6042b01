// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::reservoir_sampler::target_from;
use crate::row::{column_sum, numeric_field, parse_line, Header, Row};
use crate::source::{read_line, LineSource};
use crate::traits::{ApproxAggregate, StreamSummary, SummaryError};

/// BlockSampler - Uniform Block Sampling Summary
///
/// Reservoir-samples fixed-size *blocks* of consecutive rows instead of
/// individual rows. Incoming rows accumulate in a partial buffer; each time
/// it reaches `block_size` rows the buffer is frozen as a completed block and
/// the block enters the same Algorithm R test the row-level sampler uses,
/// with `blocks_seen` in place of the row count. A trailing partial block is
/// retained but never sampled.
///
/// # Key Properties
///
/// - **Locality**: Whole runs of consecutive rows survive together, which is
///   cheaper to reconstruct from columnar or paged storage.
/// - **Correlated Samples**: Rows within a block are correlated, so estimates
///   carry more variance than a row-level sample of the same nominal
///   fraction. Nothing here corrects for that.
/// - **Row-Level Scaling**: Queries flatten the sampled blocks and scale by
///   the total row count `N`, projecting to population rows, not blocks.
#[derive(Debug, Clone)]
pub struct BlockSampler {
    fraction: f64,
    block_size: usize,
    total_rows: u64,
    blocks_seen: u64,
    header: Option<Header>,
    partial: Vec<Row>,
    sample: Vec<Vec<Row>>,
    rng: StdRng,
}

/// Read-only snapshot of a [`BlockSampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatus {
    pub total_rows: u64,
    pub blocks_seen: u64,
    pub sampled_blocks: usize,
    pub block_size: usize,
    pub buffered_rows: usize,
    pub columns: Option<Vec<String>>,
}

impl BlockSampler {
    /// Creates an empty sampler keeping roughly `fraction` of completed
    /// blocks of `block_size` rows each.
    pub fn new(fraction: f64, block_size: usize) -> Result<Self, SummaryError> {
        Self::with_rng(fraction, block_size, StdRng::from_os_rng())
    }

    /// Creates a sampler with a deterministic RNG seed.
    pub fn with_seed(fraction: f64, block_size: usize, seed: u64) -> Result<Self, SummaryError> {
        Self::with_rng(fraction, block_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(fraction: f64, block_size: usize, rng: StdRng) -> Result<Self, SummaryError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(SummaryError::InvalidConfig(format!(
                "sample fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if block_size == 0 {
            return Err(SummaryError::InvalidConfig(
                "block size must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            fraction,
            block_size,
            total_rows: 0,
            blocks_seen: 0,
            header: None,
            partial: Vec::new(),
            sample: Vec::new(),
            rng,
        })
    }

    /// Current target number of sampled blocks:
    /// `max(1, ceil(blocks_seen * fraction))`.
    pub fn target_blocks(&self) -> usize {
        target_from(self.blocks_seen, self.fraction)
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Completed blocks seen so far. Rows still in the partial buffer are
    /// counted in `total_rows` but not here.
    pub fn blocks_seen(&self) -> u64 {
        self.blocks_seen
    }

    pub fn sampled_blocks(&self) -> usize {
        self.sample.len()
    }

    /// Rows buffered toward the next complete block.
    pub fn buffered_rows(&self) -> usize {
        self.partial.len()
    }

    pub fn status(&self) -> BlockStatus {
        BlockStatus {
            total_rows: self.total_rows,
            blocks_seen: self.blocks_seen,
            sampled_blocks: self.sample.len(),
            block_size: self.block_size,
            buffered_rows: self.partial.len(),
            columns: self.header.as_ref().map(|h| h.columns().to_vec()),
        }
    }

    /// Rebuilds the sampler from a full historical source, using the same
    /// count-then-replay phases as the row-level sampler with blocks as the
    /// sampling unit. On failure the sampler is left unchanged.
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

        let k = target_from(total / self.block_size as u64, self.fraction);
        let mut sample: Vec<Vec<Row>> = Vec::with_capacity(k);
        let mut partial: Vec<Row> = Vec::with_capacity(self.block_size);
        let mut seen: u64 = 0;
        let mut blocks: u64 = 0;
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
            partial.push(parse_line(line));
            seen += 1;
            if partial.len() == self.block_size {
                blocks += 1;
                let block = std::mem::take(&mut partial);
                if sample.len() < k {
                    sample.push(block);
                } else {
                    let j = self.rng.random_range(0..blocks);
                    if (j as usize) < k {
                        let slot = self.rng.random_range(0..k);
                        sample[slot] = block;
                    }
                }
            }
        }

        self.total_rows = seen;
        self.blocks_seen = blocks;
        self.header = header;
        self.partial = partial;
        self.sample = sample;
        tracing::info!(
            total_rows = seen,
            blocks_seen = blocks,
            target = k,
            "block sampler built"
        );
        Ok(())
    }

    fn require_header(&self) -> Result<&Header, SummaryError> {
        self.header
            .as_ref()
            .ok_or_else(|| SummaryError::NotReady("header not captured yet".to_string()))
    }

    fn require_sample(&self) -> Result<(), SummaryError> {
        if self.sample.is_empty() {
            return Err(SummaryError::NotReady(
                "no blocks sampled yet".to_string(),
            ));
        }
        Ok(())
    }

    fn sampled_rows(&self) -> impl Iterator<Item = &Row> {
        self.sample.iter().flatten()
    }

    fn sampled_row_count(&self) -> usize {
        self.sample.iter().map(|b| b.len()).sum()
    }
}

impl StreamSummary for BlockSampler {
    fn ingest_row(&mut self, row: Row) -> Result<(), SummaryError> {
        if self.header.is_none() {
            self.header = Some(Header::new(row));
            return Ok(());
        }
        self.total_rows += 1;
        self.partial.push(row);
        if self.partial.len() >= self.block_size {
            self.blocks_seen += 1;
            let block = std::mem::take(&mut self.partial);
            let k = self.target_blocks();
            if self.sample.len() < k {
                self.sample.push(block);
            } else {
                let j = self.rng.random_range(0..self.blocks_seen);
                if (j as usize) < k {
                    let slot = self.rng.random_range(0..k);
                    self.sample[slot] = block;
                }
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

impl ApproxAggregate for BlockSampler {
    fn approx_sum(&self, column: &str) -> Result<f64, SummaryError> {
        self.require_sample()?;
        let idx = self.require_header()?.resolve(column)?;
        let (sum, count) = column_sum(self.sampled_rows(), idx);
        if count == 0 {
            return Ok(0.0);
        }
        // Scale by all rows held in sampled blocks, numeric-valued or not.
        let sampled = self.sampled_row_count();
        Ok(sum / sampled as f64 * self.total_rows as f64)
    }

    fn approx_avg(&self, column: &str) -> Result<Option<f64>, SummaryError> {
        self.require_sample()?;
        let idx = self.require_header()?.resolve(column)?;
        let (sum, count) = column_sum(self.sampled_rows(), idx);
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
        for row in self.sampled_rows() {
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
