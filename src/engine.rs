// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Shared ownership boundary for a set of live summaries.
//!
//! The engine owns one instance of each summary structure behind its own
//! lock: mutations (ingest, rebuild) serialize through write locks, queries
//! take read locks and therefore always observe a consistent snapshot. A
//! rebuild holds the structure's write lock for its entire duration, so
//! readers see either the fully-old or the fully-new state, and a failed
//! rebuild leaves the prior state untouched.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::block_sampler::{BlockSampler, BlockStatus};
use crate::enums::SummaryType;
use crate::probabilistic::count_min_sketch::{CountMinSketch, SketchStatus};
use crate::reservoir_sampler::{ReservoirSampler, ReservoirStatus};
use crate::row::{parse_line, Header};
use crate::source::{read_line, LineSource};
use crate::stratified_sampler::{StratifiedSampler, StratifiedStatus};
use crate::traits::{ApproxAggregate, StreamSummary, SummaryError};

/// Construction parameters for a [`SummaryEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Row/block sample fraction shared by the reservoir samplers and the
    /// stratified sampler.
    pub sample_fraction: f64,
    /// Rows per block for the block sampler.
    pub block_size: usize,
    /// Partition column for the stratified sampler.
    pub stratum_column: String,
    /// Count-Min table width.
    pub sketch_width: usize,
    /// Count-Min table depth.
    pub sketch_depth: usize,
    /// Columns whose values feed the Count-Min Sketch on every ingested row.
    pub sketch_columns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_fraction: 0.1,
            block_size: 100,
            stratum_column: "city".to_string(),
            sketch_width: 1000,
            sketch_depth: 5,
            sketch_columns: vec!["name".to_string(), "city".to_string()],
        }
    }
}

/// Read-only snapshot of every structure held by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub reservoir: ReservoirStatus,
    pub block: BlockStatus,
    pub stratified: StratifiedStatus,
    pub sketch: SketchStatus,
}

/// SummaryEngine - Lock-Guarded Summary Registry
///
/// Holds one live instance of each summary structure, built from and rebuilt
/// against a single historical [`LineSource`], and kept current by feeding it
/// one raw line at a time. Queries dispatch on [`SummaryType`].
///
/// The cardinality estimator ([`HyperLogLog`]) is deliberately not part of
/// the registry; it is maintained and queried directly by its callers.
///
/// [`HyperLogLog`]: crate::probabilistic::hyperloglog::HyperLogLog
pub struct SummaryEngine {
    config: EngineConfig,
    source: Box<dyn LineSource>,
    reservoir: RwLock<ReservoirSampler>,
    block: RwLock<BlockSampler>,
    stratified: RwLock<StratifiedSampler>,
    sketch: RwLock<CountMinSketch>,
}

impl SummaryEngine {
    /// Creates an engine with empty summaries over the given historical
    /// source. Configuration is validated here; the source is not touched
    /// until [`build`](Self::build).
    pub fn new(config: EngineConfig, source: Box<dyn LineSource>) -> Result<Self, SummaryError> {
        let reservoir = ReservoirSampler::new(config.sample_fraction)?;
        let block = BlockSampler::new(config.sample_fraction, config.block_size)?;
        let stratified = StratifiedSampler::new(&config.stratum_column, config.sample_fraction)?;
        let sketch = CountMinSketch::new(config.sketch_width, config.sketch_depth)?;
        Ok(Self {
            config,
            source,
            reservoir: RwLock::new(reservoir),
            block: RwLock::new(block),
            stratified: RwLock::new(stratified),
            sketch: RwLock::new(sketch),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds every structure from the historical source.
    pub fn build(&self) -> Result<(), SummaryError> {
        self.rebuild(SummaryType::Reservoir)?;
        self.rebuild(SummaryType::Block)?;
        self.rebuild(SummaryType::Stratified)?;
        self.rebuild(SummaryType::CountMin)?;
        Ok(())
    }

    /// Rebuilds one structure from the historical source, holding its write
    /// lock for the whole rebuild. On failure the prior state is preserved
    /// and the error is returned to the caller; nothing is retried here.
    pub fn rebuild(&self, kind: SummaryType) -> Result<(), SummaryError> {
        match kind {
            SummaryType::Reservoir => self.write_reservoir().build(self.source.as_ref()),
            SummaryType::Block => self.write_block().build(self.source.as_ref()),
            SummaryType::Stratified => self.write_stratified().build(self.source.as_ref()),
            SummaryType::CountMin => {
                let mut guard = self.write_sketch();
                let fresh = self.build_sketch()?;
                *guard = fresh;
                Ok(())
            }
            SummaryType::HyperLogLog => Err(SummaryError::InvalidInput(
                "HyperLogLog is not maintained by the engine".to_string(),
            )),
        }
    }

    fn build_sketch(&self) -> Result<CountMinSketch, SummaryError> {
        let mut fresh = CountMinSketch::new(self.config.sketch_width, self.config.sketch_depth)?;
        let mut header: Option<Header> = None;
        let mut indices: Vec<usize> = Vec::new();
        for line in self.source.scan()? {
            let line = read_line(line)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if header.is_none() {
                let h = Header::from_line(line);
                indices = self
                    .config
                    .sketch_columns
                    .iter()
                    .map(|c| h.resolve(c))
                    .collect::<Result<_, _>>()?;
                header = Some(h);
                continue;
            }
            let row = parse_line(line);
            for &ix in &indices {
                if let Some(value) = row.get(ix) {
                    fresh.add(value);
                }
            }
        }
        tracing::info!(total_items = fresh.total_items(), "count-min sketch built");
        Ok(fresh)
    }

    /// Feeds one raw line to every structure. The first line ever seen is
    /// captured as the header everywhere and not counted as data. Sketch
    /// columns missing from this row are skipped, not errors.
    pub fn ingest_line(&self, line: &str) -> Result<(), SummaryError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        // Read before ingesting: if this line is about to be captured as the
        // header it must not feed the sketch as data.
        let header = self.read_reservoir().header().cloned();

        self.write_reservoir().ingest_line(line)?;
        self.write_block().ingest_line(line)?;
        self.write_stratified().ingest_line(line)?;

        if let Some(header) = header {
            let row = parse_line(line);
            let mut sketch = self.write_sketch();
            for column in &self.config.sketch_columns {
                if let Ok(ix) = header.resolve(column) {
                    if let Some(value) = row.get(ix) {
                        sketch.add(value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Records one raw item directly into the frequency sketch.
    pub fn add_item(&self, item: &str) {
        self.write_sketch().add(item);
    }

    /// Estimated population sum of a column, answered by the chosen sampler.
    pub fn approx_sum(&self, kind: SummaryType, column: &str) -> Result<f64, SummaryError> {
        match kind {
            SummaryType::Reservoir => self.read_reservoir().approx_sum(column),
            SummaryType::Block => self.read_block().approx_sum(column),
            SummaryType::Stratified => self.read_stratified().approx_sum(column),
            other => Err(Self::not_an_aggregate(other)),
        }
    }

    /// Estimated population average of a column.
    pub fn approx_avg(&self, kind: SummaryType, column: &str) -> Result<Option<f64>, SummaryError> {
        match kind {
            SummaryType::Reservoir => self.read_reservoir().approx_avg(column),
            SummaryType::Block => self.read_block().approx_avg(column),
            SummaryType::Stratified => self.read_stratified().approx_avg(column),
            other => Err(Self::not_an_aggregate(other)),
        }
    }

    /// Estimated per-group population sums.
    pub fn approx_group_by(
        &self,
        kind: SummaryType,
        group_column: &str,
        agg_column: &str,
    ) -> Result<HashMap<String, f64>, SummaryError> {
        match kind {
            SummaryType::Reservoir => self.read_reservoir().approx_group_by(group_column, agg_column),
            SummaryType::Block => self.read_block().approx_group_by(group_column, agg_column),
            SummaryType::Stratified => {
                self.read_stratified().approx_group_by(group_column, agg_column)
            }
            other => Err(Self::not_an_aggregate(other)),
        }
    }

    /// Estimated occurrence count of an item, from the frequency sketch.
    pub fn frequency(&self, item: &str) -> Result<u64, SummaryError> {
        let sketch = self.read_sketch();
        if sketch.total_items() == 0 {
            return Err(SummaryError::NotReady(
                "no items added to the sketch yet".to_string(),
            ));
        }
        Ok(sketch.estimate(item))
    }

    /// Consistent snapshot of every structure's counters.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            reservoir: self.read_reservoir().status(),
            block: self.read_block().status(),
            stratified: self.read_stratified().status(),
            sketch: self.read_sketch().status(),
        }
    }

    fn not_an_aggregate(kind: SummaryType) -> SummaryError {
        SummaryError::InvalidInput(format!("{} does not answer column aggregates", kind))
    }

    fn read_reservoir(&self) -> RwLockReadGuard<'_, ReservoirSampler> {
        self.reservoir.read().expect("poisoned reservoir lock")
    }

    fn write_reservoir(&self) -> RwLockWriteGuard<'_, ReservoirSampler> {
        self.reservoir.write().expect("poisoned reservoir lock")
    }

    fn read_block(&self) -> RwLockReadGuard<'_, BlockSampler> {
        self.block.read().expect("poisoned block lock")
    }

    fn write_block(&self) -> RwLockWriteGuard<'_, BlockSampler> {
        self.block.write().expect("poisoned block lock")
    }

    fn read_stratified(&self) -> RwLockReadGuard<'_, StratifiedSampler> {
        self.stratified.read().expect("poisoned stratified lock")
    }

    fn write_stratified(&self) -> RwLockWriteGuard<'_, StratifiedSampler> {
        self.stratified.write().expect("poisoned stratified lock")
    }

    fn read_sketch(&self) -> RwLockReadGuard<'_, CountMinSketch> {
        self.sketch.read().expect("poisoned sketch lock")
    }

    fn write_sketch(&self) -> RwLockWriteGuard<'_, CountMinSketch> {
        self.sketch.write().expect("poisoned sketch lock")
    }
}
