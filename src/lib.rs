//! # stream-summaries
//!
//! Compact, continuously-updated statistical summaries of an unbounded
//! stream of tabular rows, answering aggregate queries (sum, average,
//! group-by, frequency, distinct-count) with bounded error and without
//! rescanning the source data.

pub mod block_sampler;
pub mod engine;
pub mod enums;
pub mod probabilistic;
pub mod reservoir_sampler;
pub mod row;
pub mod source;
pub mod stratified_sampler;
pub mod traits;

// Re-export core traits
pub use traits::{ApproxAggregate, StreamSummary, SummaryError};

// Re-export types as they are implemented
pub use block_sampler::{BlockSampler, BlockStatus};
pub use engine::{EngineConfig, EngineStatus, SummaryEngine};
pub use enums::SummaryType;
pub use probabilistic::{CountMinSketch, HyperLogLog, SketchStatus};
pub use reservoir_sampler::{ReservoirSampler, ReservoirStatus};
pub use row::{Header, Row};
pub use source::{FileSource, LineSource, MemorySource};
pub use stratified_sampler::{StratifiedSampler, StratifiedStatus};
