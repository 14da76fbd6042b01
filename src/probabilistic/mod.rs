// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Probabilistic Data Structures (Sketches)
//!
//! Fixed-memory structures giving approximate answers to frequency and
//! cardinality queries over an unbounded item stream. Unlike the row
//! samplers they never store the items themselves, only hashed counter or
//! register state.

pub mod count_min_sketch;
pub mod hash;
pub mod hyperloglog;

pub use count_min_sketch::{CountMinSketch, SketchStatus};
pub use hyperloglog::HyperLogLog;
