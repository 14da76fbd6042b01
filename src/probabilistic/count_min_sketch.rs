use serde::{Deserialize, Serialize};

use crate::probabilistic::hash::rolling_hash;
use crate::traits::SummaryError;

/// Count-Min Sketch - Frequency Estimation Summary
///
/// A probabilistic data structure for estimating the frequency of items in a
/// stream. It uses a matrix of counters and one seeded hash function per row
/// to map items to counters.
///
/// # Key Properties
///
/// - **Fixed Memory**: Uses a fixed `depth` × `width` matrix regardless of
///   the number of unique items; it never resizes and never evicts.
/// - **One-Sided Error**: Frequencies are never underestimated, but may be
///   overestimated due to collisions. For width `w` and depth `d`, the
///   estimate exceeds the true count by at most `(e / w) * total_items` with
///   probability at least `1 - e^(-d)`.
///
/// # Example
///
/// ```
/// use stream_summaries::CountMinSketch;
///
/// let mut cms = CountMinSketch::new(1000, 5).unwrap();
/// cms.add("Delhi");
/// cms.add("Delhi");
/// cms.add("Mumbai");
///
/// assert!(cms.estimate("Delhi") >= 2);
/// assert!(cms.estimate("Mumbai") >= 1);
/// assert_eq!(cms.total_items(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMinSketch {
    width: usize,
    depth: usize,
    table: Vec<Vec<u64>>,
    seeds: Vec<u64>,
    total_items: u64,
}

/// Read-only snapshot of a [`CountMinSketch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchStatus {
    pub total_items: u64,
    pub width: usize,
    pub depth: usize,
}

impl CountMinSketch {
    /// Creates a zeroed sketch with `depth` hash rows of `width` counters
    /// each. Both dimensions must be positive.
    pub fn new(width: usize, depth: usize) -> Result<Self, SummaryError> {
        if width == 0 || depth == 0 {
            return Err(SummaryError::InvalidConfig(format!(
                "sketch dimensions must be positive, got width={} depth={}",
                width, depth
            )));
        }
        Ok(Self {
            width,
            depth,
            table: vec![vec![0; width]; depth],
            seeds: (1..=depth as u64).collect(),
            total_items: 0,
        })
    }

    /// Records one occurrence of an item: every hash row increments the
    /// counter its seeded hash selects.
    pub fn add(&mut self, item: &str) {
        for (row, &seed) in self.table.iter_mut().zip(&self.seeds) {
            let idx = rolling_hash(item, seed, self.width);
            row[idx] = row[idx].saturating_add(1);
        }
        self.total_items += 1;
    }

    /// Estimated occurrence count of an item: the minimum counter across all
    /// hash rows. Never below the true count.
    pub fn estimate(&self, item: &str) -> u64 {
        self.table
            .iter()
            .zip(&self.seeds)
            .map(|(row, &seed)| row[rolling_hash(item, seed, self.width)])
            .min()
            .unwrap_or(0)
    }

    /// Items processed so far.
    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The additive error ceiling of the classic (ε, δ) guarantee:
    /// `(e / width) * total_items`.
    pub fn error_bound(&self) -> f64 {
        std::f64::consts::E / self.width as f64 * self.total_items as f64
    }

    pub fn status(&self) -> SketchStatus {
        SketchStatus {
            total_items: self.total_items,
            width: self.width,
            depth: self.depth,
        }
    }
}
