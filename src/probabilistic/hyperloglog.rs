use serde::{Deserialize, Serialize};

use crate::probabilistic::hash::digest32;
use crate::traits::SummaryError;

/// HyperLogLog - Cardinality Estimation Summary
///
/// A probabilistic data structure for estimating the number of unique items
/// in a stream using `m = 2^b` single-byte registers. Each item is hashed to
/// a 32-bit digest; the top `b` bits select a register and the register keeps
/// the maximum leading-zero rank observed in the remaining bits.
///
/// # Key Properties
///
/// - **Fixed Memory**: `2^b` bytes regardless of the number of items.
/// - **Idempotent Updates**: Re-adding an item never changes the state, so
///   duplicates do not inflate the estimate.
/// - **Bias-Corrected**: The harmonic-mean estimator is scaled by the
///   standard `alpha * m^2` constant, with linear counting at small range and
///   a saturation correction near the 2^32 hash-space limit.
///
/// # Example
///
/// ```
/// use stream_summaries::HyperLogLog;
///
/// let mut hll = HyperLogLog::new(10).unwrap();
/// hll.add("user1");
/// hll.add("user2");
/// hll.add("user3");
/// hll.add("user1"); // duplicate
///
/// let count = hll.cardinality();
/// assert!((2..=4).contains(&count));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperLogLog {
    precision: u32,
    registers: Vec<u8>,
}

impl HyperLogLog {
    /// Creates an empty estimator with `2^precision` registers. Precision
    /// must lie in `[4, 16]`.
    pub fn new(precision: u32) -> Result<Self, SummaryError> {
        if !(4..=16).contains(&precision) {
            return Err(SummaryError::InvalidConfig(format!(
                "precision must be in [4, 16], got {}",
                precision
            )));
        }
        Ok(Self {
            precision,
            registers: vec![0u8; 1 << precision],
        })
    }

    /// Number of registers `m`.
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Adds an item. Returns `true` if the internal state changed.
    pub fn add(&mut self, item: &str) -> bool {
        let x = digest32(item);
        let idx = (x >> (32 - self.precision)) as usize;
        let w = x << self.precision;
        let rank = Self::rank(w, 32 - self.precision);
        if rank > self.registers[idx] {
            self.registers[idx] = rank;
            true
        } else {
            false
        }
    }

    /// Leading-zero rank of the remaining bits: one more than the number of
    /// leading zeros, capped at `max_bits + 1` when no bit is set.
    fn rank(w: u32, max_bits: u32) -> u8 {
        (w.leading_zeros().min(max_bits) + 1) as u8
    }

    /// Estimated number of distinct items added so far.
    pub fn cardinality(&self) -> u64 {
        let m = self.registers.len() as f64;
        let mut z = 0.0;
        let mut zeros = 0u64;
        for &r in &self.registers {
            z += 1.0 / (1u64 << r) as f64;
            if r == 0 {
                zeros += 1;
            }
        }
        let raw = self.alpha_mm() / z;

        if raw <= 2.5 * m && zeros > 0 {
            // Small-range correction: linear counting on empty registers.
            return (m * (m / zeros as f64).ln()).round() as u64;
        }
        let two32 = (1u64 << 32) as f64;
        if raw > two32 / 30.0 {
            // Large-range correction near hash-space saturation.
            return (-two32 * (1.0 - raw / two32).ln()).round() as u64;
        }
        raw.round() as u64
    }

    /// Bias-correction constant `alpha_m * m^2`, with the published
    /// small-`m` special cases.
    fn alpha_mm(&self) -> f64 {
        let m = self.registers.len() as f64;
        let alpha = match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        };
        alpha * m * m
    }

    /// Clears all registers.
    pub fn reset(&mut self) {
        self.registers.fill(0);
    }

    /// True when no item has ever been added.
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }
}
