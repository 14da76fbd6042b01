// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Deterministic string-to-integer hashing shared by the sketches.

use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

/// Seeded rolling hash over the item's bytes, reduced modulo `modulus` at
/// every step. Distinct seeds yield the independent hash rows of a Count-Min
/// table.
pub fn rolling_hash(item: &str, seed: u64, modulus: usize) -> usize {
    let m = modulus as u64;
    let mut h: u64 = 0;
    for &b in item.as_bytes() {
        h = (h.wrapping_mul(seed).wrapping_add(u64::from(b))) % m;
    }
    h as usize
}

/// Fixed-width 32-bit digest of an item, taken from the high half of its
/// SipHash-1-3 output.
pub fn digest32(item: &str) -> u32 {
    let mut hasher = SipHasher13::new();
    item.hash(&mut hasher);
    (hasher.finish() >> 32) as u32
}
