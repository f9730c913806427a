//! Frequency Sketch Module
//!
//! Approximate access-frequency counting backing the admission policy.

use rand::Rng;

// == Constants ==
/// Number of counter rows; each row indexes keys with its own seed.
const SKETCH_DEPTH: usize = 4;

/// Counters are four bits wide and saturate here.
const COUNTER_MAX: u8 = 15;

// == Frequency Sketch ==
/// Count-min sketch over key hashes.
///
/// Each of the four rows holds four-bit counters, two per byte, in a
/// power-of-two width derived from the configured counter budget. A key's
/// estimate is the minimum of its counters across rows, which makes the
/// estimate an upper bound on the true count: rows can collide, but never
/// undercount. [`FrequencySketch::reset`] halves every counter so keys that
/// stop being accessed age out instead of staying hot forever.
#[derive(Debug)]
pub(crate) struct FrequencySketch {
    rows: Vec<SketchRow>,
    seeds: [u64; SKETCH_DEPTH],
    mask: u64,
}

impl FrequencySketch {
    /// Creates a sketch sized for roughly `num_counters` tracked keys.
    pub fn new(num_counters: usize) -> Self {
        let width = num_counters.next_power_of_two().max(2);
        let mut rng = rand::thread_rng();
        let mut seeds = [0u64; SKETCH_DEPTH];
        for seed in seeds.iter_mut() {
            *seed = rng.gen();
        }

        Self {
            rows: (0..SKETCH_DEPTH).map(|_| SketchRow::new(width)).collect(),
            seeds,
            mask: (width as u64) - 1,
        }
    }

    // == Increment ==
    /// Records one access for `hash` in every row.
    pub fn increment(&mut self, hash: u64) {
        for (row, seed) in self.rows.iter_mut().zip(self.seeds) {
            row.increment(((hash ^ seed) & self.mask) as usize);
        }
    }

    // == Estimate ==
    /// Returns the estimated access count for `hash`.
    pub fn estimate(&self, hash: u64) -> u8 {
        self.rows
            .iter()
            .zip(self.seeds)
            .map(|(row, seed)| row.get(((hash ^ seed) & self.mask) as usize))
            .min()
            .unwrap_or(0)
    }

    // == Reset ==
    /// Halves every counter, ageing out stale frequency.
    pub fn reset(&mut self) {
        for row in self.rows.iter_mut() {
            row.reset();
        }
    }

    // == Clear ==
    /// Zeroes every counter.
    pub fn clear(&mut self) {
        for row in self.rows.iter_mut() {
            row.clear();
        }
    }
}

// == Sketch Row ==
/// One row of four-bit counters, packed two per byte.
#[derive(Debug)]
struct SketchRow(Vec<u8>);

impl SketchRow {
    fn new(width: usize) -> Self {
        SketchRow(vec![0u8; width / 2])
    }

    /// Reads the counter at `idx`; even indexes occupy the low nibble.
    fn get(&self, idx: usize) -> u8 {
        (self.0[idx / 2] >> ((idx & 1) * 4)) & 0x0f
    }

    /// Bumps the counter at `idx`, saturating at [`COUNTER_MAX`].
    fn increment(&mut self, idx: usize) {
        let shift = (idx & 1) * 4;
        if ((self.0[idx / 2] >> shift) & 0x0f) < COUNTER_MAX {
            self.0[idx / 2] += 1 << shift;
        }
    }

    /// Halves both counters in every byte. The 0x77 mask clears the bit a
    /// right shift would otherwise carry in from the neighbouring nibble.
    fn reset(&mut self) {
        for byte in self.0.iter_mut() {
            *byte = (*byte >> 1) & 0x77;
        }
    }

    fn clear(&mut self) {
        self.0.fill(0);
    }
}
