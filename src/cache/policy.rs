//! Admission Policy Module
//!
//! Decides which entries enter the cache and which residents are evicted to
//! make room, using approximate access frequency as the value signal.

use std::collections::HashMap;

use rand::Rng;

use crate::cache::sketch::FrequencySketch;

// == Constants ==
/// Resident entries sampled per eviction round.
const EVICTION_SAMPLE_SIZE: usize = 5;

// == Admission Outcome ==
/// Result of offering a new entry to the policy.
///
/// Victims are already untracked by the policy when this is returned; the
/// caller must remove them from the table. A rejected offer can still carry
/// victims when eviction freed some room before a colder round stopped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Admission {
    /// Whether the offered entry should be stored.
    pub admitted: bool,
    /// Entries evicted while trying to make room.
    pub victims: Vec<Victim>,
}

impl Admission {
    fn admitted(victims: Vec<Victim>) -> Self {
        Self {
            admitted: true,
            victims,
        }
    }

    fn rejected(victims: Vec<Victim>) -> Self {
        Self {
            admitted: false,
            victims,
        }
    }
}

/// An evicted entry, identified by its key hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Victim {
    pub hash: u64,
    pub cost: i64,
}

// == Admission Policy Interface ==
/// Capability surface for admission and eviction strategies.
///
/// The write worker drives exactly these operations, always from its single
/// task, so implementations need no interior locking. Swapping in a
/// different strategy means implementing this trait and changing nothing
/// else.
pub(crate) trait AdmissionPolicy: Send {
    /// Records one observed access to a key hash.
    fn record_access(&mut self, hash: u64);

    /// Offers a new entry of `cost`; decides admission and picks victims.
    fn admit(&mut self, hash: u64, cost: i64) -> Admission;

    /// Refreshes the charged cost of a resident entry after an in-place
    /// replacement. Untracked hashes are ignored.
    fn update(&mut self, hash: u64, cost: i64);

    /// Stops tracking an entry, releasing its cost. Untracked hashes are
    /// ignored.
    fn remove(&mut self, hash: u64);

    /// Forgets every entry and all frequency state.
    fn clear(&mut self);

    /// Total cost currently charged against the budget.
    fn cost_used(&self) -> i64;
}

// == TinyLFU Policy ==
/// Frequency-aware admission with sampled least-frequently-used eviction.
///
/// Residents live in a hash-to-cost table paired with a dense vec of hashes
/// so eviction candidates can be drawn uniformly at random in constant
/// time. Access counts come from a count-min sketch that is halved every
/// `num_counters` recorded accesses, keeping the frequency signal fresh.
#[derive(Debug)]
pub(crate) struct TinyLfuPolicy {
    sketch: FrequencySketch,
    slots: HashMap<u64, Slot>,
    keys: Vec<u64>,
    used: i64,
    max_cost: i64,
    accesses: u64,
    reset_at: u64,
}

/// Bookkeeping for one resident hash. `idx` is its position in the dense
/// key vec and must be kept in sync on swap-removal.
#[derive(Debug, Clone, Copy)]
struct Slot {
    cost: i64,
    idx: usize,
}

impl TinyLfuPolicy {
    pub fn new(num_counters: usize, max_cost: i64) -> Self {
        Self {
            sketch: FrequencySketch::new(num_counters),
            slots: HashMap::new(),
            keys: Vec::new(),
            used: 0,
            max_cost,
            accesses: 0,
            reset_at: num_counters as u64,
        }
    }

    fn insert_slot(&mut self, hash: u64, cost: i64) {
        self.keys.push(hash);
        self.slots.insert(
            hash,
            Slot {
                cost,
                idx: self.keys.len() - 1,
            },
        );
        self.used += cost;
    }

    fn remove_slot(&mut self, hash: u64) -> Option<i64> {
        let slot = self.slots.remove(&hash)?;
        self.keys.swap_remove(slot.idx);
        if slot.idx < self.keys.len() {
            // The former last hash now occupies the vacated position.
            let moved = self.keys[slot.idx];
            if let Some(moved_slot) = self.slots.get_mut(&moved) {
                moved_slot.idx = slot.idx;
            }
        }
        self.used -= slot.cost;
        Some(slot.cost)
    }

    /// Draws [`EVICTION_SAMPLE_SIZE`] residents at random and returns the
    /// one with the lowest frequency estimate.
    fn sample_min(&self, rng: &mut impl Rng) -> Option<(u64, i64, u8)> {
        if self.keys.is_empty() {
            return None;
        }
        let mut coldest: Option<(u64, i64, u8)> = None;
        for _ in 0..EVICTION_SAMPLE_SIZE {
            let hash = self.keys[rng.gen_range(0..self.keys.len())];
            let Some(slot) = self.slots.get(&hash) else {
                continue;
            };
            let freq = self.sketch.estimate(hash);
            if coldest.map_or(true, |(_, _, min_freq)| freq < min_freq) {
                coldest = Some((hash, slot.cost, freq));
            }
        }
        coldest
    }
}

impl AdmissionPolicy for TinyLfuPolicy {
    fn record_access(&mut self, hash: u64) {
        self.sketch.increment(hash);
        self.accesses += 1;
        if self.accesses >= self.reset_at {
            self.sketch.reset();
            self.accesses = 0;
        }
    }

    fn admit(&mut self, hash: u64, cost: i64) -> Admission {
        // An entry that could never fit is turned away outright.
        if cost > self.max_cost {
            return Admission::rejected(Vec::new());
        }

        // Already tracked: refresh the charged cost, nothing to evict.
        if let Some(slot) = self.slots.get_mut(&hash) {
            self.used += cost - slot.cost;
            slot.cost = cost;
            return Admission::admitted(Vec::new());
        }

        if self.used + cost <= self.max_cost {
            self.insert_slot(hash, cost);
            return Admission::admitted(Vec::new());
        }

        // The budget is full. Evict sampled low-frequency residents until
        // the entry fits, unless a sampled resident is hotter than the
        // entry itself; a newcomer never displaces a warmer occupant.
        let incoming_freq = self.sketch.estimate(hash);
        let mut rng = rand::thread_rng();
        let mut victims = Vec::new();
        while self.used + cost > self.max_cost {
            let Some((victim_hash, victim_cost, victim_freq)) = self.sample_min(&mut rng) else {
                return Admission::rejected(victims);
            };
            if incoming_freq < victim_freq {
                return Admission::rejected(victims);
            }
            self.remove_slot(victim_hash);
            victims.push(Victim {
                hash: victim_hash,
                cost: victim_cost,
            });
        }

        self.insert_slot(hash, cost);
        Admission::admitted(victims)
    }

    fn update(&mut self, hash: u64, cost: i64) {
        if let Some(slot) = self.slots.get_mut(&hash) {
            self.used += cost - slot.cost;
            slot.cost = cost;
        }
    }

    fn remove(&mut self, hash: u64) {
        self.remove_slot(hash);
    }

    fn clear(&mut self) {
        self.sketch.clear();
        self.slots.clear();
        self.keys.clear();
        self.used = 0;
        self.accesses = 0;
    }

    fn cost_used(&self) -> i64 {
        self.used
    }
}
