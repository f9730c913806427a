//! Access Buffer Module
//!
//! Lossy, striped batching of read-side access records on their way to the
//! admission policy.

use parking_lot::Mutex;

// == Constants ==
/// Stripe fanout; must be a power of two.
const NUM_STRIPES: usize = 8;

// == Push Outcome ==
/// What happened to one pushed access record.
#[derive(Debug)]
pub(crate) enum AccessPush {
    /// Recorded into a stripe that still has room.
    Recorded,
    /// Recording filled the stripe; the drained batch is handed back for
    /// delivery to the policy.
    Flushed(Vec<u64>),
    /// The stripe was locked by another reader; the record was discarded.
    Contended,
}

// == Access Buffer ==
/// Striped buffer of key hashes awaiting frequency bookkeeping.
///
/// Pushes never block. A stripe that cannot be locked on the first try
/// drops the record instead, which is acceptable loss: access records only
/// feed frequency estimates, and a contended cache produces plenty more.
#[derive(Debug)]
pub(crate) struct AccessBuffer {
    stripes: Vec<Mutex<Vec<u64>>>,
    capacity: usize,
}

impl AccessBuffer {
    /// Creates a buffer whose stripes drain in batches of `capacity`.
    pub fn new(capacity: usize) -> Self {
        let mut stripes = Vec::with_capacity(NUM_STRIPES);
        for _ in 0..NUM_STRIPES {
            stripes.push(Mutex::new(Vec::with_capacity(capacity)));
        }
        Self { stripes, capacity }
    }

    // == Push ==
    /// Records one access, returning the drained batch when a stripe fills.
    pub fn push(&self, hash: u64) -> AccessPush {
        let stripe = &self.stripes[(hash as usize) & (NUM_STRIPES - 1)];
        let Some(mut records) = stripe.try_lock() else {
            return AccessPush::Contended;
        };

        records.push(hash);
        if records.len() >= self.capacity {
            let batch = std::mem::replace(&mut *records, Vec::with_capacity(self.capacity));
            AccessPush::Flushed(batch)
        } else {
            AccessPush::Recorded
        }
    }
}
