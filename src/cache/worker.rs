//! Write Worker Module
//!
//! The single background task through which every admission decision and
//! policy mutation flows, in submission order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::cache::entry::CacheEntry;
use crate::cache::metrics::Metrics;
use crate::cache::policy::AdmissionPolicy;
use crate::cache::shards::ShardedMap;

// == Write Operations ==
/// Operations applied by the write worker.
///
/// The channel is FIFO, which is what makes caller-visible ordering work: a
/// deletion submitted after a set of the same key always lands after it.
#[derive(Debug)]
pub(crate) enum WriteOp<V> {
    /// Offer a new entry to the admission policy and store it if accepted.
    Insert { hash: u64, entry: CacheEntry<V> },
    /// Refresh policy bookkeeping after a synchronous in-place replacement.
    Update { hash: u64, cost: i64 },
    /// Remove an entry and release its cost. When `expires_at` is set the
    /// table removal applies only to the exact entry generation observed
    /// expired, so the marker cannot take out a fresher insert.
    Remove {
        hash: u64,
        conflict: u64,
        expires_at: Option<u64>,
    },
    /// A batch of access records for frequency bookkeeping.
    Accesses(Vec<u64>),
    /// Drop every entry and reset policy state and metrics.
    Clear,
    /// Acknowledge once every previously submitted operation has been
    /// applied.
    Barrier(oneshot::Sender<()>),
}

// == Worker Loop ==
/// Applies queued operations until every sender is dropped.
///
/// The worker owns the policy outright, so policy state needs no lock; the
/// shared table and metrics are updated as decisions land.
pub(crate) async fn run<V, P>(
    mut ops: mpsc::UnboundedReceiver<WriteOp<V>>,
    shards: Arc<ShardedMap<V>>,
    metrics: Arc<Metrics>,
    pending_inserts: Arc<AtomicUsize>,
    mut policy: P,
) where
    V: Clone + Send + Sync + 'static,
    P: AdmissionPolicy,
{
    info!("cache write worker started");

    while let Some(op) = ops.recv().await {
        match op {
            WriteOp::Insert { hash, entry } => {
                apply_insert(hash, entry, &shards, &metrics, &mut policy);
                pending_inserts.fetch_sub(1, Ordering::Relaxed);
            }
            WriteOp::Update { hash, cost } => {
                policy.update(hash, cost);
                metrics.record_update();
            }
            WriteOp::Remove {
                hash,
                conflict,
                expires_at,
            } => {
                apply_remove(hash, conflict, expires_at, &shards, &mut policy);
            }
            WriteOp::Accesses(batch) => {
                for hash in batch {
                    policy.record_access(hash);
                }
            }
            WriteOp::Clear => {
                shards.clear();
                policy.clear();
                metrics.reset();
                debug!("cache cleared");
            }
            WriteOp::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
        metrics.set_cost_in_use(policy.cost_used());
    }

    info!("cache write worker stopped");
}

/// Runs one admission round and applies its outcome to the table.
fn apply_insert<V, P>(
    hash: u64,
    entry: CacheEntry<V>,
    shards: &ShardedMap<V>,
    metrics: &Metrics,
    policy: &mut P,
) where
    V: Clone,
    P: AdmissionPolicy,
{
    let cost = entry.cost;
    let admission = policy.admit(hash, cost);

    // Victims are already untracked by the policy, whatever the verdict.
    for victim in &admission.victims {
        if shards.remove(victim.hash, None, None).is_some() {
            metrics.record_eviction(victim.cost);
            trace!(hash = victim.hash, "evicted");
        }
    }

    if admission.admitted {
        if shards.insert(hash, entry) {
            metrics.record_admission(cost);
        }
    } else {
        metrics.record_rejection();
        debug!(hash, "admission rejected");
    }
}

/// Applies a removal marker.
fn apply_remove<V, P>(
    hash: u64,
    conflict: u64,
    expires_at: Option<u64>,
    shards: &ShardedMap<V>,
    policy: &mut P,
) where
    V: Clone,
    P: AdmissionPolicy,
{
    match expires_at {
        // Expiry reclamation: only the observed generation may go, and the
        // policy slot is released only when it actually does. A fresher
        // insert of the same key keeps both its entry and its tracking.
        Some(_) => {
            if shards.remove(hash, Some(conflict), expires_at).is_some() {
                policy.remove(hash);
                trace!(hash, "expired entry reclaimed");
            }
        }
        // Explicit deletion: the caller already removed the table entry;
        // release the policy slot unconditionally.
        None => {
            shards.remove(hash, Some(conflict), None);
            policy.remove(hash);
        }
    }
}
