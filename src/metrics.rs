//! Operation counters for the role repository.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

const STRIPES: usize = 16;

#[derive(Debug, Default)]
#[repr(align(64))]
struct Stripe(AtomicU64);

/// Counter spread over cache-line aligned stripes.
///
/// Each thread increments its own stripe, so readers on the lookup path do not
/// contend on a single atomic. Reading sums every stripe.
#[derive(Debug, Default)]
pub struct StripedCounter {
    stripes: [Stripe; STRIPES],
}

impl StripedCounter {
    pub fn increment(&self) {
        self.stripes[stripe_index()].0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.stripes
            .iter()
            .map(|stripe| stripe.0.load(Ordering::Relaxed))
            .sum()
    }

    pub fn reset(&self) {
        for stripe in &self.stripes {
            stripe.0.store(0, Ordering::Relaxed);
        }
    }
}

fn stripe_index() -> usize {
    static NEXT: AtomicUsize = AtomicUsize::new(0);

    thread_local! {
        static SLOT: usize = NEXT.fetch_add(1, Ordering::Relaxed) % STRIPES;
    }

    SLOT.with(|slot| *slot)
}

/// Counters for repository operations.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct RepositoryMetrics {
    /// Number of successful creates.
    pub creates: Arc<AtomicU64>,
    /// Number of successful updates.
    pub updates: Arc<AtomicU64>,
    /// Number of deletes that found a role.
    pub deletes: Arc<AtomicU64>,
    /// Number of name and membership lookups.
    pub lookups: Arc<StripedCounter>,
    /// Number of rejected stale updates.
    pub conflicts: Arc<AtomicU64>,
    /// Number of rejected names, mismatches and duplicates.
    pub validation_failures: Arc<AtomicU64>,
    /// Number of failed commits.
    pub persistence_failures: Arc<AtomicU64>,
}

/// Point-in-time copy of [`RepositoryMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub lookups: u64,
    pub conflicts: u64,
    pub validation_failures: u64,
    pub persistence_failures: u64,
}

impl RepositoryMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_create(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup(&self) {
        self.lookups.increment();
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            lookups: self.lookups.get(),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.creates,
            &self.updates,
            &self.deletes,
            &self.conflicts,
            &self.validation_failures,
            &self.persistence_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.lookups.reset();
    }
}

impl MetricsSnapshot {
    /// Total number of successful mutations.
    pub fn mutations(&self) -> u64 {
        self.creates + self.updates + self.deletes
    }

    /// Fraction of attempted updates rejected as stale.
    pub fn conflict_ratio(&self) -> f64 {
        let attempts = self.updates + self.conflicts;
        if attempts == 0 {
            0.0
        } else {
            self.conflicts as f64 / attempts as f64
        }
    }
}
