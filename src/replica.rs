// Copyright 2020 Joyent, Inc.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::{Display, From, Into};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Error;
use crate::failover_pool::types::ReplicaStats;

// Width in bits of a replica error count. A decay shift of this size or more
// clears the count outright instead of shifting.
const ERROR_COUNT_BITS: u64 = 64;

/// The scheduling priority of a replica. Smaller values are preferred. The
/// owner of the pool assigns priorities, typically from configuration; the
/// selection machinery only ever reads them.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Priority(i64);

/// The composite key one selection round sorts candidates by.
///
/// Keys compare lexicographically as the `(priority, error_count, random)`
/// triple. The random component is drawn fresh for every round and breaks
/// ties between replicas of equal priority and error count, so no replica in
/// an equally ranked group is starved.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct SortKey {
    /// The replica's configured priority.
    pub priority: Priority,
    /// The replica's error count as observed in the snapshot.
    pub error_count: u64,
    /// This round's tie-breaker draw from the replica's generator.
    pub random: u32,
}

// The rank state of one replica. Touched only while holding the set mutex.
struct RankState {
    priority: Priority,
    random: u32,
    rng: SmallRng,
}

impl RankState {
    // Draw a fresh tie-breaker for the coming round.
    fn randomize(&mut self) {
        self.random = self.rng.gen();
    }
}

// One replica's scheduling state: the nested pool handle and the error
// counter the selector bumps on failed attempts. The counter is incremented
// atomically without the set mutex; snapshot readers tolerate observing
// either the pre- or post-increment value.
pub(crate) struct ReplicaEntry<P> {
    pool: Arc<P>,
    error_count: AtomicU64,
}

impl<P> ReplicaEntry<P> {
    pub(crate) fn pool(&self) -> &P {
        &self.pool
    }

    pub(crate) fn increment_errors(&self) {
        self.error_count.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

// The replicas of one shard, in caller-provided order. Indices into the set
// are stable and identify replicas everywhere else in the crate.
//
// The set owns the periodic decay of error counts and the per-round random
// draws. Both run under one plain mutex; contention is bounded by the number
// of replicas, which is small.
pub(crate) struct ReplicaSet<P> {
    entries: Vec<ReplicaEntry<P>>,
    ranked: Mutex<RankedState>,
    decrease_error_period: u64,
}

struct RankedState {
    ranks: Vec<RankState>,
    // Wall-clock second of the last error count halving. Zero means no
    // snapshot has been taken yet.
    last_decrease_time: u64,
}

impl<P> ReplicaSet<P> {
    pub(crate) fn new(
        pools: Vec<(Arc<P>, Priority)>,
        decrease_error_period: u64,
    ) -> Result<Self, Error> {
        let mut entries = Vec::with_capacity(pools.len());
        let mut ranks = Vec::with_capacity(pools.len());

        for (pool, priority) in pools {
            let rng = seed_rng(&pool)?;
            ranks.push(RankState {
                priority,
                random: 0,
                rng,
            });
            entries.push(ReplicaEntry {
                pool,
                error_count: AtomicU64::new(0),
            });
        }

        Ok(ReplicaSet {
            entries,
            ranked: Mutex::new(RankedState {
                ranks,
                last_decrease_time: 0,
            }),
            decrease_error_period: decrease_error_period.max(1),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entry(&self, index: usize) -> &ReplicaEntry<P> {
        &self.entries[index]
    }

    pub(crate) fn set_priority(
        &self,
        index: usize,
        priority: Priority,
    ) -> Result<(), Error> {
        let mut ranked = self.ranked_lock();
        match ranked.ranks.get_mut(index) {
            Some(rank) => {
                rank.priority = priority;
                Ok(())
            }
            None => Err(Error::UnknownReplica(index)),
        }
    }

    pub(crate) fn stats(&self) -> Vec<ReplicaStats> {
        let ranked = self.ranked_lock();
        self.entries
            .iter()
            .zip(ranked.ranks.iter())
            .map(|(entry, rank)| ReplicaStats {
                priority: rank.priority,
                error_count: entry.error_count.load(AtomicOrdering::Relaxed),
            })
            .collect()
    }

    /// Produce one internally consistent sort key per replica, in set order,
    /// after drawing fresh randoms and applying any due error count decay.
    pub(crate) fn snapshot(&self) -> Vec<SortKey> {
        self.snapshot_at(wall_clock_secs())
    }

    // `now` is a wall-clock second count. Split out from `snapshot` so tests
    // control the clock.
    pub(crate) fn snapshot_at(&self, now: u64) -> Vec<SortKey> {
        let mut ranked = self.ranked_lock();

        for rank in ranked.ranks.iter_mut() {
            rank.randomize();
        }

        if ranked.last_decrease_time == 0 {
            ranked.last_decrease_time = now;
        } else {
            // A clock that went backwards reads as no elapsed time; decay is
            // delayed, never reversed.
            let delta = now.saturating_sub(ranked.last_decrease_time);
            let shift = delta / self.decrease_error_period;

            // Advance the decay clock only when a full period has elapsed,
            // so a stream of sub-period snapshots cannot keep resetting it
            // and starve the decay.
            if shift > 0 {
                ranked.last_decrease_time = now;
            }

            if shift >= ERROR_COUNT_BITS {
                for entry in &self.entries {
                    entry.error_count.store(0, AtomicOrdering::Relaxed);
                }
            } else if shift > 0 {
                for entry in &self.entries {
                    let count =
                        entry.error_count.load(AtomicOrdering::Relaxed);
                    entry
                        .error_count
                        .store(count >> shift, AtomicOrdering::Relaxed);
                }
            }
        }

        self.entries
            .iter()
            .zip(ranked.ranks.iter())
            .map(|(entry, rank)| SortKey {
                priority: rank.priority,
                error_count: entry.error_count.load(AtomicOrdering::Relaxed),
                random: rank.random,
            })
            .collect()
    }

    fn ranked_lock(&self) -> MutexGuard<RankedState> {
        self.ranked.lock().unwrap()
    }
}

// Seed a replica's generator from the wall clock XORed with the pool
// handle's address, so entries constructed in the same instant still draw
// uncorrelated streams.
fn seed_rng<P>(pool: &Arc<P>) -> Result<SmallRng, Error> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| Error::ClockUnavailable)?
        .as_nanos() as u64;
    let identity = Arc::as_ptr(pool) as usize as u64;

    Ok(SmallRng::seed_from_u64(nanos ^ identity))
}

fn wall_clock_secs() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        // Treated as no elapsed time by the decay arithmetic.
        Err(_) => 0,
    }
}
