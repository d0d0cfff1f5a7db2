// Copyright 2020 Joyent, Inc.

pub mod types;

use std::sync::Arc;

use slog::{o, warn, Drain, Logger};

use crate::error::Error;
use crate::events;
use crate::failover_pool::types::{
    ClaimOptions, FailoverPoolOptions, ReplicaStats, SelectionTracker,
};
use crate::nested_pool::NestedPool;
use crate::replica::{Priority, ReplicaSet, SortKey};

// Default number of acquisition attempts per candidate replica
const DEFAULT_MAX_TRIES: u32 = 3;
// Default error count halving period in seconds
const DEFAULT_DECREASE_ERROR_PERIOD: u64 = 60;

/// A pool of connections to the replicas of one shard, with failover.
///
/// The pool is initialized with one nested pool per replica and hands out
/// connections by probing the replicas in the lexicographic order of their
/// `(priority, error_count, random)` sort keys, retrying across replicas up
/// to a bounded number of times. Recorded failures decay over wall-clock
/// time so a recovered replica is tried again.
pub struct FailoverPool<P>
where
    P: NestedPool,
{
    replicas: ReplicaSet<P>,
    max_tries: u32,
    log: Logger,
}

impl<P> FailoverPool<P>
where
    P: NestedPool,
{
    /// Create a pool over `pools`, the replicas of one shard, in caller
    /// order. A replica's position in `pools` is its index for
    /// [`set_priority`](#method.set_priority) and
    /// [`get_stats`](#method.get_stats). The nested pools are shared
    /// handles; the failover pool never copies or closes them.
    ///
    /// Returns [`Error::ClockUnavailable`](../error/enum.Error.html) if the
    /// wall clock cannot be read while seeding a replica's random generator.
    pub fn new(
        options: FailoverPoolOptions,
        pools: Vec<(Arc<P>, Priority)>,
    ) -> Result<Self, Error> {
        let max_tries = options.max_tries.unwrap_or(DEFAULT_MAX_TRIES);
        let decrease_error_period = options
            .decrease_error_period
            .unwrap_or(DEFAULT_DECREASE_ERROR_PERIOD);
        let log = options
            .log
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));

        let replicas = ReplicaSet::new(pools, decrease_error_period)?;

        Ok(FailoverPool {
            replicas,
            max_tries,
            log,
        })
    }

    /// The number of replicas this pool selects over.
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.len() == 0
    }

    /// Reassign the priority of the replica at `index`. Takes effect for
    /// subsequent claims; a selection round already in flight keeps the keys
    /// it snapshotted.
    pub fn set_priority(
        &self,
        index: usize,
        priority: Priority,
    ) -> Result<(), Error> {
        self.replicas.set_priority(index, priority)
    }

    /// A point-in-time view of every replica's priority and error count, in
    /// construction order.
    pub fn get_stats(&self) -> Vec<ReplicaStats> {
        self.replicas.stats()
    }

    /// Acquire one connection from the best available replica.
    ///
    /// Returns `Ok(None)` when no replica could provide a connection and
    /// `options.skip_unavailable_shards` is set; otherwise exhaustion is an
    /// [`Error::AllConnectionTriesFailed`](../error/enum.Error.html) carrying
    /// the accumulated per-attempt failure messages.
    pub fn claim(
        &self,
        options: &ClaimOptions,
    ) -> Result<Option<P::Entry>, Error> {
        let mut fail_messages = String::new();

        match self.select_one(None, options, &mut fail_messages) {
            Some(entry) => Ok(Some(entry)),
            None if options.skip_unavailable_shards => Ok(None),
            None => Err(Error::AllConnectionTriesFailed(fail_messages)),
        }
    }

    /// Acquire up to `options.max_parallel_replicas` connections, each from
    /// a distinct replica.
    ///
    /// Exhaustion is only an error when not a single connection could be
    /// acquired and `options.skip_unavailable_shards` is unset. Once at
    /// least one connection has been collected, a failed selection ends the
    /// fan-out and whatever has been collected is returned, so the result
    /// may be shorter than requested.
    pub fn claim_many(
        &self,
        options: &ClaimOptions,
    ) -> Result<Vec<P::Entry>, Error> {
        let mut tracker = SelectionTracker::new(self.replicas.len());

        let max_connections = options.max_parallel_replicas;
        let mut connections = Vec::with_capacity(max_connections as usize);

        for i in 0..max_connections {
            let mut fail_messages = String::new();

            match self.select_one(
                Some(&mut tracker),
                options,
                &mut fail_messages,
            ) {
                Some(entry) => connections.push(entry),
                None if i == 0 && !options.skip_unavailable_shards => {
                    return Err(Error::AllConnectionTriesFailed(
                        fail_messages,
                    ));
                }
                None => break,
            }
        }

        Ok(connections)
    }

    // One selection: snapshot the sort keys, rank the candidates, then sweep
    // them in rank order up to `max_tries` times until an acquisition
    // succeeds. Sweeping every candidate before retrying any one surfaces a
    // live alternate on the first round instead of burning retries on a dead
    // host. Each failed attempt bumps the replica's error count and appends
    // its message to `fail_messages`.
    fn select_one(
        &self,
        mut tracker: Option<&mut SelectionTracker>,
        options: &ClaimOptions,
        fail_messages: &mut String,
    ) -> Option<P::Entry> {
        let snapshot = self.replicas.snapshot();

        struct Candidate {
            key: SortKey,
            // Slot in the tracker prefix, when selecting under a tracker.
            tracker_index: usize,
            pool_index: usize,
        }

        let candidate_count = match &tracker {
            Some(tracker) => tracker.size(),
            None => self.replicas.len(),
        };

        let mut candidates = Vec::with_capacity(candidate_count);
        for i in 0..candidate_count {
            let pool_index = match &tracker {
                Some(tracker) => tracker.handle_at(i),
                None => i,
            };
            candidates.push(Candidate {
                key: snapshot[pool_index],
                tracker_index: i,
                pool_index,
            });
        }

        candidates.sort_by(|lhs, rhs| lhs.key.cmp(&rhs.key));

        for try_no in 1..=self.max_tries {
            for candidate in &candidates {
                let entry = self.replicas.entry(candidate.pool_index);

                match entry.pool().try_acquire(options) {
                    Ok(connection) => {
                        if let Some(tracker) = tracker.as_mut() {
                            tracker.consume(candidate.tracker_index);
                        }
                        return Some(connection);
                    }
                    Err(reason) => {
                        entry.increment_errors();
                        events::DISTRIBUTED_CONNECTION_FAIL_TRY.increment();

                        warn!(
                            self.log,
                            "Connection failed at try {}, reason: {}",
                            try_no,
                            reason
                        );

                        fail_messages.push_str(&reason.to_string());
                        fail_messages.push('\n');
                    }
                }
            }
        }

        events::DISTRIBUTED_CONNECTION_FAIL_AT_ALL.increment();
        None
    }
}
