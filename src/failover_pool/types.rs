// Copyright 2020 Joyent, Inc.

use slog::Logger;

use crate::replica::Priority;

/// The configuration options for a failover pool. This is required to
/// instantiate a new pool.
#[derive(Debug)]
pub struct FailoverPoolOptions {
    /// An optional ceiling on the number of acquisition attempts made
    /// against each candidate replica during one selection. If not specified
    /// the default is 3.
    pub max_tries: Option<u32>,
    /// An optional period, in seconds, between successive halvings of every
    /// replica's error count. If not specified the default is 60 seconds.
    pub decrease_error_period: Option<u64>,
    /// An optional `slog` logger instance. If none is provided then the
    /// logging will fall back to using the
    /// [`slog-stdlog`](https://docs.rs/slog-stdlog) drain which is
    /// essentially the same as using the rust standard
    /// [`log`](https://docs.rs/log) crate.
    pub log: Option<Logger>,
}

/// Per-claim settings supplied by the caller.
#[derive(Clone, Debug)]
pub struct ClaimOptions {
    /// The number of connections `claim_many` hands out, each from a
    /// distinct replica. The default is 1.
    pub max_parallel_replicas: u32,
    /// When true, the complete absence of a live replica yields an empty
    /// result instead of an error. The default is false.
    pub skip_unavailable_shards: bool,
}

impl Default for ClaimOptions {
    fn default() -> Self {
        ClaimOptions {
            max_parallel_replicas: 1,
            skip_unavailable_shards: false,
        }
    }
}

/// A point-in-time view of one replica's scheduling state, as reported by
/// [`FailoverPool::get_stats`](../struct.FailoverPool.html#method.get_stats).
#[derive(Clone, Copy, Debug)]
pub struct ReplicaStats {
    /// The replica's configured priority.
    pub priority: Priority,
    /// The replica's current error count.
    pub error_count: u64,
}

// Tracks which replicas a multi-connection claim has already consumed, so
// successive selections draw from a shrinking candidate pool. The handles
// form a permutation of the replica indices; `consume` swaps a handle behind
// the unallocated prefix rather than removing it, so no handle is ever lost
// or duplicated. No bounds are checked here beyond slice indexing; the
// selector is contracted to stay within `[0, size())`.
#[doc(hidden)]
#[derive(Debug)]
pub struct SelectionTracker {
    handles: Vec<usize>,
    unallocated_size: usize,
}

impl SelectionTracker {
    pub fn new(size: usize) -> Self {
        SelectionTracker {
            handles: (0..size).collect(),
            unallocated_size: size,
        }
    }

    /// The number of replicas still eligible for selection.
    pub fn size(&self) -> usize {
        self.unallocated_size
    }

    /// The replica index held in tracker slot `index`.
    pub fn handle_at(&self, index: usize) -> usize {
        self.handles[index]
    }

    /// Retire tracker slot `index`, shrinking the eligible prefix by one.
    pub fn consume(&mut self, index: usize) {
        self.handles.swap(index, self.unallocated_size - 1);
        self.unallocated_size -= 1;
    }
}
