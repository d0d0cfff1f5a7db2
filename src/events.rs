// Copyright 2020 Joyent, Inc.

//! Process-wide counters for connection acquisition failures.
//!
//! The counters only ever increase and are shared by every pool in the
//! process. They are cheap enough to bump on every failed attempt and are
//! intended to be scraped by whatever telemetry the embedding application
//! runs.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing process-wide event counter.
#[derive(Debug)]
pub struct Counter(AtomicU64);

impl Counter {
    const fn new() -> Self {
        Counter(AtomicU64::new(0))
    }

    /// Add one to the counter.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current value of the counter.
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Incremented once per failed acquisition attempt against a replica.
pub static DISTRIBUTED_CONNECTION_FAIL_TRY: Counter = Counter::new();

/// Incremented once per selection that exhausted every candidate replica.
pub static DISTRIBUTED_CONNECTION_FAIL_AT_ALL: Counter = Counter::new();
