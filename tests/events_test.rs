// Copyright 2020 Joyent, Inc.

// The failure counters are process-wide, so this scenario lives in its own
// test binary where nothing else drives the selector.

use std::error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use failover_pool::events::{
    DISTRIBUTED_CONNECTION_FAIL_AT_ALL, DISTRIBUTED_CONNECTION_FAIL_TRY,
};
use failover_pool::failover_pool::types::{ClaimOptions, FailoverPoolOptions};
use failover_pool::failover_pool::FailoverPool;
use failover_pool::nested_pool::NestedPool;

#[derive(Debug)]
struct AcquireFailure;

impl fmt::Display for AcquireFailure {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        "connection refused".fmt(fmt)
    }
}

impl error::Error for AcquireFailure {}

struct FailingPool {
    attempts: AtomicUsize,
}

impl NestedPool for FailingPool {
    type Entry = ();
    type Error = AcquireFailure;

    fn try_acquire(
        &self,
        _options: &ClaimOptions,
    ) -> Result<(), AcquireFailure> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AcquireFailure)
    }
}

#[test]
fn failure_counters_advance() {
    let replica = Arc::new(FailingPool {
        attempts: AtomicUsize::new(0),
    });

    let pool_opts = FailoverPoolOptions {
        max_tries: Some(3),
        decrease_error_period: Some(60),
        log: None,
    };

    let pool =
        FailoverPool::new(pool_opts, vec![(replica.clone(), 0.into())])
            .unwrap();

    let fail_try_before = DISTRIBUTED_CONNECTION_FAIL_TRY.value();
    let fail_at_all_before = DISTRIBUTED_CONNECTION_FAIL_AT_ALL.value();

    assert!(pool.claim(&ClaimOptions::default()).is_err());

    assert_eq!(replica.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        DISTRIBUTED_CONNECTION_FAIL_TRY.value() - fail_try_before,
        3
    );
    assert_eq!(
        DISTRIBUTED_CONNECTION_FAIL_AT_ALL.value() - fail_at_all_before,
        1
    );
}
