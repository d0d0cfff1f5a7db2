// Copyright 2020 Joyent, Inc.

use std::error;

use crate::failover_pool::types::ClaimOptions;

/// A single-replica connection pool the failover pool draws from.
///
/// The `NestedPool` trait is the seam between the failover pool and the
/// machinery that actually opens and reuses connections. The failover pool
/// never manages sockets itself; it only decides which nested pool to ask
/// next and how often to retry. A nested pool need not be backed by TCP
/// sockets at all, as long as it can hand out some entry type on request.
///
/// `try_acquire` may block the calling thread, for example on network I/O or
/// on the nested pool's own capacity. That is deliberate: if every nested
/// pool is saturated, the failover pool blocks too, and backpressure
/// propagates to the caller. Implementations must be callable concurrently
/// from multiple threads and must not assume any serialization by the
/// failover pool.
pub trait NestedPool: Send + Sync + 'static {
    /// The connection type handed out by this pool.
    type Entry: Send;
    /// The error type returned by a failed acquisition attempt. This is an
    /// associated type so each implementation can report failures in its own
    /// terms. The only constraint is the standard library
    /// [Error](https://doc.rust-lang.org/std/error/trait.Error.html) trait,
    /// which gives the failover pool a human-readable reason to log and to
    /// accumulate into its failure diagnostics.
    type Error: error::Error;

    /// Attempt to obtain one connection from this pool. A failure here is
    /// recovered by the failover pool, which moves on to the next candidate
    /// replica; only the message is retained.
    fn try_acquire(
        &self,
        options: &ClaimOptions,
    ) -> Result<Self::Entry, Self::Error>;
}
