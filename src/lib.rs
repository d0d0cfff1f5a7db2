// Copyright 2020 Joyent, Inc.

//! A failover-aware connection pool for replicated services
//!
//! `failover-pool` manages connection acquisition across the replicas of a
//! sharded, replicated service -- typically a distributed database where
//! every replica of a shard can answer the same reads. The crate does not
//! open sockets itself. It is layered over a set of *nested pools*, one per
//! replica, each implementing the
//! [`NestedPool`](nested_pool/trait.NestedPool.html) trait, and decides
//! which nested pool to ask next, how often to retry, and when to give up.
//!
//! ## Selection
//!
//! Each selection round ranks the replicas by a composite sort key, the
//! lexicographic triple `(priority, error_count, random)`:
//!
//! * *priority* is assigned by the pool's owner, typically from
//!   configuration. Smaller values are preferred, so an operator can pin
//!   traffic to nearby replicas and keep remote ones as fallback.
//! * *error_count* is the number of failed acquisition attempts recorded
//!   against the replica, so replicas that have been failing recently sort
//!   behind healthy ones.
//! * *random* is a fresh per-round draw from a per-replica generator. It
//!   breaks ties between equally ranked replicas so none of them is
//!   deterministically starved.
//!
//! The selector then sweeps the ranked candidates, asking each nested pool
//! for a connection, and repeats the sweep up to `max_tries` times. Sweeping
//! every candidate before retrying any one means a live alternate is found
//! on the first round when one exists, rather than spending every retry on
//! a dead host.
//!
//! ## Error decay
//!
//! Recorded failures must not penalize a replica forever. Every
//! `decrease_error_period` seconds of wall-clock time, each replica's error
//! count is halved (a right shift per elapsed period), so a recovered
//! replica climbs back up the ranking and is probed again. Decay is purely
//! time-based; a successful acquisition does not reset any counter.
//!
//! ## Fan-out
//!
//! [`claim_many`](failover_pool/struct.FailoverPool.html#method.claim_many)
//! acquires up to `max_parallel_replicas` connections in one call, each from
//! a *distinct* replica, for callers that fan a query out over several
//! replicas of the same shard. Whether an unavailable shard is an error or
//! an empty result is governed by the `skip_unavailable_shards` claim
//! option.
//!
//! Note: if one of the nested pools blocks because it is out of capacity,
//! the failover pool blocks too. Backpressure propagates; it is not
//! converted into failure.
//!
//! ## Example
//!
//! Use a hypothetical `NestedPool` implementation to acquire connections
//! with failover across three replicas.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use failover_pool::failover_pool::types::{
//!     ClaimOptions, FailoverPoolOptions,
//! };
//! use failover_pool::failover_pool::FailoverPool;
//!
//! let replicas = vec![
//!     (Arc::new(TcpNestedPool::new("10.0.0.1:5432")), 0.into()),
//!     (Arc::new(TcpNestedPool::new("10.0.0.2:5432")), 0.into()),
//!     (Arc::new(TcpNestedPool::new("10.0.1.1:5432")), 1.into()),
//! ];
//!
//! let pool_opts = FailoverPoolOptions {
//!     max_tries: Some(3),
//!     decrease_error_period: Some(60),
//!     log: None,
//! };
//!
//! let pool = FailoverPool::new(pool_opts, replicas)?;
//!
//! let conn = pool.claim(&ClaimOptions::default())?;
//!
//! let fanout = pool.claim_many(&ClaimOptions {
//!     max_parallel_replicas: 2,
//!     skip_unavailable_shards: true,
//! })?;
//! ```

#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod failover_pool;
pub mod nested_pool;
pub mod replica;
