// Copyright 2020 Joyent, Inc.

use std::error;
use std::fmt;

/// The error type for failover pool operations.
#[derive(Debug)]
pub enum Error {
    /// The wall clock could not be read while seeding a replica's random
    /// generator. Raised at pool construction time.
    ClockUnavailable,
    /// Every candidate replica failed the configured number of acquisition
    /// attempts. The payload is the accumulated log of per-attempt failure
    /// messages, one line per attempt.
    AllConnectionTriesFailed(String),
    /// A replica index does not name a replica of this pool.
    UnknownReplica(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ClockUnavailable => {
                write!(fmt, "Cannot read the wall clock to seed a replica")
            }
            Error::AllConnectionTriesFailed(log) => {
                write!(fmt, "All connection tries failed. Log: \n\n{}", log)
            }
            Error::UnknownReplica(index) => {
                write!(fmt, "No replica with index {}", index)
            }
        }
    }
}

impl error::Error for Error {}
