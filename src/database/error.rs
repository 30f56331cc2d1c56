//! # Database Error Module
//!
//! This module defines possible errors that could happen while interacting
//! with database engines through the interfaces in `crate::database`.

use std::error::Error;
use std::fmt;

use crate::game::Tier;

/* ERROR WRAPPER */

/// Wrapper for all database-related errors that could happen during runtime.
/// This pertains specifically to the elements of the `crate::database`
/// module.
#[derive(Debug)]
pub enum DatabaseError {
    /// An error to indicate that a tier's table was requested but does not
    /// exist in the underlying store.
    MissingTier { tier: Tier },

    /// An error to indicate that stored data failed an integrity check
    /// while being read back.
    Corrupted { hint: String },

    /// An error to indicate that an in-memory table allocation could not be
    /// satisfied.
    OutOfMemory { tier: Tier, bytes: u64 },
}

impl Error for DatabaseError {}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTier { tier } => {
                write!(f, "No solved table exists for tier {tier}.")
            },
            Self::Corrupted { hint } => {
                write!(f, "Stored solution data is corrupted: {hint}")
            },
            Self::OutOfMemory { tier, bytes } => {
                write!(
                    f,
                    "Failed to allocate a {bytes}-byte solving table for \
                    tier {tier}.",
                )
            },
        }
    }
}
