//! Ownership-aware authorization.
//!
//! The gate is a pure predicate over the caller's claims, the owner of the
//! record being touched, and the capability the operation needs. The owner
//! has to be read from storage first, so callers resolve "not found" before
//! asking the gate anything.

use crate::claims::{Claims, Role};
use std::fmt;
use thiserror::Error;

/// What an operation requires of the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Only administrators may proceed.
    AdminOnly,
    /// The record's owner or an administrator may proceed.
    OwnerOrAdmin,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdminOnly => write!(f, "admin-only"),
            Self::OwnerOrAdmin => write!(f, "owner-or-admin"),
        }
    }
}

/// The single deny outcome. It carries nothing about the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("attempted action is not allowed")]
pub struct Forbidden;

/// Decide whether `claims` may act on a record owned by `owner`.
pub fn authorize(claims: &Claims, owner: &str, capability: Capability) -> Result<(), Forbidden> {
    if claims.authorized(&[Role::Admin]) {
        return Ok(());
    }

    match capability {
        Capability::OwnerOrAdmin if claims.subject == owner => Ok(()),
        _ => Err(Forbidden),
    }
}
