//! Core domain types and shared logic for the gallery image store.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Image records and their create/update inputs
//! - Tri-state patch fields for partial updates
//! - Caller claims, roles and the ownership-aware authorization gate
//! - Input validation
//! - Request contexts carrying cancellation and deadlines
//! - Configuration

pub mod authz;
pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod image;
pub mod patch;
pub mod validate;

pub use authz::{Capability, Forbidden, authorize};
pub use claims::{Claims, Role};
pub use context::{Context, Interrupted};
pub use error::{Error, Result};
pub use image::{Image, ImageId, NewImage, UpdateImage};
pub use patch::Patch;
pub use validate::{FieldError, FieldErrors};
