//! Input validation. Pure checks, no I/O.

use crate::image::{ImageId, NewImage, UpdateImage};
use crate::patch::Patch;
use serde::Serialize;
use std::fmt;

/// Maximum accepted length of an image URL, in bytes.
pub const MAX_IMAGE_URL_LEN: usize = 2048;

/// Maximum accepted length of a user ID, in bytes.
pub const MAX_USER_ID_LEN: usize = 128;

/// A single field that failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation for one payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether `field` is among the failures.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<FieldError> for FieldErrors {
    fn from(e: FieldError) -> Self {
        Self(vec![e])
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Check that `id` is a well-formed image identifier.
pub fn check_id(id: &str) -> crate::Result<ImageId> {
    ImageId::parse(id)
}

/// Check that an owner reference is usable as a lookup key.
pub fn check_owner(owner: &str) -> crate::Result<()> {
    if owner.trim().is_empty() || owner.len() > MAX_USER_ID_LEN {
        return Err(crate::Error::InvalidId(owner.to_string()));
    }
    Ok(())
}

/// Validate a creation payload. All fields are required.
pub fn check_new(ni: &NewImage) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::default();
    check_text(&mut errs, "image_url", &ni.image_url, MAX_IMAGE_URL_LEN);
    check_text(&mut errs, "user_id", &ni.user_id, MAX_USER_ID_LEN);
    errs.into_result()
}

/// Validate an update payload. Absent fields are fine; present ones obey the
/// creation rules, and neither column accepts an explicit null.
pub fn check_update(up: &UpdateImage) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::default();
    check_patch(&mut errs, "image_url", &up.image_url, MAX_IMAGE_URL_LEN);
    check_patch(&mut errs, "user_id", &up.user_id, MAX_USER_ID_LEN);
    errs.into_result()
}

/// Validate paging parameters. Pages are 1-indexed.
pub fn check_page(page: u32, page_size: u32) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::default();
    if page < 1 {
        errs.push("page", "must be at least 1");
    }
    if page_size < 1 {
        errs.push("page_size", "must be at least 1");
    }
    errs.into_result()
}

fn check_patch(errs: &mut FieldErrors, field: &'static str, value: &Patch<String>, max: usize) {
    match value {
        Patch::Absent => {}
        Patch::Null => errs.push(field, "cannot be null"),
        Patch::Value(v) => check_text(errs, field, v, max),
    }
}

fn check_text(errs: &mut FieldErrors, field: &'static str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errs.push(field, "is a required field");
    } else if value.len() > max {
        errs.push(field, format!("must be at most {max} bytes"));
    } else if value.chars().any(char::is_control) {
        errs.push(field, "must not contain control characters");
    }
}
