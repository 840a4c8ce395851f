//! Resource core for gallery images.
//!
//! [`ImageCore`] validates input, runs store operations, translates storage
//! failures into [`ImageError`], and composes the ownership check between the
//! read and the write of a guarded mutation.

pub mod error;
pub mod image;

pub use error::{ImageError, ImageResult};
pub use image::ImageCore;
