//! # gara-media
//!
//! Image normalization for attachments: images larger than the configured
//! bounds are downscaled by a single integer factor and every image is
//! re-encoded as JPEG for a predictable, compact payload.

pub mod normalize;

mod error;

pub use error::MediaError;
pub use normalize::{normalize, scale_factor, NormalizedImage};
