//! Output generation.
//!
//! - [`json`]: writes the [`Digest`](crate::models::Digest) hand-off file
//!   consumed by the external renderer

pub mod json;
