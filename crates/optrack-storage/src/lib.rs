//! Cloudflare R2 artifact storage client.
//!
//! This crate provides:
//! - Clip artifact upload (file or bytes) to an S3-compatible bucket
//! - Stable public object URLs used as artifact references in reports
//! - Session-scoped key layout for clip artifacts

pub mod client;
pub mod error;

pub use client::{clip_key, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
