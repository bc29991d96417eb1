//! HTTP clients for the external ML collaborators.
//!
//! This crate provides:
//! - `RemoteDetector`: client for the object-detection inference service,
//!   implementing the pipeline's `Detector` trait
//! - `GeminiPlacement`: vision-language placement classifier, the semantic
//!   alternative to the mask-overlap strategy

pub mod detector;
pub mod error;
pub mod gemini;

pub use detector::{DetectorClientConfig, RemoteDetector};
pub use error::{MlClientError, MlClientResult};
pub use gemini::{GeminiConfig, GeminiPlacement};
