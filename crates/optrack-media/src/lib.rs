//! FFmpeg CLI wrapper for clip assembly.
//!
//! Turns the JPEG frame sequence accumulated over a clip interval into an
//! MP4 artifact. FFmpeg is an external collaborator; this crate only builds
//! the command line, pipes frames in, and surfaces failures.

pub mod clip;
pub mod error;

pub use clip::ClipEncoder;
pub use error::{MediaError, MediaResult};
