//! HTTP/WebSocket server and session pipeline for live tool tracking.
//!
//! The binary wires a frame source, a detector, a placement classifier and
//! an artifact sink into one `Session`, exposes `/ws` for live subscribers
//! plus `/report` for polling clients, and runs until the source ends or
//! shutdown is signalled.

pub mod artifact;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod source;
pub mod state;
pub mod ws;

pub use artifact::{ArtifactSink, ClipSink, NullSink};
pub use config::{DetectorBackend, PlacementBackend, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use routes::router;
pub use session::{Session, SessionConfig};
pub use source::{FrameSource, HttpFrameSource, StubFrameSource};
pub use state::AppState;
