//! Participant backend adapters
//!
//! - [`FixedParticipantBackend`]: canned replies, for offline runs and demos
//! - [`RoutingBackend`]: routes each participant to one of several backends
//! - `HttpParticipantBackend`: JSON over HTTP (feature `http-backend`)

mod fixed;
#[cfg(feature = "http-backend")]
mod http;
mod routing;

pub use fixed::{FixedParticipantBackend, FixedReply};
#[cfg(feature = "http-backend")]
pub use http::HttpParticipantBackend;
pub use routing::RoutingBackend;
