//! WebSocket infrastructure for pushing market summaries
//!
//! This module tracks live dashboard connections so that messages can be
//! delivered to all of them at once.

mod registry;

pub use registry::{ClientId, ConnectionRegistry};
