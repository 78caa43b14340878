//! Server-side pieces of Siphon: the UDP listener and worker dispatch.
//!
//! Split out of the binary so integration tests can drive a live listener.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

pub mod listener;

pub use listener::Listener;
