//! # crumbtrail-server
//!
//! Host process for the crumbtrail recorder.
//!
//! Owns a recording [`Session`](crumbtrail_core::Session), feeds it from a
//! simulated position source, and serves the trail over HTTP.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod map;
pub mod simulator;
pub mod state;
