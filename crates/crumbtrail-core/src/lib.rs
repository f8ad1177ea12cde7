//! # crumbtrail-core
//!
//! Core logic for the crumbtrail position recorder.
//!
//! This crate provides:
//! - A durable, append-only trail of position samples
//! - A recorder that manages the connection to a position source and turns
//!   its callbacks into stored, displayed samples
//! - Configuration management (update cadence, storage, display, filtering)
//!
//! ## Architecture
//!
//! - [`storage`] - Append-only point store backed by SQLite
//! - [`source`] - Position source interface and a manually driven source
//! - [`recorder`] - Connection state machine and sample acceptance
//! - [`session`] - Top-level owner wiring store and recorder together
//! - [`policy`] - Optional sample filtering
//! - [`render`] - Rendering layer and host notification interfaces
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod policy;
pub mod recorder;
pub mod render;
pub mod session;
pub mod source;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
pub use config::{
    default_database_path, AccuracyTier, Config, ConfigError, ConfigResult, DisplayConfig,
    FilterConfig, RecenterPolicy, SimulatorConfig, StorageConfig, TrackingConfig,
};
pub use error::{CrumbtrailError, Error, Result};
pub use policy::{AcceptAll, MinDistance, SamplePolicy};
pub use recorder::{RecorderStatus, TrackRecorder, TrackRecorderBuilder};
pub use render::{HostListener, LoggingHost, TrailRenderer};
pub use session::Session;
pub use source::{
    ManualSource, PositionListener, PositionSource, SourceCallCounts, SourceCallbacks,
    SubscriptionId,
};
pub use storage::{PointStore, SqliteStore, StorageError, StorageResult};
pub use types::{ConnectionState, Coordinate, InvalidCoordinate, Point};
