//! `tflcm-core` – time-indexed transform buffer.
//!
//! Ingests stamped rigid transforms between named coordinate frames, keeps a
//! bounded history of them, and answers "where is frame A relative to frame
//! B at time T?" by walking the shortest chain of stored frame pairs.
//!
//! # Modules
//!
//! - [`buffer`] – [`TransformBuffer`]: ingestion, retention, availability
//!   checks and lookups.  The blocking `wait_for_transform` /
//!   `*_blocking` calls live in `wait`.
//! - [`algebra`] – [`invert`] and [`compose`] on stamped transforms.
//! - [`record`] – [`TransformRecord`], one stored observation.
//! - [`config`] – [`BufferConfig`], TOML file plus `TFLCM_*` environment
//!   overrides.
//! - [`clock`] – the [`Clock`] seam, with [`SystemClock`] and [`MockClock`].
//! - [`traits`] – [`TransformSink`] / [`TransformLookup`], the narrow views
//!   ingestion paths and query callers depend on.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tflcm_core::{BufferConfig, Clock, MockClock, TransformBuffer};
//! use tflcm_types::{Stamp, TransformStamped};
//!
//! let clock = MockClock::new(Stamp::new(1_000, 0));
//! let buffer = TransformBuffer::with_clock(BufferConfig::default(), Arc::new(clock.clone()));
//!
//! buffer.set_transform(&TransformStamped::identity("map", "odom", clock.now()), "slam", false);
//! assert!(buffer.can_transform("odom", "map", clock.now(), Duration::from_millis(100)));
//! assert_eq!(buffer.all_frame_names(), ["map", "odom"]);
//! ```

pub mod algebra;
pub mod buffer;
pub mod clock;
pub mod config;
mod graph;
pub mod record;
pub mod traits;
mod wait;

pub use algebra::{compose, invert};
pub use buffer::TransformBuffer;
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{BufferConfig, ConfigError};
pub use record::TransformRecord;
pub use traits::{TransformLookup, TransformSink};
