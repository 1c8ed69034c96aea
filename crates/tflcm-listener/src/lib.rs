//! `tflcm-listener` – the ingestion side of the transform buffer.
//!
//! Moves decoded transform publications from producers into a
//! [`TransformSink`][tflcm_core::TransformSink] without caring what they mean.
//!
//! # Modules
//!
//! - [`bus`] – [`TfBus`]: topic-routed broadcast bus with the `/tf` and
//!   `/tf_static` lanes, built on Tokio broadcast channels.
//! - [`broadcaster`] – [`TransformBroadcaster`]: publishes transforms under
//!   one authority name.
//! - [`listener`] – [`TransformListener`]: background task pushing every
//!   publication into a buffer.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console and
//!   OTLP tracing setup for host processes.

pub mod broadcaster;
pub mod bus;
pub mod listener;
pub mod telemetry;

pub use broadcaster::TransformBroadcaster;
pub use bus::{BusError, TfBus, TfPublication, TfTopic, TopicReceiver};
pub use listener::{ListenerStats, TransformListener};
