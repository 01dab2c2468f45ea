//! `simlink-runtime` – Process Runtime
//!
//! The pieces a bridge process needs around the device manager.
//!
//! # Modules
//!
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber (compact or JSON console output) with an
//!   optional OTLP span exporter enabled by `OTEL_EXPORTER_OTLP_ENDPOINT`.
//! - [`tokio_node`] – [`TokioNode`][tokio_node::TokioNode]: a
//!   [`HostNode`][simlink_middleware::HostNode] whose recurring timers are
//!   Tokio interval tasks.

pub mod telemetry;
pub mod tokio_node;

pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
pub use tokio_node::TokioNode;
