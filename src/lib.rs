//! # streamwatch
//!
//! A live telemetry monitor for video delivery metrics.
//!
//! The crate keeps a long-lived streaming connection to a metrics source,
//! decodes quality-of-experience (QoE) and quality-of-service (QoS)
//! samples, keeps a bounded rolling history of each family, and classifies
//! every new value against fixed benchmarks to produce a status and a trend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Monitor                             │
//! │  ┌──────────┐    ┌──────────┐    ┌──────────┐   ┌─────────┐  │
//! │  │ source   │───▶│  decode  │───▶│ history  │──▶│ classify│  │
//! │  │ (events) │    │ (sample) │    │ (window) │   │ (report)│  │
//! │  └──────────┘    └──────────┘    └──────────┘   └────┬────┘  │
//! │       ▲                                              │       │
//! │  StreamProvider | ReplayProvider          watch ◀────┘       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Channel provider abstraction ([`ChannelProvider`] trait)
//!   with a TCP implementation and a deterministic replay
//! - **[`data`]**: Sample types, benchmarks, history windows and classification
//! - **[`monitor`]**: Connection lifecycle, ingestion and the presentation-facing view
//! - **[`report`]**: Plain-text and JSON rendering of a view
//! - **[`config`]**: Layered file/environment configuration
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Monitor a TCP endpoint emitting newline-delimited JSON
//! streamwatch --connect metrics.example:9090
//!
//! # Replay a recorded session
//! streamwatch --replay session.ndjson
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use streamwatch::{Monitor, StreamProvider};
//!
//! # tokio_test::block_on(async {
//! let monitor = Monitor::new(StreamProvider::new("localhost:9090"), 30);
//! let mut updates = monitor.subscribe();
//!
//! if let Some(attempt) = monitor.connect() {
//!     println!("settled in {:?}", attempt.await.unwrap());
//! }
//! while updates.changed().await.is_ok() {
//!     let view = updates.borrow_and_update().clone();
//!     println!("{}", streamwatch::report::render_text(&view));
//! }
//! # });
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod monitor;
pub mod report;
pub mod source;

// Re-export main types for convenience
pub use crate::config::MonitorConfig;
pub use data::{
    Direction, ExperienceSample, Family, HistoryWindow, InboundMessage, Metric, MetricReport,
    ServiceSample, Status, StreamDescriptor, Trend,
};
pub use error::{ChannelError, DecodeError};
pub use monitor::{ConnectionState, Monitor, MonitorView};
pub use source::{ChannelEvent, ChannelProvider, ReplayProvider, StreamProvider};
