//! Sample types, benchmarks and classification.
//!
//! ## Submodules
//!
//! - [`sample`]: Wire types for the three sample families and the inbound envelope
//! - [`benchmark`]: Metric catalogue with fixed reference values
//! - [`history`]: Bounded rolling window per family
//! - [`classify`]: Status tier and trend computation
//! - [`evaluation`]: Classifies the newest sample of a family, metric by metric
//! - [`format`]: Display formatting of metric values
//!
//! ## Data Flow
//!
//! ```text
//! raw bytes
//!     │
//!     ▼
//! InboundMessage::decode()
//!     │
//!     ├──▶ HistoryWindow::push()
//!     │
//!     └──▶ evaluate(window) ──▶ MetricReport (status + trend per metric)
//! ```

pub mod benchmark;
pub mod classify;
pub mod evaluation;
pub mod format;
pub mod history;
pub mod sample;

pub use benchmark::{Benchmark, Family, Metric};
pub use classify::{classify_status, classify_trend, Direction, Status, Trend};
pub use evaluation::{evaluate, worst_status, MetricReport};
pub use history::{HistoryWindow, DEFAULT_HISTORY_SIZE};
pub use sample::{ErrorNotice, ExperienceSample, InboundMessage, ServiceSample, StreamDescriptor};
