//! Per-family evaluation of the newest sample against benchmarks.
//!
//! Each time a sample arrives, every metric of its family is classified
//! against the benchmark, and its trend is computed against the sample
//! immediately before it in the history window.

use serde::Serialize;

use super::benchmark::{Family, Metric};
use super::classify::{classify_status, classify_trend, Status, Trend};
use super::history::HistoryWindow;
use super::sample::{ExperienceSample, ServiceSample};

/// Classification of one metric for the newest sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub metric: Metric,
    pub value: f64,
    pub benchmark: f64,
    pub status: Status,
    pub trend: Option<Trend>,
}

/// Sample family that can be evaluated metric by metric.
pub trait Evaluate {
    const FAMILY: Family;

    /// Read `metric` from this sample, `None` if it belongs to another family.
    fn metric_value(&self, metric: Metric) -> Option<f64>;
}

impl Evaluate for ExperienceSample {
    const FAMILY: Family = Family::Experience;

    fn metric_value(&self, metric: Metric) -> Option<f64> {
        metric.read_experience(self)
    }
}

impl Evaluate for ServiceSample {
    const FAMILY: Family = Family::Service;

    fn metric_value(&self, metric: Metric) -> Option<f64> {
        metric.read_service(self)
    }
}

/// Evaluate the newest sample of `window` for every metric of its family.
///
/// Returns an empty list when the window is empty.
pub fn evaluate<T: Evaluate>(window: &HistoryWindow<T>) -> Vec<MetricReport> {
    let Some(latest) = window.latest() else {
        return Vec::new();
    };
    let previous = window.previous();

    T::FAMILY
        .metrics()
        .iter()
        .filter_map(|&metric| {
            let value = latest.metric_value(metric)?;
            let baseline = previous.and_then(|p| p.metric_value(metric));
            let benchmark = metric.benchmark();

            Some(MetricReport {
                metric,
                value,
                benchmark: benchmark.value,
                status: classify_status(value, benchmark.value, benchmark.higher_is_better),
                trend: classify_trend(value, baseline, benchmark.higher_is_better),
            })
        })
        .collect()
}

/// Worst status among `reports`, `Good` when empty.
pub fn worst_status<'a>(reports: impl IntoIterator<Item = &'a MetricReport>) -> Status {
    reports
        .into_iter()
        .map(|r| r.status)
        .max()
        .unwrap_or(Status::Good)
}
