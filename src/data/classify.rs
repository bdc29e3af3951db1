//! Status and trend classification against benchmarks.

use serde::Serialize;

/// Ratio of the benchmark below which a higher-is-better metric is critical.
pub const HIGHER_WARNING_RATIO: f64 = 0.8;

/// Ratio of the benchmark above which a lower-is-better metric is critical.
pub const LOWER_WARNING_RATIO: f64 = 1.2;

/// Status tier of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Status {
    Good,
    Warning,
    Critical,
}

impl Status {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Good => "OK",
            Status::Warning => "WARN",
            Status::Critical => "CRIT",
        }
    }
}

/// Direction of change between two consecutive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
        }
    }
}

/// Percentage change of a metric relative to its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: Direction,
    /// Absolute percentage change.
    pub magnitude_percent: f64,
    /// Whether the change moved toward the favorable side.
    pub is_improving: bool,
}

impl Trend {
    /// Magnitude with one decimal, e.g. `"10.0"`.
    pub fn magnitude_label(&self) -> String {
        format!("{:.1}", self.magnitude_percent)
    }
}

/// Classify a value against its benchmark.
///
/// Non-finite inputs are treated as critical rather than propagated.
pub fn classify_status(value: f64, benchmark: f64, higher_is_better: bool) -> Status {
    if !value.is_finite() || !benchmark.is_finite() {
        return Status::Critical;
    }

    if higher_is_better {
        if value >= benchmark {
            Status::Good
        } else if value >= benchmark * HIGHER_WARNING_RATIO {
            Status::Warning
        } else {
            Status::Critical
        }
    } else if value <= benchmark {
        Status::Good
    } else if value <= benchmark * LOWER_WARNING_RATIO {
        Status::Warning
    } else {
        Status::Critical
    }
}

/// Compute the trend from `previous` to `current`.
///
/// Returns `None` without a usable baseline (absent, zero or non-finite).
/// A change of exactly zero reports `Down` and is not improving.
pub fn classify_trend(current: f64, previous: Option<f64>, higher_is_better: bool) -> Option<Trend> {
    let previous = previous.filter(|p| *p != 0.0 && p.is_finite())?;
    if !current.is_finite() {
        return None;
    }

    let percent_change = (current - previous) / previous * 100.0;
    let direction = if percent_change > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };
    let is_improving = if higher_is_better {
        percent_change > 0.0
    } else {
        percent_change < 0.0
    };

    Some(Trend {
        direction,
        magnitude_percent: percent_change.abs(),
        is_improving,
    })
}
