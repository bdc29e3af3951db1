//! Metric catalogue and fixed reference benchmarks.

use serde::Serialize;

use super::sample::{ExperienceSample, ServiceSample};

/// Reference value for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Benchmark {
    pub value: f64,
    /// Classification direction: values above the benchmark are favorable.
    pub higher_is_better: bool,
}

impl Benchmark {
    const fn lower(value: f64) -> Self {
        Self {
            value,
            higher_is_better: false,
        }
    }

    const fn higher(value: f64) -> Self {
        Self {
            value,
            higher_is_better: true,
        }
    }
}

/// Sample family a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Family {
    Experience,
    Service,
}

impl Family {
    pub fn label(&self) -> &'static str {
        match self {
            Family::Experience => "QoE",
            Family::Service => "QoS",
        }
    }

    /// Metrics evaluated for this family, in display order.
    pub fn metrics(&self) -> &'static [Metric] {
        match self {
            Family::Experience => &Metric::EXPERIENCE,
            Family::Service => &Metric::SERVICE,
        }
    }
}

/// Every numerically evaluated metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    BufferRatio,
    AverageBitrate,
    StartupTime,
    QualitySwitches,
    RebufferingFrequency,
    Latency,
    Throughput,
    PacketLoss,
    Jitter,
    ConnectionStability,
}

impl Metric {
    pub const EXPERIENCE: [Metric; 5] = [
        Metric::BufferRatio,
        Metric::AverageBitrate,
        Metric::StartupTime,
        Metric::QualitySwitches,
        Metric::RebufferingFrequency,
    ];

    pub const SERVICE: [Metric; 5] = [
        Metric::Latency,
        Metric::Throughput,
        Metric::PacketLoss,
        Metric::Jitter,
        Metric::ConnectionStability,
    ];

    pub fn family(&self) -> Family {
        match self {
            Metric::BufferRatio
            | Metric::AverageBitrate
            | Metric::StartupTime
            | Metric::QualitySwitches
            | Metric::RebufferingFrequency => Family::Experience,
            Metric::Latency
            | Metric::Throughput
            | Metric::PacketLoss
            | Metric::Jitter
            | Metric::ConnectionStability => Family::Service,
        }
    }

    /// The process-wide benchmark for this metric.
    pub fn benchmark(&self) -> Benchmark {
        match self {
            Metric::BufferRatio => Benchmark::lower(0.5),
            Metric::AverageBitrate => Benchmark::higher(4500.0),
            Metric::StartupTime => Benchmark::lower(1000.0),
            Metric::QualitySwitches => Benchmark::lower(2.0),
            Metric::RebufferingFrequency => Benchmark::lower(0.1),
            Metric::Latency => Benchmark::lower(50.0),
            Metric::Throughput => Benchmark::higher(10000.0),
            Metric::PacketLoss => Benchmark::lower(0.1),
            Metric::Jitter => Benchmark::lower(15.0),
            Metric::ConnectionStability => Benchmark::higher(99.9),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::BufferRatio => "Buffer Ratio",
            Metric::AverageBitrate => "Average Bitrate",
            Metric::StartupTime => "Startup Time",
            Metric::QualitySwitches => "Quality Switches",
            Metric::RebufferingFrequency => "Rebuffering Frequency",
            Metric::Latency => "Latency",
            Metric::Throughput => "Throughput",
            Metric::PacketLoss => "Packet Loss",
            Metric::Jitter => "Network Jitter",
            Metric::ConnectionStability => "Connection Stability",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::BufferRatio | Metric::PacketLoss | Metric::ConnectionStability => "%",
            Metric::AverageBitrate | Metric::Throughput => "kbps",
            Metric::StartupTime | Metric::Latency | Metric::Jitter => "ms",
            Metric::QualitySwitches | Metric::RebufferingFrequency => "/min",
        }
    }

    /// Read this metric from an experience sample. `None` for service metrics.
    pub fn read_experience(&self, sample: &ExperienceSample) -> Option<f64> {
        match self {
            Metric::BufferRatio => Some(sample.buffer_ratio),
            Metric::AverageBitrate => Some(sample.average_bitrate),
            Metric::StartupTime => Some(sample.startup_time),
            Metric::QualitySwitches => Some(f64::from(sample.quality_switches)),
            Metric::RebufferingFrequency => Some(sample.rebuffering_frequency),
            _ => None,
        }
    }

    /// Read this metric from a service sample. `None` for experience metrics.
    pub fn read_service(&self, sample: &ServiceSample) -> Option<f64> {
        match self {
            Metric::Latency => Some(sample.latency),
            Metric::Throughput => Some(sample.throughput),
            Metric::PacketLoss => Some(sample.packet_loss),
            Metric::Jitter => Some(sample.jitter),
            Metric::ConnectionStability => Some(sample.connection_stability),
            _ => None,
        }
    }
}
