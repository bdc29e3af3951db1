//! Sample types carried on the metrics stream.
//!
//! These types match the JSON produced by the metrics source: a tagged
//! envelope `{"type": ..., "data": ...}` wrapping one of three payloads
//! or an error notice.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Viewer-side quality of experience measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceSample {
    /// Percentage of viewing time spent buffering.
    pub buffer_ratio: f64,
    /// Average delivered bitrate in kbps.
    pub average_bitrate: f64,
    /// Time from request to first frame, in milliseconds.
    pub startup_time: f64,
    /// Rendition changes per minute.
    pub quality_switches: u32,
    /// Buffer stall events per minute.
    pub rebuffering_frequency: f64,
    /// ISO-8601 timestamp assigned by the producer.
    pub timestamp: String,
}

/// Network transport quality of service measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSample {
    /// Round-trip latency in milliseconds.
    pub latency: f64,
    /// Throughput in kbps.
    pub throughput: f64,
    /// Packet loss percentage (0-100).
    pub packet_loss: f64,
    /// Jitter in milliseconds.
    pub jitter: f64,
    /// Percentage of time with a stable connection (0-100).
    pub connection_stability: f64,
    /// ISO-8601 timestamp assigned by the producer.
    pub timestamp: String,
}

/// Descriptive stream metadata. Never evaluated numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub protocol: String,
    /// Container format, e.g. "MPEG-TS".
    #[serde(rename = "format")]
    pub container: String,
    pub codec: String,
    pub resolution: String,
    pub frame_rate: f64,
    #[serde(rename = "cdnProvider")]
    pub provider: String,
    pub region: String,
    /// Edge node identifier, e.g. "SFO53-C1".
    #[serde(rename = "edgeServer")]
    pub edge_node: String,
    pub timestamp: String,
}

/// Body of an explicit error notice sent by the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum InboundMessage {
    Qoe(ExperienceSample),
    Qos(ServiceSample),
    Metadata(StreamDescriptor),
    Error(ErrorNotice),
}

impl InboundMessage {
    /// Decode a raw payload and check the numeric ranges of the samples.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let message: InboundMessage = serde_json::from_slice(raw)?;
        message.validate()?;
        Ok(message)
    }

    fn validate(&self) -> Result<(), DecodeError> {
        match self {
            InboundMessage::Qoe(s) => {
                non_negative("bufferRatio", s.buffer_ratio)?;
                non_negative("averageBitrate", s.average_bitrate)?;
                non_negative("startupTime", s.startup_time)?;
                non_negative("rebufferingFrequency", s.rebuffering_frequency)
            }
            InboundMessage::Qos(s) => {
                non_negative("latency", s.latency)?;
                non_negative("throughput", s.throughput)?;
                percentage("packetLoss", s.packet_loss)?;
                non_negative("jitter", s.jitter)?;
                percentage("connectionStability", s.connection_stability)
            }
            InboundMessage::Metadata(d) => non_negative("frameRate", d.frame_rate),
            InboundMessage::Error(_) => Ok(()),
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), DecodeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DecodeError::OutOfRange { field, value })
    }
}

fn percentage(field: &'static str, value: f64) -> Result<(), DecodeError> {
    non_negative(field, value)?;
    if value <= 100.0 {
        Ok(())
    } else {
        Err(DecodeError::OutOfRange { field, value })
    }
}
