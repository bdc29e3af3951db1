//! Plain-text and JSON rendering of a [`MonitorView`].

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::data::benchmark::Family;
use crate::data::classify::{Direction, Status};
use crate::data::evaluation::{worst_status, MetricReport};
use crate::data::format::{format_change, format_clock, format_value};
use crate::monitor::{ConnectionState, MonitorView};

/// Render one metric as a fixed-width line.
pub fn render_metric(report: &MetricReport) -> String {
    let unit = report.metric.unit();
    let mut line = format!(
        "  {:<22} {:>12}  {:<4}  benchmark {:>10}",
        report.metric.label(),
        format_value(report.value, unit),
        report.status.symbol(),
        format_value(report.benchmark, unit),
    );

    if let Some(trend) = &report.trend {
        let _ = write!(
            line,
            "  {} {} ({})",
            trend.direction.arrow(),
            format_change(trend.direction == Direction::Up, trend.magnitude_percent),
            if trend.is_improving { "improving" } else { "worsening" }
        );
    }
    line
}

/// Render the whole view as text.
pub fn render_text(view: &MonitorView) -> String {
    let mut out = String::new();

    let _ = write!(out, "[{}] {}", view.state.label(), view.source);
    if !view.reports.is_empty() {
        let _ = write!(out, "  overall {}", worst_status(view.reports.values()).symbol());
    }
    if let Some(ms) = view.last_update {
        let _ = write!(out, "  (last update: {})", format_clock(ms));
    }
    out.push('\n');

    if let ConnectionState::Errored(reason) = &view.state {
        let _ = writeln!(out, "Connection error: {}", reason);
    }

    for family in [Family::Experience, Family::Service] {
        let reports: Vec<&MetricReport> = family
            .metrics()
            .iter()
            .filter_map(|m| view.report(*m))
            .collect();
        if reports.is_empty() {
            continue;
        }
        let worst = worst_status(reports.iter().copied());
        let _ = writeln!(out, "{} [{}]", family.label(), worst.symbol());
        for report in reports {
            let _ = writeln!(out, "{}", render_metric(report));
        }
    }

    if let Some(d) = &view.descriptor {
        let _ = writeln!(
            out,
            "Stream: {} {} {} {} @ {}fps via {} {} ({})",
            d.protocol, d.container, d.codec, d.resolution, d.frame_rate, d.provider, d.region, d.edge_node
        );
    }

    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "Notice: {}", notice);
    }

    out
}

/// Count of reports per status, as (good, warning, critical).
pub fn status_counts(view: &MonitorView) -> (usize, usize, usize) {
    view.reports
        .values()
        .fold((0, 0, 0), |(g, w, c), r| match r.status {
            Status::Good => (g + 1, w, c),
            Status::Warning => (g, w + 1, c),
            Status::Critical => (g, w, c + 1),
        })
}

/// Worst status among the reports of one family.
pub fn family_status(view: &MonitorView, family: Family) -> Status {
    worst_status(view.reports.values().filter(|r| r.metric.family() == family))
}

/// Export the view to a pretty-printed JSON file.
pub fn export_to_file(view: &MonitorView, path: &Path) -> Result<()> {
    let (good, warning, critical) = status_counts(view);

    let export = serde_json::json!({
        "summary": {
            "state": view.state.label(),
            "source": view.source,
            "good": good,
            "warning": warning,
            "critical": critical,
            "qoe_status": family_status(view, Family::Experience).symbol(),
            "qos_status": family_status(view, Family::Service).symbol(),
            "experience_samples": view.experience.len(),
            "service_samples": view.service.len(),
        },
        "view": view,
    });

    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, json)?;
    Ok(())
}
