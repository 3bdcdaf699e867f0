//! Report rendering (text and JSON)

use console::style;
use std::fmt::Write;
use std::time::Duration;

use crate::config::{OutputConfig, ReportFormat};
use crate::parallel::{AggregateReport, TaskSummary};

const WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `report` as configured
pub fn render(report: &AggregateReport, output: &OutputConfig) -> serde_json::Result<String> {
    match output.format {
        ReportFormat::Text => Ok(render_text(report, output.per_task)),
        ReportFormat::Json => render_json(report),
    }
}

pub fn render_json(report: &AggregateReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn render_text(report: &AggregateReport, per_task: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", style("Query statistics").bold().underlined());
    row(&mut out, "queries", report.task_count.to_string());
    row(&mut out, "workers", report.worker_count.to_string());
    row(&mut out, "total process time", format_duration(report.total_process_duration));

    let Some(latency) = &report.latency else {
        let _ = writeln!(out, "  {}", style("no queries executed").yellow());
        return out;
    };

    row(&mut out, "total query time", format_duration(report.total_query_duration));
    row(&mut out, "min query time", format_duration(latency.min_query_duration));
    row(&mut out, "median query time", format_duration(latency.median_query_duration));
    row(&mut out, "mean query time", format_duration(latency.mean_query_duration));
    row(&mut out, "max query time", format_duration(latency.max_query_duration));

    if report.empty_windows > 0 {
        row(&mut out, "empty windows", report.empty_windows.to_string());
    }
    match report.value_range {
        Some(range) => row(&mut out, "value range", format!("{:.2} .. {:.2}", range.min, range.max)),
        None => row(&mut out, "value range", "no samples".to_string()),
    }

    if per_task {
        let _ = writeln!(out, "\n{}", style("Per-task summary").bold().underlined());
        for task in &report.tasks {
            task_row(&mut out, task);
        }
    }

    out
}

fn task_row(out: &mut String, task: &TaskSummary) {
    let range = match (task.min, task.max) {
        (Some(min), Some(max)) => format!("min {min:.2} max {max:.2}"),
        _ => "no samples".to_string(),
    };
    let _ = writeln!(
        out,
        "  {} {} .. {}  {}  {:>10}  {}",
        style(&task.entity_id).bold(),
        task.window_start.format(WINDOW_FORMAT),
        task.window_end.format(WINDOW_FORMAT),
        style(format!("worker {}", task.worker_id)).dim(),
        format_duration(task.query_duration),
        range
    );
}

fn row(out: &mut String, key: &str, value: String) {
    let _ = writeln!(out, "  {:<20} {}", style(key).dim(), style(value).bold());
}

/// `X.XXXms` below a second, `X.XXXs` below a minute, `XmY.YYYs` above
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        let minutes = (secs / 60.0).floor();
        format!("{}m{:.3}s", minutes as u64, secs - minutes * 60.0)
    } else if secs >= 1.0 {
        format!("{secs:.3}s")
    } else {
        format!("{:.3}ms", duration.as_nanos() as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{LatencySummary, ValueRange};
    use chrono::{TimeZone, Utc};

    fn tasks() -> Vec<TaskSummary> {
        let start = Utc.with_ymd_and_hms(2017, 1, 1, 8, 59, 22).unwrap();
        let summary = |entity: &str, range: Option<(f64, f64)>| TaskSummary {
            entity_id: entity.to_string(),
            window_start: start,
            window_end: start + chrono::Duration::hours(1),
            worker_id: 1,
            query_duration: Duration::from_millis(20),
            sample_count: usize::from(range.is_some()) * 60,
            min: range.map(|(min, _)| min),
            max: range.map(|(_, max)| max),
        };
        vec![
            summary("host_000008", Some((0.5, 99.25))),
            summary("host_000001", Some((3.0, 4.0))),
            summary("host_000002", None),
        ]
    }

    fn output(format: ReportFormat, per_task: bool) -> OutputConfig {
        OutputConfig { format, per_task }
    }

    fn report(latency: Option<LatencySummary>) -> AggregateReport {
        AggregateReport {
            task_count: if latency.is_some() { 3 } else { 0 },
            worker_count: 5,
            total_process_duration: Duration::from_millis(1250),
            total_query_duration: Duration::from_millis(60),
            latency,
            value_range: latency.map(|_| ValueRange { min: 0.5, max: 99.25 }),
            empty_windows: 1,
            tasks: if latency.is_some() { tasks() } else { Vec::new() },
        }
    }

    fn latency() -> LatencySummary {
        LatencySummary {
            min_query_duration: Duration::from_millis(10),
            max_query_duration: Duration::from_millis(30),
            median_query_duration: Duration::from_millis(20),
            mean_query_duration: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_text_report_lists_statistics() {
        console::set_colors_enabled(false);
        let text = render_text(&report(Some(latency())), false);

        assert!(text.contains("queries"));
        assert!(text.contains("median query time"));
        assert!(text.contains("20.000ms"));
        assert!(text.contains("1.250s"));
        assert!(text.contains("0.50 .. 99.25"));
        assert!(text.contains("empty windows"));
        assert!(!text.contains("Per-task summary"));
    }

    #[test]
    fn test_text_report_per_task_lines() {
        console::set_colors_enabled(false);
        let text = render(&report(Some(latency())), &output(ReportFormat::Text, true)).unwrap();

        assert!(text.contains("Per-task summary"));
        assert!(text.contains("host_000008 2017-01-01 08:59:22 .. 2017-01-01 09:59:22"));
        assert!(text.contains("min 3.00 max 4.00"));
        let empty = text.lines().find(|line| line.contains("host_000002")).unwrap();
        assert!(empty.contains("no samples"));
    }

    #[test]
    fn test_text_report_without_data() {
        console::set_colors_enabled(false);
        let text = render_text(&report(None), true);
        assert!(text.contains("no queries executed"));
        assert!(!text.contains("median"));
    }

    #[test]
    fn test_json_report() {
        let json = render(&report(Some(latency())), &output(ReportFormat::Json, false)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["task_count"], 3);
        assert_eq!(value["latency"]["median_query_ms"], 20.0);
        assert_eq!(value["value_range"]["max"], 99.25);
        assert_eq!(value["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(value["tasks"][0]["entity_id"], "host_000008");
        assert_eq!(value["tasks"][0]["query_ms"], 20.0);
        assert!(value["tasks"][2]["min"].is_null());
        assert!(value["tasks"][2]["max"].is_null());

        let empty: serde_json::Value =
            serde_json::from_str(&render_json(&report(None)).unwrap()).unwrap();
        assert!(empty["latency"].is_null());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.500ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.500s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m5.000s");
    }
}
