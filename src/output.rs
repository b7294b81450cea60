//! Output formatting and persistence for aggregated series.
//!
//! Supports pretty-printing, JSON serialization, a plain-text table, CSV
//! export of a series and CSV append of per-major summaries.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Debug;
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::analyzers::types::{AggregatedSeries, SeriesSummary};
use crate::session::{DataStatus, MajorView};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Undefined rates render as `n/a`, never as `0%`.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{r:.1}%"),
        None => "n/a".to_string(),
    }
}

pub fn format_grade(grade: Option<f64>) -> String {
    match grade {
        Some(g) => format!("{g:.2}"),
        None => "n/a".to_string(),
    }
}

/// Zero counts mean "not reported".
pub fn format_count(count: u32) -> String {
    if count == 0 {
        "-".to_string()
    } else {
        count.to_string()
    }
}

fn format_delta(delta: Option<f64>) -> String {
    match delta {
        Some(d) if d.abs() > 1e-9 => format!("{d:+.2}"),
        Some(_) => String::new(),
        None => "n/a".to_string(),
    }
}

pub fn status_message(status: DataStatus) -> &'static str {
    match status {
        DataStatus::FetchFailed => "Data could not be fetched for this major",
        DataStatus::NoData => "No data available for this major",
        DataStatus::Partial => "Some sources failed to load; showing partial data",
        DataStatus::Incomplete => {
            "Some data may be incomplete: recent sources no longer provide every detail"
        }
        DataStatus::Complete => "",
    }
}

/// Renders a series as a fixed-width text table.
pub fn render_table(series: &AggregatedSeries) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:>8} {:>8} {:<2} {:>9} {:>10} {:>10} {:>8}",
        "Year", "Cutoff", "Change", "", "Max", "Rejects", "Admits", "Accept"
    );
    for entry in &series.entries {
        let r = &entry.record;
        let _ = writeln!(
            out,
            "{:<6} {:>8} {:>8} {:<2} {:>9} {:>10} {:>10} {:>8}",
            r.year,
            format_grade(r.min_grade),
            format_delta(entry.cutoff_delta),
            entry.trend.symbol(),
            format_grade(r.max_grade_reported()),
            format_count(r.initial_reject),
            format_count(r.final_admit),
            format_rate(entry.acceptance_rate),
        );
    }
    out
}

/// Renders the whole-series figures. Cutoff figures are marked unavailable
/// when no year reports a cutoff.
pub fn render_summary(summary: &SeriesSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Years:               {}-{} ({} entries)", summary.first_year, summary.last_year, summary.years);
    let _ = writeln!(out, "Total initial rejects: {}", summary.total_initial_reject);
    let _ = writeln!(out, "Total final admits:    {}", summary.total_final_admit);
    let _ = writeln!(out, "Overall accept rate:   {}", format_rate(summary.pooled_acceptance_rate));
    let _ = writeln!(out, "Avg accept rate:       {}", format_rate(summary.mean_acceptance_rate));
    match &summary.cutoff {
        Some(c) => {
            let _ = writeln!(out, "Avg cutoff:            {:.2}", c.mean);
            let _ = writeln!(out, "Cutoff range:          {:.2} - {:.2}", c.min, c.max);
            let _ = writeln!(out, "Net change:            {:+.2}", c.net_change);
        }
        None => {
            let _ = writeln!(out, "Cutoff statistics:     unavailable");
        }
    }
    out
}

/// One flattened series row for CSV export.
#[derive(Debug, Serialize)]
struct SeriesRow {
    year: i32,
    domestic: Option<bool>,
    min_grade: Option<f64>,
    max_grade: Option<f64>,
    initial_reject: u32,
    final_admit: u32,
    acceptance_rate: Option<f64>,
    cutoff_delta: Option<f64>,
}

/// Writes a series to `path` as CSV, replacing any existing file.
pub fn write_series_csv(path: &str, series: &AggregatedSeries) -> Result<()> {
    debug!(path, rows = series.entries.len(), "Writing series CSV");
    let mut writer = WriterBuilder::new().from_path(path)?;

    for entry in &series.entries {
        writer.serialize(SeriesRow {
            year: entry.record.year,
            domestic: entry.record.domestic,
            min_grade: entry.record.min_grade,
            max_grade: entry.record.max_grade_reported(),
            initial_reject: entry.record.initial_reject,
            final_admit: entry.record.final_admit,
            acceptance_rate: entry.acceptance_rate,
            cutoff_delta: entry.cutoff_delta,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// One per-major summary line for the append log.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    loaded_at: String,
    major: &'a str,
    domestic: bool,
    status: DataStatus,
    first_year: Option<i32>,
    last_year: Option<i32>,
    total_initial_reject: Option<u64>,
    total_final_admit: Option<u64>,
    mean_cutoff: Option<f64>,
    min_cutoff: Option<f64>,
    max_cutoff: Option<f64>,
    net_change: Option<f64>,
    failed_identifiers: usize,
}

/// Appends a summary row for `view` to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_summary(path: &str, view: &MajorView) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV summary");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let summary = view.series.series().map(|s| &s.summary);
    let cutoff = summary.and_then(|s| s.cutoff.as_ref());

    writer.serialize(SummaryRow {
        loaded_at: view.loaded_at.to_rfc3339(),
        major: &view.name,
        domestic: view.domestic,
        status: view.status(),
        first_year: summary.map(|s| s.first_year),
        last_year: summary.map(|s| s.last_year),
        total_initial_reject: summary.map(|s| s.total_initial_reject),
        total_final_admit: summary.map(|s| s.total_final_admit),
        mean_cutoff: cutoff.map(|c| c.mean),
        min_cutoff: cutoff.map(|c| c.min),
        max_cutoff: cutoff.map(|c| c.max),
        net_change: cutoff.map(|c| c.net_change),
        failed_identifiers: view.failures.len(),
    })?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::series::aggregate_major;
    use crate::session::{FetchReport, IdentifierBatch};
    use crate::stats::AdmissionRecord;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_records() -> Vec<AdmissionRecord> {
        vec![
            AdmissionRecord {
                year: 2021,
                domestic: None,
                min_grade: Some(84.0),
                max_grade: 97.0,
                initial_reject: 30,
                final_admit: 10,
            },
            AdmissionRecord::with_cutoff(2022, 86.25),
        ]
    }

    fn sample_view() -> MajorView {
        MajorView::build(
            "Computer Science",
            FetchReport {
                batches: vec![IdentifierBatch {
                    identifier: 1,
                    records: sample_records(),
                }],
                failures: vec![],
            },
            true,
        )
    }

    #[test]
    fn test_undefined_rate_is_not_zero() {
        assert_eq!(format_rate(None), "n/a");
        assert_eq!(format_rate(Some(0.0)), "0.0%");
        assert_eq!(format_rate(Some(25.0)), "25.0%");
    }

    #[test]
    fn test_unreported_counts() {
        assert_eq!(format_count(0), "-");
        assert_eq!(format_count(42), "42");
    }

    #[test]
    fn test_render_table() {
        let series = aggregate_major(&[sample_records()], true);
        let table = render_table(series.series().unwrap());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("84.00"));
        assert!(lines[1].contains("25.0%"));
        assert!(lines[2].contains("+2.25"));
        assert!(lines[2].contains("n/a"));
    }

    #[test]
    fn test_render_table_columns_align() {
        let mut flat = AdmissionRecord::with_cutoff(2023, 86.25);
        flat.initial_reject = 5;
        let records = vec![
            AdmissionRecord::with_cutoff(2020, 90.0),
            AdmissionRecord::with_cutoff(2021, 80.0),
            AdmissionRecord::with_cutoff(2022, 86.25),
            flat,
        ];
        let series = aggregate_major(&[records], true);
        let table = render_table(series.series().unwrap());
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();

        assert_eq!(widths.len(), 5);
        assert!(widths.iter().all(|&w| w == widths[0]));
    }

    #[test]
    fn test_render_summary_rates() {
        let series = aggregate_major(&[sample_records()], true);
        let text = render_summary(&series.series().unwrap().summary);
        assert!(text.contains("Overall accept rate:   25.0%"));
        assert!(text.contains("Avg accept rate:       25.0%"));
    }

    #[test]
    fn test_render_summary_without_cutoffs() {
        let mut record = AdmissionRecord::with_cutoff(2020, 0.0);
        record.min_grade = None;
        let series = aggregate_major(&[vec![record]], true);
        let text = render_summary(&series.series().unwrap().summary);
        assert!(text.contains("unavailable"));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&sample_view());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample_view()).unwrap();
    }

    #[test]
    fn test_write_series_csv() {
        let path = temp_path("admission_cutoffs_test_series.csv");
        let series = aggregate_major(&[sample_records()], true);
        write_series_csv(&path, series.series().unwrap()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("year,domestic,min_grade"));
        assert!(lines[2].starts_with("2022,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_summary_writes_header_once() {
        let path = temp_path("admission_cutoffs_test_summary.csv");
        let _ = fs::remove_file(&path);

        let view = sample_view();
        append_summary(&path, &view).unwrap();
        append_summary(&path, &view).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("loaded_at")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_summary_for_no_data() {
        let path = temp_path("admission_cutoffs_test_summary_empty.csv");
        let _ = fs::remove_file(&path);

        let view = MajorView::build("English", FetchReport::default(), true);
        append_summary(&path, &view).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("English"));
        assert!(content.contains("no_data"));

        fs::remove_file(&path).unwrap();
    }
}
