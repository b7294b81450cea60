//! Aggregates across majors: the average-cutoff series and cutoff extremes.
//!
//! Majors are walked in ascending name order (byte-wise, via `BTreeMap`) and
//! each major's entries in ascending year order. Ties for a maximum go to the
//! first candidate in that walk.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzers::types::{AggregatedSeries, CrossMajorSummary, HighestCutoff, SeriesOutcome};
use crate::analyzers::utility::mean;
use crate::stats::AdmissionRecord;

#[derive(Default)]
struct YearAccumulator {
    cutoffs: Vec<f64>,
    max_grades: Vec<f64>,
    initial_reject: u32,
    final_admit: u32,
}

/// One synthetic record per year: cutoff and max grade averaged over the
/// majors that report them that year, counts summed.
pub fn average_records(majors: &BTreeMap<String, AggregatedSeries>) -> Vec<AdmissionRecord> {
    let mut years: BTreeMap<i32, YearAccumulator> = BTreeMap::new();

    for series in majors.values() {
        for record in series.records() {
            let acc = years.entry(record.year).or_default();
            if let Some(cutoff) = record.min_grade {
                acc.cutoffs.push(cutoff);
            }
            if let Some(max_grade) = record.max_grade_reported() {
                acc.max_grades.push(max_grade);
            }
            acc.initial_reject = acc.initial_reject.saturating_add(record.initial_reject);
            acc.final_admit = acc.final_admit.saturating_add(record.final_admit);
        }
    }

    years
        .into_iter()
        .map(|(year, acc)| AdmissionRecord {
            year,
            domestic: None,
            min_grade: mean(&acc.cutoffs),
            max_grade: mean(&acc.max_grades).unwrap_or(0.0),
            initial_reject: acc.initial_reject,
            final_admit: acc.final_admit,
        })
        .collect()
}

/// The average series with derived metrics, or `NoData` with no majors.
pub fn average_series(majors: &BTreeMap<String, AggregatedSeries>) -> SeriesOutcome {
    match AggregatedSeries::from_sorted(average_records(majors)) {
        Some(series) => SeriesOutcome::Loaded(series),
        None => SeriesOutcome::NoData,
    }
}

fn candidates(
    majors: &BTreeMap<String, AggregatedSeries>,
) -> impl Iterator<Item = (&str, &AdmissionRecord, f64)> {
    majors.iter().flat_map(|(name, series)| {
        series
            .records()
            .filter_map(move |r| r.min_grade.map(|cutoff| (name.as_str(), r, cutoff)))
    })
}

/// Highest cutoff across every major and year.
pub fn highest_cutoff(majors: &BTreeMap<String, AggregatedSeries>) -> Option<HighestCutoff> {
    let mut best: Option<(&str, &AdmissionRecord, f64)> = None;

    for candidate in candidates(majors) {
        if best.is_none_or(|(_, _, cutoff)| candidate.2 > cutoff) {
            best = Some(candidate);
        }
    }

    best.map(|(major, record, _)| HighestCutoff {
        major: major.to_string(),
        year: record.year,
        record: record.clone(),
    })
}

/// The highest-cutoff major for each year, ascending by year.
pub fn yearly_highest(majors: &BTreeMap<String, AggregatedSeries>) -> Vec<HighestCutoff> {
    let mut best: BTreeMap<i32, (&str, &AdmissionRecord, f64)> = BTreeMap::new();

    for candidate in candidates(majors) {
        let year = candidate.1.year;
        if best
            .get(&year)
            .is_none_or(|(_, _, cutoff)| candidate.2 > *cutoff)
        {
            best.insert(year, candidate);
        }
    }

    best.into_iter()
        .map(|(year, (major, record, _))| HighestCutoff {
            major: major.to_string(),
            year,
            record: record.clone(),
        })
        .collect()
}

/// Mean of each major's relative first-to-last cutoff change, in percent.
///
/// Majors whose first cutoff is zero contribute nothing.
pub fn average_trend_percent(majors: &BTreeMap<String, AggregatedSeries>) -> Option<f64> {
    let changes: Vec<f64> = majors
        .values()
        .filter_map(|series| {
            let mut cutoffs = series.records().filter_map(|r| r.min_grade);
            let first = cutoffs.next()?;
            let last = cutoffs.last().unwrap_or(first);
            (first != 0.0).then(|| (last - first) / first * 100.0)
        })
        .collect();

    mean(&changes)
}

impl CrossMajorSummary {
    pub fn from_majors(majors: &BTreeMap<String, AggregatedSeries>) -> Self {
        let summary = CrossMajorSummary {
            generated_at: Utc::now(),
            major_count: majors.len(),
            average: average_series(majors),
            highest: highest_cutoff(majors),
            yearly_highest: yearly_highest(majors),
            average_trend_percent: average_trend_percent(majors),
            failed_identifiers: Vec::new(),
        };
        debug!(
            majors = summary.major_count,
            years = summary.yearly_highest.len(),
            "Cross-major summary built"
        );
        summary
    }
}
