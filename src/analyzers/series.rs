use tracing::{debug, warn};

use crate::analyzers::trend::Trend;
use crate::analyzers::types::{
    AggregatedSeries, CutoffStats, SeriesEntry, SeriesOutcome, SeriesSummary,
};
use crate::analyzers::utility::{max_value, mean, min_value};
use crate::stats::AdmissionRecord;

/// Filters, concatenates and sorts the per-identifier batches of one major.
///
/// Batches are taken in identifier order. When two records share a year the
/// first one seen wins and the other is dropped with a warning.
pub fn merge_records<B: AsRef<[AdmissionRecord]>>(
    batches: &[B],
    domestic: bool,
) -> Vec<AdmissionRecord> {
    let mut merged: Vec<AdmissionRecord> = batches
        .iter()
        .flat_map(|batch| batch.as_ref())
        .filter(|r| r.passes_filter(domestic))
        .cloned()
        .collect();

    // stable: first-seen stays ahead within a year
    merged.sort_by_key(|r| r.year);

    let before = merged.len();
    merged.dedup_by(|later, kept| {
        let duplicate = later.year == kept.year;
        if duplicate {
            warn!(
                year = later.year,
                kept = ?kept.min_grade,
                dropped = ?later.min_grade,
                "Duplicate year while merging identifiers, keeping first seen"
            );
        }
        duplicate
    });

    if merged.len() != before {
        debug!(dropped = before - merged.len(), "Duplicate years removed");
    }

    merged
}

/// Attaches acceptance rate, cutoff delta and trend to sorted records.
pub fn derive_entries(records: Vec<AdmissionRecord>) -> Vec<SeriesEntry> {
    let mut previous_cutoff: Option<f64> = None;

    records
        .into_iter()
        .map(|record| {
            let cutoff_delta = record.min_grade.map(|current| match previous_cutoff {
                Some(prev) => current - prev,
                None => 0.0,
            });
            if record.min_grade.is_some() {
                previous_cutoff = record.min_grade;
            }

            SeriesEntry {
                acceptance_rate: record.acceptance_rate(),
                trend: Trend::from_delta(cutoff_delta),
                cutoff_delta,
                record,
            }
        })
        .collect()
}

/// Cutoff mean/min/max/net change over entries that report a cutoff.
pub fn cutoff_stats(entries: &[SeriesEntry]) -> Option<CutoffStats> {
    let cutoffs: Vec<f64> = entries.iter().filter_map(|e| e.record.min_grade).collect();

    Some(CutoffStats {
        mean: mean(&cutoffs)?,
        min: min_value(&cutoffs)?,
        max: max_value(&cutoffs)?,
        net_change: cutoffs.last()? - cutoffs.first()?,
    })
}

/// Unweighted mean of the yearly acceptance rates, counting only years that
/// report both rejects and admits.
pub fn mean_acceptance_rate(entries: &[SeriesEntry]) -> Option<f64> {
    let rates: Vec<f64> = entries
        .iter()
        .filter(|e| e.record.initial_reject > 0 && e.record.final_admit > 0)
        .filter_map(|e| e.acceptance_rate)
        .collect();
    mean(&rates)
}

/// Whole-series summary. `None` for an empty series.
pub fn summarize(entries: &[SeriesEntry]) -> Option<SeriesSummary> {
    let first = entries.first()?;
    let last = entries.last()?;

    let total_initial_reject: u64 = entries
        .iter()
        .map(|e| u64::from(e.record.initial_reject))
        .sum();
    let total_final_admit: u64 = entries
        .iter()
        .map(|e| u64::from(e.record.final_admit))
        .sum();

    Some(SeriesSummary {
        first_year: first.record.year,
        last_year: last.record.year,
        years: entries.len(),
        total_initial_reject,
        total_final_admit,
        pooled_acceptance_rate: AdmissionRecord::pct(
            total_final_admit,
            total_final_admit + total_initial_reject,
        ),
        mean_acceptance_rate: mean_acceptance_rate(entries),
        cutoff: cutoff_stats(entries),
        complete: entries.iter().all(|e| e.record.is_complete()),
    })
}

impl AggregatedSeries {
    /// Builds a series from records already sorted with unique years.
    /// Returns `None` when there are no records.
    pub fn from_sorted(records: Vec<AdmissionRecord>) -> Option<Self> {
        let entries = derive_entries(records);
        let summary = summarize(&entries)?;
        Some(AggregatedSeries { entries, summary })
    }
}

/// Runs the full per-major pipeline over normalized identifier batches.
pub fn aggregate_major<B: AsRef<[AdmissionRecord]>>(batches: &[B], domestic: bool) -> SeriesOutcome {
    match AggregatedSeries::from_sorted(merge_records(batches, domestic)) {
        Some(series) => SeriesOutcome::Loaded(series),
        None => SeriesOutcome::NoData,
    }
}
