//! Data types produced by the aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::trend::Trend;
use crate::stats::AdmissionRecord;

/// One year of an aggregated series with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesEntry {
    pub record: AdmissionRecord,
    /// Percent, `None` when the record has neither admits nor rejects.
    pub acceptance_rate: Option<f64>,
    /// Change from the nearest earlier entry that has a cutoff.
    pub cutoff_delta: Option<f64>,
    pub trend: Trend,
}

/// Cutoff statistics over the entries that report one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Last reported cutoff minus first reported cutoff.
    pub net_change: f64,
}

/// Whole-series figures for one aggregated series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub first_year: i32,
    pub last_year: i32,
    pub years: usize,
    pub total_initial_reject: u64,
    pub total_final_admit: u64,
    /// Acceptance rate over the summed counts.
    pub pooled_acceptance_rate: Option<f64>,
    /// Unweighted mean of the yearly rates over years reporting both counts.
    pub mean_acceptance_rate: Option<f64>,
    pub cutoff: Option<CutoffStats>,
    /// False when any year lacks a cutoff, a max grade or counts.
    pub complete: bool,
}

/// Non-empty, strictly year-ascending series with derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub entries: Vec<SeriesEntry>,
    pub summary: SeriesSummary,
}

impl AggregatedSeries {
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|e| e.record.year)
    }

    pub fn records(&self) -> impl Iterator<Item = &AdmissionRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn get(&self, year: i32) -> Option<&SeriesEntry> {
        self.entries
            .binary_search_by_key(&year, |e| e.record.year)
            .ok()
            .map(|i| &self.entries[i])
    }
}

/// Result of aggregating one major: either data, or the distinct
/// "nothing to show" state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeriesOutcome {
    NoData,
    Loaded(AggregatedSeries),
}

impl SeriesOutcome {
    pub fn series(&self) -> Option<&AggregatedSeries> {
        match self {
            SeriesOutcome::Loaded(s) => Some(s),
            SeriesOutcome::NoData => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SeriesOutcome::NoData)
    }
}

/// A single (major, year) cutoff candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighestCutoff {
    pub major: String,
    pub year: i32,
    pub record: AdmissionRecord,
}

impl HighestCutoff {
    pub fn cutoff(&self) -> f64 {
        self.record.min_grade.unwrap_or(f64::NEG_INFINITY)
    }
}

/// Where the default "average cutoff" view comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageSource {
    /// Pre-computed by the data provider.
    #[default]
    Provider,
    /// Computed locally from every major's records.
    Computed,
}

/// Cross-major results used by the default view and the summary cards.
#[derive(Debug, Clone, Serialize)]
pub struct CrossMajorSummary {
    pub generated_at: DateTime<Utc>,
    pub major_count: usize,
    pub average: SeriesOutcome,
    pub highest: Option<HighestCutoff>,
    pub yearly_highest: Vec<HighestCutoff>,
    /// Mean relative first-to-last cutoff change across majors, in percent.
    pub average_trend_percent: Option<f64>,
    /// Identifiers whose records could not be fetched.
    pub failed_identifiers: Vec<i64>,
}
