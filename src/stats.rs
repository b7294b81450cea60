use serde::{Deserialize, Serialize};

/// One year's admission outcome for one major identifier, after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub year: i32,
    /// `None` means the record applies to every applicant type.
    #[serde(default)]
    pub domestic: Option<bool>,
    /// Cutoff. `None` when the provider value could not be coerced.
    pub min_grade: Option<f64>,
    /// `0.0` means "not reported".
    pub max_grade: f64,
    pub initial_reject: u32,
    pub final_admit: u32,
}

impl AdmissionRecord {
    /// Record with only a year and a cutoff; everything else unreported.
    pub fn with_cutoff(year: i32, min_grade: f64) -> Self {
        AdmissionRecord {
            year,
            domestic: None,
            min_grade: Some(min_grade),
            max_grade: 0.0,
            initial_reject: 0,
            final_admit: 0,
        }
    }

    pub fn pct(part: u64, total: u64) -> Option<f64> {
        if total == 0 {
            None
        } else {
            Some((part as f64 / total as f64) * 100.0)
        }
    }

    /// `final_admit / (final_admit + initial_reject)` in percent, undefined
    /// when both counts are zero.
    pub fn acceptance_rate(&self) -> Option<f64> {
        let admits = u64::from(self.final_admit);
        Self::pct(admits, admits + u64::from(self.initial_reject))
    }

    pub fn max_grade_reported(&self) -> Option<f64> {
        (self.max_grade > 0.0).then_some(self.max_grade)
    }

    pub fn counts_reported(&self) -> bool {
        self.initial_reject > 0 || self.final_admit > 0
    }

    pub fn is_complete(&self) -> bool {
        self.min_grade.is_some() && self.max_grade_reported().is_some() && self.counts_reported()
    }

    /// Records without a `domestic` flag pass every filter value.
    pub fn passes_filter(&self, domestic: bool) -> bool {
        self.domestic.is_none_or(|d| d == domestic)
    }
}
