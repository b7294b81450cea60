//! Trait for the read-only admission data provider.

use anyhow::Result;

use crate::majors::MajorEntry;
use crate::normalize::RawAdmissionRecord;

/// Abstraction over the remote admission-statistics service.
///
/// Rows are returned raw; normalization happens on the engine side.
#[async_trait::async_trait]
pub trait AdmissionProvider: Send + Sync {
    /// Every `(name, identifier)` pair, one per identifier.
    async fn list_majors(&self) -> Result<Vec<MajorEntry>>;

    /// The provider's pre-computed cross-major average, one row per year.
    async fn average_cutoffs(&self) -> Result<Vec<RawAdmissionRecord>>;

    /// All admission rows for one identifier.
    async fn admission_records(&self, identifier: i64) -> Result<Vec<RawAdmissionRecord>>;
}
