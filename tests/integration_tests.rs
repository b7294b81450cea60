use admission_cutoffs::analyzers::types::SeriesOutcome;
use admission_cutoffs::infra::provider::decode_envelope;
use admission_cutoffs::majors::MajorEntry;
use admission_cutoffs::normalize::RawAdmissionRecord;
use admission_cutoffs::services::provider_api::AdmissionProvider;
use admission_cutoffs::session::{DataStatus, MajorView, SelectionOutcome, Session};
use anyhow::Result;
use std::sync::Arc;

/// Serves recorded provider responses from `tests/fixtures`.
struct FixtureProvider;

#[async_trait::async_trait]
impl AdmissionProvider for FixtureProvider {
    async fn list_majors(&self) -> Result<Vec<MajorEntry>> {
        decode_envelope(include_bytes!("fixtures/majors.json"))
    }

    async fn average_cutoffs(&self) -> Result<Vec<RawAdmissionRecord>> {
        decode_envelope(include_bytes!("fixtures/average_cutoffs.json"))
    }

    async fn admission_records(&self, identifier: i64) -> Result<Vec<RawAdmissionRecord>> {
        let body: &[u8] = match identifier {
            101 => include_bytes!("fixtures/admission_101.json"),
            102 => include_bytes!("fixtures/admission_102.json"),
            103 => include_bytes!("fixtures/admission_103.json"),
            104 => include_bytes!("fixtures/admission_104.json"),
            other => anyhow::bail!("no fixture for identifier {other}"),
        };
        decode_envelope(body)
    }
}

async fn session() -> Session<FixtureProvider> {
    let session = Session::new(FixtureProvider);
    session.initialize().await.expect("Failed to initialize session");
    session
}

async fn select(session: &Session<FixtureProvider>, name: &str) -> Arc<MajorView> {
    match session.select_major(name).await.expect("Failed to select major") {
        SelectionOutcome::Applied(view) => view,
        SelectionOutcome::Superseded => panic!("unexpected supersede"),
    }
}

#[tokio::test]
async fn test_full_pipeline() {
    let session = session().await;
    let view = select(&session, "Engineering").await;
    let series = view.series.series().expect("Engineering has data");

    let years: Vec<i32> = series.years().collect();
    assert_eq!(years, vec![2020, 2021, 2022, 2023]);

    // 2022 exists under both identifiers; the first identifier's row wins
    assert_eq!(series.get(2022).unwrap().record.min_grade, Some(91.4));
    assert_eq!(series.get(2023).unwrap().record.min_grade, Some(92.0));
    assert_eq!(series.entries[0].cutoff_delta, Some(0.0));
    assert_eq!(series.get(2023).unwrap().acceptance_rate, None);

    let summary = &series.summary;
    assert_eq!(summary.total_initial_reject, 330);
    assert_eq!(summary.total_final_admit, 135);
    let cutoff = summary.cutoff.as_ref().unwrap();
    assert!((cutoff.mean - 90.625).abs() < 1e-9);
    assert_eq!(cutoff.min, 89.0);
    assert_eq!(cutoff.max, 92.0);
    assert!((cutoff.net_change - 3.0).abs() < 1e-9);

    assert_eq!(view.status(), DataStatus::Incomplete);
}

#[tokio::test]
async fn test_international_filter() {
    let session = session().await;
    select(&session, "Engineering").await;

    let view = session.set_domestic_filter(false).unwrap();
    let series = view.series.series().unwrap();
    assert_eq!(series.get(2023).unwrap().record.min_grade, Some(94.5));
    assert_eq!(series.years().count(), 4);
}

#[tokio::test]
async fn test_malformed_fields_recovered() {
    let session = session().await;
    let view = select(&session, "Mathematics").await;
    let series = view.series.series().unwrap();

    // the yearless row is dropped, the rest survive field by field
    assert_eq!(series.years().collect::<Vec<_>>(), vec![2020, 2021]);
    let first = &series.entries[0];
    assert_eq!(first.record.initial_reject, 0);
    assert_eq!(first.acceptance_rate, Some(100.0));
}

#[tokio::test]
async fn test_failed_major_is_reported() {
    let session = session().await;
    let view = select(&session, "English").await;

    assert!(matches!(view.series, SeriesOutcome::NoData));
    assert_eq!(view.status(), DataStatus::FetchFailed);
    assert!(view.failures[0].message.contains("admission statistics not found"));
}

#[tokio::test]
async fn test_average_and_search() {
    let session = session().await;

    let average = session.average().unwrap();
    let series = average.series.series().unwrap();
    assert_eq!(series.years().collect::<Vec<_>>(), vec![2020, 2021, 2022]);
    assert_eq!(series.get(2022).unwrap().acceptance_rate, None);
    assert_eq!(series.get(2022).unwrap().record.max_grade_reported(), None);

    assert_eq!(session.search("eng"), vec!["Engineering", "English"]);
    assert_eq!(session.search("ATH"), vec!["Mathematics"]);
}

#[tokio::test]
async fn test_overview() {
    let session = session().await;
    let overview = session.compute_overview().await.unwrap();

    assert_eq!(overview.major_count, 2);
    assert_eq!(overview.failed_identifiers, vec![102]);

    let highest = overview.highest.as_ref().unwrap();
    assert_eq!((highest.major.as_str(), highest.year), ("Engineering", 2023));

    let average = overview.average.series().unwrap();
    assert!((average.get(2020).unwrap().record.min_grade.unwrap() - 83.5).abs() < 1e-9);
    assert!((average.get(2021).unwrap().record.min_grade.unwrap() - 85.3).abs() < 1e-9);
    assert_eq!(average.get(2023).unwrap().record.min_grade, Some(92.0));
}
