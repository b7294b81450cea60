//! Session-scoped aggregation context.
//!
//! A [`Session`] owns everything fetched for one user session: the major
//! index, the default average view, the optional cross-major overview and the
//! currently displayed major. Nothing lives in module-level state;
//! [`Session::reset`] drops it all.
//!
//! Selections are versioned. Each [`Session::select_major`] call for a known
//! major takes a new generation number and only applies its result if no
//! newer selection (or reset) started while its fetches were in flight. A
//! superseded fetch still runs to completion; its result is discarded.
//! [`Session::initialize`] and [`Session::compute_overview`] are tied to the
//! reset epoch instead, so a reset also discards what they were loading.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, warn};

use crate::analyzers::series::aggregate_major;
use crate::analyzers::types::{AverageSource, CrossMajorSummary, SeriesOutcome};
use crate::infra::config::ProviderConfig;
use crate::majors::{MajorIndex, SearchIndex};
use crate::normalize::normalize_records;
use crate::services::provider_api::AdmissionProvider;
use crate::stats::AdmissionRecord;

/// Normalized records fetched for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierBatch {
    pub identifier: i64,
    pub records: Vec<AdmissionRecord>,
}

impl AsRef<[AdmissionRecord]> for IdentifierBatch {
    fn as_ref(&self) -> &[AdmissionRecord] {
        &self.records
    }
}

/// An identifier whose records could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub identifier: i64,
    pub message: String,
}

/// Outcome of fetching a set of identifiers: successes in request order,
/// plus failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchReport {
    pub batches: Vec<IdentifierBatch>,
    pub failures: Vec<FetchFailure>,
}

/// What the presentation layer should say about a loaded major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    /// Every fetch failed.
    FetchFailed,
    /// Fetches succeeded but nothing survived the filter.
    NoData,
    /// Some identifiers failed; the series covers the rest.
    Partial,
    /// Some years lack a max grade, a cutoff or counts.
    Incomplete,
    Complete,
}

/// A major's fetched data and the series derived from it under one filter.
#[derive(Debug, Clone, Serialize)]
pub struct MajorView {
    pub name: String,
    pub domestic: bool,
    pub loaded_at: DateTime<Utc>,
    pub batches: Vec<IdentifierBatch>,
    pub failures: Vec<FetchFailure>,
    pub series: SeriesOutcome,
}

impl MajorView {
    pub fn build(name: &str, report: FetchReport, domestic: bool) -> Self {
        let series = aggregate_major(&report.batches, domestic);
        MajorView {
            name: name.to_string(),
            domestic,
            loaded_at: Utc::now(),
            batches: report.batches,
            failures: report.failures,
            series,
        }
    }

    /// Re-derives the series from the stored batches under another filter.
    pub fn with_filter(&self, domestic: bool) -> Self {
        MajorView {
            name: self.name.clone(),
            domestic,
            loaded_at: self.loaded_at,
            batches: self.batches.clone(),
            failures: self.failures.clone(),
            series: aggregate_major(&self.batches, domestic),
        }
    }

    pub fn status(&self) -> DataStatus {
        match &self.series {
            SeriesOutcome::NoData if self.batches.is_empty() && !self.failures.is_empty() => {
                DataStatus::FetchFailed
            }
            SeriesOutcome::NoData => DataStatus::NoData,
            SeriesOutcome::Loaded(_) if !self.failures.is_empty() => DataStatus::Partial,
            SeriesOutcome::Loaded(series) if !series.summary.complete => DataStatus::Incomplete,
            SeriesOutcome::Loaded(_) => DataStatus::Complete,
        }
    }
}

/// The default "average cutoff" view.
#[derive(Debug, Clone, Serialize)]
pub struct AverageView {
    pub source: AverageSource,
    pub loaded_at: DateTime<Utc>,
    pub series: SeriesOutcome,
    pub error: Option<String>,
}

impl AverageView {
    fn failed(source: AverageSource, err: &anyhow::Error) -> Self {
        AverageView {
            source,
            loaded_at: Utc::now(),
            series: SeriesOutcome::NoData,
            error: Some(format!("{err:#}")),
        }
    }
}

/// Result of [`Session::select_major`].
#[derive(Debug, Clone)]
pub enum SelectionOutcome {
    /// The view is now the session's current view.
    Applied(Arc<MajorView>),
    /// A newer selection or a reset started first; nothing was applied.
    Superseded,
}

struct SessionState {
    majors: Option<Arc<MajorIndex>>,
    search: Arc<SearchIndex>,
    average: Option<Arc<AverageView>>,
    overview: Option<Arc<CrossMajorSummary>>,
    domestic: bool,
    current: Option<Arc<MajorView>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            majors: None,
            search: Arc::new(SearchIndex::default()),
            average: None,
            overview: None,
            domestic: true,
            current: None,
        }
    }
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Session<P> {
    provider: Arc<P>,
    fetch_limit: usize,
    average_source: AverageSource,
    generation: AtomicU64,
    epoch: AtomicU64,
    pending: AtomicUsize,
    state: Mutex<SessionState>,
}

impl<P: AdmissionProvider + 'static> Session<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, &ProviderConfig::default())
    }

    pub fn with_config(provider: P, config: &ProviderConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            fetch_limit: config.fetch_limit(),
            average_source: config.average_source,
            generation: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds the major index and loads the average view.
    ///
    /// A failed major list is an error. A failed average leaves an
    /// [`AverageView`] with no data and the error message. A reset while
    /// loading discards everything loaded so far.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let _pending = PendingGuard::enter(&self.pending);
        let epoch = self.epoch.load(Ordering::SeqCst);

        let entries = self
            .provider
            .list_majors()
            .await
            .context("failed to fetch major list")?;
        let index = MajorIndex::build(&entries);
        info!(majors = index.len(), identifiers = entries.len(), "Major index built");

        {
            let mut state = self.state();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                info!("Session reset during initialization, discarding major index");
                return Ok(());
            }
            state.search = Arc::new(SearchIndex::new(&index));
            state.majors = Some(Arc::new(index));
        }

        let average = match self.average_source {
            AverageSource::Provider => self.load_provider_average().await,
            AverageSource::Computed => match self.compute_overview().await {
                Ok(overview) => AverageView {
                    source: AverageSource::Computed,
                    loaded_at: overview.generated_at,
                    series: overview.average.clone(),
                    error: None,
                },
                Err(e) => {
                    warn!(error = %e, "Failed to compute average cutoffs");
                    AverageView::failed(AverageSource::Computed, &e)
                }
            },
        };
        let mut state = self.state();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            info!("Session reset during initialization, discarding average");
            return Ok(());
        }
        state.average = Some(Arc::new(average));

        Ok(())
    }

    async fn load_provider_average(&self) -> AverageView {
        match self.provider.average_cutoffs().await {
            Ok(rows) => {
                let records = normalize_records(&rows);
                debug!(rows = rows.len(), records = records.len(), "Average cutoffs fetched");
                AverageView {
                    source: AverageSource::Provider,
                    loaded_at: Utc::now(),
                    series: aggregate_major(&[records], true),
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch average cutoffs");
                AverageView::failed(AverageSource::Provider, &e)
            }
        }
    }

    /// Drops all cached state and invalidates in-flight selections.
    pub fn reset(&self) {
        let mut state = self.state();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = SessionState::default();
        info!("Session reset");
    }

    /// Fetches every identifier of `name` and makes the result current,
    /// unless a newer selection started meanwhile.
    ///
    /// An unknown name is an error and leaves in-flight selections alone.
    #[tracing::instrument(skip(self))]
    pub async fn select_major(&self, name: &str) -> Result<SelectionOutcome> {
        let _pending = PendingGuard::enter(&self.pending);

        let identifiers = {
            let state = self.state();
            let majors = state
                .majors
                .as_ref()
                .ok_or_else(|| anyhow!("session is not initialized"))?;
            majors
                .identifiers(name)
                .ok_or_else(|| anyhow!("unknown major '{name}'"))?
                .to_vec()
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let report = fetch_identifiers(&self.provider, &identifiers, self.fetch_limit).await;

        let mut state = self.state();
        if self.generation.load(Ordering::SeqCst) != generation {
            info!(generation, "Selection superseded, discarding result");
            return Ok(SelectionOutcome::Superseded);
        }

        let view = Arc::new(MajorView::build(name, report, state.domestic));
        info!(
            status = ?view.status(),
            batches = view.batches.len(),
            failures = view.failures.len(),
            "Major loaded"
        );
        state.current = Some(Arc::clone(&view));
        Ok(SelectionOutcome::Applied(view))
    }

    /// Switches between all students (`true`) and international only
    /// (`false`), re-deriving the current view from already fetched data.
    pub fn set_domestic_filter(&self, domestic: bool) -> Option<Arc<MajorView>> {
        let mut state = self.state();
        if state.domestic != domestic {
            state.overview = None;
        }
        state.domestic = domestic;

        let view = state
            .current
            .as_ref()
            .map(|current| Arc::new(current.with_filter(domestic)));
        state.current = view.clone();
        view
    }

    /// Major names containing `query`, case-insensitively, in index order.
    pub fn search(&self, query: &str) -> Vec<String> {
        let search = Arc::clone(&self.state().search);
        search.search(query).into_iter().map(str::to_string).collect()
    }

    /// Fetches every major and builds the cross-major summary under the
    /// current filter. Cached until the filter changes or the session resets.
    #[tracing::instrument(skip(self))]
    pub async fn compute_overview(&self) -> Result<Arc<CrossMajorSummary>> {
        let _pending = PendingGuard::enter(&self.pending);

        let (majors, domestic) = {
            let state = self.state();
            if let Some(overview) = &state.overview {
                return Ok(Arc::clone(overview));
            }
            let majors = state
                .majors
                .clone()
                .ok_or_else(|| anyhow!("session is not initialized"))?;
            (majors, state.domestic)
        };
        let epoch = self.epoch.load(Ordering::SeqCst);

        let identifiers: Vec<i64> = majors
            .iter()
            .flat_map(|m| m.identifiers.iter().copied())
            .collect();
        let report = fetch_identifiers(&self.provider, &identifiers, self.fetch_limit).await;

        let by_identifier: HashMap<i64, &IdentifierBatch> =
            report.batches.iter().map(|b| (b.identifier, b)).collect();

        let mut per_major = BTreeMap::new();
        for major in majors.iter() {
            let batches: Vec<&[AdmissionRecord]> = major
                .identifiers
                .iter()
                .filter_map(|id| by_identifier.get(id).map(|b| b.records.as_slice()))
                .collect();
            if let SeriesOutcome::Loaded(series) = aggregate_major(&batches, domestic) {
                per_major.insert(major.name.clone(), series);
            }
        }

        let mut summary = CrossMajorSummary::from_majors(&per_major);
        summary.failed_identifiers = report.failures.iter().map(|f| f.identifier).collect();
        if !summary.failed_identifiers.is_empty() {
            warn!(
                failed = summary.failed_identifiers.len(),
                "Overview built from partial data"
            );
        }
        let summary = Arc::new(summary);

        let mut state = self.state();
        if self.epoch.load(Ordering::SeqCst) == epoch && state.domestic == domestic {
            state.overview = Some(Arc::clone(&summary));
        }
        Ok(summary)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub fn is_initialized(&self) -> bool {
        self.state().majors.is_some()
    }

    pub fn domestic_filter(&self) -> bool {
        self.state().domestic
    }

    pub fn majors(&self) -> Option<Arc<MajorIndex>> {
        self.state().majors.clone()
    }

    pub fn average(&self) -> Option<Arc<AverageView>> {
        self.state().average.clone()
    }

    pub fn current(&self) -> Option<Arc<MajorView>> {
        self.state().current.clone()
    }

    pub fn overview(&self) -> Option<Arc<CrossMajorSummary>> {
        self.state().overview.clone()
    }
}

/// Fetches identifiers concurrently (at most `limit` at a time) and
/// normalizes each batch. Results keep the order of `identifiers`.
pub async fn fetch_identifiers<P: AdmissionProvider + 'static>(
    provider: &Arc<P>,
    identifiers: &[i64],
    limit: usize,
) -> FetchReport {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (pos, &identifier) in identifiers.iter().enumerate() {
        let provider = Arc::clone(provider);
        let sem = Arc::clone(&semaphore);
        let span = tracing::info_span!("fetch_identifier", identifier);

        tasks.spawn(
            async move {
                let _permit = sem.acquire_owned().await.ok();
                let result = provider
                    .admission_records(identifier)
                    .await
                    .map(|rows| normalize_records(&rows));
                match &result {
                    Ok(records) => debug!(records = records.len(), "Identifier fetched"),
                    Err(e) => warn!(error = %e, "Identifier fetch failed"),
                }
                (pos, result)
            }
            .instrument(span),
        );
    }

    let mut slots: Vec<Option<Result<Vec<AdmissionRecord>>>> =
        identifiers.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((pos, result)) => slots[pos] = Some(result),
            Err(e) => error!(error = %e, "Identifier fetch task panicked"),
        }
    }

    let mut report = FetchReport::default();
    for (&identifier, slot) in identifiers.iter().zip(slots) {
        match slot {
            Some(Ok(records)) => report.batches.push(IdentifierBatch { identifier, records }),
            Some(Err(e)) => report.failures.push(FetchFailure {
                identifier,
                message: format!("{e:#}"),
            }),
            None => report.failures.push(FetchFailure {
                identifier,
                message: "fetch task did not complete".to_string(),
            }),
        }
    }
    report
}
