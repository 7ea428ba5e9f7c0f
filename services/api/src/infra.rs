use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use placement_board::workflows::pipeline::{
    read_seed, read_seed_file, AlertError, CardId, CardRecord, FailureNotice, FailureNotifier,
    MoveRequest, NavigationHook, NavigationRequest, PipelineRepository, Placement,
    RepositoryError, SeedError, StageHistoryEntry,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const DEFAULT_SEED: &str = include_str!("../seeds/board.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Applications backend kept in process memory. Every accepted move appends a history
/// entry.
#[derive(Default)]
pub(crate) struct InMemoryPipelineRepository {
    records: Mutex<Vec<CardRecord>>,
    history: Mutex<Vec<StageHistoryEntry>>,
    outage: AtomicBool,
}

impl InMemoryPipelineRepository {
    pub(crate) fn with_records(records: Vec<CardRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// While set, every move is refused as if the backend were unreachable.
    pub(crate) fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::Release);
    }

    /// Admin recommendation: changes the stored placement without going through the
    /// board. Boards pick it up on their next refresh.
    pub(crate) fn recommend(
        &self,
        card_id: &CardId,
        placement: Placement,
    ) -> Result<StageHistoryEntry, RepositoryError> {
        let entry = self.record_move(&MoveRequest::new(card_id.clone(), placement))?;
        info!(card_id = %card_id, %placement, "recommendation applied");
        Ok(entry)
    }

    fn record_move(&self, request: &MoveRequest) -> Result<StageHistoryEntry, RepositoryError> {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        let record = records
            .iter_mut()
            .find(|record| record.id == request.card_id.as_str())
            .ok_or(RepositoryError::NotFound)?;

        let recorded_at = Utc::now();
        record.stage = request.stage.as_str().to_string();
        record.sub_stage = request
            .sub_stage
            .map(|sub_stage| sub_stage.as_str().to_string());
        record.updated_at = recorded_at;

        let entry = StageHistoryEntry {
            card_id: request.card_id.clone(),
            stage: request.stage,
            sub_stage: request.sub_stage,
            recorded_at,
        };
        self.history
            .lock()
            .expect("history mutex poisoned")
            .push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl PipelineRepository for InMemoryPipelineRepository {
    async fn fetch_cards(&self) -> Result<Vec<CardRecord>, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex poisoned").clone())
    }

    async fn persist_move(&self, request: &MoveRequest) -> Result<(), RepositoryError> {
        if self.outage.load(Ordering::Acquire) {
            return Err(RepositoryError::Unavailable(
                "applications backend unreachable".to_string(),
            ));
        }
        self.record_move(request).map(|_| ())
    }

    async fn history(&self, card_id: &CardId) -> Result<Vec<StageHistoryEntry>, RepositoryError> {
        let guard = self.history.lock().expect("history mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| &entry.card_id == card_id)
            .cloned()
            .collect())
    }
}

/// Alert sink that logs each failed move and keeps it for later display.
#[derive(Default, Clone)]
pub(crate) struct LoggingAlertPublisher {
    events: Arc<Mutex<Vec<FailureNotice>>>,
}

impl FailureNotifier for LoggingAlertPublisher {
    fn notify(&self, notice: FailureNotice) -> Result<(), AlertError> {
        warn!(card_id = %notice.card_id, message = %notice.message, "move failed");
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

impl LoggingAlertPublisher {
    pub(crate) fn events(&self) -> Vec<FailureNotice> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

pub(crate) struct LoggingNavigation;

impl NavigationHook for LoggingNavigation {
    fn open(&self, request: &NavigationRequest) {
        match &request.job {
            Some(job) => info!(card_id = %request.card_id, job = %job.0, "opening job detail"),
            None => info!(card_id = %request.card_id, "card has no linked job"),
        }
    }
}

/// Records from `path`, or the bundled sample board when no path is given.
pub(crate) fn load_records(path: Option<&Path>) -> Result<Vec<CardRecord>, SeedError> {
    match path {
        Some(path) => read_seed_file(path),
        None => read_seed(DEFAULT_SEED.as_bytes()),
    }
}
