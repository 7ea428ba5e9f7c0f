use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use crate::workflows::pipeline::domain::{CardId, CardRecord, MoveRequest, StageHistoryEntry};
use crate::workflows::pipeline::repository::{
    AlertError, FailureNotice, FailureNotifier, NavigationHook, NavigationRequest,
    PipelineRepository, RepositoryError,
};
use crate::workflows::pipeline::{pipeline_router, PipelineBoardService};

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn record(id: &str, stage: &str, sub_stage: Option<&str>) -> CardRecord {
    CardRecord {
        id: id.to_string(),
        title: format!("Role {id}"),
        company: "Northwind Staffing".to_string(),
        job_id: Some(format!("job-{id}")),
        stage: stage.to_string(),
        sub_stage: sub_stage.map(str::to_string),
        updated_at: at(1, 9),
    }
}

/// Seven cards spread across the board; card "7" starts in `applied`.
pub(super) fn sample_records() -> Vec<CardRecord> {
    vec![
        record("1", "interested", None),
        record("2", "interview", Some("phone_screening")),
        record("3", "interview", None),
        record("4", "offer", Some("negotiation")),
        record("5", "interview", Some("final_interview_stage")),
        record("6", "rejected", None),
        record("7", "applied", None),
    ]
}

pub(super) fn card_id(id: &str) -> CardId {
    CardId::new(id)
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<Vec<CardRecord>>,
    history: Mutex<Vec<StageHistoryEntry>>,
    calls: Mutex<Vec<MoveRequest>>,
    failure: Mutex<Option<RepositoryError>>,
}

impl MemoryRepository {
    pub(super) fn with_records(records: Vec<CardRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub(super) fn fail_with(&self, error: RepositoryError) {
        *self.failure.lock().expect("failure mutex poisoned") = Some(error);
    }

    pub(super) fn recover(&self) {
        *self.failure.lock().expect("failure mutex poisoned") = None;
    }

    pub(super) fn calls(&self) -> Vec<MoveRequest> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn entries(&self) -> Vec<StageHistoryEntry> {
        self.history.lock().expect("history mutex poisoned").clone()
    }

    /// Change a record behind the board's back, as an admin recommendation would.
    pub(super) fn overwrite(&self, id: &str, stage: &str, sub_stage: Option<&str>) {
        let mut records = self.records.lock().expect("records mutex poisoned");
        if let Some(existing) = records.iter_mut().find(|existing| existing.id == id) {
            existing.stage = stage.to_string();
            existing.sub_stage = sub_stage.map(str::to_string);
        }
    }
}

#[async_trait]
impl PipelineRepository for MemoryRepository {
    async fn fetch_cards(&self) -> Result<Vec<CardRecord>, RepositoryError> {
        Ok(self.records.lock().expect("records mutex poisoned").clone())
    }

    async fn persist_move(&self, request: &MoveRequest) -> Result<(), RepositoryError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(request.clone());

        if let Some(error) = self.failure.lock().expect("failure mutex poisoned").clone() {
            return Err(error);
        }

        let mut records = self.records.lock().expect("records mutex poisoned");
        let existing = records
            .iter_mut()
            .find(|existing| existing.id == request.card_id.0)
            .ok_or(RepositoryError::NotFound)?;
        existing.stage = request.stage.as_str().to_string();
        existing.sub_stage = request.sub_stage.map(|sub_stage| sub_stage.as_str().to_string());

        self.history
            .lock()
            .expect("history mutex poisoned")
            .push(StageHistoryEntry {
                card_id: request.card_id.clone(),
                stage: request.stage,
                sub_stage: request.sub_stage,
                recorded_at: at(2, 12),
            });
        Ok(())
    }

    async fn history(&self, card_id: &CardId) -> Result<Vec<StageHistoryEntry>, RepositoryError> {
        Ok(self
            .entries()
            .into_iter()
            .filter(|entry| &entry.card_id == card_id)
            .collect())
    }
}

/// Backend that stores every move but never answers the move call.
pub(super) struct SilentRepository {
    inner: MemoryRepository,
}

impl SilentRepository {
    pub(super) fn with_records(records: Vec<CardRecord>) -> Self {
        Self {
            inner: MemoryRepository::with_records(records),
        }
    }

    pub(super) fn entries(&self) -> Vec<StageHistoryEntry> {
        self.inner.entries()
    }
}

#[async_trait]
impl PipelineRepository for SilentRepository {
    async fn fetch_cards(&self) -> Result<Vec<CardRecord>, RepositoryError> {
        self.inner.fetch_cards().await
    }

    async fn persist_move(&self, request: &MoveRequest) -> Result<(), RepositoryError> {
        self.inner.persist_move(request).await?;
        std::future::pending().await
    }

    async fn history(&self, card_id: &CardId) -> Result<Vec<StageHistoryEntry>, RepositoryError> {
        self.inner.history(card_id).await
    }
}

/// Backend whose move calls block until the test releases them.
pub(super) struct GatedRepository {
    records: Vec<CardRecord>,
    calls: Mutex<Vec<MoveRequest>>,
    entered: Notify,
    gate: Semaphore,
    result: Mutex<Result<(), RepositoryError>>,
}

impl GatedRepository {
    pub(super) fn new(records: Vec<CardRecord>) -> Self {
        Self {
            records,
            calls: Mutex::new(Vec::new()),
            entered: Notify::new(),
            gate: Semaphore::new(0),
            result: Mutex::new(Ok(())),
        }
    }

    pub(super) fn resolve_with(&self, result: Result<(), RepositoryError>) {
        *self.result.lock().expect("result mutex poisoned") = result;
    }

    /// Wait until one more move call has reached the backend.
    pub(super) async fn entered(&self) {
        self.entered.notified().await;
    }

    pub(super) fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub(super) fn calls(&self) -> Vec<MoveRequest> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl PipelineRepository for GatedRepository {
    async fn fetch_cards(&self) -> Result<Vec<CardRecord>, RepositoryError> {
        Ok(self.records.clone())
    }

    async fn persist_move(&self, request: &MoveRequest) -> Result<(), RepositoryError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(request.clone());
        self.entered.notify_one();

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| RepositoryError::Unavailable("gate closed".to_string()))?;
        permit.forget();

        self.result.lock().expect("result mutex poisoned").clone()
    }

    async fn history(&self, _card_id: &CardId) -> Result<Vec<StageHistoryEntry>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl PipelineRepository for UnavailableRepository {
    async fn fetch_cards(&self) -> Result<Vec<CardRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn persist_move(&self, _request: &MoveRequest) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn history(&self, _card_id: &CardId) -> Result<Vec<StageHistoryEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryAlerts {
    events: Mutex<Vec<FailureNotice>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<FailureNotice> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl FailureNotifier for MemoryAlerts {
    fn notify(&self, notice: FailureNotice) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct BrokenAlerts;

impl FailureNotifier for BrokenAlerts {
    fn notify(&self, _notice: FailureNotice) -> Result<(), AlertError> {
        Err(AlertError::Transport("toast channel closed".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNavigation {
    opened: Mutex<Vec<NavigationRequest>>,
}

impl RecordingNavigation {
    pub(super) fn opened(&self) -> Vec<NavigationRequest> {
        self.opened.lock().expect("navigation mutex poisoned").clone()
    }
}

impl NavigationHook for RecordingNavigation {
    fn open(&self, request: &NavigationRequest) {
        self.opened
            .lock()
            .expect("navigation mutex poisoned")
            .push(request.clone());
    }
}

pub(super) fn build_service() -> (
    PipelineBoardService<MemoryRepository, MemoryAlerts>,
    Arc<MemoryRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(MemoryRepository::with_records(sample_records()));
    let alerts = Arc::new(MemoryAlerts::default());
    let service = PipelineBoardService::new(repository.clone(), alerts.clone());
    service.load(sample_records());
    (service, repository, alerts)
}

pub(super) fn build_gated_service() -> (
    Arc<PipelineBoardService<GatedRepository, MemoryAlerts>>,
    Arc<GatedRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(GatedRepository::new(sample_records()));
    let alerts = Arc::new(MemoryAlerts::default());
    let service = PipelineBoardService::new(repository.clone(), alerts.clone());
    service.load(sample_records());
    (Arc::new(service), repository, alerts)
}

pub(super) fn router_with_service(
    service: PipelineBoardService<MemoryRepository, MemoryAlerts>,
) -> axum::Router {
    pipeline_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
