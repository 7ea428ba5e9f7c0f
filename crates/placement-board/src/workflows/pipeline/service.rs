use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::domain::{ApplicationCard, CardId, CardRecord, Placement, StageHistoryEntry};
use super::repository::{
    FailureNotifier, NavigationHook, NavigationRequest, NoNavigation, PipelineRepository,
    RepositoryError,
};
use super::stage::{StageId, SubStageId};
use super::store::{BoardError, BoardStore, LoadSummary, MoveOutcome, MoveStart, MoveTicket};
use super::surface::{
    render, BoardView, CardMenu, DragSession, DropOutcome, DropTarget, MoveIntent, ViewConfig,
};
use crate::config::BoardConfig;

/// Service composing the board store with the applications backend, the failure alert
/// sink, and the navigation hook.
///
/// The store lock is only held for the synchronous steps of a move; it is released before
/// the persistence call is awaited so moves on different cards proceed independently.
/// Persistence and its resolution run on a spawned task, so a move always settles even
/// when the caller stops waiting for it.
pub struct PipelineBoardService<R, A> {
    store: Arc<Mutex<BoardStore>>,
    repository: Arc<R>,
    alerts: Arc<A>,
    navigation: Arc<dyn NavigationHook>,
    move_timeout: Option<Duration>,
}

impl<R, A> PipelineBoardService<R, A>
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    pub fn new(repository: Arc<R>, alerts: Arc<A>) -> Self {
        Self {
            store: Arc::new(Mutex::new(BoardStore::new())),
            repository,
            alerts,
            navigation: Arc::new(NoNavigation),
            move_timeout: None,
        }
    }

    pub fn from_config(repository: Arc<R>, alerts: Arc<A>, config: &BoardConfig) -> Self {
        Self::new(repository, alerts).with_move_timeout(config.move_timeout)
    }

    pub fn with_navigation(mut self, navigation: Arc<dyn NavigationHook>) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn with_move_timeout(mut self, move_timeout: Option<Duration>) -> Self {
        self.move_timeout = move_timeout;
        self
    }

    /// Replace the board with externally supplied records.
    pub fn load(&self, records: Vec<CardRecord>) -> LoadSummary {
        self.store().load(records)
    }

    /// Fetch every record from the backend and replace the board with it.
    pub async fn refresh(&self) -> Result<LoadSummary, BoardServiceError> {
        let records = self.repository.fetch_cards().await?;
        Ok(self.load(records))
    }

    /// Move a card: apply locally, persist, then confirm or roll back. Dropping the
    /// returned future does not cancel the persistence call.
    pub async fn move_card(
        &self,
        card_id: &CardId,
        stage: StageId,
        sub_stage: Option<SubStageId>,
    ) -> Result<MoveOutcome, BoardError> {
        let started = self
            .store()
            .begin_move(card_id, stage, sub_stage, Utc::now())?;
        let ticket = match started {
            MoveStart::Started(ticket) => ticket,
            MoveStart::AlreadyPending => return Ok(MoveOutcome::Ignored(card_id.clone())),
        };

        let settlement = MoveSettlement {
            store: Arc::clone(&self.store),
            repository: Arc::clone(&self.repository),
            alerts: Arc::clone(&self.alerts),
            move_timeout: self.move_timeout,
        };
        match tokio::spawn(settlement.run(ticket.clone())).await {
            Ok(outcome) => Ok(outcome),
            Err(join_error) => {
                error!(
                    %join_error,
                    card_id = %ticket.card_id(),
                    "move task ended without resolving"
                );
                let aborted = Err(RepositoryError::Unavailable("move task aborted".to_string()));
                Ok(resolve(&self.store, self.alerts.as_ref(), &ticket, aborted))
            }
        }
    }

    /// Execute an intent produced by either input mode.
    pub async fn apply(&self, intent: MoveIntent) -> Result<MoveOutcome, BoardError> {
        let destination = intent.destination;
        self.move_card(&intent.card_id, destination.stage(), destination.sub_stage())
            .await
    }

    /// Complete a drag of `card_id` onto `target`. Returns `None` when the drop issues no
    /// move.
    pub async fn drag(
        &self,
        card_id: &CardId,
        target: DropTarget,
    ) -> Result<Option<MoveOutcome>, BoardError> {
        let session = {
            let store = self.store();
            let card = store
                .card(card_id)
                .ok_or_else(|| BoardError::UnknownCard(card_id.clone()))?;
            DragSession::pick_up(card)
        };

        match session.drop_on(target) {
            DropOutcome::Move(intent) => self.apply(intent).await.map(Some),
            DropOutcome::Reorder | DropOutcome::Cancelled => {
                debug!(card_id = %card_id, "drop issued no move");
                Ok(None)
            }
        }
    }

    pub fn menu(&self, card_id: &CardId) -> Result<CardMenu, BoardError> {
        let store = self.store();
        let card = store
            .card(card_id)
            .ok_or_else(|| BoardError::UnknownCard(card_id.clone()))?;
        Ok(CardMenu::for_card(card, store.is_pending(card_id)))
    }

    /// Complete a menu selection. Returns `None` when `destination` is not offered, which
    /// is only the case for the card's current placement.
    pub async fn select_from_menu(
        &self,
        card_id: &CardId,
        destination: Placement,
    ) -> Result<Option<MoveOutcome>, BoardError> {
        let intent = self.menu(card_id)?.select(destination);
        match intent {
            Some(intent) => self.apply(intent).await.map(Some),
            None => Ok(None),
        }
    }

    /// Hand a card to the host application for its detail view.
    pub fn activate(&self, card_id: &CardId) -> Result<NavigationRequest, BoardError> {
        let request = {
            let store = self.store();
            let card = store
                .card(card_id)
                .ok_or_else(|| BoardError::UnknownCard(card_id.clone()))?;
            NavigationRequest {
                card_id: card.id.clone(),
                job: card.job.clone(),
            }
        };
        self.navigation.open(&request);
        Ok(request)
    }

    pub async fn history(
        &self,
        card_id: &CardId,
    ) -> Result<Vec<StageHistoryEntry>, BoardServiceError> {
        let known = self.store().card(card_id).is_some();
        if !known {
            return Err(BoardError::UnknownCard(card_id.clone()).into());
        }
        Ok(self.repository.history(card_id).await?)
    }

    pub fn render(&self, config: &ViewConfig) -> BoardView {
        render(&self.store(), config)
    }

    pub fn query(&self, stage: StageId, sub_stage: Option<SubStageId>) -> Vec<ApplicationCard> {
        self.store()
            .query(stage, sub_stage)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn card(&self, card_id: &CardId) -> Option<ApplicationCard> {
        self.store().card(card_id).cloned()
    }

    pub fn is_pending(&self, card_id: &CardId) -> bool {
        self.store().is_pending(card_id)
    }

    /// Run a read-only closure against the current store.
    pub fn with_store<T>(&self, read: impl FnOnce(&BoardStore) -> T) -> T {
        read(&self.store())
    }

    fn store(&self) -> MutexGuard<'_, BoardStore> {
        lock(&self.store)
    }
}

/// Everything a spawned move task needs once the optimistic change is on the board.
struct MoveSettlement<R, A> {
    store: Arc<Mutex<BoardStore>>,
    repository: Arc<R>,
    alerts: Arc<A>,
    move_timeout: Option<Duration>,
}

impl<R, A> MoveSettlement<R, A>
where
    R: PipelineRepository + 'static,
    A: FailureNotifier + 'static,
{
    async fn run(self, ticket: MoveTicket) -> MoveOutcome {
        let result = self
            .bounded(self.repository.persist_move(ticket.request()))
            .await;
        let timed_out = matches!(result, Err(RepositoryError::TimedOut));
        let outcome = resolve(&self.store, self.alerts.as_ref(), &ticket, result);
        if timed_out {
            self.resync(ticket.card_id()).await;
        }
        outcome
    }

    /// The backend may still apply a write that timed out, so reload what it holds.
    async fn resync(&self, card_id: &CardId) {
        warn!(
            card_id = %card_id,
            "backend may still apply the timed-out move; refreshing board"
        );
        match self.bounded(self.repository.fetch_cards()).await {
            Ok(records) => {
                lock(&self.store).load(records);
            }
            Err(error) => {
                warn!(
                    %error,
                    card_id = %card_id,
                    "refresh after timed-out move failed; refresh advised"
                );
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, RepositoryError> {
        match self.move_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(RepositoryError::TimedOut)),
            None => call.await,
        }
    }
}

fn resolve<A>(
    store: &Mutex<BoardStore>,
    alerts: &A,
    ticket: &MoveTicket,
    result: Result<(), RepositoryError>,
) -> MoveOutcome
where
    A: FailureNotifier + ?Sized,
{
    let outcome = match result {
        Ok(()) => lock(store).confirm(ticket),
        Err(error) => lock(store).fail(ticket, &error.to_string()),
    };

    match &outcome {
        MoveOutcome::RolledBack { notice, .. } => {
            if let Err(error) = alerts.notify(notice.clone()) {
                error!(%error, card_id = %notice.card_id, "failed to deliver move failure alert");
            }
        }
        MoveOutcome::Confirmed(card) => {
            info!(card_id = %card.id, placement = %card.placement, "card moved");
        }
        MoveOutcome::Ignored(_) | MoveOutcome::Stale(_) => {}
    }
    outcome
}

fn lock(store: &Mutex<BoardStore>) -> MutexGuard<'_, BoardStore> {
    store.lock().expect("board mutex poisoned")
}

/// Error raised by backend-facing service calls.
#[derive(Debug, thiserror::Error)]
pub enum BoardServiceError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
