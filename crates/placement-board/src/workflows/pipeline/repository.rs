use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationCard, CardId, CardRecord, JobReference, MoveRequest, Placement, StageHistoryEntry,
};

/// Applications backend the board reconciles with. Implementations live with the CRUD
/// layer; the board only reads records, requests moves, and reads history.
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Full fetch used for the initial load and every refresh.
    async fn fetch_cards(&self) -> Result<Vec<CardRecord>, RepositoryError>;

    /// Persist a stage transition. On success the backend appends one history entry.
    async fn persist_move(&self, request: &MoveRequest) -> Result<(), RepositoryError>;

    async fn history(&self, card_id: &CardId) -> Result<Vec<StageHistoryEntry>, RepositoryError>;
}

/// Error enumeration for backend failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("move rejected: {0}")]
    Rejected(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for the applications backend")]
    TimedOut,
}

/// User-facing alert channel for failed moves.
pub trait FailureNotifier: Send + Sync {
    fn notify(&self, notice: FailureNotice) -> Result<(), AlertError>;
}

/// Displayable description of a failed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub card_id: CardId,
    pub attempted: String,
    pub message: String,
}

impl FailureNotice {
    pub fn for_move(card: &ApplicationCard, attempted: Placement, reason: &str) -> Self {
        Self {
            card_id: card.id.clone(),
            attempted: attempted.to_string(),
            message: format!(
                "Could not move \"{}\" at {} (card {}) to {}: {}",
                card.title,
                card.company,
                card.id,
                attempted.label(),
                reason
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Request for the host application to show a card's full application detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationRequest {
    pub card_id: CardId,
    pub job: Option<JobReference>,
}

pub trait NavigationHook: Send + Sync {
    fn open(&self, request: &NavigationRequest);
}

/// Hook for hosts that do not navigate anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNavigation;

impl NavigationHook for NoNavigation {
    fn open(&self, _request: &NavigationRequest) {}
}
