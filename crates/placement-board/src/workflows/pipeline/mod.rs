//! Application pipeline board.
//!
//! Cards move between seven stages (two of which carry sub-stages). Moves are applied to
//! the in-memory board immediately, persisted through [`PipelineRepository`], and rolled
//! back with a user-facing alert when persistence fails. A card with a move in flight
//! ignores further move requests until that move resolves.

pub mod domain;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;
pub mod stage;
pub mod store;
pub mod surface;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationCard, CardId, CardRecord, JobReference, MoveRequest, NormalizedCard, Placement,
    StageHistoryEntry,
};
pub use repository::{
    AlertError, FailureNotice, FailureNotifier, NavigationHook, NavigationRequest, NoNavigation,
    PipelineRepository, RepositoryError,
};
pub use router::pipeline_router;
pub use seed::{read_seed, read_seed_file, SeedError};
pub use service::{BoardServiceError, PipelineBoardService};
pub use stage::{is_valid_stage, normalize, sub_stages_of, StageId, SubStageId, UnknownStage};
pub use store::{
    BoardError, BoardSnapshot, BoardStore, CardState, LoadSummary, MoveOutcome, MoveStart,
    MoveTicket,
};
pub use surface::{
    BoardView, CardMenu, CardView, ColumnView, DragSession, DropOutcome, DropTarget, LaneView,
    MenuEntry, MoveIntent, ViewConfig,
};
