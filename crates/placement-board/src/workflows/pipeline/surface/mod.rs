//! Interaction surface for the pipeline board.
//!
//! Columns and lanes are rendered from the store, and both input modes (drag and the
//! per-card menu) reduce to the same [`MoveIntent`]. The surface never mutates cards; it
//! only reads the store and hands intents to the service.

pub mod gesture;
pub mod menu;
pub mod view;

use serde::Serialize;

use super::domain::{CardId, Placement};
use super::stage::{StageId, SubStageId};
use super::store::BoardError;

pub use gesture::{DragSession, DropOutcome, DropTarget, DropTargetPayload};
pub use menu::{CardMenu, MenuEntry};
pub use view::{render, BoardView, CardView, ColumnView, LaneView, ViewConfig};

/// A request to move one card to one destination, independent of how it was gestured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveIntent {
    pub card_id: CardId,
    pub destination: Placement,
}

impl MoveIntent {
    pub fn new(card_id: CardId, destination: Placement) -> Self {
        Self {
            card_id,
            destination,
        }
    }

    /// Build an intent from wire values. Unknown stages are rejected; sub-stages that are
    /// unknown or do not belong to the stage are cleared.
    pub fn parse(
        card_id: CardId,
        stage: &str,
        sub_stage: Option<&str>,
    ) -> Result<Self, BoardError> {
        let stage = stage.parse::<StageId>()?;
        let sub_stage = sub_stage.and_then(SubStageId::parse);
        Ok(Self::new(card_id, Placement::new(stage, sub_stage)))
    }
}
