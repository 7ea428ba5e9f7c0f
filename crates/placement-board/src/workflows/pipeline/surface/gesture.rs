use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationCard, CardId, Placement};
use super::super::stage::{StageId, SubStageId};
use super::super::store::BoardError;
use super::MoveIntent;

/// A drop zone on the board. A collapsed column is a single target for its stage; an
/// expanded column offers one target per sub-stage plus one for the bare stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DropTarget {
    pub placement: Placement,
    pub collapsed: bool,
}

impl DropTarget {
    pub fn column(stage: StageId) -> Self {
        Self {
            placement: Placement::stage_only(stage),
            collapsed: true,
        }
    }

    pub fn lane(placement: Placement) -> Self {
        Self {
            placement,
            collapsed: false,
        }
    }

    /// Whether a card currently at `placement` is already inside this target.
    pub fn contains(&self, placement: Placement) -> bool {
        if self.collapsed {
            self.placement.stage() == placement.stage()
        } else {
            self.placement == placement
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Move(MoveIntent),
    /// Dropped back into the partition it came from. Intra-partition order is not
    /// tracked, so nothing is issued.
    Reorder,
    /// Released outside any drop target.
    Cancelled,
}

/// A card picked up by a pointer or touch drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    card_id: CardId,
    origin: Placement,
}

impl DragSession {
    pub fn pick_up(card: &ApplicationCard) -> Self {
        Self {
            card_id: card.id.clone(),
            origin: card.placement,
        }
    }

    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn origin(&self) -> Placement {
        self.origin
    }

    pub fn drop_on(self, target: DropTarget) -> DropOutcome {
        if target.contains(self.origin) {
            DropOutcome::Reorder
        } else {
            DropOutcome::Move(MoveIntent::new(self.card_id, target.placement))
        }
    }

    pub fn release(self) -> DropOutcome {
        DropOutcome::Cancelled
    }
}

/// Drop target as sent by a browser client.
#[derive(Debug, Clone, Deserialize)]
pub struct DropTargetPayload {
    pub stage: String,
    #[serde(default)]
    pub sub_stage: Option<String>,
    #[serde(default)]
    pub collapsed: bool,
}

impl DropTargetPayload {
    pub fn into_target(self) -> Result<DropTarget, BoardError> {
        let stage = self.stage.parse::<StageId>()?;
        if self.collapsed {
            return Ok(DropTarget::column(stage));
        }
        let sub_stage = self.sub_stage.as_deref().and_then(SubStageId::parse);
        Ok(DropTarget::lane(Placement::new(stage, sub_stage)))
    }
}
