use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{ApplicationCard, CardId, CardRecord, MoveRequest, Placement};
use super::repository::FailureNotice;
use super::stage::{StageId, SubStageId, UnknownStage};

/// Per-card position in the optimistic move state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Stable,
    /// A move has been applied locally and awaits confirmation. Carries everything needed
    /// to roll the card back without consulting any other state.
    Pending {
        prior: Placement,
        prior_updated: DateTime<Utc>,
    },
}

impl CardState {
    pub const fn is_pending(&self) -> bool {
        matches!(self, CardState::Pending { .. })
    }
}

#[derive(Debug, Clone)]
struct CardSlot {
    card: ApplicationCard,
    state: CardState,
}

/// Handle for an in-flight move, returned by [`BoardStore::begin_move`] and consumed when
/// the persistence call resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTicket {
    request: MoveRequest,
    prior: Placement,
}

impl MoveTicket {
    pub fn request(&self) -> &MoveRequest {
        &self.request
    }

    pub fn card_id(&self) -> &CardId {
        &self.request.card_id
    }

    pub fn target(&self) -> Placement {
        self.request.placement()
    }

    pub fn prior(&self) -> Placement {
        self.prior
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveStart {
    Started(MoveTicket),
    /// The card already has a move in flight; the request was dropped.
    AlreadyPending,
}

/// Final effect of a move request on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Confirmed(ApplicationCard),
    RolledBack {
        card: ApplicationCard,
        notice: FailureNotice,
    },
    Ignored(CardId),
    /// The card left the board, or lost its pending state, before the move resolved.
    Stale(CardId),
}

impl MoveOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            MoveOutcome::Confirmed(_) => "confirmed",
            MoveOutcome::RolledBack { .. } => "rolled_back",
            MoveOutcome::Ignored(_) => "ignored",
            MoveOutcome::Stale(_) => "stale",
        }
    }
}

/// Synchronous rejection of a malformed move request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("card '{0}' is not on the board")]
    UnknownCard(CardId),
    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub generation: u64,
    pub loaded: usize,
    pub coerced_stage: Vec<CardId>,
    pub cleared_sub_stage: Vec<CardId>,
    pub duplicates: Vec<CardId>,
    /// Cards whose move was still in flight and stayed pending across the reload.
    pub kept_pending: Vec<CardId>,
}

/// Cards grouped by placement. Derived from the card list on demand and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    partitions: BTreeMap<Placement, Vec<CardId>>,
}

impl BoardSnapshot {
    pub fn from_cards<'a>(cards: impl IntoIterator<Item = &'a ApplicationCard>) -> Self {
        let mut partitions: BTreeMap<Placement, Vec<CardId>> = BTreeMap::new();
        for card in cards {
            partitions
                .entry(card.placement)
                .or_default()
                .push(card.id.clone());
        }
        Self { partitions }
    }

    pub fn partition(&self, placement: &Placement) -> &[CardId] {
        self.partitions
            .get(placement)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn partitions(&self) -> impl Iterator<Item = (&Placement, &[CardId])> {
        self.partitions
            .iter()
            .map(|(placement, ids)| (placement, ids.as_slice()))
    }

    /// Every partition holding `card_id`. A well-formed snapshot yields exactly one.
    pub fn placements_of(&self, card_id: &CardId) -> Vec<Placement> {
        self.partitions
            .iter()
            .filter(|(_, ids)| ids.contains(card_id))
            .map(|(placement, _)| *placement)
            .collect()
    }
}

/// In-memory board state: the ordered card list plus an id index into it.
#[derive(Debug, Default)]
pub struct BoardStore {
    slots: Vec<CardSlot>,
    index: HashMap<CardId, usize>,
    generation: u64,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board wholesale with the supplied records. Malformed stages are coerced
    /// to the default stage and duplicate ids keep their first occurrence.
    ///
    /// A card with a move in flight stays pending at its optimistic placement. The reloaded
    /// record becomes the placement a failed move rolls back to.
    pub fn load(&mut self, records: Vec<CardRecord>) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut slots = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut in_flight: HashMap<CardId, (Placement, DateTime<Utc>)> = self
            .slots
            .iter()
            .filter(|slot| slot.state.is_pending())
            .map(|slot| {
                (
                    slot.card.id.clone(),
                    (slot.card.placement, slot.card.last_updated),
                )
            })
            .collect();

        for record in records {
            let normalized = record.into_card();
            let mut card = normalized.card;

            if index.contains_key(&card.id) {
                warn!(card_id = %card.id, "dropping duplicate card id on load");
                summary.duplicates.push(card.id);
                continue;
            }
            if normalized.stage_coerced {
                warn!(card_id = %card.id, default = %StageId::DEFAULT, "coerced unknown stage");
                summary.coerced_stage.push(card.id.clone());
            }
            if normalized.sub_stage_cleared {
                debug!(card_id = %card.id, stage = %card.stage(), "cleared inapplicable sub-stage");
                summary.cleared_sub_stage.push(card.id.clone());
            }

            let mut state = CardState::Stable;
            if let Some((optimistic, optimistic_updated)) = in_flight.remove(&card.id) {
                debug!(
                    card_id = %card.id,
                    stored = %card.placement,
                    "kept in-flight move across reload"
                );
                state = CardState::Pending {
                    prior: card.placement,
                    prior_updated: card.last_updated,
                };
                card.placement = optimistic;
                card.last_updated = optimistic_updated;
                summary.kept_pending.push(card.id.clone());
            }

            index.insert(card.id.clone(), slots.len());
            slots.push(CardSlot { card, state });
        }

        for card_id in in_flight.keys() {
            warn!(card_id = %card_id, "card with a move in flight left the board on reload");
        }

        self.slots = slots;
        self.index = index;
        self.generation += 1;

        summary.generation = self.generation;
        summary.loaded = self.slots.len();
        info!(
            generation = summary.generation,
            loaded = summary.loaded,
            coerced = summary.coerced_stage.len(),
            kept_pending = summary.kept_pending.len(),
            duplicates = summary.duplicates.len(),
            "pipeline board loaded"
        );
        summary
    }

    /// Apply a move optimistically and mark the card pending. The caller owns the returned
    /// ticket and must hand it back to [`BoardStore::confirm`] or [`BoardStore::fail`].
    pub fn begin_move(
        &mut self,
        card_id: &CardId,
        stage: StageId,
        sub_stage: Option<SubStageId>,
        now: DateTime<Utc>,
    ) -> Result<MoveStart, BoardError> {
        let slot = self.slot_mut(card_id)?;

        if slot.state.is_pending() {
            warn!(card_id = %card_id, "ignoring move request for card with a move in flight");
            return Ok(MoveStart::AlreadyPending);
        }

        let target = Placement::new(stage, sub_stage);
        let prior = slot.card.placement;
        slot.state = CardState::Pending {
            prior,
            prior_updated: slot.card.last_updated,
        };
        slot.card.placement = target;
        slot.card.last_updated = now;

        debug!(card_id = %card_id, from = %prior, to = %target, "applied optimistic move");
        Ok(MoveStart::Started(MoveTicket {
            request: MoveRequest::new(card_id.clone(), target),
            prior,
        }))
    }

    /// Persistence succeeded: keep the optimistic placement and return the card to stable.
    pub fn confirm(&mut self, ticket: &MoveTicket) -> MoveOutcome {
        let Some(slot) = self.pending_slot(ticket) else {
            return MoveOutcome::Stale(ticket.card_id().clone());
        };

        slot.state = CardState::Stable;
        debug!(card_id = %ticket.card_id(), placement = %slot.card.placement, "move confirmed");
        MoveOutcome::Confirmed(slot.card.clone())
    }

    /// Persistence failed: restore the values captured when the move began, or the stored
    /// values of the latest reload if one happened while the move was in flight.
    pub fn fail(&mut self, ticket: &MoveTicket, reason: &str) -> MoveOutcome {
        let Some(slot) = self.pending_slot(ticket) else {
            return MoveOutcome::Stale(ticket.card_id().clone());
        };

        if let CardState::Pending {
            prior,
            prior_updated,
        } = slot.state
        {
            slot.card.placement = prior;
            slot.card.last_updated = prior_updated;
        }
        slot.state = CardState::Stable;

        let notice = FailureNotice::for_move(&slot.card, ticket.target(), reason);
        warn!(
            card_id = %ticket.card_id(),
            attempted = %ticket.target(),
            restored = %slot.card.placement,
            reason,
            "move failed; rolled back"
        );
        MoveOutcome::RolledBack {
            card: slot.card.clone(),
            notice,
        }
    }

    /// Cards of one partition in load order.
    pub fn query(&self, stage: StageId, sub_stage: Option<SubStageId>) -> Vec<&ApplicationCard> {
        self.cards()
            .filter(|card| card.stage() == stage && card.sub_stage() == sub_stage)
            .collect()
    }

    /// Every card of a stage regardless of sub-stage, in load order.
    pub fn query_stage(&self, stage: StageId) -> Vec<&ApplicationCard> {
        self.cards().filter(|card| card.stage() == stage).collect()
    }

    pub fn card(&self, card_id: &CardId) -> Option<&ApplicationCard> {
        self.index.get(card_id).map(|&position| &self.slots[position].card)
    }

    pub fn state(&self, card_id: &CardId) -> Option<CardState> {
        self.index
            .get(card_id)
            .map(|&position| self.slots[position].state)
    }

    pub fn is_pending(&self, card_id: &CardId) -> bool {
        self.state(card_id)
            .map(|state| state.is_pending())
            .unwrap_or(false)
    }

    pub fn cards(&self) -> impl Iterator<Item = &ApplicationCard> {
        self.slots.iter().map(|slot| &slot.card)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::from_cards(self.cards())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, card_id: &CardId) -> Result<&mut CardSlot, BoardError> {
        let position = *self
            .index
            .get(card_id)
            .ok_or_else(|| BoardError::UnknownCard(card_id.clone()))?;
        Ok(&mut self.slots[position])
    }

    fn pending_slot(&mut self, ticket: &MoveTicket) -> Option<&mut CardSlot> {
        let target = ticket.target();
        let Ok(slot) = self.slot_mut(ticket.card_id()) else {
            warn!(
                card_id = %ticket.card_id(),
                "discarding resolution for card no longer on the board"
            );
            return None;
        };
        if slot.state.is_pending() && slot.card.placement == target {
            Some(slot)
        } else {
            warn!(
                card_id = %ticket.card_id(),
                "discarding resolution for card without matching move"
            );
            None
        }
    }
}
