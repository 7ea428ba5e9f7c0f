use serde::Serialize;

use super::super::domain::{ApplicationCard, CardId, Placement};
use super::MoveIntent;

/// Discrete alternative to dragging: every reachable destination except the card's
/// current one. Selecting an entry yields the same intent a drag onto that lane would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardMenu {
    pub card_id: CardId,
    pub current: Placement,
    pub pending: bool,
    pub entries: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub destination: Placement,
    pub label: String,
}

impl CardMenu {
    pub fn for_card(card: &ApplicationCard, pending: bool) -> Self {
        let entries = Placement::all()
            .into_iter()
            .filter(|destination| *destination != card.placement)
            .map(|destination| MenuEntry {
                label: destination.label(),
                destination,
            })
            .collect();

        Self {
            card_id: card.id.clone(),
            current: card.placement,
            pending,
            entries,
        }
    }

    /// Intent for a listed destination; `None` when the destination is not offered.
    pub fn select(&self, destination: Placement) -> Option<MoveIntent> {
        self.entries
            .iter()
            .find(|entry| entry.destination == destination)
            .map(|entry| MoveIntent::new(self.card_id.clone(), entry.destination))
    }
}
