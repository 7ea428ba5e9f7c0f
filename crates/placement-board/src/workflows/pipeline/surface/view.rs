use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::super::domain::{ApplicationCard, CardId, JobReference, Placement};
use super::super::stage::{StageId, SubStageId};
use super::super::store::BoardStore;
use super::gesture::DropTarget;

/// View-only configuration: which columns are expanded into sub-stage lanes and which
/// single column is shown on narrow screens. Never persisted and never consulted by the
/// store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewConfig {
    expanded: BTreeSet<StageId>,
    focus: Option<StageId>,
}

impl ViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient constructor for query-string input: unknown stage names are skipped.
    pub fn from_query(expanded: Option<&str>, focus: Option<&str>) -> Self {
        let mut config = Self::default();
        for name in expanded.unwrap_or_default().split(',') {
            if let Ok(stage) = name.parse::<StageId>() {
                config.expand(stage);
            }
        }
        config.focus = focus.and_then(|name| name.parse::<StageId>().ok());
        config
    }

    /// Flip a column between the flat list and per-sub-stage lanes. Columns without
    /// sub-stages cannot expand. Returns the new expanded state.
    pub fn toggle(&mut self, stage: StageId) -> bool {
        if !stage.has_sub_stages() {
            return false;
        }
        if !self.expanded.remove(&stage) {
            self.expanded.insert(stage);
        }
        self.is_expanded(stage)
    }

    pub fn expand(&mut self, stage: StageId) {
        if stage.has_sub_stages() {
            self.expanded.insert(stage);
        }
    }

    pub fn collapse(&mut self, stage: StageId) {
        self.expanded.remove(&stage);
    }

    pub fn is_expanded(&self, stage: StageId) -> bool {
        self.expanded.contains(&stage)
    }

    pub fn focus(&mut self, stage: StageId) {
        self.focus = Some(stage);
    }

    pub fn unfocus(&mut self) {
        self.focus = None;
    }

    pub fn focused(&self) -> Option<StageId> {
        self.focus
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
    pub total_cards: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub stage: StageId,
    pub label: &'static str,
    pub count: usize,
    pub expandable: bool,
    pub expanded: bool,
    pub lanes: Vec<LaneView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaneView {
    pub target: DropTarget,
    pub label: String,
    pub count: usize,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub id: CardId,
    pub title: String,
    pub company: String,
    pub job: Option<JobReference>,
    pub stage: StageId,
    pub sub_stage: Option<SubStageId>,
    pub sub_stage_label: Option<&'static str>,
    pub last_updated: DateTime<Utc>,
    pub pending: bool,
}

impl CardView {
    fn from_card(card: &ApplicationCard, pending: bool) -> Self {
        Self {
            id: card.id.clone(),
            title: card.title.clone(),
            company: card.company.clone(),
            job: card.job.clone(),
            stage: card.stage(),
            sub_stage: card.sub_stage(),
            sub_stage_label: card.sub_stage().map(SubStageId::label),
            last_updated: card.last_updated,
            pending,
        }
    }

    /// Pending cards render dimmed and do not offer drag or menu affordances.
    pub fn interactive(&self) -> bool {
        !self.pending
    }
}

pub fn render(store: &BoardStore, config: &ViewConfig) -> BoardView {
    let columns = StageId::ordered()
        .into_iter()
        .filter(|stage| config.focused().map_or(true, |focus| focus == *stage))
        .map(|stage| render_column(store, config, stage))
        .collect();

    BoardView {
        columns,
        total_cards: store.len(),
    }
}

fn render_column(store: &BoardStore, config: &ViewConfig, stage: StageId) -> ColumnView {
    let card_view = |card: &&ApplicationCard| CardView::from_card(card, store.is_pending(&card.id));
    let expanded = config.is_expanded(stage);

    let lanes = if expanded {
        std::iter::once(None)
            .chain(stage.sub_stages().iter().copied().map(Some))
            .map(|sub_stage| {
                let cards: Vec<CardView> =
                    store.query(stage, sub_stage).iter().map(card_view).collect();
                LaneView {
                    target: DropTarget::lane(Placement::new(stage, sub_stage)),
                    label: sub_stage
                        .map(|sub_stage| sub_stage.label().to_string())
                        .unwrap_or_else(|| format!("{} (no sub-stage)", stage.label())),
                    count: cards.len(),
                    cards,
                }
            })
            .collect()
    } else {
        let cards: Vec<CardView> = store.query_stage(stage).iter().map(card_view).collect();
        vec![LaneView {
            target: DropTarget::column(stage),
            label: stage.label().to_string(),
            count: cards.len(),
            cards,
        }]
    };

    ColumnView {
        stage,
        label: stage.label(),
        count: lanes.iter().map(|lane| lane.count).sum(),
        expandable: stage.has_sub_stages(),
        expanded,
        lanes,
    }
}
