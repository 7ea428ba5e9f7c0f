use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::{normalize, StageId, SubStageId};

/// Stable identifier of a job application as known to the applications backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job posting the application belongs to, handed to navigation on activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobReference(pub String);

/// A normalized `(stage, sub-stage)` pair. Doubles as the partition key of the board.
///
/// The fields are private so that every value in circulation has already been through
/// [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Placement {
    stage: StageId,
    sub_stage: Option<SubStageId>,
}

impl Placement {
    pub fn new(stage: StageId, sub_stage: Option<SubStageId>) -> Self {
        let (stage, sub_stage) = normalize(stage, sub_stage);
        Self { stage, sub_stage }
    }

    /// The parent stage itself, with no sub-stage.
    pub const fn stage_only(stage: StageId) -> Self {
        Self {
            stage,
            sub_stage: None,
        }
    }

    pub const fn stage(&self) -> StageId {
        self.stage
    }

    pub const fn sub_stage(&self) -> Option<SubStageId> {
        self.sub_stage
    }

    /// Every placement a card can occupy, in display order: each stage followed by its
    /// sub-stages.
    pub fn all() -> Vec<Self> {
        StageId::ordered()
            .into_iter()
            .flat_map(|stage| {
                std::iter::once(Self::stage_only(stage)).chain(
                    stage
                        .sub_stages()
                        .iter()
                        .map(move |sub_stage| Self {
                            stage,
                            sub_stage: Some(*sub_stage),
                        }),
                )
            })
            .collect()
    }

    pub fn label(&self) -> String {
        match self.sub_stage {
            Some(sub_stage) => format!("{} / {}", self.stage.label(), sub_stage.label()),
            None => self.stage.label().to_string(),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_stage {
            Some(sub_stage) => write!(f, "{}/{}", self.stage, sub_stage),
            None => write!(f, "{}", self.stage),
        }
    }
}

/// The unit the board manipulates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationCard {
    pub id: CardId,
    pub title: String,
    pub company: String,
    pub job: Option<JobReference>,
    pub placement: Placement,
    pub last_updated: DateTime<Utc>,
}

impl ApplicationCard {
    pub fn stage(&self) -> StageId {
        self.placement.stage()
    }

    pub fn sub_stage(&self) -> Option<SubStageId> {
        self.placement.sub_stage()
    }
}

/// Inbound record shape supplied by the applications backend. Stage fields are kept as
/// raw strings so that upstream drift can be coerced rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub stage: String,
    #[serde(default)]
    pub sub_stage: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Result of coercing a [`CardRecord`] into an [`ApplicationCard`].
#[derive(Debug, Clone)]
pub struct NormalizedCard {
    pub card: ApplicationCard,
    pub stage_coerced: bool,
    pub sub_stage_cleared: bool,
}

impl CardRecord {
    pub fn into_card(self) -> NormalizedCard {
        let (stage, stage_coerced) = match self.stage.parse::<StageId>() {
            Ok(stage) => (stage, false),
            Err(_) => (StageId::DEFAULT, true),
        };

        let requested_sub_stage = self
            .sub_stage
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let placement = Placement::new(stage, requested_sub_stage.and_then(SubStageId::parse));
        let sub_stage_cleared = requested_sub_stage.is_some() && placement.sub_stage().is_none();

        NormalizedCard {
            card: ApplicationCard {
                id: CardId(self.id),
                title: self.title,
                company: self.company,
                job: self.job_id.map(JobReference),
                placement,
                last_updated: self.updated_at,
            },
            stage_coerced,
            sub_stage_cleared,
        }
    }
}

impl From<&ApplicationCard> for CardRecord {
    fn from(card: &ApplicationCard) -> Self {
        Self {
            id: card.id.0.clone(),
            title: card.title.clone(),
            company: card.company.clone(),
            job_id: card.job.as_ref().map(|job| job.0.clone()),
            stage: card.stage().as_str().to_string(),
            sub_stage: card.sub_stage().map(|sub_stage| sub_stage.as_str().to_string()),
            updated_at: card.last_updated,
        }
    }
}

/// Arguments of the move-persistence call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRequest {
    pub card_id: CardId,
    pub stage: StageId,
    pub sub_stage: Option<SubStageId>,
}

impl MoveRequest {
    pub fn new(card_id: CardId, placement: Placement) -> Self {
        Self {
            card_id,
            stage: placement.stage(),
            sub_stage: placement.sub_stage(),
        }
    }

    pub fn placement(&self) -> Placement {
        Placement::new(self.stage, self.sub_stage)
    }
}

/// Immutable record of a confirmed transition, owned by the applications backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub card_id: CardId,
    pub stage: StageId,
    pub sub_stage: Option<SubStageId>,
    pub recorded_at: DateTime<Utc>,
}
