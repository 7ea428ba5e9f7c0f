use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level pipeline bucket. Declaration order is the board's display order; it does not
/// imply that applications must progress through the stages linearly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Interested,
    Applied,
    Interview,
    Offer,
    Referrals,
    Accepted,
    Rejected,
}

impl StageId {
    /// Stage assigned to inbound records whose stage cannot be recognised.
    pub const DEFAULT: Self = Self::Applied;

    pub const fn ordered() -> [Self; 7] {
        [
            Self::Interested,
            Self::Applied,
            Self::Interview,
            Self::Offer,
            Self::Referrals,
            Self::Accepted,
            Self::Rejected,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interested => "interested",
            Self::Applied => "applied",
            Self::Interview => "interview",
            Self::Offer => "offer",
            Self::Referrals => "referrals",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Interested => "Interested",
            Self::Applied => "Applied",
            Self::Interview => "Interview",
            Self::Offer => "Offer",
            Self::Referrals => "Referrals",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    /// Ordered sub-stages that refine this stage; empty when the stage has none.
    pub const fn sub_stages(self) -> &'static [SubStageId] {
        match self {
            Self::Interview => &[
                SubStageId::PhoneScreening,
                SubStageId::InterviewStage,
                SubStageId::FinalInterviewStage,
            ],
            Self::Offer => &[SubStageId::Negotiation, SubStageId::OfferExtended],
            Self::Interested
            | Self::Applied
            | Self::Referrals
            | Self::Accepted
            | Self::Rejected => &[],
        }
    }

    pub const fn has_sub_stages(self) -> bool {
        !self.sub_stages().is_empty()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ordered()
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStage(value.to_string()))
    }
}

/// Finer-grained position inside the `interview` or `offer` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStageId {
    PhoneScreening,
    InterviewStage,
    FinalInterviewStage,
    Negotiation,
    OfferExtended,
}

impl SubStageId {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::PhoneScreening,
            Self::InterviewStage,
            Self::FinalInterviewStage,
            Self::Negotiation,
            Self::OfferExtended,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhoneScreening => "phone_screening",
            Self::InterviewStage => "interview_stage",
            Self::FinalInterviewStage => "final_interview_stage",
            Self::Negotiation => "negotiation",
            Self::OfferExtended => "offer_extended",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PhoneScreening => "Phone Screening",
            Self::InterviewStage => "Interview Stage",
            Self::FinalInterviewStage => "Final Interview Stage",
            Self::Negotiation => "Negotiation",
            Self::OfferExtended => "Offer Extended",
        }
    }

    /// Lenient parse used for inbound data: unrecognised values yield `None` so that
    /// `normalize` can clear them instead of rejecting the record.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ordered()
            .into_iter()
            .find(|sub_stage| sub_stage.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for SubStageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stage identifier outside the fixed set is supplied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipeline stage '{0}'")]
pub struct UnknownStage(pub String);

pub fn is_valid_stage(value: &str) -> bool {
    value.parse::<StageId>().is_ok()
}

pub fn sub_stages_of(stage: StageId) -> &'static [SubStageId] {
    stage.sub_stages()
}

/// Single authority for sub-stage validity: keeps `sub_stage` only when it belongs to
/// `stage`. Every transition and every inbound record passes through here.
pub fn normalize(
    stage: StageId,
    sub_stage: Option<SubStageId>,
) -> (StageId, Option<SubStageId>) {
    match sub_stage {
        Some(candidate) if stage.sub_stages().contains(&candidate) => (stage, Some(candidate)),
        _ => (stage, None),
    }
}
