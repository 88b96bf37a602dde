//! Background conversation assessments.
//!
//! Produced off the turn path and cached per room; the next turn reads the
//! cache (if any) to calibrate orchestration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    Casual,
    Exploring,
    Engaged,
    Philosophical,
    Confused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Building,
    Sustained,
    Shifting,
    Waning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedDepth {
    Surface,
    Moderate,
    Full,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Casual => "casual",
            UserState::Exploring => "exploring",
            UserState::Engaged => "engaged",
            UserState::Philosophical => "philosophical",
            UserState::Confused => "confused",
        }
    }
}

impl Momentum {
    pub fn as_str(&self) -> &'static str {
        match self {
            Momentum::Building => "building",
            Momentum::Sustained => "sustained",
            Momentum::Shifting => "shifting",
            Momentum::Waning => "waning",
        }
    }
}

impl SuggestedDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedDepth::Surface => "surface",
            SuggestedDepth::Moderate => "moderate",
            SuggestedDepth::Full => "full",
        }
    }
}

/// Where the user and the conversation currently stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStageAssessment {
    pub user_state: UserState,
    pub momentum: Momentum,
    pub suggested_depth: SuggestedDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLength {
    Brief,
    Moderate,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDepth {
    Surface,
    Accessible,
    Philosophical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Clarity,
    Authenticity,
    Engagement,
}

impl TargetLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLength::Brief => "brief",
            TargetLength::Moderate => "moderate",
            TargetLength::Full => "full",
        }
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Clarity => "clarity",
            Priority::Authenticity => "authenticity",
            Priority::Engagement => "engagement",
        }
    }
}

/// How the next persona responses should be shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseModulation {
    pub target_length: TargetLength,
    pub depth: ResponseDepth,
    pub max_characters: u8,
    pub priority: Priority,
}

impl ResponseModulation {
    /// Clamp `max_characters` into the valid 1..=5 range.
    pub fn clamped(mut self) -> Self {
        self.max_characters = self.max_characters.clamp(1, 5);
        self
    }
}
