// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PollError;

pub type PollId = u64;
pub type OptionId = u32;

/// Account identity, normalised so that comparisons ignore case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> Result<Self, PollError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PollError::Unauthorized("missing account identity".into()));
        }
        Ok(AccountId(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOption {
    pub id: OptionId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Rendered once by the creator and stored verbatim.
    pub display_date: String,
    pub vote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub creator: AccountId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub options: Vec<DateOption>,
}

impl Poll {
    pub fn option(&self, option_id: OptionId) -> Option<&DateOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.vote_count).sum()
    }

    pub fn summary(&self) -> PollSummary {
        PollSummary {
            id: self.id,
            title: self.title.clone(),
            creator: self.creator.clone(),
            created_at: self.created_at,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: PollId,
    pub title: String,
    pub creator: AccountId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

/// Poll header as returned by `getPoll`, without the option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    #[serde(flatten)]
    pub summary: PollSummary,
    pub date_options_count: usize,
    pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub receipt_id: Uuid,
    pub poll_id: PollId,
    pub voter: AccountId,
    pub chosen_option_id: OptionId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterInfo {
    pub has_voted: bool,
    pub chosen_option_id: Option<OptionId>,
}

impl From<Option<&VoteReceipt>> for VoterInfo {
    fn from(receipt: Option<&VoteReceipt>) -> Self {
        VoterInfo {
            has_voted: receipt.is_some(),
            chosen_option_id: receipt.map(|r| r.chosen_option_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyEntry {
    pub option_id: OptionId,
    pub vote_count: u64,
}

/// One date option as submitted by a poll creator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub display_date: String,
}

/// A validated poll waiting to be written to the ledger.
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub creator: AccountId,
    pub title: String,
    pub options: Vec<OptionSpec>,
}

impl NewPoll {
    /// Minimum shape every stored poll must have.
    pub fn check_shape(&self) -> Result<(), PollError> {
        if self.title.trim().is_empty() {
            return Err(PollError::InvalidInput("poll title must not be empty".into()));
        }
        if self.options.len() < 2 {
            return Err(PollError::InvalidInput(
                "a poll needs at least 2 date options".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: String,
    pub options: Vec<OptionSpec>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: OptionId,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollResponse {
    pub poll_id: PollId,
}
