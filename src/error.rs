// src/error.rs
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::election::CandidateId;
use crate::models::{OptionId, PollId};

/// Every way a poll or election operation can fail.
///
/// Failures are terminal for the call that produced them; nothing in the
/// core retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("poll {0} not found")]
    PollNotFound(PollId),

    #[error("option {option_id} does not belong to poll {poll_id}")]
    InvalidOption { poll_id: PollId, option_id: OptionId },

    #[error("poll {0} is closed")]
    PollClosed(PollId),

    #[error("voting is still active")]
    PollStillActive,

    #[error("account has already voted")]
    AlreadyVoted,

    #[error("poll {0} is already closed")]
    AlreadyClosed(PollId),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("no votes were cast")]
    NoVotesCast,

    #[error("voting has not started")]
    VotingNotStarted,

    #[error("voting has already started")]
    VotingAlreadyStarted,

    #[error("candidate {0} does not exist")]
    UnknownCandidate(CandidateId),

    #[error("election voting is closed")]
    ElectionClosed,

    #[error("election voting has already ended")]
    ElectionAlreadyEnded,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl PollError {
    /// Stable machine-readable code, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::InvalidInput(_) => "InvalidInput",
            PollError::PollNotFound(_) => "NotFound",
            PollError::InvalidOption { .. } | PollError::UnknownCandidate(_) => "InvalidOption",
            PollError::PollClosed(_) | PollError::ElectionClosed => "PollClosed",
            PollError::PollStillActive => "PollStillActive",
            PollError::AlreadyVoted => "AlreadyVoted",
            PollError::AlreadyClosed(_) | PollError::ElectionAlreadyEnded => "AlreadyClosed",
            PollError::Unauthorized(_) => "Unauthorized",
            PollError::NoVotesCast => "NoVotesCast",
            PollError::VotingNotStarted => "VotingNotStarted",
            PollError::VotingAlreadyStarted => "VotingAlreadyStarted",
            PollError::Storage(_) => "Storage",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PollError::InvalidInput(_)
            | PollError::InvalidOption { .. }
            | PollError::UnknownCandidate(_) => StatusCode::BAD_REQUEST,
            PollError::Unauthorized(_) => StatusCode::FORBIDDEN,
            PollError::PollNotFound(_) => StatusCode::NOT_FOUND,
            PollError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::CONFLICT,
        }
    }
}

impl From<sqlx::Error> for PollError {
    fn from(e: sqlx::Error) -> Self {
        PollError::Storage(e.to_string())
    }
}

impl From<JsonRejection> for PollError {
    fn from(rejection: JsonRejection) -> Self {
        PollError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for PollError {
    fn from(rejection: PathRejection) -> Self {
        PollError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        if let PollError::Storage(ref msg) = self {
            tracing::error!(error = %msg, "ledger backend failure");
        }
        let body = json!({ "error": self.to_string(), "kind": self.kind() });
        (self.status(), Json(body)).into_response()
    }
}
