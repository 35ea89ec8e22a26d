// src/ballot.rs
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::PollError;
use crate::ledger::Ledger;
use crate::models::{AccountId, OptionId, Poll, PollId, VoteReceipt, VoterInfo};

/// Validates and applies single votes: one per account per poll.
#[derive(Clone)]
pub struct BallotRecorder {
    ledger: Ledger,
}

impl BallotRecorder {
    pub fn new(ledger: Ledger) -> Self {
        BallotRecorder { ledger }
    }

    pub async fn vote(
        &self,
        poll_id: PollId,
        voter: &AccountId,
        option_id: OptionId,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt, PollError> {
        let result = self
            .ledger
            .record_vote(poll_id, voter, option_id, now, |poll, existing| {
                check_ballot(poll, existing, option_id)
            })
            .await;
        match &result {
            Ok(receipt) => info!(
                poll_id,
                option_id,
                voter = %voter,
                receipt_id = %receipt.receipt_id,
                "vote recorded"
            ),
            Err(e) => debug!(poll_id, option_id, voter = %voter, error = %e, "vote rejected"),
        }
        result
    }

    pub async fn has_voted(
        &self,
        poll_id: PollId,
        voter: &AccountId,
    ) -> Result<VoterInfo, PollError> {
        let receipt = self.ledger.receipt(poll_id, voter).await?;
        Ok(VoterInfo::from(receipt.as_ref()))
    }
}

/// Ballot rules in the order callers observe them.
pub fn check_ballot(
    poll: &Poll,
    existing: Option<&VoteReceipt>,
    option_id: OptionId,
) -> Result<(), PollError> {
    if !poll.active {
        return Err(PollError::PollClosed(poll.id));
    }
    if poll.option(option_id).is_none() {
        return Err(PollError::InvalidOption { poll_id: poll.id, option_id });
    }
    if existing.is_some() {
        return Err(PollError::AlreadyVoted);
    }
    Ok(())
}
