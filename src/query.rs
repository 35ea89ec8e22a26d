// src/query.rs
use crate::ballot::BallotRecorder;
use crate::error::PollError;
use crate::ledger::Ledger;
use crate::models::{
    AccountId, DateOption, PollDetail, PollId, PollSummary, TallyEntry, VoterInfo,
};
use crate::tally::TallyResolver;

/// Read-only projections for the front-end. Holds no state of its own.
#[derive(Clone)]
pub struct QueryFacade {
    ledger: Ledger,
    tally: TallyResolver,
    ballots: BallotRecorder,
}

impl QueryFacade {
    pub fn new(ledger: Ledger, tally: TallyResolver, ballots: BallotRecorder) -> Self {
        QueryFacade { ledger, tally, ballots }
    }

    pub async fn all_polls(&self) -> Result<Vec<PollSummary>, PollError> {
        self.ledger.get_all_polls().await
    }

    pub async fn poll(&self, poll_id: PollId) -> Result<PollDetail, PollError> {
        let poll = self.ledger.get_poll(poll_id).await?;
        Ok(PollDetail {
            summary: poll.summary(),
            date_options_count: poll.options.len(),
            total_votes: poll.total_votes(),
        })
    }

    pub async fn date_options(&self, poll_id: PollId) -> Result<Vec<DateOption>, PollError> {
        self.ledger.get_options(poll_id).await
    }

    pub async fn voter_info(
        &self,
        poll_id: PollId,
        voter: &AccountId,
    ) -> Result<VoterInfo, PollError> {
        self.ballots.has_voted(poll_id, voter).await
    }

    pub async fn tally(&self, poll_id: PollId) -> Result<Vec<TallyEntry>, PollError> {
        self.tally.tally(poll_id).await
    }

    pub async fn winner(&self, poll_id: PollId) -> Result<DateOption, PollError> {
        self.tally.winner(poll_id).await
    }
}
