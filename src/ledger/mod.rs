//! Storage of record for polls, date options and vote receipts.
//!
//! Every mutation runs its caller-supplied check inside the same critical
//! section that applies the write, so a check that passes can never be
//! invalidated by a concurrent call before the write lands.

mod memory;
mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

use chrono::{DateTime, Utc};

use crate::error::PollError;
use crate::models::{
    AccountId, DateOption, NewPoll, OptionId, Poll, PollId, PollSummary, VoteReceipt,
};

#[derive(Clone)]
pub enum Ledger {
    Memory(MemoryLedger),
    Postgres(PgLedger),
}

impl Ledger {
    pub fn in_memory() -> Self {
        Ledger::Memory(MemoryLedger::default())
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Ledger::Memory(_) => "memory",
            Ledger::Postgres(_) => "postgres",
        }
    }

    /// Stores a new poll with `active = true` and zeroed counters.
    pub async fn create_poll(
        &self,
        poll: NewPoll,
        now: DateTime<Utc>,
    ) -> Result<PollId, PollError> {
        poll.check_shape()?;
        match self {
            Ledger::Memory(l) => l.create_poll(poll, now).await,
            Ledger::Postgres(l) => l.create_poll(poll, now).await,
        }
    }

    pub async fn get_poll(&self, poll_id: PollId) -> Result<Poll, PollError> {
        match self {
            Ledger::Memory(l) => l.get_poll(poll_id).await,
            Ledger::Postgres(l) => l.get_poll(poll_id).await,
        }
    }

    pub async fn get_options(&self, poll_id: PollId) -> Result<Vec<DateOption>, PollError> {
        Ok(self.get_poll(poll_id).await?.options)
    }

    /// Summaries in creation order.
    pub async fn get_all_polls(&self) -> Result<Vec<PollSummary>, PollError> {
        match self {
            Ledger::Memory(l) => l.get_all_polls().await,
            Ledger::Postgres(l) => l.get_all_polls().await,
        }
    }

    /// The voter's receipt for a poll, if any. Fails when the poll is unknown.
    pub async fn receipt(
        &self,
        poll_id: PollId,
        voter: &AccountId,
    ) -> Result<Option<VoteReceipt>, PollError> {
        match self {
            Ledger::Memory(l) => l.receipt(poll_id, voter).await,
            Ledger::Postgres(l) => l.receipt(poll_id, voter).await,
        }
    }

    /// Increments one option counter and creates one receipt, or does nothing.
    ///
    /// `check` sees the poll and the voter's existing receipt under the
    /// ledger's write exclusion.
    pub async fn record_vote<F>(
        &self,
        poll_id: PollId,
        voter: &AccountId,
        option_id: OptionId,
        now: DateTime<Utc>,
        check: F,
    ) -> Result<VoteReceipt, PollError>
    where
        F: FnOnce(&Poll, Option<&VoteReceipt>) -> Result<(), PollError> + Send,
    {
        match self {
            Ledger::Memory(l) => l.record_vote(poll_id, voter, option_id, now, check).await,
            Ledger::Postgres(l) => l.record_vote(poll_id, voter, option_id, now, check).await,
        }
    }

    /// Flips `active` to false after `check` accepts the current poll.
    pub async fn close_poll<F>(&self, poll_id: PollId, check: F) -> Result<(), PollError>
    where
        F: FnOnce(&Poll) -> Result<(), PollError> + Send,
    {
        match self {
            Ledger::Memory(l) => l.close_poll(poll_id, check).await,
            Ledger::Postgres(l) => l.close_poll(poll_id, check).await,
        }
    }
}

/// Builds the stored option list from creator input, ids in creation order.
pub(crate) fn fresh_options(poll: &NewPoll) -> Vec<DateOption> {
    poll.options
        .iter()
        .enumerate()
        .map(|(idx, spec)| DateOption {
            id: idx as OptionId,
            timestamp: spec.timestamp,
            display_date: spec.display_date.clone(),
            vote_count: 0,
        })
        .collect()
}
