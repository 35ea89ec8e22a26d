use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PollError;
use crate::ledger::fresh_options;
use crate::models::{
    AccountId, NewPoll, OptionId, Poll, PollId, PollSummary, VoteReceipt,
};

#[derive(Default)]
struct LedgerState {
    last_id: PollId,
    polls: BTreeMap<PollId, Poll>,
    receipts: HashMap<(PollId, AccountId), VoteReceipt>,
}

/// Whole-ledger reader/writer lock: one mutation at a time, reads share.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    pub(super) async fn create_poll(
        &self,
        poll: NewPoll,
        now: DateTime<Utc>,
    ) -> Result<PollId, PollError> {
        let mut state = self.state.write().await;
        let id = state.last_id + 1;
        let options = fresh_options(&poll);
        state.polls.insert(
            id,
            Poll {
                id,
                title: poll.title,
                creator: poll.creator,
                created_at: now,
                active: true,
                options,
            },
        );
        state.last_id = id;
        Ok(id)
    }

    pub(super) async fn get_poll(&self, poll_id: PollId) -> Result<Poll, PollError> {
        let state = self.state.read().await;
        state
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or(PollError::PollNotFound(poll_id))
    }

    pub(super) async fn get_all_polls(&self) -> Result<Vec<PollSummary>, PollError> {
        let state = self.state.read().await;
        Ok(state.polls.values().map(Poll::summary).collect())
    }

    pub(super) async fn receipt(
        &self,
        poll_id: PollId,
        voter: &AccountId,
    ) -> Result<Option<VoteReceipt>, PollError> {
        let state = self.state.read().await;
        if !state.polls.contains_key(&poll_id) {
            return Err(PollError::PollNotFound(poll_id));
        }
        Ok(state.receipts.get(&(poll_id, voter.clone())).cloned())
    }

    pub(super) async fn record_vote<F>(
        &self,
        poll_id: PollId,
        voter: &AccountId,
        option_id: OptionId,
        now: DateTime<Utc>,
        check: F,
    ) -> Result<VoteReceipt, PollError>
    where
        F: FnOnce(&Poll, Option<&VoteReceipt>) -> Result<(), PollError>,
    {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let key = (poll_id, voter.clone());

        let poll = state
            .polls
            .get_mut(&poll_id)
            .ok_or(PollError::PollNotFound(poll_id))?;
        check(&*poll, state.receipts.get(&key))?;

        // Nothing is written until both halves of the vote are known to apply.
        if state.receipts.contains_key(&key) {
            return Err(PollError::AlreadyVoted);
        }
        let option = poll
            .options
            .iter_mut()
            .find(|o| o.id == option_id)
            .ok_or(PollError::InvalidOption { poll_id, option_id })?;

        option.vote_count += 1;
        let receipt = VoteReceipt {
            receipt_id: Uuid::new_v4(),
            poll_id,
            voter: voter.clone(),
            chosen_option_id: option_id,
            cast_at: now,
        };
        state.receipts.insert(key, receipt.clone());
        Ok(receipt)
    }

    pub(super) async fn close_poll<F>(&self, poll_id: PollId, check: F) -> Result<(), PollError>
    where
        F: FnOnce(&Poll) -> Result<(), PollError>,
    {
        let mut state = self.state.write().await;
        let poll = state
            .polls
            .get_mut(&poll_id)
            .ok_or(PollError::PollNotFound(poll_id))?;
        check(&*poll)?;
        if !poll.active {
            return Err(PollError::AlreadyClosed(poll_id));
        }
        poll.active = false;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn receipt_count(&self, poll_id: PollId) -> usize {
        let state = self.state.read().await;
        state.receipts.keys().filter(|(id, _)| *id == poll_id).count()
    }
}
