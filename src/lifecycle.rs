// src/lifecycle.rs
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ClosePolicy;
use crate::error::PollError;
use crate::ledger::Ledger;
use crate::models::{AccountId, NewPoll, OptionSpec, Poll, PollId};

pub const MAX_TITLE_CHARS: usize = 200;

/// Creates polls and closes them. A poll is open from creation and closes
/// exactly once.
#[derive(Clone)]
pub struct PollLifecycle {
    ledger: Ledger,
    policy: ClosePolicy,
    max_date_options: usize,
}

impl PollLifecycle {
    pub fn new(ledger: Ledger, policy: ClosePolicy, max_date_options: usize) -> Self {
        PollLifecycle { ledger, policy, max_date_options }
    }

    pub async fn create(
        &self,
        creator: &AccountId,
        title: &str,
        options: Vec<OptionSpec>,
        now: DateTime<Utc>,
    ) -> Result<PollId, PollError> {
        let poll = validate_new_poll(creator, title, options, self.max_date_options)?;
        let option_count = poll.options.len();
        let poll_id = self.ledger.create_poll(poll, now).await?;
        info!(poll_id, creator = %creator, option_count, "poll created");
        Ok(poll_id)
    }

    pub async fn close(&self, poll_id: PollId, requester: &AccountId) -> Result<(), PollError> {
        let policy = self.policy;
        let result = self
            .ledger
            .close_poll(poll_id, |poll| authorize_close(poll, requester, policy))
            .await;
        match &result {
            Ok(()) => info!(poll_id, requester = %requester, "poll closed"),
            Err(e) => debug!(poll_id, requester = %requester, error = %e, "close rejected"),
        }
        result
    }

    pub async fn is_creator(
        &self,
        poll_id: PollId,
        account: &AccountId,
    ) -> Result<bool, PollError> {
        let poll = self.ledger.get_poll(poll_id).await?;
        Ok(&poll.creator == account)
    }
}

/// Checks creator input and produces the record the ledger will store.
pub fn validate_new_poll(
    creator: &AccountId,
    title: &str,
    options: Vec<OptionSpec>,
    max_date_options: usize,
) -> Result<NewPoll, PollError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PollError::InvalidInput("poll title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(PollError::InvalidInput(format!(
            "poll title is longer than {MAX_TITLE_CHARS} characters"
        )));
    }
    if options.len() < 2 {
        return Err(PollError::InvalidInput("a poll needs at least 2 date options".into()));
    }
    if options.len() > max_date_options {
        return Err(PollError::InvalidInput(format!(
            "a poll takes at most {max_date_options} date options"
        )));
    }

    let mut seen = HashSet::with_capacity(options.len());
    for option in &options {
        if option.display_date.trim().is_empty() {
            return Err(PollError::InvalidInput(
                "every date option needs a display date".into(),
            ));
        }
        if !seen.insert(option.timestamp) {
            return Err(PollError::InvalidInput(format!(
                "date option {} appears more than once",
                option.timestamp.timestamp()
            )));
        }
    }

    Ok(NewPoll {
        creator: creator.clone(),
        title: title.to_string(),
        options,
    })
}

/// Runs under the ledger's write exclusion when a poll is being closed.
pub fn authorize_close(
    poll: &Poll,
    requester: &AccountId,
    policy: ClosePolicy,
) -> Result<(), PollError> {
    if !poll.active {
        return Err(PollError::AlreadyClosed(poll.id));
    }
    if policy.restrict_close_to_creator && &poll.creator != requester {
        return Err(PollError::Unauthorized(format!(
            "only the creator may close poll {}",
            poll.id
        )));
    }
    Ok(())
}
