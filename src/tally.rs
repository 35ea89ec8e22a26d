// src/tally.rs
use std::str::FromStr;

use crate::error::PollError;
use crate::ledger::Ledger;
use crate::models::{DateOption, Poll, PollId, TallyEntry};

/// How a tie for the highest vote count is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Lowest option id, i.e. the option created first.
    #[default]
    EarliestOption,
    /// Smallest timestamp; lowest id when timestamps are equal.
    EarliestDate,
}

impl TieBreak {
    fn rank(self, option: &DateOption) -> (i64, u32) {
        match self {
            TieBreak::EarliestOption => (0, option.id),
            TieBreak::EarliestDate => (option.timestamp.timestamp(), option.id),
        }
    }
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earliest-option" | "earliest_option" => Ok(TieBreak::EarliestOption),
            "earliest-date" | "earliest_date" => Ok(TieBreak::EarliestDate),
            other => Err(format!("unknown tie-break {other:?}")),
        }
    }
}

/// Highest count wins, `rank` orders the tied entries. Zero votes everywhere
/// means there is no winner.
pub fn pick_winner<'a, T, V, R, K>(entries: &'a [T], votes: V, rank: R) -> Result<&'a T, PollError>
where
    V: Fn(&T) -> u64,
    R: Fn(&T) -> K,
    K: Ord,
{
    let best = entries.iter().map(&votes).max().unwrap_or(0);
    if best == 0 {
        return Err(PollError::NoVotesCast);
    }
    entries
        .iter()
        .filter(|e| votes(*e) == best)
        .min_by_key(|e| rank(*e))
        .ok_or(PollError::NoVotesCast)
}

pub fn standings(poll: &Poll) -> Vec<TallyEntry> {
    poll.options
        .iter()
        .map(|o| TallyEntry { option_id: o.id, vote_count: o.vote_count })
        .collect()
}

pub fn winner_of(poll: &Poll, tie_break: TieBreak) -> Result<DateOption, PollError> {
    if poll.active {
        return Err(PollError::PollStillActive);
    }
    pick_winner(&poll.options, |o| o.vote_count, |o| tie_break.rank(o)).cloned()
}

#[derive(Clone)]
pub struct TallyResolver {
    ledger: Ledger,
    tie_break: TieBreak,
}

impl TallyResolver {
    pub fn new(ledger: Ledger, tie_break: TieBreak) -> Self {
        TallyResolver { ledger, tie_break }
    }

    /// Counts in option creation order, not sorted by count.
    pub async fn tally(&self, poll_id: PollId) -> Result<Vec<TallyEntry>, PollError> {
        let poll = self.ledger.get_poll(poll_id).await?;
        Ok(standings(&poll))
    }

    pub async fn winner(&self, poll_id: PollId) -> Result<DateOption, PollError> {
        let poll = self.ledger.get_poll(poll_id).await?;
        winner_of(&poll, self.tie_break)
    }
}
