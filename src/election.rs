// src/election.rs
//! The single implicit election: add candidates, start a timed vote, end it,
//! read the winner. Voting also expires on its own at `start + duration`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::PollError;
use crate::lifecycle::MAX_TITLE_CHARS;
use crate::models::{AccountId, VoterInfo};
use crate::tally::pick_winner;

pub type CandidateId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionStatus {
    pub started: bool,
    pub ended: bool,
    pub active: bool,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub now: DateTime<Utc>,
    pub remaining_seconds: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCandidateRequest {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVotingRequest {
    pub duration_minutes: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionVoteRequest {
    pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Copy)]
struct VotingWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Default)]
struct ElectionState {
    candidates: Vec<Candidate>,
    window: Option<VotingWindow>,
    ended: bool,
    receipts: HashMap<AccountId, CandidateId>,
}

impl ElectionState {
    fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.window {
            Some(w) => !self.ended && now < w.end,
            None => false,
        }
    }

    fn status(&self, now: DateTime<Utc>) -> ElectionStatus {
        let active = self.is_active(now);
        ElectionStatus {
            started: self.window.is_some(),
            ended: self.ended,
            active,
            start_time: self.window.map(|w| w.start),
            end_time: self.window.map(|w| w.end),
            now,
            remaining_seconds: match self.window {
                Some(w) if active => (w.end - now).num_seconds().max(0),
                _ => 0,
            },
        }
    }
}

#[derive(Clone)]
pub struct Election {
    state: Arc<RwLock<ElectionState>>,
    admin: Option<AccountId>,
}

impl Election {
    /// `admin`, when set, is the only account allowed to administer the election.
    pub fn new(admin: Option<AccountId>) -> Self {
        Election {
            state: Arc::new(RwLock::new(ElectionState::default())),
            admin,
        }
    }

    fn authorize(&self, caller: &AccountId) -> Result<(), PollError> {
        match &self.admin {
            Some(admin) if admin != caller => Err(PollError::Unauthorized(
                "only the election admin may do this".into(),
            )),
            _ => Ok(()),
        }
    }

    pub async fn add_candidate(
        &self,
        caller: &AccountId,
        name: &str,
    ) -> Result<Candidate, PollError> {
        self.authorize(caller)?;
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_TITLE_CHARS {
            return Err(PollError::InvalidInput(
                "candidate name is empty or too long".into(),
            ));
        }

        let mut state = self.state.write().await;
        if state.window.is_some() {
            return Err(PollError::VotingAlreadyStarted);
        }
        let candidate = Candidate {
            id: state.candidates.len() as CandidateId,
            name: name.to_string(),
            vote_count: 0,
        };
        state.candidates.push(candidate.clone());
        info!(candidate_id = candidate.id, name = %candidate.name, "candidate added");
        Ok(candidate)
    }

    pub async fn start_voting(
        &self,
        caller: &AccountId,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<ElectionStatus, PollError> {
        self.authorize(caller)?;
        if duration_minutes == 0 {
            return Err(PollError::InvalidInput(
                "voting duration must be positive".into(),
            ));
        }

        let mut state = self.state.write().await;
        if state.window.is_some() {
            return Err(PollError::VotingAlreadyStarted);
        }
        if state.candidates.len() < 2 {
            return Err(PollError::InvalidInput(
                "an election needs at least 2 candidates".into(),
            ));
        }
        let end = now
            .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
            .ok_or_else(|| PollError::InvalidInput("voting duration is out of range".into()))?;
        state.window = Some(VotingWindow { start: now, end });
        info!(duration_minutes, end_time = %end, "election voting started");
        Ok(state.status(now))
    }

    pub async fn end_voting(
        &self,
        caller: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<ElectionStatus, PollError> {
        self.authorize(caller)?;
        let mut state = self.state.write().await;
        if state.window.is_none() {
            return Err(PollError::VotingNotStarted);
        }
        if state.ended {
            return Err(PollError::ElectionAlreadyEnded);
        }
        state.ended = true;
        info!("election voting ended");
        Ok(state.status(now))
    }

    pub async fn vote(
        &self,
        voter: &AccountId,
        candidate_id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<(), PollError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.window.is_none() {
            return Err(PollError::VotingNotStarted);
        }
        if !state.is_active(now) {
            return Err(PollError::ElectionClosed);
        }
        let Some(candidate) = state.candidates.get_mut(candidate_id as usize) else {
            debug!(candidate_id, voter = %voter, "vote for unknown candidate");
            return Err(PollError::UnknownCandidate(candidate_id));
        };
        if state.receipts.contains_key(voter) {
            return Err(PollError::AlreadyVoted);
        }

        candidate.vote_count += 1;
        state.receipts.insert(voter.clone(), candidate_id);
        info!(candidate_id, voter = %voter, "election vote recorded");
        Ok(())
    }

    /// Ties go to the candidate added first.
    pub async fn winner(&self, now: DateTime<Utc>) -> Result<Candidate, PollError> {
        let state = self.state.read().await;
        if state.window.is_none() {
            return Err(PollError::VotingNotStarted);
        }
        if state.is_active(now) {
            return Err(PollError::PollStillActive);
        }
        pick_winner(&state.candidates, |c| c.vote_count, |c| c.id).cloned()
    }

    pub async fn status(&self, now: DateTime<Utc>) -> ElectionStatus {
        self.state.read().await.status(now)
    }

    pub async fn candidates(&self) -> Vec<Candidate> {
        self.state.read().await.candidates.clone()
    }

    pub async fn voter_info(&self, voter: &AccountId) -> VoterInfo {
        let state = self.state.read().await;
        let chosen = state.receipts.get(voter).copied();
        VoterInfo { has_voted: chosen.is_some(), chosen_option_id: chosen }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::account;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_705_327_200, 0).unwrap()
    }

    async fn running(admin: Option<AccountId>) -> Election {
        let election = Election::new(admin);
        let caller = account("0xadmin");
        election.add_candidate(&caller, "Alice").await.unwrap();
        election.add_candidate(&caller, "Bob").await.unwrap();
        election.start_voting(&caller, 60, t0()).await.unwrap();
        election
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let election = running(None).await;
        let admin = account("0xadmin");

        election.vote(&account("0x1"), 1, t0()).await.unwrap();
        election.vote(&account("0x2"), 1, t0()).await.unwrap();
        election.vote(&account("0x3"), 0, t0()).await.unwrap();
        assert_eq!(
            election.vote(&account("0x1"), 0, t0()).await.unwrap_err(),
            PollError::AlreadyVoted
        );
        assert_eq!(election.winner(t0()).await.unwrap_err(), PollError::PollStillActive);

        election.end_voting(&admin, t0()).await.unwrap();
        assert_eq!(
            election.end_voting(&admin, t0()).await.unwrap_err(),
            PollError::ElectionAlreadyEnded
        );
        assert_eq!(
            election.vote(&account("0x4"), 0, t0()).await.unwrap_err(),
            PollError::ElectionClosed
        );

        let winner = election.winner(t0()).await.unwrap();
        assert_eq!((winner.name.as_str(), winner.vote_count), ("Bob", 2));
        assert_eq!(election.voter_info(&account("0x3")).await.chosen_option_id, Some(0));
    }

    #[tokio::test]
    async fn voting_expires_without_an_explicit_end() {
        let election = running(None).await;
        let just_before = t0() + Duration::minutes(59);
        let at_end = t0() + Duration::minutes(60);

        let status = election.status(just_before).await;
        assert!(status.active);
        assert_eq!(status.remaining_seconds, 60);
        election.vote(&account("0x1"), 0, just_before).await.unwrap();

        let status = election.status(at_end).await;
        assert!(status.started && !status.active && !status.ended);
        assert_eq!(status.end_time, Some(at_end));
        assert_eq!(
            election.vote(&account("0x2"), 1, at_end).await.unwrap_err(),
            PollError::ElectionClosed
        );
        assert_eq!(election.winner(at_end).await.unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn setup_rules() {
        let election = Election::new(Some(account("0xadmin")));
        let admin = account("0xadmin");
        let now = t0();

        assert!(matches!(
            election.add_candidate(&account("0xother"), "Mallory").await,
            Err(PollError::Unauthorized(_))
        ));
        assert!(matches!(
            election.add_candidate(&admin, "  ").await,
            Err(PollError::InvalidInput(_))
        ));
        assert_eq!(
            election.end_voting(&admin, now).await.unwrap_err(),
            PollError::VotingNotStarted
        );
        assert_eq!(
            election.vote(&account("0x1"), 0, now).await.unwrap_err(),
            PollError::VotingNotStarted
        );
        assert_eq!(election.winner(now).await.unwrap_err(), PollError::VotingNotStarted);

        election.add_candidate(&admin, "Alice").await.unwrap();
        assert!(matches!(
            election.start_voting(&admin, 10, now).await,
            Err(PollError::InvalidInput(_))
        ));
        election.add_candidate(&admin, "Bob").await.unwrap();
        assert!(matches!(
            election.start_voting(&admin, 0, now).await,
            Err(PollError::InvalidInput(_))
        ));
        election.start_voting(&admin, 10, now).await.unwrap();

        assert_eq!(
            election.start_voting(&admin, 10, now).await.unwrap_err(),
            PollError::VotingAlreadyStarted
        );
        assert_eq!(
            election.add_candidate(&admin, "Carol").await.unwrap_err(),
            PollError::VotingAlreadyStarted
        );
        assert_eq!(
            election.vote(&account("0x1"), 5, now).await.unwrap_err(),
            PollError::UnknownCandidate(5)
        );
        assert_eq!(election.candidates().await.len(), 2);
    }

    #[tokio::test]
    async fn only_the_admin_starts_and_ends_voting() {
        let election = Election::new(Some(account("0xAdmin")));
        let admin = account("0xadmin");
        let other = account("0xother");
        let now = t0();
        election.add_candidate(&admin, "Alice").await.unwrap();
        election.add_candidate(&admin, "Bob").await.unwrap();

        assert!(matches!(
            election.start_voting(&other, 10, now).await,
            Err(PollError::Unauthorized(_))
        ));
        assert!(!election.status(now).await.started);
        election.start_voting(&admin, 10, now).await.unwrap();

        assert!(matches!(
            election.end_voting(&other, now).await,
            Err(PollError::Unauthorized(_))
        ));
        assert!(election.status(now).await.active);
        election.end_voting(&admin, now).await.unwrap();
        assert!(election.status(now).await.ended);
    }

    #[tokio::test]
    async fn tie_goes_to_first_candidate() {
        let election = running(None).await;
        election.vote(&account("0x1"), 1, t0()).await.unwrap();
        election.vote(&account("0x2"), 0, t0()).await.unwrap();
        election.end_voting(&account("0xadmin"), t0()).await.unwrap();

        for _ in 0..3 {
            assert_eq!(election.winner(t0()).await.unwrap().id, 0);
        }
    }

    #[tokio::test]
    async fn no_votes_no_winner() {
        let election = running(None).await;
        election.end_voting(&account("0xadmin"), t0()).await.unwrap();
        assert_eq!(election.winner(t0()).await.unwrap_err(), PollError::NoVotesCast);
    }
}
