// handlers.rs
use axum::extract::{FromRequest, FromRequestParts, State};
use axum::Json;
use chrono::Utc;
use http::request::Parts;
use serde_json::{json, Value};

use crate::ballot::BallotRecorder;
use crate::config::Config;
use crate::election::{
    AddCandidateRequest, Candidate, Election, ElectionStatus, ElectionVoteRequest,
    StartVotingRequest,
};
use crate::error::PollError;
use crate::ledger::Ledger;
use crate::lifecycle::PollLifecycle;
use crate::models::{
    AccountId, CreatePollRequest, CreatePollResponse, DateOption, PollDetail, PollId,
    PollSummary, TallyEntry, VoteReceipt, VoteRequest, VoterInfo,
};
use crate::query::QueryFacade;
use crate::tally::TallyResolver;

/// Request header carrying the caller's account identity.
pub const ACCOUNT_HEADER: &str = "x-account";

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: PollLifecycle,
    pub ballots: BallotRecorder,
    pub query: QueryFacade,
    pub election: Election,
}

impl AppState {
    pub fn new(ledger: Ledger, config: &Config) -> Self {
        let tally = TallyResolver::new(ledger.clone(), config.tie_break);
        let ballots = BallotRecorder::new(ledger.clone());
        AppState {
            lifecycle: PollLifecycle::new(
                ledger.clone(),
                config.close_policy,
                config.max_date_options,
            ),
            ballots: ballots.clone(),
            query: QueryFacade::new(ledger, tally, ballots),
            election: Election::new(config.election_admin.clone()),
        }
    }
}

/// JSON request body whose rejections render as `PollError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(PollError))]
pub struct JsonBody<T>(pub T);

/// Path parameters whose rejections render as `PollError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PollError))]
pub struct PathArgs<T>(pub T);

/// The authenticated caller of a mutating request.
pub struct Caller(pub AccountId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = PollError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        AccountId::parse(raw).map(Caller)
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create a date poll owned by the caller
pub async fn create_poll(
    State(state): State<AppState>,
    Caller(creator): Caller,
    JsonBody(req): JsonBody<CreatePollRequest>,
) -> Result<Json<CreatePollResponse>, PollError> {
    let poll_id = state
        .lifecycle
        .create(&creator, &req.title, req.options, Utc::now())
        .await?;
    Ok(Json(CreatePollResponse { poll_id }))
}

pub async fn get_all_polls(
    State(state): State<AppState>,
) -> Result<Json<Vec<PollSummary>>, PollError> {
    Ok(Json(state.query.all_polls().await?))
}

pub async fn get_poll(
    State(state): State<AppState>,
    PathArgs(poll_id): PathArgs<PollId>,
) -> Result<Json<PollDetail>, PollError> {
    Ok(Json(state.query.poll(poll_id).await?))
}

pub async fn get_date_options(
    State(state): State<AppState>,
    PathArgs(poll_id): PathArgs<PollId>,
) -> Result<Json<Vec<DateOption>>, PollError> {
    Ok(Json(state.query.date_options(poll_id).await?))
}

pub async fn get_tally(
    State(state): State<AppState>,
    PathArgs(poll_id): PathArgs<PollId>,
) -> Result<Json<Vec<TallyEntry>>, PollError> {
    Ok(Json(state.query.tally(poll_id).await?))
}

/// Cast the caller's single vote in a poll
pub async fn vote(
    State(state): State<AppState>,
    Caller(voter): Caller,
    PathArgs(poll_id): PathArgs<PollId>,
    JsonBody(req): JsonBody<VoteRequest>,
) -> Result<Json<VoteReceipt>, PollError> {
    let receipt = state
        .ballots
        .vote(poll_id, &voter, req.option_id, Utc::now())
        .await?;
    Ok(Json(receipt))
}

pub async fn end_poll(
    State(state): State<AppState>,
    Caller(requester): Caller,
    PathArgs(poll_id): PathArgs<PollId>,
) -> Result<Json<Value>, PollError> {
    state.lifecycle.close(poll_id, &requester).await?;
    Ok(Json(json!({ "status": "Poll closed", "pollId": poll_id })))
}

pub async fn get_voter_info(
    State(state): State<AppState>,
    PathArgs((poll_id, account)): PathArgs<(PollId, String)>,
) -> Result<Json<VoterInfo>, PollError> {
    let voter = AccountId::parse(&account)?;
    Ok(Json(state.query.voter_info(poll_id, &voter).await?))
}

pub async fn is_creator(
    State(state): State<AppState>,
    PathArgs((poll_id, account)): PathArgs<(PollId, String)>,
) -> Result<Json<Value>, PollError> {
    let account = AccountId::parse(&account)?;
    let is_creator = state.lifecycle.is_creator(poll_id, &account).await?;
    Ok(Json(json!({ "isCreator": is_creator })))
}

pub async fn get_winner(
    State(state): State<AppState>,
    PathArgs(poll_id): PathArgs<PollId>,
) -> Result<Json<DateOption>, PollError> {
    Ok(Json(state.query.winner(poll_id).await?))
}

pub async fn add_candidate(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<AddCandidateRequest>,
) -> Result<Json<Candidate>, PollError> {
    Ok(Json(state.election.add_candidate(&caller, &req.name).await?))
}

pub async fn get_candidates(State(state): State<AppState>) -> Json<Vec<Candidate>> {
    Json(state.election.candidates().await)
}

pub async fn start_voting(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<StartVotingRequest>,
) -> Result<Json<ElectionStatus>, PollError> {
    let status = state
        .election
        .start_voting(&caller, req.duration_minutes, Utc::now())
        .await?;
    Ok(Json(status))
}

pub async fn end_voting(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ElectionStatus>, PollError> {
    Ok(Json(state.election.end_voting(&caller, Utc::now()).await?))
}

pub async fn election_vote(
    State(state): State<AppState>,
    Caller(voter): Caller,
    JsonBody(req): JsonBody<ElectionVoteRequest>,
) -> Result<Json<Value>, PollError> {
    state.election.vote(&voter, req.candidate_id, Utc::now()).await?;
    Ok(Json(json!({ "status": "Vote recorded" })))
}

pub async fn election_status(State(state): State<AppState>) -> Json<ElectionStatus> {
    Json(state.election.status(Utc::now()).await)
}

pub async fn election_voter_info(
    State(state): State<AppState>,
    PathArgs(account): PathArgs<String>,
) -> Result<Json<VoterInfo>, PollError> {
    let voter = AccountId::parse(&account)?;
    Ok(Json(state.election.voter_info(&voter).await))
}

pub async fn election_winner(
    State(state): State<AppState>,
) -> Result<Json<Candidate>, PollError> {
    Ok(Json(state.election.winner(Utc::now()).await?))
}
