use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::PollError;
use crate::ledger::fresh_options;
use crate::models::{
    AccountId, DateOption, NewPoll, OptionId, Poll, PollId, PollSummary, VoteReceipt,
};

#[derive(sqlx::FromRow)]
struct PollRow {
    id: i64,
    title: String,
    creator: String,
    created_at: DateTime<Utc>,
    active: bool,
}

impl PollRow {
    fn into_poll(self, options: Vec<DateOption>) -> Result<Poll, PollError> {
        Ok(Poll {
            id: self.id as PollId,
            title: self.title,
            creator: AccountId::parse(&self.creator)?,
            created_at: self.created_at,
            active: self.active,
            options,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: i32,
    option_time: DateTime<Utc>,
    display_date: String,
    vote_count: i64,
}

impl From<OptionRow> for DateOption {
    fn from(row: OptionRow) -> Self {
        DateOption {
            id: row.id as OptionId,
            timestamp: row.option_time,
            display_date: row.display_date,
            vote_count: row.vote_count.max(0) as u64,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    receipt_id: Uuid,
    poll_id: i64,
    voter: String,
    option_id: i32,
    cast_at: DateTime<Utc>,
}

impl ReceiptRow {
    fn into_receipt(self) -> Result<VoteReceipt, PollError> {
        Ok(VoteReceipt {
            receipt_id: self.receipt_id,
            poll_id: self.poll_id as PollId,
            voter: AccountId::parse(&self.voter)?,
            chosen_option_id: self.option_id as OptionId,
            cast_at: self.cast_at,
        })
    }
}

/// Postgres-backed ledger. Mutations lock the poll row for the length of
/// their transaction, so writes to one poll are applied one at a time.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        PgLedger { pool }
    }

    pub(super) async fn create_poll(
        &self,
        poll: NewPoll,
        now: DateTime<Utc>,
    ) -> Result<PollId, PollError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO polls (title, creator, created_at, active)
             VALUES ($1, $2, $3, TRUE)
             RETURNING id",
        )
        .bind(&poll.title)
        .bind(poll.creator.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for option in fresh_options(&poll) {
            sqlx::query(
                "INSERT INTO date_options (poll_id, id, option_time, display_date, vote_count)
                 VALUES ($1, $2, $3, $4, 0)",
            )
            .bind(id)
            .bind(option.id as i32)
            .bind(option.timestamp)
            .bind(&option.display_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id as PollId)
    }

    pub(super) async fn get_poll(&self, poll_id: PollId) -> Result<Poll, PollError> {
        let mut tx = self.pool.begin().await?;
        snapshot(&mut *tx).await?;
        let poll = load_poll(&mut *tx, poll_id, false).await?;
        tx.commit().await?;
        poll.ok_or(PollError::PollNotFound(poll_id))
    }

    pub(super) async fn get_all_polls(&self) -> Result<Vec<PollSummary>, PollError> {
        let rows: Vec<PollRow> = sqlx::query_as(
            "SELECT id, title, creator, created_at, active FROM polls ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_poll(Vec::new()).map(|p| p.summary()))
            .collect()
    }

    pub(super) async fn receipt(
        &self,
        poll_id: PollId,
        voter: &AccountId,
    ) -> Result<Option<VoteReceipt>, PollError> {
        let mut tx = self.pool.begin().await?;
        snapshot(&mut *tx).await?;
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM polls WHERE id = $1")
            .bind(poll_id as i64)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(PollError::PollNotFound(poll_id));
        }
        let receipt = load_receipt(&mut *tx, poll_id, voter).await?;
        tx.commit().await?;
        Ok(receipt)
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
        F: FnOnce(&Poll, Option<&VoteReceipt>) -> Result<(), PollError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let poll = load_poll(&mut *tx, poll_id, true)
            .await?
            .ok_or(PollError::PollNotFound(poll_id))?;
        let existing = load_receipt(&mut *tx, poll_id, voter).await?;
        check(&poll, existing.as_ref())?;
        if existing.is_some() {
            return Err(PollError::AlreadyVoted);
        }
        if poll.option(option_id).is_none() {
            return Err(PollError::InvalidOption { poll_id, option_id });
        }

        sqlx::query(
            "UPDATE date_options SET vote_count = vote_count + 1 WHERE poll_id = $1 AND id = $2",
        )
            .bind(poll_id as i64)
            .bind(option_id as i32)
            .execute(&mut *tx)
            .await?;

        let receipt = VoteReceipt {
            receipt_id: Uuid::new_v4(),
            poll_id,
            voter: voter.clone(),
            chosen_option_id: option_id,
            cast_at: now,
        };
        sqlx::query(
            "INSERT INTO vote_receipts (receipt_id, poll_id, voter, option_id, cast_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(receipt.receipt_id)
        .bind(poll_id as i64)
        .bind(voter.as_str())
        .bind(option_id as i32)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(receipt)
    }

    pub(super) async fn close_poll<F>(&self, poll_id: PollId, check: F) -> Result<(), PollError>
    where
        F: FnOnce(&Poll) -> Result<(), PollError> + Send,
    {
        let mut tx = self.pool.begin().await?;
        let poll = load_poll(&mut *tx, poll_id, true)
            .await?
            .ok_or(PollError::PollNotFound(poll_id))?;
        check(&poll)?;
        if !poll.active {
            return Err(PollError::AlreadyClosed(poll_id));
        }

        sqlx::query("UPDATE polls SET active = FALSE WHERE id = $1")
            .bind(poll_id as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn snapshot(conn: &mut PgConnection) -> Result<(), PollError> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(conn)
        .await?;
    Ok(())
}

async fn load_poll(
    conn: &mut PgConnection,
    poll_id: PollId,
    for_update: bool,
) -> Result<Option<Poll>, PollError> {
    let sql = if for_update {
        "SELECT id, title, creator, created_at, active FROM polls WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT id, title, creator, created_at, active FROM polls WHERE id = $1"
    };
    let row: Option<PollRow> = sqlx::query_as(sql)
        .bind(poll_id as i64)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(row) = row else { return Ok(None) };

    let options: Vec<OptionRow> = sqlx::query_as(
        "SELECT id, option_time, display_date, vote_count
         FROM date_options WHERE poll_id = $1 ORDER BY id",
    )
    .bind(poll_id as i64)
    .fetch_all(&mut *conn)
    .await?;

    row.into_poll(options.into_iter().map(DateOption::from).collect())
        .map(Some)
}

async fn load_receipt(
    conn: &mut PgConnection,
    poll_id: PollId,
    voter: &AccountId,
) -> Result<Option<VoteReceipt>, PollError> {
    let row: Option<ReceiptRow> = sqlx::query_as(
        "SELECT receipt_id, poll_id, voter, option_id, cast_at
         FROM vote_receipts WHERE poll_id = $1 AND voter = $2",
    )
    .bind(poll_id as i64)
    .bind(voter.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    row.map(ReceiptRow::into_receipt).transpose()
}
