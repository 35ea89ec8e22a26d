// src/db.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS polls (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT NOT NULL CHECK (length(title) > 0),
    creator     TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    active      BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS date_options (
    poll_id      BIGINT NOT NULL REFERENCES polls (id),
    id           INTEGER NOT NULL,
    option_time  TIMESTAMPTZ NOT NULL,
    display_date TEXT NOT NULL,
    vote_count   BIGINT NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
    PRIMARY KEY (poll_id, id)
);

CREATE TABLE IF NOT EXISTS vote_receipts (
    receipt_id  UUID PRIMARY KEY,
    poll_id     BIGINT NOT NULL,
    voter       TEXT NOT NULL,
    option_id   INTEGER NOT NULL,
    cast_at     TIMESTAMPTZ NOT NULL,
    UNIQUE (poll_id, voter),
    FOREIGN KEY (poll_id, option_id) REFERENCES date_options (poll_id, id)
);
"#;

pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Creates the ledger tables if they are missing.
pub async fn ensure_schema(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
