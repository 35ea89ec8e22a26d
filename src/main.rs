// src/main.rs
mod ballot;
mod config;
mod db;
mod election;
mod error;
mod handlers;
mod ledger;
mod lifecycle;
mod models;
mod query;
mod routes;
mod tally;

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::AppState;
use crate::ledger::{Ledger, PgLedger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("date_poll_backend=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let ledger = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.db_max_connections).await?;
            db::ensure_schema(&pool).await?;
            Ledger::Postgres(PgLedger::new(pool))
        }
        None => Ledger::in_memory(),
    };
    info!(
        backend = ledger.backend(),
        restrict_close_to_creator = config.close_policy.restrict_close_to_creator,
        tie_break = ?config.tie_break,
        "ledger ready"
    );

    let app = routes::create_routes(AppState::new(ledger, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "listening");
    axum_server::bind(addr).serve(app.into_make_service()).await?;

    Ok(())
}
