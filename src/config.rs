// src/config.rs
use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::models::AccountId;
use crate::tally::TieBreak;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Who may close a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosePolicy {
    pub restrict_close_to_creator: bool,
}

impl Default for ClosePolicy {
    fn default() -> Self {
        ClosePolicy { restrict_close_to_creator: true }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// When unset the ledger lives in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub close_policy: ClosePolicy,
    pub tie_break: TieBreak,
    pub max_date_options: usize,
    pub election_admin: Option<AccountId>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3030,
            database_url: None,
            db_max_connections: 5,
            close_policy: ClosePolicy::default(),
            tie_break: TieBreak::default(),
            max_date_options: 32,
            election_admin: None,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let election_admin = match lookup("ELECTION_ADMIN") {
            Some(raw) if !raw.trim().is_empty() => {
                Some(AccountId::parse(&raw).map_err(|_| ConfigError::Invalid {
                    name: "ELECTION_ADMIN",
                    value: raw.clone(),
                })?)
            }
            _ => None,
        };

        Ok(Config {
            port: parse_var(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_var(
                &lookup,
                "DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            close_policy: ClosePolicy {
                restrict_close_to_creator: parse_var(
                    &lookup,
                    "RESTRICT_CLOSE_TO_CREATOR",
                    defaults.close_policy.restrict_close_to_creator,
                )?,
            },
            tie_break: parse_var(&lookup, "TIE_BREAK", defaults.tie_break)?,
            max_date_options: parse_var(&lookup, "MAX_DATE_OPTIONS", defaults.max_date_options)?,
            election_admin,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
