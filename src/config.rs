use color_eyre::eyre::{Report, WrapErr};
use dotenv::dotenv;
use std::env;

pub const DEFAULT_MAX_VOTES_PER_USER: u32 = 10;
const DEFAULT_DATABASE_URL: &str = "sqlite:breadcharts.db";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VotingConfig {
    max_votes_per_user: u32,
}

impl VotingConfig {
    /// Non-positive caps fall back to the default.
    pub fn new(max_votes_per_user: i64) -> Self {
        let max_votes_per_user = if max_votes_per_user <= 0 {
            DEFAULT_MAX_VOTES_PER_USER
        } else {
            u32::try_from(max_votes_per_user).unwrap_or(u32::MAX)
        };
        Self { max_votes_per_user }
    }

    pub fn max_votes_per_user(&self) -> u32 {
        self.max_votes_per_user
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            max_votes_per_user: DEFAULT_MAX_VOTES_PER_USER,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub voting: VotingConfig,
}

impl Config {
    /// Reads the configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, Report> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Report> {
        let voting = match lookup("VOTING_MAX_VOTES_PER_USER") {
            Some(value) => {
                let max_votes_per_user = value.trim().parse::<i64>().wrap_err_with(|| {
                    format!("VOTING_MAX_VOTES_PER_USER is not an integer: {:?}", value)
                })?;
                VotingConfig::new(max_votes_per_user)
            }
            None => VotingConfig::default(),
        };
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned()),
            voting,
        })
    }
}
