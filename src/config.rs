use std::time::Duration;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub omdb_rps: u32,
    pub omdb_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://movielist.db?mode=rwc".to_string());

        let omdb_api_key = var("OMDB_API_KEY").unwrap_or_default();
        let omdb_base_url =
            var("OMDB_BASE_URL").unwrap_or_else(|| "https://www.omdbapi.com".to_string());

        let omdb_rps: u32 = var("OMDB_RPS").and_then(|s| s.parse().ok()).unwrap_or(4);

        let omdb_timeout_secs: u64 = match var("OMDB_TIMEOUT_SECS") {
            Some(s) => s.parse().context("OMDB_TIMEOUT_SECS")?,
            None => 10,
        };

        Ok(Self {
            database_url,
            omdb_api_key,
            omdb_base_url,
            omdb_rps,
            omdb_timeout: Duration::from_secs(omdb_timeout_secs),
        })
    }
}
