use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::MovieMetadata,
};

// Ok(None): the provider answered and has no such movie.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(&self, title: &str, year: Option<i32>) -> AppResult<Option<MovieMetadata>>;
}

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no OMDB_API_KEY provided, metadata lookups will be rejected");
        }

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, api_key, base_url, limiter }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbClient {
    async fn lookup(&self, title: &str, year: Option<i32>) -> AppResult<Option<MovieMetadata>> {
        self.limiter.until_ready().await;

        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        let mut req = self.client.get(url).query(&[("apikey", self.api_key.as_str()), ("t", title)]);
        if let Some(year) = year {
            req = req.query(&[("y", year)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::TransientProvider(format!("provider returned {status}")));
        }

        let body = resp.text().await?;
        let parsed: OmdbResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::TransientProvider(format!("malformed response ({status}): {e}"))
        })?;

        let result = interpret(parsed);
        match &result {
            Ok(Some(found)) => tracing::debug!(title, ?year, director = ?found.director, "metadata found"),
            Ok(None) => tracing::debug!(title, ?year, "provider has no such movie"),
            Err(err) => tracing::warn!(title, ?year, error = %err, "metadata lookup failed"),
        }
        result
    }
}

fn interpret(resp: OmdbResponse) -> AppResult<Option<MovieMetadata>> {
    if !resp.response.eq_ignore_ascii_case("true") {
        let error = resp.error.unwrap_or_else(|| "unknown error".to_string());
        if error.to_ascii_lowercase().contains("not found") {
            return Ok(None);
        }
        return Err(AppError::ProviderRejected(error));
    }

    let Some(title) = present(resp.title) else {
        return Err(AppError::TransientProvider("response is missing a title".to_string()));
    };

    Ok(Some(MovieMetadata {
        title,
        year: present(resp.year).and_then(|y| y.get(..4)?.parse().ok()),
        director: present(resp.director),
        rating: present(resp.imdb_rating)
            .and_then(|r| r.parse::<f64>().ok())
            .filter(|r| (0.0..=10.0).contains(r)),
        poster_url: present(resp.poster),
    }))
}

// OMDb reports absent fields as "N/A".
fn present(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let s = s.trim();
        (!s.is_empty() && s != "N/A").then(|| s.to_string())
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbResponse {
    response: String,
    title: Option<String>,
    year: Option<String>,
    director: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    poster: Option<String>,
    error: Option<String>,
}
