//! Marketplace API client
//!
//! Stateless wrappers around the three remote marketplace operations the
//! pipeline needs: fetch a question, fetch the listing it refers to, and post
//! an answer. Every call is authenticated with the tenant's bearer token and
//! every failure becomes an explicit [`MarketplaceError`] value; nothing in
//! here raises into the orchestrator uncaught.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;

/// Marketplace call failures, kept at the call boundary
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Non-2xx response; the body is captured for diagnostics when available
    #[error("marketplace returned status {status}: {}", body.as_deref().unwrap_or("<no body>"))]
    Http { status: u16, body: Option<String> },

    /// Network or connectivity error
    #[error("network error calling marketplace: {0}")]
    Network(#[from] reqwest::Error),

    /// Body that did not parse into the expected shape
    #[error("malformed marketplace response: {0}")]
    Malformed(String),
}

/// Question status as reported by the marketplace. Anything the bot does not
/// recognize is "not actionable" and folds into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    Banned,
    Deleted,
    UnderReview,
    #[serde(other)]
    Other,
}

/// A buyer question, fetched fresh per webhook and never persisted
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: i64,
    pub status: QuestionStatus,
    pub text: String,
    pub item_id: String,
    pub from: QuestionAuthor,
}

/// Author reference on a question
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionAuthor {
    pub id: i64,
}

/// The subset of listing fields the reply prompt needs. Extra response
/// fields are ignored; listings are never cached because title and price
/// may change between questions.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub title: String,
    pub price: f64,
    pub currency_id: String,
    pub permalink: Option<String>,
}

/// Remote marketplace operations, behind a trait so the orchestrator can be
/// exercised with a recording double instead of a live API.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Fetch the question behind a notification resource path (for example
    /// `/questions/10`).
    async fn fetch_question(
        &self,
        resource: &str,
        token: &str,
    ) -> Result<Question, MarketplaceError>;

    /// Fetch the listing a question refers to.
    async fn fetch_item(&self, item_id: &str, token: &str) -> Result<Item, MarketplaceError>;

    /// Post an answer. At most one delivery attempt per pipeline run; a
    /// failure is returned to the caller, never retried here.
    async fn post_answer(
        &self,
        question_id: i64,
        text: &str,
        token: &str,
    ) -> Result<(), MarketplaceError>;
}

/// reqwest-backed marketplace client
#[derive(Clone)]
pub struct MarketplaceClient {
    http: reqwest::Client,
    api_base: String,
}

impl MarketplaceClient {
    /// Create a client against an explicit API base URL
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    /// Create a client from the application configuration
    pub fn from_config(http: reqwest::Client, config: &AppConfig) -> Self {
        Self::new(http, config.marketplace_api_base.clone())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        token: &str,
    ) -> Result<T, MarketplaceError> {
        debug!(%url, "marketplace GET");
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MarketplaceError::Http {
                status: status.as_u16(),
                body: if body.is_empty() { None } else { Some(body) },
            });
        }

        serde_json::from_str(&body).map_err(|e| MarketplaceError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl MarketplaceApi for MarketplaceClient {
    async fn fetch_question(
        &self,
        resource: &str,
        token: &str,
    ) -> Result<Question, MarketplaceError> {
        self.get_json(format!("{}{}", self.api_base, resource), token)
            .await
    }

    async fn fetch_item(&self, item_id: &str, token: &str) -> Result<Item, MarketplaceError> {
        self.get_json(format!("{}/items/{}", self.api_base, item_id), token)
            .await
    }

    async fn post_answer(
        &self,
        question_id: i64,
        text: &str,
        token: &str,
    ) -> Result<(), MarketplaceError> {
        let url = format!("{}/answers", self.api_base);
        debug!(%url, question_id, "marketplace POST answer");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "question_id": question_id,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // Keep whatever the provider said; it is the only diagnostic we get.
        let body = response.text().await.unwrap_or_default();
        warn!(question_id, status = status.as_u16(), body = %body, "posting answer rejected");
        Err(MarketplaceError::Http {
            status: status.as_u16(),
            body: if body.is_empty() { None } else { Some(body) },
        })
    }
}
