//! OAuth 2.0 authorization-code flow against the marketplace.
//!
//! Two halves: building the user-facing authorization URL, and exchanging a
//! returned code for a token pair that is persisted per tenant. The exchange
//! makes exactly one attempt; an expired or reused code fails fast and the
//! seller restarts the install flow, so retrying here only burns the code.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::RepositoryError;
use crate::repositories::CredentialStore;

/// Failures of the authorization flow. Configuration gaps are distinct
/// variants so the operator sees exactly which key is missing instead of a
/// generic exchange error.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("oauth client id is not configured")]
    MissingClientId,
    #[error("oauth client secret is not configured")]
    MissingClientSecret,
    #[error("oauth redirect uri is not configured")]
    MissingRedirectUri,
    #[error("token endpoint returned status {status}: {detail}")]
    TokenEndpoint { status: u16, detail: String },
    #[error("network error during token exchange: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token response missing field '{0}'")]
    MissingField(&'static str),
    #[error("failed to persist credentials: {0}")]
    Store(#[from] RepositoryError),
    #[error("invalid authorization base url: {0}")]
    InvalidAuthorizeUrl(#[from] url::ParseError),
}

/// Token endpoint response. All fields optional so absence becomes a precise
/// `MissingField` error rather than a serde parse failure.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user_id: Option<i64>,
}

/// Build the consent-page URL a seller is redirected to when installing the
/// bot.
pub fn build_authorize_url(config: &AppConfig) -> Result<Url, OAuthError> {
    let client_id = config
        .oauth_client_id
        .as_deref()
        .ok_or(OAuthError::MissingClientId)?;
    let redirect_uri = config
        .oauth_redirect_uri
        .as_deref()
        .ok_or(OAuthError::MissingRedirectUri)?;

    let mut url = Url::parse(&format!("{}/authorization", config.marketplace_auth_base))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri);

    Ok(url)
}

/// Exchanges authorization codes for token pairs and persists them.
pub struct OAuthExchanger {
    http: reqwest::Client,
    token_url: String,
    store: Arc<dyn CredentialStore>,
}

impl OAuthExchanger {
    pub fn new(
        http: reqwest::Client,
        config: &AppConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth/token", config.marketplace_api_base),
            store,
        }
    }

    /// Exchange an authorization code and store the resulting credentials.
    /// Returns the tenant id the provider bound the tokens to.
    pub async fn exchange_code(&self, config: &AppConfig, code: &str) -> Result<i64, OAuthError> {
        let client_id = config
            .oauth_client_id
            .as_deref()
            .ok_or(OAuthError::MissingClientId)?;
        let client_secret = config
            .oauth_client_secret
            .as_deref()
            .ok_or(OAuthError::MissingClientSecret)?;
        let redirect_uri = config
            .oauth_redirect_uri
            .as_deref()
            .ok_or(OAuthError::MissingRedirectUri)?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), detail = %detail, "token exchange rejected");
            return Err(OAuthError::TokenEndpoint {
                status: status.as_u16(),
                detail,
            });
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token
            .access_token
            .ok_or(OAuthError::MissingField("access_token"))?;
        let refresh_token = token
            .refresh_token
            .ok_or(OAuthError::MissingField("refresh_token"))?;
        let tenant_id = token.user_id.ok_or(OAuthError::MissingField("user_id"))?;

        self.store
            .upsert(tenant_id, &access_token, &refresh_token)
            .await?;

        info!(tenant_id, "tenant credentials stored");
        Ok(tenant_id)
    }
}
