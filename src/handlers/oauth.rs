//! # OAuth Handlers
//!
//! The install kickoff redirect and the authorization-code callback. Both are
//! browser-facing: the seller lands here while linking their marketplace
//! account to the bot, so the callback answers with plain readable text
//! rather than JSON.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use serde::Deserialize;
use tracing::error;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::oauth::{self, OAuthError};
use crate::server::AppState;

/// Query parameters of the OAuth callback
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// Single-use authorization code issued by the provider
    pub code: Option<String>,
}

/// Install kickoff: redirect the seller to the provider's consent page
#[utoipa::path(
    get,
    path = "/install",
    responses(
        (status = 302, description = "Redirect to the provider authorization page"),
        (status = 500, description = "OAuth client not configured", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn install(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = oauth::build_authorize_url(&state.config).map_err(config_error)?;
    Ok(Redirect::temporary(url.as_str()))
}

/// Authorization-code callback: exchange the code and store the credentials
#[utoipa::path(
    get,
    path = "/callback",
    params(CallbackParams),
    responses(
        (status = 200, description = "Account linked, body names the tenant id"),
        (status = 400, description = "Missing authorization code", body = ApiError),
        (status = 500, description = "Exchange failed", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<String, ApiError> {
    let code = params.code.filter(|code| !code.is_empty()).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "MISSING_CODE",
            "Query parameter 'code' is required",
        )
    })?;

    match state.exchanger.exchange_code(&state.config, &code).await {
        Ok(tenant_id) => Ok(format!(
            "Account linked successfully. Seller {} can now receive automatic answers.",
            tenant_id
        )),
        Err(error @ (OAuthError::MissingClientId
        | OAuthError::MissingClientSecret
        | OAuthError::MissingRedirectUri)) => Err(config_error(error)),
        Err(error) => {
            error!(%error, "authorization code exchange failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OAUTH_EXCHANGE_FAILED",
                "Failed to exchange the authorization code",
            )
            .with_details(serde_json::json!({"detail": error.to_string()})))
        }
    }
}

fn config_error(error: OAuthError) -> ApiError {
    error!(%error, "oauth configuration incomplete");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "OAUTH_NOT_CONFIGURED",
        "OAuth client is not configured",
    )
    .with_details(serde_json::json!({"detail": error.to_string()}))
}
