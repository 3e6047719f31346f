//! Fetching the provider's profile document with an access token.

use std::time::Duration;

use serde_json::Value;
use shared::error::CommonError;
use tracing::debug;

use super::config::AuthenticatorConfig;
use super::oauth::create_http_client;

pub const TOKEN_PLACEHOLDER: &str = ":token";
const MAX_ERROR_BODY_CHARS: usize = 256;

/// At most [`MAX_ERROR_BODY_CHARS`] characters of an error response body
fn truncate_error_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

#[allow(async_fn_in_trait)]
pub trait ProfileFetcherLike {
    async fn fetch_profile(&self, access_token: &str) -> Result<Value, CommonError>;
}

/// Build the profile URL for `access_token`
pub fn profile_url(user_json_url: &str, access_token: &str) -> Result<url::Url, CommonError> {
    let substituted = user_json_url.replace(TOKEN_PLACEHOLDER, &urlencoding::encode(access_token));
    let url = url::Url::parse(&substituted)?;
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct HttpProfileFetcher {
    user_json_url: String,
    client: reqwest::Client,
}

impl HttpProfileFetcher {
    pub fn new(config: &AuthenticatorConfig) -> Result<Self, CommonError> {
        let client = create_http_client(Duration::from_secs(config.profile_fetch_timeout_secs))?;

        Ok(Self {
            user_json_url: config.user_json_url.clone(),
            client,
        })
    }
}

impl ProfileFetcherLike for HttpProfileFetcher {
    async fn fetch_profile(&self, access_token: &str) -> Result<Value, CommonError> {
        let url = profile_url(&self.user_json_url, access_token)?;
        debug!(host = url.host_str(), path = url.path(), "fetching provider profile");

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body_len = body.len(), "profile request was rejected");
            return Err(CommonError::InvalidResponse {
                msg: format!(
                    "Profile request failed: HTTP {status} - {}",
                    truncate_error_body(&body)
                ),
                source: None,
            });
        }

        let body = response.bytes().await?;
        let profile: Value = serde_json::from_slice(&body)?;
        Ok(profile)
    }
}
