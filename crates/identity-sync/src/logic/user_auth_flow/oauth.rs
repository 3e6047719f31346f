//! OAuth2 authorization code flow against the configured provider.
//!
//! 1. Authorization: build the provider URL with a fresh CSRF state
//! 2. Callback: exchange the code for an access token, which is handed to
//!    [`super::Authenticator::after_authenticate`]

use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use shared::error::CommonError;
use tracing::debug;

use super::AuthCallbackParams;
use super::config::OauthClientConfig;

/// Client with authorization and token endpoints set
pub type ConfiguredOauthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Create an HTTP client for OAuth requests
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client, CommonError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| CommonError::Unknown(anyhow::anyhow!("Failed to create HTTP client: {e}")))
}

pub fn build_oauth_client(
    config: &OauthClientConfig,
) -> Result<ConfiguredOauthClient, CommonError> {
    let auth_url =
        AuthUrl::new(config.authorize_url.clone()).map_err(|e| CommonError::InvalidRequest {
            msg: format!("Invalid authorization endpoint: {e}"),
            source: None,
        })?;

    let token_url =
        TokenUrl::new(config.token_url.clone()).map_err(|e| CommonError::InvalidRequest {
            msg: format!("Invalid token endpoint: {e}"),
            source: None,
        })?;

    let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_auth_type(if config.send_auth_header {
            AuthType::BasicAuth
        } else {
            AuthType::RequestBody
        });

    if !config.client_secret.is_empty() {
        client = client.set_client_secret(ClientSecret::new(config.client_secret.clone()));
    }

    if !config.redirect_uri.is_empty() {
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone()).map_err(|e| {
            CommonError::InvalidRequest {
                msg: format!("Invalid redirect URI: {e}"),
                source: None,
            }
        })?;
        client = client.set_redirect_uri(redirect_url);
    }

    Ok(client)
}

/// Provider URL to send the user to, and the CSRF state the callback must
/// echo back
pub fn build_authorization_url(
    client: &ConfiguredOauthClient,
    scopes: &[String],
) -> (Url, CsrfToken) {
    let mut auth_request = client.authorize_url(CsrfToken::new_random);
    for scope in scopes {
        auth_request = auth_request.add_scope(Scope::new(scope.clone()));
    }
    auth_request.url()
}

pub async fn exchange_code_for_token(
    client: &ConfiguredOauthClient,
    http_client: &reqwest::Client,
    code: &str,
) -> Result<AuthCallbackParams, CommonError> {
    let token_response = client
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .request_async(http_client)
        .await
        .map_err(|e| CommonError::Authentication {
            msg: format!("Token exchange failed: {e}"),
            source: None,
        })?;

    debug!(
        token_type = ?token_response.token_type(),
        "exchanged authorization code for access token"
    );

    Ok(AuthCallbackParams {
        access_token: token_response.access_token().secret().clone(),
    })
}
