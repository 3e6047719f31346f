use serde::{Deserialize, Serialize};
use shared::error::CommonError;

use crate::logic::group_sync::GroupSyncConfig;
use crate::logic::profile_mapping::AttributePathConfig;

pub const DEFAULT_PROFILE_FETCH_TIMEOUT_SECS: u64 = 10;

fn default_profile_fetch_timeout_secs() -> u64 {
    DEFAULT_PROFILE_FETCH_TIMEOUT_SECS
}

/// OAuth2 client registration with the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OauthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    /// Send client credentials as HTTP Basic auth during token exchange
    /// instead of in the request body
    pub send_auth_header: bool,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    pub client: OauthClientConfig,
    /// Profile endpoint. `:token` is replaced with the access token.
    pub user_json_url: String,
    pub json_paths: AttributePathConfig,
    /// Whether emails asserted by this provider are trusted for account
    /// matching
    pub email_verified: bool,
    pub groups: GroupSyncConfig,
    #[serde(default = "default_profile_fetch_timeout_secs")]
    pub profile_fetch_timeout_secs: u64,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            client: OauthClientConfig::default(),
            user_json_url: String::new(),
            json_paths: AttributePathConfig::default(),
            email_verified: false,
            groups: GroupSyncConfig::default(),
            profile_fetch_timeout_secs: DEFAULT_PROFILE_FETCH_TIMEOUT_SECS,
        }
    }
}

impl AuthenticatorConfig {
    pub fn from_yaml(yaml_str: &str) -> Result<Self, CommonError> {
        let config: AuthenticatorConfig = serde_yaml::from_str(yaml_str)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, CommonError> {
        let yaml_str = serde_yaml::to_string(self)?;
        Ok(yaml_str)
    }
}
