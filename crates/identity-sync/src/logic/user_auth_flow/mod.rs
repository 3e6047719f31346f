//! Post-authentication orchestration.
//!
//! After the host completes the OAuth2 exchange it calls
//! [`Authenticator::after_authenticate`] with the access token:
//! 1. Fetch the provider profile
//! 2. Map it to a [`NormalizedIdentity`]
//! 3. Resolve the local account by link, then by verified email
//! 4. Sync group memberships for a resolved account
//!
//! When nothing resolved, the host creates the account itself and calls
//! [`Authenticator::after_create_account`] with the carried extra data.

pub mod config;
pub mod oauth;
pub mod profile_fetch;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::CommonError;
use tracing::{debug, warn};

use crate::logic::group_sync::{GroupSyncReport, sync_user_groups};
use crate::logic::identity_link::{
    IdentityResolution, ResolveIdentityParams, persist_link, resolve_identity,
};
use crate::logic::profile_mapping::{NormalizedIdentity, apply_profile_mapping};
use crate::repository::{AccountDirectoryLike, GroupDirectoryLike, LinkRecord, LinkStoreLike};

pub use config::{AuthenticatorConfig, OauthClientConfig};
pub use profile_fetch::{HttpProfileFetcher, ProfileFetcherLike};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCallbackParams {
    pub access_token: String,
}

/// Carried from `after_authenticate` to `after_create_account` when no local
/// account matched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthExtraData {
    pub external_id: Option<String>,
    pub groups: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub resolution: IdentityResolution,
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub extra_data: AuthExtraData,
    /// Present when groups were synced for the resolved account
    pub group_sync: Option<GroupSyncReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountCreatedResult {
    pub link: Option<LinkRecord>,
    pub group_sync: Option<GroupSyncReport>,
}

pub struct Authenticator<R, F> {
    config: AuthenticatorConfig,
    repository: R,
    fetcher: F,
}

impl<R> Authenticator<R, HttpProfileFetcher>
where
    R: LinkStoreLike + AccountDirectoryLike + GroupDirectoryLike,
{
    /// Authenticator that fetches profiles over HTTP
    pub fn with_http_fetcher(
        config: AuthenticatorConfig,
        repository: R,
    ) -> Result<Self, CommonError> {
        let fetcher = HttpProfileFetcher::new(&config)?;
        Ok(Self::new(config, repository, fetcher))
    }
}

impl<R, F> Authenticator<R, F>
where
    R: LinkStoreLike + AccountDirectoryLike + GroupDirectoryLike,
    F: ProfileFetcherLike,
{
    pub fn new(config: AuthenticatorConfig, repository: R, fetcher: F) -> Self {
        Self {
            config,
            repository,
            fetcher,
        }
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    #[tracing::instrument(skip_all)]
    pub async fn after_authenticate(
        &self,
        params: AuthCallbackParams,
    ) -> Result<AuthResult, CommonError> {
        let profile = self
            .fetcher
            .fetch_profile(&params.access_token)
            .await
            .map_err(|e| CommonError::Authentication {
                msg: format!("Failed to fetch provider profile: {e}"),
                source: Some(e.into()),
            })?;
        debug!("fetched provider profile");

        let NormalizedIdentity {
            external_id,
            username,
            display_name,
            email,
            raw_groups,
        } = apply_profile_mapping(&profile, &self.config.json_paths);
        if external_id.is_none() {
            warn!("provider profile has no user id, account linking is unavailable");
        }

        let email_verified = email.is_some() && self.config.email_verified;
        let resolution = resolve_identity(
            &self.repository,
            ResolveIdentityParams {
                external_id: external_id.as_deref(),
                email: email.as_deref(),
                email_verified,
            },
        )
        .await;
        debug!(resolution = ?resolution, "resolved identity");

        let group_sync = match (resolution.account(), raw_groups.as_deref()) {
            (Some(account), Some(claims)) => Some(
                sync_user_groups(&self.repository, &account.id, &self.config.groups, claims).await,
            ),
            _ => None,
        };

        Ok(AuthResult {
            resolution,
            name: display_name,
            username,
            email,
            email_verified,
            extra_data: AuthExtraData {
                external_id,
                groups: raw_groups,
            },
            group_sync,
        })
    }

    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn after_create_account(
        &self,
        account_id: &str,
        extra_data: &AuthExtraData,
    ) -> Result<AccountCreatedResult, CommonError> {
        let link = match extra_data.external_id.as_deref() {
            Some(external_id) => {
                Some(persist_link(&self.repository, external_id, account_id).await?)
            }
            None => {
                debug!("no external id carried, skipping link");
                None
            }
        };

        let group_sync = match extra_data.groups.as_deref() {
            Some(claims) => Some(
                sync_user_groups(&self.repository, account_id, &self.config.groups, claims).await,
            ),
            None => None,
        };

        Ok(AccountCreatedResult { link, group_sync })
    }
}
