use serde_json::Value;
use shared::error::CommonError;
use shared::primitives::{PaginatedResponse, PaginationRequest};

use crate::logic::group_sync::GroupSyncConfig;
use crate::logic::profile_mapping::AttributePathConfig;
use crate::logic::user_auth_flow::{Authenticator, AuthenticatorConfig, ProfileFetcherLike};
use crate::repository::{
    AccountDirectoryLike, GroupDirectoryLike, LinkRecord, LinkStoreLike, LocalAccount, LocalGroup,
    Repository,
};

/// Profile fetcher that returns a canned document or fails
#[derive(Debug, Clone)]
pub struct StubProfileFetcher {
    profile: Option<Value>,
}

impl StubProfileFetcher {
    pub fn ok(profile: Value) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    pub fn failing() -> Self {
        Self { profile: None }
    }
}

impl ProfileFetcherLike for StubProfileFetcher {
    async fn fetch_profile(&self, _access_token: &str) -> Result<Value, CommonError> {
        self.profile
            .clone()
            .ok_or_else(|| CommonError::InvalidResponse {
                msg: "Profile request failed: HTTP 503 Service Unavailable".to_string(),
                source: None,
            })
    }
}

fn host_rejected() -> CommonError {
    CommonError::Repository {
        msg: "host rejected the call".to_string(),
        source: None,
    }
}

/// Wraps the in-memory repository and fails selected group calls
#[derive(Clone)]
pub struct FailingDirectory {
    pub inner: Repository,
    pub fail_list: bool,
    /// Every membership page claims another page with the same token
    pub repeat_page_token: bool,
    pub fail_add_for: Option<String>,
    pub fail_remove_for: Option<String>,
}

impl FailingDirectory {
    pub fn new(inner: Repository) -> Self {
        Self {
            inner,
            fail_list: false,
            repeat_page_token: false,
            fail_add_for: None,
            fail_remove_for: None,
        }
    }
}

impl LinkStoreLike for FailingDirectory {
    async fn get_link(&self, key: &str) -> Result<Option<LinkRecord>, CommonError> {
        self.inner.get_link(key).await
    }

    async fn set_link(&self, key: &str, record: &LinkRecord) -> Result<(), CommonError> {
        self.inner.set_link(key, record).await
    }
}

impl AccountDirectoryLike for FailingDirectory {
    async fn get_account_by_id(&self, id: &str) -> Result<Option<LocalAccount>, CommonError> {
        self.inner.get_account_by_id(id).await
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<LocalAccount>, CommonError> {
        self.inner.find_account_by_email(email).await
    }
}

impl GroupDirectoryLike for FailingDirectory {
    async fn list_user_groups(
        &self,
        user_id: &str,
        pagination: &PaginationRequest,
    ) -> Result<PaginatedResponse<LocalGroup>, CommonError> {
        if self.fail_list {
            return Err(host_rejected());
        }
        if self.repeat_page_token {
            let first_page = PaginationRequest {
                page_size: pagination.page_size,
                next_page_token: None,
            };
            let page = self.inner.list_user_groups(user_id, &first_page).await?;
            return Ok(PaginatedResponse {
                items: page.items,
                next_page_token: Some("same".to_string()),
            });
        }
        self.inner.list_user_groups(user_id, pagination).await
    }

    async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>, CommonError> {
        self.inner.get_group_by_name(name).await
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), CommonError> {
        if self.fail_add_for.as_deref() == Some(group_id) {
            return Err(host_rejected());
        }
        self.inner.add_group_member(group_id, user_id).await
    }

    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), CommonError> {
        if self.fail_remove_for.as_deref() == Some(group_id) {
            return Err(host_rejected());
        }
        self.inner.remove_group_member(group_id, user_id).await
    }
}

pub fn test_config(email_verified: bool) -> AuthenticatorConfig {
    AuthenticatorConfig {
        user_json_url: "http://127.0.0.1/user?access_token=:token".to_string(),
        json_paths: AttributePathConfig {
            user_id: "id".to_string(),
            username: "login".to_string(),
            name: "name".to_string(),
            email: "email".to_string(),
            groups: "groups".to_string(),
        },
        email_verified,
        groups: GroupSyncConfig {
            group_matching: "admins=staff,devs=developers".to_string(),
            name_attribute: "name".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub struct TestContext {
    pub config: AuthenticatorConfig,
    pub repository: Repository,
}

impl TestContext {
    pub fn new(email_verified: bool) -> Self {
        shared::setup_test!();
        Self {
            config: test_config(email_verified),
            repository: Repository::new(),
        }
    }

    pub fn authenticator(
        &self,
        fetcher: StubProfileFetcher,
    ) -> Authenticator<Repository, StubProfileFetcher> {
        Authenticator::new(self.config.clone(), self.repository.clone(), fetcher)
    }

    /// Authenticator over a [`FailingDirectory`] sharing this context's state
    pub fn failing_authenticator(
        &self,
        fetcher: StubProfileFetcher,
        configure: impl FnOnce(&mut FailingDirectory),
    ) -> Authenticator<FailingDirectory, StubProfileFetcher> {
        let mut directory = FailingDirectory::new(self.repository.clone());
        configure(&mut directory);
        Authenticator::new(self.config.clone(), directory, fetcher)
    }

    pub fn seed_account(&self, id: &str, email: &str) {
        self.repository.insert_account(LocalAccount {
            id: id.to_string(),
            username: None,
            email: Some(email.to_string()),
        });
    }

    /// Groups are stored with id `group-<name>`
    pub fn seed_groups(&self, names: &[&str]) {
        for name in names {
            self.repository.insert_group(LocalGroup {
                id: format!("group-{name}"),
                name: name.to_string(),
            });
        }
    }

    pub async fn join(&self, user_id: &str, group_name: &str) {
        self.repository
            .add_group_member(&format!("group-{group_name}"), user_id)
            .await
            .unwrap();
    }

    /// Sorted group names of `user_id`
    pub fn group_names_for(&self, user_id: &str) -> Vec<String> {
        self.repository.group_names_for(user_id).into_iter().collect()
    }
}
