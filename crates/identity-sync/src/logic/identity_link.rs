//! Linking external identities to local accounts.
//!
//! A link is written once, when the host creates an account for an unknown
//! identity, and takes precedence over email matching on every later login.

use serde::Serialize;
use shared::error::CommonError;
use shared::primitives::WrappedChronoDateTime;
use tracing::{debug, warn};

use crate::repository::{AccountDirectoryLike, LinkRecord, LinkStoreLike, LocalAccount};

pub const LINK_KEY_PREFIX: &str = "oauth2_user_";

/// Store key for an external identity
pub fn link_key(external_id: &str) -> String {
    format!("{LINK_KEY_PREFIX}{external_id}")
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// How (and whether) a login was matched to a local account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "account")]
pub enum IdentityResolution {
    Linked(LocalAccount),
    EmailMatched(LocalAccount),
    NoMatch,
}

impl IdentityResolution {
    pub fn account(&self) -> Option<&LocalAccount> {
        match self {
            IdentityResolution::Linked(account) | IdentityResolution::EmailMatched(account) => {
                Some(account)
            }
            IdentityResolution::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.account().is_some()
    }
}

pub struct ResolveIdentityParams<'a> {
    pub external_id: Option<&'a str>,
    pub email: Option<&'a str>,
    /// Whether the email can be trusted for matching
    pub email_verified: bool,
}

async fn resolve_by_email<R: AccountDirectoryLike>(
    repository: &R,
    email: &str,
) -> IdentityResolution {
    let normalized = normalize_email(email);
    if normalized.is_empty() {
        return IdentityResolution::NoMatch;
    }

    match repository.find_account_by_email(&normalized).await {
        Ok(Some(account)) => {
            debug!(account_id = %account.id, "resolved account by verified email");
            IdentityResolution::EmailMatched(account)
        }
        Ok(None) => IdentityResolution::NoMatch,
        Err(e) => {
            warn!(error = %e, "account lookup by email failed, treating as no match");
            IdentityResolution::NoMatch
        }
    }
}

/// Find the local account for a login.
///
/// Never fails: store or directory errors are logged and treated as misses
/// so the host can fall back to account creation.
pub async fn resolve_identity<R>(
    repository: &R,
    params: ResolveIdentityParams<'_>,
) -> IdentityResolution
where
    R: LinkStoreLike + AccountDirectoryLike,
{
    if let Some(external_id) = params.external_id {
        match repository.get_link(&link_key(external_id)).await {
            Ok(Some(link)) => {
                return match repository.get_account_by_id(&link.local_account_id).await {
                    Ok(Some(account)) => {
                        debug!(external_id, account_id = %account.id, "resolved account by link");
                        IdentityResolution::Linked(account)
                    }
                    Ok(None) => {
                        warn!(
                            external_id,
                            account_id = %link.local_account_id,
                            "linked account no longer exists"
                        );
                        IdentityResolution::NoMatch
                    }
                    Err(e) => {
                        warn!(external_id, error = %e, "linked account lookup failed");
                        IdentityResolution::NoMatch
                    }
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(external_id, error = %e, "link lookup failed, falling back to email");
            }
        }
    }

    match params.email {
        Some(email) if params.email_verified => resolve_by_email(repository, email).await,
        _ => IdentityResolution::NoMatch,
    }
}

/// Record that `external_id` belongs to `account_id`.
///
/// Re-persisting an existing pair does not write. A link for the same
/// identity that points at another account is replaced.
pub async fn persist_link<R: LinkStoreLike>(
    repository: &R,
    external_id: &str,
    account_id: &str,
) -> Result<LinkRecord, CommonError> {
    if external_id.trim().is_empty() {
        return Err(CommonError::InvalidRequest {
            msg: "Cannot link an account to an empty external id".to_string(),
            source: None,
        });
    }

    let key = link_key(external_id);
    if let Some(existing) = repository.get_link(&key).await? {
        if existing.local_account_id == account_id {
            return Ok(existing);
        }
        warn!(
            external_id,
            previous_account_id = %existing.local_account_id,
            account_id,
            "replacing link for external identity"
        );
    }

    let record = LinkRecord {
        local_account_id: account_id.to_string(),
        linked_at: WrappedChronoDateTime::now(),
    };
    repository.set_link(&key, &record).await?;
    debug!(external_id, account_id, "persisted identity link");

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;

    fn account(id: &str, email: &str) -> LocalAccount {
        LocalAccount {
            id: id.to_string(),
            username: None,
            email: Some(email.to_string()),
        }
    }

    fn setup_repo() -> Repository {
        shared::setup_test!();
        let repo = Repository::new();
        repo.insert_account(account("U1", "u1@example.com"));
        repo.insert_account(account("U2", "jane@example.com"));
        repo
    }

    #[tokio::test]
    async fn test_link_takes_precedence_over_email() {
        let repo = setup_repo();
        persist_link(&repo, "E1", "U1").await.unwrap();

        let resolution = resolve_identity(
            &repo,
            ResolveIdentityParams {
                external_id: Some("E1"),
                email: Some("jane@example.com"),
                email_verified: true,
            },
        )
        .await;

        assert_eq!(resolution, IdentityResolution::Linked(account("U1", "u1@example.com")));
    }

    #[tokio::test]
    async fn test_verified_email_match_without_link() {
        let repo = setup_repo();

        let resolution = resolve_identity(
            &repo,
            ResolveIdentityParams {
                external_id: Some("E9"),
                email: Some("  Jane@Example.COM "),
                email_verified: true,
            },
        )
        .await;

        assert_eq!(
            resolution,
            IdentityResolution::EmailMatched(account("U2", "jane@example.com"))
        );
    }

    #[tokio::test]
    async fn test_unverified_email_is_not_matched() {
        let repo = setup_repo();

        let resolution = resolve_identity(
            &repo,
            ResolveIdentityParams {
                external_id: None,
                email: Some("jane@example.com"),
                email_verified: false,
            },
        )
        .await;

        assert_eq!(resolution, IdentityResolution::NoMatch);
    }

    #[tokio::test]
    async fn test_no_external_id_and_no_email_is_no_match() {
        let repo = setup_repo();

        let resolution = resolve_identity(
            &repo,
            ResolveIdentityParams {
                external_id: None,
                email: None,
                email_verified: true,
            },
        )
        .await;

        assert!(!resolution.is_match());
    }

    #[tokio::test]
    async fn test_link_to_vanished_account_does_not_fall_back_to_email() {
        let repo = setup_repo();
        persist_link(&repo, "E1", "deleted-account").await.unwrap();

        let resolution = resolve_identity(
            &repo,
            ResolveIdentityParams {
                external_id: Some("E1"),
                email: Some("jane@example.com"),
                email_verified: true,
            },
        )
        .await;

        assert_eq!(resolution, IdentityResolution::NoMatch);
    }

    #[tokio::test]
    async fn test_persist_link_is_idempotent() {
        let repo = setup_repo();

        let first = persist_link(&repo, "E1", "U1").await.unwrap();
        let second = persist_link(&repo, "E1", "U1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.link_count(), 1);
    }

    #[tokio::test]
    async fn test_persist_link_replaces_link_to_other_account() {
        let repo = setup_repo();
        persist_link(&repo, "E1", "U1").await.unwrap();

        let record = persist_link(&repo, "E1", "U2").await.unwrap();

        assert_eq!(record.local_account_id, "U2");
        let stored = repo.get_link(&link_key("E1")).await.unwrap().unwrap();
        assert_eq!(stored.local_account_id, "U2");
    }

    #[tokio::test]
    async fn test_persist_link_rejects_empty_external_id() {
        let repo = setup_repo();
        let result = persist_link(&repo, " ", "U1").await;
        assert!(matches!(result, Err(CommonError::InvalidRequest { .. })));
        assert_eq!(repo.link_count(), 0);
    }

    #[test]
    fn test_link_key() {
        assert_eq!(link_key("12345"), "oauth2_user_12345");
    }
}
