use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use shared::error::CommonError;
use shared::primitives::{PaginatedResponse, PaginationRequest, decode_pagination_token};

use crate::repository::{
    AccountDirectoryLike, GroupDirectoryLike, LinkRecord, LinkStoreLike, LocalAccount, LocalGroup,
};

/// In-memory implementation of the host-facing traits.
///
/// Cloning is cheap and clones share state. Useful for development hosts and
/// for tests; a real host backs these traits with its own storage.
#[derive(Clone, Default)]
pub struct Repository {
    links: Arc<DashMap<String, LinkRecord>>,
    accounts: Arc<DashMap<String, LocalAccount>>,
    /// Groups keyed by id
    groups: Arc<DashMap<String, LocalGroup>>,
    /// Group ids keyed by account id
    memberships: Arc<DashMap<String, BTreeSet<String>>>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: LocalAccount) {
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn insert_group(&self, group: LocalGroup) {
        self.groups.insert(group.id.clone(), group);
    }

    /// Names of the groups the account belongs to, sorted
    pub fn group_names_for(&self, user_id: &str) -> BTreeSet<String> {
        self.memberships
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.groups.get(id).map(|g| g.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl LinkStoreLike for Repository {
    async fn get_link(&self, key: &str) -> Result<Option<LinkRecord>, CommonError> {
        Ok(self.links.get(key).map(|r| r.value().clone()))
    }

    async fn set_link(&self, key: &str, record: &LinkRecord) -> Result<(), CommonError> {
        self.links.insert(key.to_string(), record.clone());
        Ok(())
    }
}

impl AccountDirectoryLike for Repository {
    async fn get_account_by_id(&self, id: &str) -> Result<Option<LocalAccount>, CommonError> {
        Ok(self.accounts.get(id).map(|a| a.value().clone()))
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<LocalAccount>, CommonError> {
        let mut matches: Vec<LocalAccount> = self
            .accounts
            .iter()
            .filter(|a| {
                a.email
                    .as_deref()
                    .is_some_and(|e| e.trim().to_lowercase() == email)
            })
            .map(|a| a.value().clone())
            .collect();
        // DashMap iteration order is unspecified
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.into_iter().next())
    }
}

impl GroupDirectoryLike for Repository {
    async fn list_user_groups(
        &self,
        user_id: &str,
        pagination: &PaginationRequest,
    ) -> Result<PaginatedResponse<LocalGroup>, CommonError> {
        let cursor = match &pagination.next_page_token {
            Some(token) => {
                let parts =
                    decode_pagination_token(token).map_err(|e| CommonError::Repository {
                        msg: format!("Invalid pagination token: {e}"),
                        source: Some(e),
                    })?;
                parts.into_iter().next()
            }
            None => None,
        };

        let mut groups: Vec<LocalGroup> = self
            .memberships
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.groups.get(id).map(|g| g.value().clone()))
                    .collect()
            })
            .unwrap_or_default();
        groups.sort_by(|a, b| a.id.cmp(&b.id));

        let page_size = pagination.page_size.max(1) as usize;
        let items: Vec<LocalGroup> = groups
            .into_iter()
            .filter(|g| cursor.as_ref().is_none_or(|c| g.id.as_str() > c.as_str()))
            .take(page_size + 1)
            .collect();

        Ok(PaginatedResponse::from_items_with_extra(
            items,
            pagination,
            |g| vec![g.id.clone()],
        ))
    }

    async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>, CommonError> {
        Ok(self
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.value().clone()))
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), CommonError> {
        if !self.groups.contains_key(group_id) {
            return Err(CommonError::NotFound {
                msg: "Group not found".to_string(),
                lookup_id: group_id.to_string(),
                source: None,
            });
        }
        self.memberships
            .entry(user_id.to_string())
            .or_default()
            .insert(group_id.to_string());
        Ok(())
    }

    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), CommonError> {
        if let Some(mut ids) = self.memberships.get_mut(user_id) {
            ids.remove(group_id);
        }
        Ok(())
    }
}
