mod memory;

use serde::{Deserialize, Serialize};
use shared::{
    error::CommonError,
    primitives::{PaginatedResponse, PaginationRequest, WrappedChronoDateTime},
};

pub use memory::Repository;

// Account types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAccount {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

// Group types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGroup {
    pub id: String,
    pub name: String,
}

// Link types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub local_account_id: String,
    pub linked_at: WrappedChronoDateTime,
}

/// Key/value store holding external identity links.
///
/// Only get and set are required; links are never listed or deleted.
#[allow(async_fn_in_trait)]
pub trait LinkStoreLike {
    async fn get_link(&self, key: &str) -> Result<Option<LinkRecord>, CommonError>;

    async fn set_link(&self, key: &str, record: &LinkRecord) -> Result<(), CommonError>;
}

/// Read access to the host's accounts
#[allow(async_fn_in_trait)]
pub trait AccountDirectoryLike {
    async fn get_account_by_id(&self, id: &str) -> Result<Option<LocalAccount>, CommonError>;

    /// `email` is already normalized (trimmed, lowercased).
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<LocalAccount>, CommonError>;
}

/// The host's group membership API
#[allow(async_fn_in_trait)]
pub trait GroupDirectoryLike {
    /// Groups the given account currently belongs to
    async fn list_user_groups(
        &self,
        user_id: &str,
        pagination: &PaginationRequest,
    ) -> Result<PaginatedResponse<LocalGroup>, CommonError>;

    async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>, CommonError>;

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), CommonError>;

    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), CommonError>;
}
