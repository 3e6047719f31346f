pub mod group_sync;
pub mod identity_link;
pub mod profile_mapping;
pub mod user_auth_flow;
