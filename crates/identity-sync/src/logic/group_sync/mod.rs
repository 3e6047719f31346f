//! Group synchronization from provider group claims.
//!
//! Each login reconciles the user's local group memberships against the
//! groups the provider currently asserts:
//! 1. Parse the `token=group` mapping rules
//! 2. Compute the target set of local group names from the raw claims
//! 3. Walk the user's current memberships, keeping those in the target set
//!    and removing the rest
//! 4. Add the user to each remaining target group that exists locally
//!
//! The membership read-modify-write is not serialized here. Two concurrent
//! logins for the same user can interleave; the next login converges any
//! drift, and hosts that need stricter guarantees hold a per-user lock around
//! [`sync_user_groups`].

pub mod reconcile;
pub use self::reconcile::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::profile_mapping::{AttributePath, scalar_to_string};

/// Which current memberships a reconciliation is allowed to revoke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationScope {
    /// Every group the user belongs to is owned by the provider's claims
    #[default]
    AllMemberships,
    /// Only groups that are the target of some mapping rule are touched
    MappedGroupsOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSyncConfig {
    /// Comma-separated `external_token=local_group` pairs
    pub group_matching: String,
    /// Path of the comparable token inside object-shaped claims. Empty means
    /// claims are compared directly.
    pub name_attribute: String,
    pub scope: ReconciliationScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMappingRule {
    pub external_token: String,
    pub local_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupMappingRules {
    pub rules: Vec<GroupMappingRule>,
    /// Entries that could not be parsed. They match nothing.
    pub skipped: Vec<String>,
}

impl GroupMappingRules {
    /// Parse `a=x,b=y`. Whitespace around entries and around `=` is ignored;
    /// `a=b=c` maps `a` to `b`.
    pub fn parse(rule_string: &str) -> Self {
        let mut parsed = Self::default();

        for entry in rule_string.split(',').map(str::trim) {
            if entry.is_empty() {
                continue;
            }

            let mut parts = entry.split('=').map(str::trim);
            match (parts.next(), parts.next()) {
                (Some(token), Some(group)) if !token.is_empty() && !group.is_empty() => {
                    parsed.rules.push(GroupMappingRule {
                        external_token: token.to_string(),
                        local_group: group.to_string(),
                    });
                }
                _ => parsed.skipped.push(entry.to_string()),
            }
        }

        parsed
    }

    pub fn targets_group(&self, local_group: &str) -> bool {
        self.rules.iter().any(|r| r.local_group == local_group)
    }

    /// Local group names asserted by `claims`, in rule order, without
    /// duplicates.
    pub fn target_groups(
        &self,
        claims: &[Value],
        name_attribute: Option<&AttributePath>,
    ) -> Vec<String> {
        let tokens: Vec<String> = claims
            .iter()
            .filter_map(|claim| claim_token(claim, name_attribute))
            .collect();

        let mut targets: Vec<String> = Vec::new();
        for rule in &self.rules {
            let asserted = tokens.iter().any(|t| *t == rule.external_token);
            if asserted && !targets.contains(&rule.local_group) {
                targets.push(rule.local_group.clone());
            }
        }
        targets
    }
}

/// The comparable token of a single group claim.
pub fn claim_token(claim: &Value, name_attribute: Option<&AttributePath>) -> Option<String> {
    match name_attribute {
        Some(path) if claim.is_object() => path.extract_present(claim).and_then(scalar_to_string),
        _ => scalar_to_string(claim),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperation {
    ListMemberships,
    LookupGroup,
    AddMember,
    RemoveMember,
}

/// A host call that failed during reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSyncError {
    pub operation: GroupOperation,
    pub group: Option<String>,
    pub message: String,
}

/// What a reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupSyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub retained: Vec<String>,
    /// Target groups with no local counterpart
    pub missing: Vec<String>,
    pub skipped_rules: Vec<String>,
    pub errors: Vec<GroupSyncError>,
}

impl GroupSyncReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn mutation_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}
