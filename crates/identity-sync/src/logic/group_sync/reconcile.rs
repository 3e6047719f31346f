use std::collections::HashSet;

use serde_json::Value;
use shared::error::CommonError;
use shared::primitives::PaginationRequest;
use tracing::{debug, warn};

use super::{
    GroupMappingRules, GroupOperation, GroupSyncConfig, GroupSyncError, GroupSyncReport,
    ReconciliationScope,
};
use crate::logic::profile_mapping::AttributePath;
use crate::repository::{GroupDirectoryLike, LocalGroup};

const MEMBERSHIP_PAGE_SIZE: i64 = 1000;
const MAX_MEMBERSHIP_PAGES: usize = 100;

fn enumeration_error(msg: String) -> CommonError {
    CommonError::Repository { msg, source: None }
}

/// Current memberships that this reconciliation may revoke.
///
/// A page token that repeats, an empty page that still carries a token, or
/// more than [`MAX_MEMBERSHIP_PAGES`] pages is an error.
async fn list_reconcilable_groups<R: GroupDirectoryLike>(
    repository: &R,
    user_id: &str,
    rules: &GroupMappingRules,
    scope: ReconciliationScope,
) -> Result<Vec<LocalGroup>, CommonError> {
    let mut all_groups = Vec::new();
    let mut seen_tokens = HashSet::new();
    let mut next_page_token = None;
    for _ in 0..MAX_MEMBERSHIP_PAGES {
        let pagination = PaginationRequest {
            page_size: MEMBERSHIP_PAGE_SIZE,
            next_page_token,
        };
        let result = repository.list_user_groups(user_id, &pagination).await?;
        let page_was_empty = result.items.is_empty();
        all_groups.extend(result.items);

        let Some(token) = result.next_page_token else {
            return Ok(filter_by_scope(all_groups, rules, scope));
        };
        if page_was_empty {
            return Err(enumeration_error(
                "Membership listing returned an empty page with a next page token".to_string(),
            ));
        }
        if !seen_tokens.insert(token.clone()) {
            return Err(enumeration_error("Membership listing repeated a page token".to_string()));
        }
        next_page_token = Some(token);
    }

    Err(enumeration_error(format!("Membership listing exceeded {MAX_MEMBERSHIP_PAGES} pages")))
}

fn filter_by_scope(
    all_groups: Vec<LocalGroup>,
    rules: &GroupMappingRules,
    scope: ReconciliationScope,
) -> Vec<LocalGroup> {
    match scope {
        ReconciliationScope::AllMemberships => all_groups,
        ReconciliationScope::MappedGroupsOnly => all_groups
            .into_iter()
            .filter(|g| rules.targets_group(&g.name))
            .collect(),
    }
}

fn record_error(
    report: &mut GroupSyncReport,
    operation: GroupOperation,
    group: Option<&str>,
    error: &CommonError,
) {
    warn!(
        ?operation,
        group,
        error = %error,
        "group sync operation failed, continuing"
    );
    report.errors.push(GroupSyncError {
        operation,
        group: group.map(str::to_string),
        message: error.to_string(),
    });
}

/// Reconcile a user's local group memberships with the provider's claims.
///
/// Best effort: every failed host call is recorded in the returned report
/// and the reconciliation moves on. Only a failure to enumerate the current
/// memberships stops it, before any mutation is made.
pub async fn sync_user_groups<R: GroupDirectoryLike>(
    repository: &R,
    user_id: &str,
    config: &GroupSyncConfig,
    raw_groups: &[Value],
) -> GroupSyncReport {
    let rules = GroupMappingRules::parse(&config.group_matching);
    let name_attribute = AttributePath::parse(&config.name_attribute);

    let mut report = GroupSyncReport {
        skipped_rules: rules.skipped.clone(),
        ..Default::default()
    };
    for entry in &rules.skipped {
        warn!(entry = %entry, "ignoring malformed group mapping rule");
    }

    let mut targets = rules.target_groups(raw_groups, name_attribute.as_ref());
    debug!(
        user_id,
        claims = raw_groups.len(),
        targets = ?targets,
        "computed target groups"
    );

    let current = list_reconcilable_groups(repository, user_id, &rules, config.scope).await;
    let current = match current {
        Ok(groups) => groups,
        Err(e) => {
            record_error(&mut report, GroupOperation::ListMemberships, None, &e);
            return report;
        }
    };

    for group in current {
        if let Some(pos) = targets.iter().position(|t| *t == group.name) {
            targets.remove(pos);
            report.retained.push(group.name);
            continue;
        }

        match repository.remove_group_member(&group.id, user_id).await {
            Ok(()) => {
                debug!(user_id, group = %group.name, "removed group membership");
                report.removed.push(group.name);
            }
            Err(e) => record_error(
                &mut report,
                GroupOperation::RemoveMember,
                Some(group.name.as_str()),
                &e,
            ),
        }
    }

    for name in targets {
        let group = match repository.get_group_by_name(&name).await {
            Ok(Some(group)) => group,
            Ok(None) => {
                warn!(group = %name, "mapped group does not exist locally, skipping");
                report.missing.push(name);
                continue;
            }
            Err(e) => {
                record_error(
                    &mut report,
                    GroupOperation::LookupGroup,
                    Some(name.as_str()),
                    &e,
                );
                continue;
            }
        };

        match repository.add_group_member(&group.id, user_id).await {
            Ok(()) => {
                debug!(user_id, group = %group.name, "added group membership");
                report.added.push(group.name);
            }
            Err(e) => record_error(
                &mut report,
                GroupOperation::AddMember,
                Some(name.as_str()),
                &e,
            ),
        }
    }

    report
}
