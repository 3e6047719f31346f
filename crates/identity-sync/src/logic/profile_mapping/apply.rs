use serde_json::Value;
use tracing::debug;

use super::path::{AttributePath, scalar_to_string};
use super::{AttributePathConfig, NormalizedIdentity};

/// Extract a string attribute. Misses and unusable shapes leave it unset.
fn extract_string_attribute(profile: &Value, configured: &str, attribute: &str) -> Option<String> {
    let path = AttributePath::parse(configured)?;
    let Some(value) = path.extract_present(profile) else {
        debug!(attribute, path = %path, "attribute path resolved to nothing");
        return None;
    };

    let extracted = scalar_to_string(value);
    if extracted.is_none() {
        debug!(
            attribute,
            path = %path,
            "attribute path resolved to a non-scalar value, ignoring"
        );
    }
    extracted
}

/// Extract group claims. An array is the claim list, any other present value
/// is treated as a single claim.
fn extract_group_claims(profile: &Value, configured: &str) -> Option<Vec<Value>> {
    let path = AttributePath::parse(configured)?;
    let Some(value) = path.extract_present(profile) else {
        debug!(attribute = "groups", path = %path, "attribute path resolved to nothing");
        return None;
    };

    match value {
        Value::Array(claims) => Some(claims.clone()),
        other => Some(vec![other.clone()]),
    }
}

/// Build a [`NormalizedIdentity`] from a raw profile document.
///
/// No attribute is required here; absence is handled by the caller.
pub fn apply_profile_mapping(profile: &Value, paths: &AttributePathConfig) -> NormalizedIdentity {
    NormalizedIdentity {
        external_id: extract_string_attribute(profile, &paths.user_id, "user_id"),
        username: extract_string_attribute(profile, &paths.username, "username"),
        display_name: extract_string_attribute(profile, &paths.name, "name"),
        email: extract_string_attribute(profile, &paths.email, "email"),
        raw_groups: extract_group_claims(profile, &paths.groups),
    }
}
