pub mod apply;
pub mod path;

pub use self::apply::*;
pub use self::path::{AttributePath, is_blank, scalar_to_string};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where each logical attribute lives in the provider's profile document.
///
/// Every value is a dot-separated path; an empty string disables extraction
/// for that attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributePathConfig {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub groups: String,
}

/// Identity fields pulled out of a raw provider profile. Any of them may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIdentity {
    pub external_id: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Group claims exactly as the provider sent them: plain tokens or objects
    pub raw_groups: Option<Vec<Value>>,
}
