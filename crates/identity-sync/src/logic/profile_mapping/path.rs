use serde_json::{Map, Value};

/// A dot-separated address into a JSON document, e.g. `data.attributes.email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    segments: Vec<String>,
}

impl AttributePath {
    /// Parse a configured path string.
    ///
    /// Returns `None` for a blank string, which means "do not extract".
    /// Trailing separators are ignored; any other empty segment is kept and
    /// makes every extraction miss.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }

        let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
        while segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        if segments.is_empty() {
            return None;
        }

        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the path through `root`.
    ///
    /// A blank value found along the way is returned as-is, so callers that
    /// only want usable values should call [`AttributePath::extract_present`].
    pub fn extract<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let last = self.segments.len().checked_sub(1)?;
        let mut fragment = root;

        for (idx, segment) in self.segments.iter().enumerate() {
            if segment.is_empty() || is_blank(fragment) {
                return None;
            }
            let map = fragment.as_object()?;
            let deref = lookup_key(map, segment)?;

            if is_blank(deref) || idx == last {
                return Some(deref);
            }
            fragment = deref;
        }

        None
    }

    pub fn extract_present<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.extract(root).filter(|v| !is_blank(v))
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// `null`, `false`, whitespace-only strings, and empty arrays or objects.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

/// Render a scalar claim as a string. Strings pass through, numbers use their
/// decimal form, every other shape yields `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Exact key first, then a key spelled differently (`userId`, `user_id`,
/// `:user_id`).
fn lookup_key<'a>(map: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    let exact = map.get(segment);
    if exact.is_some_and(|v| !matches!(v, Value::Null | Value::Bool(false))) {
        return exact;
    }

    let wanted = normalize_key(segment);
    if wanted.is_empty() {
        return exact;
    }
    map.iter()
        .find(|(key, value)| {
            key.as_str() != segment
                && !matches!(value, Value::Null | Value::Bool(false))
                && normalize_key(key) == wanted
        })
        .map(|(_, value)| value)
        .or(exact)
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
