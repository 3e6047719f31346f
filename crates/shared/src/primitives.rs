use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedChronoDateTime(chrono::DateTime<chrono::Utc>);

impl WrappedChronoDateTime {
    pub fn get_inner(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }

    pub fn new(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self(value)
    }

    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }
}

impl TryFrom<&str> for WrappedChronoDateTime {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // SQL-style datetime first, then RFC3339
        let parsed = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .or_else(|_| chrono::DateTime::parse_from_rfc3339(value).map(|dt| dt.into()))
            .map_err(|_e| anyhow::anyhow!("invalid datetime value"))?;

        Ok(WrappedChronoDateTime::new(parsed))
    }
}

impl std::fmt::Display for WrappedChronoDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for WrappedChronoDateTime {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self(value)
    }
}

impl From<WrappedChronoDateTime> for chrono::DateTime<chrono::Utc> {
    fn from(value: WrappedChronoDateTime) -> Self {
        value.0
    }
}

// Pagination types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationRequest {
    pub page_size: i64,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Encode a composite key into an opaque base64 pagination token
pub fn encode_pagination_token(key_parts: &[String]) -> String {
    base64::engine::general_purpose::STANDARD.encode(key_parts.join("__").as_bytes())
}

/// Decode a base64-encoded pagination token back to a vector of strings
pub fn decode_pagination_token(token: &str) -> anyhow::Result<Vec<String>> {
    let decoded_bytes = base64::engine::general_purpose::STANDARD.decode(token)?;
    let decoded_str = String::from_utf8(decoded_bytes)?;
    Ok(decoded_str.split("__").map(|s| s.to_string()).collect())
}

impl<T> PaginatedResponse<T> {
    /// Create a paginated response from a list of items fetched with `page_size + 1`.
    ///
    /// If more than `page_size` items were fetched, the extra item is dropped
    /// and the next page token is built from the last kept item's composite key.
    pub fn from_items_with_extra<F>(
        mut items: Vec<T>,
        pagination: &PaginationRequest,
        get_id: F,
    ) -> Self
    where
        F: FnOnce(&T) -> Vec<String>,
    {
        let has_more = items.len() as i64 > pagination.page_size;

        if has_more {
            items.pop();
        }

        let next_page_token = if has_more && !items.is_empty() {
            items
                .last()
                .map(|item| encode_pagination_token(&get_id(item)))
        } else {
            None
        };

        Self {
            items,
            next_page_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_token_round_trip_composite_key() {
        let token = encode_pagination_token(&["staff".to_string(), "g-1".to_string()]);
        let decoded = decode_pagination_token(&token).unwrap();
        assert_eq!(decoded, vec!["staff".to_string(), "g-1".to_string()]);
    }

    #[test]
    fn test_from_items_with_extra_sets_next_page_token() {
        let pagination = PaginationRequest {
            page_size: 2,
            next_page_token: None,
        };
        let page = PaginatedResponse::from_items_with_extra(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            &pagination,
            |item| vec![item.clone()],
        );
        assert_eq!(page.items, vec!["a".to_string(), "b".to_string()]);
        let token = page.next_page_token.expect("expected another page");
        assert_eq!(decode_pagination_token(&token).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_from_items_with_extra_last_page() {
        let pagination = PaginationRequest {
            page_size: 5,
            next_page_token: None,
        };
        let page =
            PaginatedResponse::from_items_with_extra(vec![1, 2], &pagination, |item| {
                vec![item.to_string()]
            });
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_datetime_parses_sql_and_rfc3339() {
        let sql = WrappedChronoDateTime::try_from("2024-05-01 10:00:00.000").unwrap();
        let rfc = WrappedChronoDateTime::try_from("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(sql, rfc);
        assert!(WrappedChronoDateTime::try_from("yesterday").is_err());
    }
}
