use serde::Serialize;
use thiserror::Error;

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug, Serialize)]
pub enum CommonError {
    #[error("user could not be authenticated: {msg}")]
    Authentication {
        msg: String,
        #[serde(skip)]
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("could not find resource: {msg}")]
    NotFound {
        msg: String,
        lookup_id: String,
        #[serde(skip)]
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("unknown error")]
    Unknown(
        #[serde(skip)]
        #[from]
        anyhow::Error,
    ),
    #[error("invalid request: {msg}")]
    InvalidRequest {
        msg: String,
        #[serde(skip)]
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("invalid response: {msg}")]
    InvalidResponse {
        msg: String,
        #[serde(skip)]
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("repository error: {msg}")]
    Repository {
        msg: String,
        #[serde(skip)]
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("io error")]
    IoError {
        #[serde(skip)]
        #[from]
        #[source]
        source: std::io::Error,
    },
    #[error("url parse error")]
    UrlParseError {
        #[serde(skip)]
        #[from]
        #[source]
        source: url::ParseError,
    },
    #[error("serde json error")]
    SerdeSerializationError {
        #[serde(skip)]
        #[from]
        #[source]
        source: serde_json::Error,
    },
    #[error("serde yaml error")]
    SerdeYamlError {
        #[serde(skip)]
        #[from]
        #[source]
        source: serde_yaml::Error,
    },
    #[error("reqwest error")]
    ReqwestError {
        #[serde(skip)]
        #[from]
        #[source]
        source: reqwest::Error,
    },
}

impl CommonError {
    /// Short, stable name of the variant, suitable for structured log fields.
    pub fn name(&self) -> &'static str {
        match self {
            CommonError::Authentication { .. } => "Authentication",
            CommonError::NotFound { .. } => "NotFound",
            CommonError::InvalidRequest { .. } => "InvalidRequest",
            CommonError::InvalidResponse { .. } => "InvalidResponse",
            CommonError::Repository { .. } => "Repository",
            CommonError::Unknown(_)
            | CommonError::IoError { .. }
            | CommonError::UrlParseError { .. }
            | CommonError::SerdeSerializationError { .. }
            | CommonError::SerdeYamlError { .. }
            | CommonError::ReqwestError { .. } => "InternalServerError",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    name: String,
    message: String,
}

impl From<&CommonError> for ErrorResponse {
    fn from(error: &CommonError) -> Self {
        ErrorResponse {
            name: error.name().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_uses_variant_name() {
        let err = CommonError::Authentication {
            msg: "profile fetch failed".to_string(),
            source: None,
        };
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(body["name"], "Authentication");
        assert_eq!(
            body["message"],
            "user could not be authenticated: profile fetch failed"
        );
    }

    #[test]
    fn test_wrapped_errors_are_internal() {
        let err: CommonError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.name(), "InternalServerError");
    }
}
