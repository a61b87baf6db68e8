//! Error types for the REST ORM
//!
//! One error enum for the engine (`RestError`) plus the conversions the
//! transport, cache and configuration layers need to feed into it.

use serde_json::Value;
use thiserror::Error;

/// Result type alias for REST model operations
pub type RestResult<T> = Result<T, RestError>;

/// Error types for REST model operations
#[derive(Debug, Clone, Error)]
pub enum RestError {
    /// `find_or_fail` / `first_or_fail` found nothing
    #[error("No query results for entity [{entity}]")]
    NotFound { entity: String },

    /// The remote API rejected a mutation with HTTP 422
    #[error("Remote validation exception [{status}]: {errors}")]
    RemoteValidation { status: u16, errors: Value },

    /// The connection referenced by an entity has no configuration
    #[error("Missing config for rest connection [{connection}]")]
    MissingConfiguration { connection: String },

    /// Non-success HTTP status or network level failure
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// Relationship resolution failed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed or is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Primary key is missing or invalid
    #[error("Primary key is missing or invalid")]
    MissingPrimaryKey,
}

impl RestError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Transport { status, .. } => *status,
            RestError::RemoteValidation { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RestError::Transport { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RestError::NotFound { .. })
    }

    /// Promote a 422 transport failure into a `RemoteValidation` error.
    ///
    /// Any other error is returned unchanged.
    pub fn into_remote_validation(self) -> RestError {
        match self {
            RestError::Transport {
                status: Some(422),
                body,
                ..
            } => {
                let errors = body
                    .as_deref()
                    .map(|raw| {
                        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
                    })
                    .unwrap_or(Value::Null);

                RestError::RemoteValidation {
                    status: 422,
                    errors,
                }
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RestError {
    fn from(err: serde_yaml::Error) -> Self {
        RestError::Configuration(err.to_string())
    }
}

impl From<url::ParseError> for RestError {
    fn from(err: url::ParseError) -> Self {
        RestError::Configuration(format!("Invalid base url: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unprocessable_entity_becomes_remote_validation() {
        let err = RestError::Transport {
            status: Some(422),
            message: "POST /users returned 422".to_string(),
            body: Some(r#"{"email":["has already been taken"]}"#.to_string()),
        };

        match err.into_remote_validation() {
            RestError::RemoteValidation { status, errors } => {
                assert_eq!(status, 422);
                assert_eq!(errors, json!({"email": ["has already been taken"]}));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_other_failures_are_left_alone() {
        let err = RestError::Transport {
            status: Some(500),
            message: "boom".to_string(),
            body: None,
        };

        let converted = err.into_remote_validation();
        assert!(converted.is_transport());
        assert_eq!(converted.status(), Some(500));
    }

    #[test]
    fn test_non_json_validation_body_is_kept_as_string() {
        let err = RestError::Transport {
            status: Some(422),
            message: "bad".to_string(),
            body: Some("name missing".to_string()),
        };

        match err.into_remote_validation() {
            RestError::RemoteValidation { errors, .. } => {
                assert_eq!(errors, Value::String("name missing".to_string()))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_display_messages() {
        let err = RestError::MissingConfiguration {
            connection: "billing".to_string(),
        };
        assert_eq!(err.to_string(), "Missing config for rest connection [billing]");

        let err = RestError::NotFound {
            entity: "User".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No query results for entity [User]");
    }
}
