//! Error types for the Adyen provider.

use thiserror::Error;

use crate::client::ApiError;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request carried a value that does not fit the schema.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not (or not correctly) configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state or configuration payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state handed over by the host is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A Management API call failed. `context` names the operation.
    #[error("{context}: {error}")]
    Api {
        /// What the provider was doing, e.g. "Could not create merchant webhook".
        context: String,
        /// The underlying client error.
        error: ApiError,
    },
}

impl ProviderError {
    /// Wrap a client error with the operation it interrupted.
    pub fn api(context: impl Into<String>, error: ApiError) -> Self {
        Self::Api {
            context: context.into(),
            error,
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Api { context, error } => {
                let msg = format!("{}: {}", context, error);
                match error.status_code() {
                    Some(401) | Some(403) => tonic::Status::permission_denied(msg),
                    Some(404) => tonic::Status::not_found(msg),
                    Some(400) | Some(422) => tonic::Status::invalid_argument(msg),
                    Some(429) => tonic::Status::resource_exhausted(msg),
                    Some(_) => tonic::Status::internal(msg),
                    None => tonic::Status::unavailable(msg),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("adyen_payment".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: adyen_payment");

        let err = ProviderError::api(
            "Could not delete merchant webhook",
            ApiError::status(500, "boom"),
        );
        assert_eq!(
            format!("{}", err),
            "Could not delete merchant webhook: Adyen API returned HTTP 500: boom"
        );
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::UnknownResource("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[test]
    fn test_api_error_to_status() {
        let status: tonic::Status =
            ProviderError::api("ctx", ApiError::status(401, "unauthorized")).into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);

        let status: tonic::Status =
            ProviderError::api("ctx", ApiError::status(422, "invalid")).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status =
            ProviderError::api("ctx", ApiError::status(429, "slow down")).into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);

        let status: tonic::Status =
            ProviderError::api("ctx", ApiError::status(503, "down")).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn api_error_is_printed_once() {
        use std::error::Error as _;

        let err = ProviderError::api("Could not read webhook", ApiError::status(500, "x"));
        assert!(err.source().is_none());
        assert_eq!(
            err.to_string().matches("HTTP 500").count(),
            1,
            "{}",
            err
        );
    }
}
