use thiserror::Error;

use super::models::AdyenErrorBody;

/// Errors returned by the Management API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Management API answered with a non-success status.
    #[error("Adyen API returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The error message from the body, or the raw body text.
        message: String,
        /// The decoded Adyen error body, when the API sent one.
        body: Option<AdyenErrorBody>,
    },

    /// A response body did not match the expected shape.
    #[error("failed to decode Adyen API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client could not be built from the given settings.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Build a status error from a raw message.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Build a status error from a response body, decoding it as an Adyen
    /// error when possible.
    pub fn from_response(status: u16, text: &str) -> Self {
        match serde_json::from_str::<AdyenErrorBody>(text) {
            Ok(body) => {
                let message = body.describe().unwrap_or_else(|| text.to_owned());
                Self::Status {
                    status,
                    message,
                    body: Some(body),
                }
            },
            Err(_) => Self::status(status, text),
        }
    }

    /// The HTTP status, if the API answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a lookup failed because the webhook does not exist. The
    /// company endpoints answer 422 for ids they do not know.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status_code(), Some(404) | Some(422))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ApiError::status(500, "internal error");
        assert_eq!(err.to_string(), "Adyen API returned HTTP 500: internal error");

        let err = ApiError::Configuration("api key contains a newline".into());
        assert_eq!(
            err.to_string(),
            "invalid client configuration: api key contains a newline"
        );
    }

    #[test]
    fn decodes_adyen_error_body() {
        let text = r#"{"status":422,"errorCode":"02_004","message":"Required field 'url' is missing","errorType":"validation","pspReference":"PSP123"}"#;
        let err = ApiError::from_response(422, text);

        assert_eq!(err.status_code(), Some(422));
        assert_eq!(
            err.to_string(),
            "Adyen API returned HTTP 422: 02_004 Required field 'url' is missing (pspReference PSP123)"
        );
        match err {
            ApiError::Status { body: Some(body), .. } => {
                assert_eq!(body.error_type.as_deref(), Some("validation"));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn keeps_raw_text_for_non_json_bodies() {
        let err = ApiError::from_response(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Adyen API returned HTTP 502: Bad Gateway");
    }

    #[test]
    fn not_found_classification() {
        assert!(ApiError::status(404, "gone").is_not_found());
        assert!(ApiError::status(422, "invalid").is_not_found());
        assert!(!ApiError::status(500, "boom").is_not_found());
        assert!(!ApiError::Configuration("x".into()).is_not_found());
    }
}
