//! Error types for the dashboard client
//!
//! Every backend call resolves to a [`ClientError`] on failure. None of them
//! are fatal: callers log, optionally notify, and keep the session running.

use thiserror::Error;

/// A response body that could not be turned into a typed schema
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body was not valid JSON for the expected shape
    #[error("{endpoint}: malformed response body: {source}")]
    Json {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Body parsed but a field violates the schema
    #[error("{endpoint}: invalid field `{field}`: {reason}")]
    InvalidField {
        endpoint: &'static str,
        field: String,
        reason: String,
    },
}

/// Failure of a single backend request
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure, timeout or connection refusal
    #[error("request to {path} failed: {message}")]
    Network { path: String, message: String },

    /// Backend answered with a non-success status
    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Requested process is gone
    #[error("process {pid} no longer exists")]
    NotFound { pid: u32 },

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Short machine-friendly kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Network { .. } => "network",
            ClientError::Status { .. } => "status",
            ClientError::Decode(_) => "decode",
            ClientError::NotFound { .. } => "not_found",
            ClientError::Url(_) => "url",
        }
    }
}

/// Failure writing or reading persisted settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure producing the CSV export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv writer: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv output was not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("could not write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = ClientError::Network {
            path: "api/dashboard".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.kind(), "network");
        assert_eq!(ClientError::NotFound { pid: 4 }.kind(), "not_found");
    }

    #[test]
    fn test_decode_error_display_names_endpoint() {
        let err = DecodeError::InvalidField {
            endpoint: "/api/snapshot",
            field: "processes[0].cpu".to_string(),
            reason: "must be a finite, non-negative number".to_string(),
        };
        let text = ClientError::from(err).to_string();
        assert!(text.contains("/api/snapshot"));
        assert!(text.contains("processes[0].cpu"));
    }
}
