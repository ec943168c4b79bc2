//! Error types for the crocodoc client.
//!
//! Every fallible operation returns [`CrocodocError`]. The variants fall into
//! five groups, and the group tells the caller whether anything went over
//! the wire:
//!
//! * **Precondition**: rejected locally before any request was built
//!   (missing identifier, empty batch, bad thumbnail size, bad config).
//!   [`CrocodocError::is_precondition`] is `true` for these.
//! * **Transport**: the request never produced an HTTP status (connection
//!   refused, timeout). Surfaced verbatim from `crocodoc-http`.
//! * **Http**: the service answered with a 4xx/5xx status; see
//!   [`HttpError`].
//! * **Decode**: the service answered 200 but the body did not have the
//!   expected shape.
//! * **Local I/O**: reading an upload source or saving a download failed.
//!
//! Nothing is rolled back on error. In particular a status refresh that
//! reports a failed conversion has already updated the document's status;
//! see [`crate::document::StatusUpdate`].

use crocodoc_http::TransportError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the crocodoc client.
#[derive(Debug, Error)]
pub enum CrocodocError {
    // ── Precondition errors ───────────────────────────────────────────────
    /// The document has no identifier yet (it was never uploaded).
    #[error("Cannot call {operation}: no uuid is set on the document")]
    MissingIdentifier { operation: &'static str },

    /// A batch status query was issued with no identifiers.
    #[error("Cannot query statuses: at least one uuid is required")]
    EmptyBatch,

    /// Thumbnail size is not `<w>x<h>` with both sides in 1–300.
    #[error("Invalid thumbnail size '{size}': expected '<width>x<height>' with each side 1–300 (e.g. '100x100')")]
    InvalidThumbnailSize { size: String },

    /// Client configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Connection-level failure; no HTTP status was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with a 4xx or 5xx status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A 200 response whose body did not match the expected shape.
    #[error("Unexpected response to {operation}: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    /// The status batch did not include the requested document.
    #[error("Status response did not include document '{uuid}'")]
    MissingStatus { uuid: String },

    /// The service reports that converting the document failed.
    #[error("Conversion of document '{uuid}' failed: {message}")]
    ConversionFailed { uuid: String, message: String },

    // ── Local I/O errors ──────────────────────────────────────────────────
    /// Could not open or read the byte source for an upload.
    #[error("Failed to read upload source '{name}': {source}")]
    ReadInput {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a downloaded file.
    #[error("Failed to save '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CrocodocError {
    /// `true` when the error was raised before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CrocodocError::MissingIdentifier { .. }
                | CrocodocError::EmptyBatch
                | CrocodocError::InvalidThumbnailSize { .. }
                | CrocodocError::InvalidConfig(_)
        )
    }

    /// The classified HTTP error, if this is one.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            CrocodocError::Http(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn decode(operation: &'static str, detail: impl fmt::Display) -> Self {
        CrocodocError::Decode {
            operation,
            detail: detail.to_string(),
        }
    }
}

/// Which status band an [`HttpError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// 400–499.
    Client,
    /// 500–599.
    Server,
}

/// A 4xx/5xx response, classified by [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: u16,
    pub kind: HttpErrorKind,
    /// Phrase from the status table plus any `error` field from the body.
    pub message: String,
}

impl HttpError {
    pub fn is_client_error(&self) -> bool {
        self.kind == HttpErrorKind::Client
    }

    pub fn is_server_error(&self) -> bool {
        self.kind == HttpErrorKind::Server
    }

    /// `true` for a client error whose status is one of `statuses`.
    ///
    /// The service throttles with an ordinary 4xx, so which codes mean
    /// "rate limited" is configuration, see
    /// [`crate::ClientConfig::rate_limit_statuses`].
    pub fn is_rate_limit(&self, statuses: &[u16]) -> bool {
        self.is_client_error() && statuses.contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_are_flagged() {
        assert!(CrocodocError::EmptyBatch.is_precondition());
        assert!(CrocodocError::MissingIdentifier { operation: "Delete" }.is_precondition());
        assert!(CrocodocError::InvalidThumbnailSize { size: "0x1".into() }.is_precondition());

        let remote = CrocodocError::Http(HttpError {
            status: 500,
            kind: HttpErrorKind::Server,
            message: "Unknown server error: status 500".into(),
        });
        assert!(!remote.is_precondition());
        assert_eq!(remote.as_http().map(|e| e.status), Some(500));
    }

    #[test]
    fn rate_limit_is_a_configured_client_status() {
        let throttled = HttpError {
            status: 400,
            kind: HttpErrorKind::Client,
            message: "HTTP 400 Bad Request: rate limit exceeded".into(),
        };
        assert!(throttled.is_rate_limit(&[400]));
        assert!(!throttled.is_rate_limit(&[]));
        assert!(!throttled.is_rate_limit(&[429]));

        let server = HttpError {
            status: 503,
            kind: HttpErrorKind::Server,
            message: String::new(),
        };
        assert!(!server.is_rate_limit(&[503]));
    }

    #[test]
    fn missing_identifier_display() {
        let e = CrocodocError::MissingIdentifier {
            operation: "CreateSession",
        };
        assert!(e.to_string().contains("CreateSession"));
        assert!(e.to_string().contains("no uuid"));
    }

    #[test]
    fn conversion_failed_display() {
        let e = CrocodocError::ConversionFailed {
            uuid: "abc".into(),
            message: "password protected".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("abc"), "got: {msg}");
        assert!(msg.contains("password protected"), "got: {msg}");
    }

    #[test]
    fn transport_error_is_transparent() {
        let e: CrocodocError = TransportError::Timeout {
            url: "https://crocodoc.com/api/v2/document/status".into(),
        }
        .into();
        assert!(e.to_string().starts_with("Request to 'https://crocodoc.com"));
    }
}
