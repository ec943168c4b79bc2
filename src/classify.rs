//! Response classification shared by every operation.
//!
//! The service reports failures through the status code, and for 4xx
//! responses usually adds a JSON body of the form `{"error": "..."}`. A
//! response must be classified *before* its body is decoded as the
//! operation's result, otherwise an error envelope would be decoded as if it
//! were a result envelope.
//!
//! | Status    | Classification                                  |
//! |-----------|-------------------------------------------------|
//! | 200       | [`Classification::Success`]                     |
//! | 400–499   | [`Classification::ClientError`] (phrase + body) |
//! | 500–599   | [`Classification::ServerError`] (body ignored)  |
//! | otherwise | [`Classification::Unclassified`]                |
//!
//! `Unclassified` statuses (1xx, 201, 3xx …) are not errors; the caller goes
//! on to decode the body as if it were a 200.

use crate::error::{HttpError, HttpErrorKind};
use crocodoc_http::Response;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

/// Reason phrases for the 4xx codes the service documents.
static CLIENT_ERROR_PHRASES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (400, "Bad Request"),
        (401, "Unauthorized"),
        (404, "Not Found"),
        (405, "Method Not Allowed"),
    ])
});

/// Body shape of a 4xx response.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

/// Outcome of inspecting a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    ClientError { status: u16, message: String },
    ServerError { status: u16 },
    /// Outside the three special-cased bands; treated as success-shaped.
    Unclassified { status: u16 },
}

impl Classification {
    /// Convert to a `Result`, keeping success-shaped outcomes as `Ok`.
    pub fn into_result(self) -> Result<(), HttpError> {
        match self {
            Classification::Success | Classification::Unclassified { .. } => Ok(()),
            Classification::ClientError { status, message } => Err(HttpError {
                status,
                kind: HttpErrorKind::Client,
                message,
            }),
            Classification::ServerError { status } => Err(HttpError {
                status,
                kind: HttpErrorKind::Server,
                message: format!("Unknown server error: status {status}"),
            }),
        }
    }
}

/// The reason phrase for a 4xx code, if it is one the service documents.
pub fn client_error_phrase(status: u16) -> Option<&'static str> {
    CLIENT_ERROR_PHRASES.get(&status).copied()
}

/// Classify a response by status code, reading the JSON error for 4xx.
pub fn classify(response: &Response) -> Classification {
    match response.status {
        200 => Classification::Success,
        status @ 400..=499 => Classification::ClientError {
            status,
            message: client_error_message(status, response),
        },
        status @ 500..=599 => Classification::ServerError { status },
        status => Classification::Unclassified { status },
    }
}

fn client_error_message(status: u16, response: &Response) -> String {
    let phrase = match client_error_phrase(status) {
        Some(phrase) => format!("HTTP {status} {phrase}"),
        None => format!("HTTP {status} unknown client error"),
    };

    // A body that is not an error envelope contributes nothing.
    let detail = response
        .json::<ErrorEnvelope>()
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|msg| !msg.is_empty());

    match detail {
        Some(detail) => format!("{phrase}: {detail}"),
        None => phrase,
    }
}
