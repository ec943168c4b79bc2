//! Per-document lifecycle: status, viewing session, extracted text,
//! downloads, thumbnails, and deletion.
//!
//! ## State machine
//!
//! ```text
//!  (none) ──upload──▶ Queued ──▶ Processing ──▶ Done
//!                        │            │
//!                        └────────────┴──────▶ Error
//!  any non-Deleted ──delete (true)──▶ Deleted   (terminal)
//! ```
//!
//! Status only changes when the service says so: every transition except
//! upload and delete comes from [`Document::refresh_status`]. `Done` and
//! `Error` are re-polled like any other status.
//!
//! ## Ownership
//!
//! A [`Document`] is plain data plus methods that borrow a [`Client`]. It is
//! `Send` but mutating methods take `&mut self`, so one owner at a time
//! drives a given document. Nothing here spawns threads or polls in the
//! background; callers poll [`Document::refresh_status`] (or, for many
//! documents, [`Client::refresh_statuses`]) on their own schedule.
//!
//! ## Deleted documents
//!
//! Operations on a document already marked `Deleted` are still sent. The
//! service rejects them and that rejection is what the caller sees.

use crate::client::Client;
use crate::endpoint::{with_param, Endpoint};
use crate::error::CrocodocError;
use crate::params::{
    bool_param, file_name_of, is_remote_safe_filename, resolve_thumbnail_size, DownloadOptions,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ── Status ───────────────────────────────────────────────────────────────

/// Conversion status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    /// Conversion has not started.
    Queued,
    /// Conversion is running.
    Processing,
    /// Conversion succeeded.
    Done,
    /// Conversion failed, or the service reported a status this client does
    /// not know.
    Error,
    /// Removed from the service. Terminal.
    Deleted,
}

impl DocumentStatus {
    /// Map the service's status token. Unknown tokens fold to `Error`.
    pub fn from_remote(token: &str) -> Self {
        match token {
            "QUEUED" => DocumentStatus::Queued,
            "PROCESSING" => DocumentStatus::Processing,
            "DONE" => DocumentStatus::Done,
            _ => DocumentStatus::Error,
        }
    }

    /// `true` while the service is still working on the document.
    pub fn is_pending(self) -> bool {
        matches!(self, DocumentStatus::Queued | DocumentStatus::Processing)
    }

    pub fn is_terminal(self) -> bool {
        self == DocumentStatus::Deleted
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Queued => "QUEUED",
            DocumentStatus::Processing => "PROCESSING",
            DocumentStatus::Done => "DONE",
            DocumentStatus::Error => "ERROR",
            DocumentStatus::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// One entry of a batch status response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusRecord {
    pub uuid: String,
    /// Raw status token, e.g. `"PROCESSING"`.
    pub status: String,
    #[serde(default)]
    pub viewable: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusRecord {
    pub fn document_status(&self) -> DocumentStatus {
        DocumentStatus::from_remote(&self.status)
    }

    /// The failure to report for `ERROR` and unknown statuses.
    pub fn failure_message(&self) -> Option<String> {
        if self.document_status() != DocumentStatus::Error {
            return None;
        }
        match self.error.as_deref() {
            Some(msg) if !msg.is_empty() => Some(msg.to_string()),
            _ => Some(format!("conversion failed (status {})", self.status)),
        }
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {}, Status: {}, Viewable: {}, Error: {}",
            self.uuid,
            self.status,
            self.viewable,
            self.error.as_deref().unwrap_or("-")
        )
    }
}

/// Result of applying a status record to a document.
///
/// The document's status has already been updated when this value exists.
/// A failed conversion is reported in `error` rather than as an `Err`, so
/// the update is never lost; call [`StatusUpdate::into_result`] to treat a
/// failed conversion as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub uuid: String,
    pub status: DocumentStatus,
    pub viewable: bool,
    /// Set for `ERROR` and unrecognised statuses.
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// `Ok(status)`, or [`CrocodocError::ConversionFailed`] when the service
    /// reported a failure.
    pub fn into_result(self) -> Result<DocumentStatus, CrocodocError> {
        match self.error {
            None => Ok(self.status),
            Some(message) => Err(CrocodocError::ConversionFailed {
                uuid: self.uuid,
                message,
            }),
        }
    }
}

/// Outcome of [`Client::refresh_statuses`].
///
/// Every document whose record came back has already been updated, and its
/// [`StatusUpdate`] is kept here even when other records are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRefresh {
    /// One update per document that had a record, in input order.
    pub updates: Vec<StatusUpdate>,
    /// Uuids the service returned no record for, in input order.
    pub missing: Vec<String>,
}

impl BatchRefresh {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Updates that report a failed conversion.
    pub fn failures(&self) -> impl Iterator<Item = &StatusUpdate> {
        self.updates.iter().filter(|u| u.is_failed())
    }

    /// `Ok(updates)` when every document had a record, otherwise
    /// [`CrocodocError::MissingStatus`] for the first missing one.
    pub fn into_result(self) -> Result<Vec<StatusUpdate>, CrocodocError> {
        match self.missing.into_iter().next() {
            Some(uuid) => Err(CrocodocError::MissingStatus { uuid }),
            None => Ok(self.updates),
        }
    }
}

/// Body of a successful session request.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: String,
}

// ── Document ─────────────────────────────────────────────────────────────

/// A document on the conversion service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    uuid: String,
    display_name: String,
    status: Option<DocumentStatus>,
    session_token: Option<String>,
    session_expires_at: Option<DateTime<Utc>>,
    extracted_text: String,
}

impl Document {
    /// A local handle that has not been uploaded. Every operation on it
    /// fails with [`CrocodocError::MissingIdentifier`].
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// A handle for a document uploaded earlier. Its status is unknown
    /// until the first refresh.
    pub fn from_identifier(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    pub(crate) fn uploaded(
        uuid: String,
        display_name: impl Into<String>,
        session: Option<String>,
    ) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            status: Some(DocumentStatus::Queued),
            // An upload-time session has no known creation time, so it is
            // kept but never counted as valid.
            session_token: session.filter(|s| !s.is_empty()),
            ..Self::default()
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// `None` until the status has been checked (or set by upload/delete).
    pub fn status(&self) -> Option<DocumentStatus> {
        self.status
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        self.session_expires_at
    }

    /// `true` when a session exists and `now` is before its expiry.
    pub fn has_valid_session(&self, now: DateTime<Utc>) -> bool {
        self.session_token.is_some() && self.session_expires_at.is_some_and(|exp| now < exp)
    }

    /// The cached text, if it has been fetched and was non-empty.
    pub fn extracted_text(&self) -> Option<&str> {
        (!self.extracted_text.is_empty()).then_some(self.extracted_text.as_str())
    }

    pub(crate) fn require_uuid(&self, operation: &'static str) -> Result<&str, CrocodocError> {
        if self.uuid.is_empty() {
            return Err(CrocodocError::MissingIdentifier { operation });
        }
        if self.status.is_some_and(DocumentStatus::is_terminal) {
            debug!("{}: document {} is deleted; sending anyway", operation, self.uuid);
        }
        Ok(&self.uuid)
    }

    // ── Status ───────────────────────────────────────────────────────────

    /// Poll the service and update [`Document::status`].
    ///
    /// `Err` means the status could not be fetched and nothing changed. `Ok`
    /// means the status was updated; a failed conversion shows up as
    /// [`StatusUpdate::error`].
    pub fn refresh_status(&mut self, client: &Client) -> Result<StatusUpdate, CrocodocError> {
        let uuid = self.require_uuid("GetStatus")?.to_string();
        let records = client.statuses(&[uuid.as_str()])?;
        let record = records
            .iter()
            .find(|r| r.uuid == uuid)
            .or_else(|| records.first())
            .ok_or(CrocodocError::MissingStatus { uuid })?;
        Ok(self.apply_status(record))
    }

    pub(crate) fn apply_status(&mut self, record: &StatusRecord) -> StatusUpdate {
        let status = record.document_status();
        if self.status != Some(status) {
            info!(
                "Document {}: {} -> {}",
                self.uuid,
                self.status.map_or_else(|| "UNKNOWN".to_string(), |s| s.to_string()),
                status
            );
        }
        self.status = Some(status);

        let error = record.failure_message();
        if let Some(ref msg) = error {
            warn!("Document {}: conversion failed: {}", self.uuid, msg);
        }

        StatusUpdate {
            uuid: self.uuid.clone(),
            status,
            viewable: record.viewable,
            error,
        }
    }

    // ── Session ──────────────────────────────────────────────────────────

    /// Return a viewing session token, creating one unless the current one
    /// is still inside its local validity window.
    pub fn create_or_refresh_session(&mut self, client: &Client) -> Result<&str, CrocodocError> {
        let uuid = self.require_uuid("CreateSession")?.to_string();
        let now = client.now();

        if !self.has_valid_session(now) {
            let request = with_param(client.request(Endpoint::CreateSession), "uuid", uuid);
            let response = client.execute(Endpoint::CreateSession, &request)?;
            let body: SessionResponse = response
                .json()
                .map_err(|e| CrocodocError::decode("CreateSession", e))?;
            if body.session.is_empty() {
                return Err(CrocodocError::decode("CreateSession", "empty session token"));
            }

            let lifetime = ChronoDuration::seconds(client.config().session_lifetime_secs as i64);
            let expires_at = now + lifetime;
            debug!("Document {}: session valid until {}", self.uuid, expires_at);

            self.session_token = Some(body.session);
            self.session_expires_at = Some(expires_at);
        }

        Ok(self.session_token.as_deref().unwrap_or_default())
    }

    // ── Text ─────────────────────────────────────────────────────────────

    /// Fetch the extracted text once and cache it.
    ///
    /// Pages are separated by form feeds (`\u{c}`); the text is kept
    /// verbatim apart from trimming surrounding whitespace. An empty result
    /// is not cached, so a later call asks again.
    pub fn fetch_text(&mut self, client: &Client) -> Result<&str, CrocodocError> {
        let uuid = self.require_uuid("GetText")?.to_string();

        if self.extracted_text.is_empty() {
            let request = with_param(client.request(Endpoint::Text), "uuid", uuid);
            let response = client.execute(Endpoint::Text, &request)?;
            let text = response
                .text()
                .map_err(|e| CrocodocError::decode("GetText", e))?;
            self.extracted_text = text.trim().to_string();
            debug!("Document {}: cached {} bytes of text", self.uuid, self.extracted_text.len());
        }

        Ok(&self.extracted_text)
    }

    // ── Download ─────────────────────────────────────────────────────────

    /// Download the original file or its PDF rendition and save it under
    /// `target_name` (see [`crate::params::resolve_save_path`]).
    ///
    /// An empty `target_name` derives one from the display name or uuid.
    /// When the name is not printable ASCII the request uses the uuid as
    /// filename; the local file still gets the requested name.
    pub fn download(
        &self,
        client: &Client,
        target_name: &str,
        options: &DownloadOptions,
    ) -> Result<PathBuf, CrocodocError> {
        let uuid = self.require_uuid("Download")?;

        let target = if target_name.is_empty() {
            self.default_download_name(options.as_pdf || options.with_annotations)
        } else {
            target_name.to_string()
        };

        let requested = file_name_of(&target);
        let remote_name = if is_remote_safe_filename(requested) {
            requested.to_string()
        } else {
            debug!("Download: '{}' is not printable ASCII; requesting as '{}'", requested, uuid);
            uuid.to_string()
        };

        let mut request = with_param(client.request(Endpoint::Download), "uuid", uuid);
        request = with_param(request, "pdf", bool_param(options.as_pdf));
        request = with_param(request, "filename", remote_name);
        request = with_param(request, "annotated", bool_param(options.with_annotations));
        request = with_param(request, "filter", options.filter.as_param());

        let response = client.execute(Endpoint::Download, &request)?;
        debug!(
            "Download {}: content-type {:?}, {} bytes",
            uuid,
            response.header("content-type"),
            response.body.len()
        );

        client.save(&target, &response.body)
    }

    fn default_download_name(&self, pdf: bool) -> String {
        let base = file_name_of(&self.display_name);
        match (base.is_empty(), pdf) {
            (true, true) => format!("{}.pdf", self.uuid),
            (true, false) => self.uuid.clone(),
            (false, true) => Path::new(base)
                .with_extension("pdf")
                .to_string_lossy()
                .into_owned(),
            (false, false) => base.to_string(),
        }
    }

    // ── Thumbnail ────────────────────────────────────────────────────────

    /// Download a PNG thumbnail of the first page.
    ///
    /// `size` is `"<w>x<h>"` with each side in 1–300; empty uses the
    /// configured default. An empty `target_name` saves as `<uuid>.png`.
    pub fn thumbnail(
        &self,
        client: &Client,
        size: &str,
        target_name: &str,
    ) -> Result<PathBuf, CrocodocError> {
        let uuid = self.require_uuid("Thumbnail")?;
        let size = resolve_thumbnail_size(size, client.config().default_thumbnail_size)?;

        let mut request = with_param(client.request(Endpoint::Thumbnail), "uuid", uuid);
        request = with_param(request, "size", size.to_string());
        let response = client.execute(Endpoint::Thumbnail, &request)?;

        let target = if target_name.is_empty() {
            format!("{uuid}.png")
        } else {
            target_name.to_string()
        };
        client.save(&target, &response.body)
    }

    // ── Delete ───────────────────────────────────────────────────────────

    /// Delete the document from the service.
    ///
    /// On `true` the session is cleared and the status becomes `Deleted`.
    /// On `false` nothing changes locally.
    pub fn delete(&mut self, client: &Client) -> Result<bool, CrocodocError> {
        let uuid = self.require_uuid("Delete")?.to_string();
        let request = with_param(client.request(Endpoint::Delete), "uuid", uuid);
        let response = client.execute(Endpoint::Delete, &request)?;
        let deleted: bool = response
            .json()
            .map_err(|e| CrocodocError::decode("Delete", e))?;

        if deleted {
            info!("Document {} deleted", self.uuid);
            self.status = Some(DocumentStatus::Deleted);
            self.session_token = None;
            self.session_expires_at = None;
        } else {
            warn!("Document {}: service declined to delete", self.uuid);
        }
        Ok(deleted)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Document uuid: {}, status: {}, name: {}, session: ",
            if self.uuid.is_empty() { "-" } else { self.uuid.as_str() },
            self.status.map_or_else(|| "UNKNOWN".to_string(), |s| s.to_string()),
            self.display_name
        )?;
        match (&self.session_token, self.session_expires_at) {
            (Some(_), Some(exp)) => write!(f, "valid until {}", exp.to_rfc3339())?,
            (Some(_), None) => f.write_str("unchecked")?,
            (None, _) => f.write_str("none")?,
        }
        write!(f, ", text extracted: {}>", !self.extracted_text.is_empty())
    }
}
