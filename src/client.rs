//! The configured entry point: upload, batch status queries, and the shared
//! request path every document operation goes through.
//!
//! ## Request path
//!
//! ```text
//! Endpoint::request ──▶ Transport::send ──▶ classify ──▶ decode / save
//!                            ▲                  │
//!                            └── RetryPolicy ◀──┘  (upload only, on 400)
//! ```
//!
//! A [`Client`] is cheap to clone and holds no per-document state; each
//! [`Document`] owns its own status, session, and text cache.

use crate::config::ClientConfig;
use crate::document::{BatchRefresh, Document, StatusRecord};
use crate::endpoint::{with_param, Endpoint};
use crate::error::CrocodocError;
use crate::params::resolve_save_path;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use crocodoc_http::{HttpTransport, Request, Response, Transport};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source of "now" for session expiry.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Body of a successful upload.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    uuid: String,
    #[serde(default)]
    session: Option<String>,
}

/// A client bound to one service token.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    clock: Clock,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("transport", &"<dyn Transport>")
            .finish()
    }
}

impl Client {
    /// Build a client that talks to the service over HTTPS.
    pub fn new(config: ClientConfig) -> Result<Self, CrocodocError> {
        let transport = HttpTransport::new(config.request_timeout_secs)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client from `CROCODOC_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, CrocodocError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used for session expiry.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// A request for `endpoint` with the token already attached.
    pub(crate) fn request(&self, endpoint: Endpoint) -> Request {
        endpoint.request(&self.config.base_url, &self.config.api_token)
    }

    /// Send once and classify. Only upload retries.
    pub(crate) fn execute(
        &self,
        endpoint: Endpoint,
        request: &Request,
    ) -> Result<Response, CrocodocError> {
        RetryPolicy::none().run(endpoint.operation(), || self.transport.send(request))
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Upload the bytes read from `source` under `display_name`.
    ///
    /// The source is read to the end before the first attempt so the request
    /// can be re-sent if the service rate-limits it. The returned document
    /// has its uuid set and status [`crate::DocumentStatus::Queued`].
    pub fn upload<R: Read>(
        &self,
        mut source: R,
        display_name: &str,
    ) -> Result<Document, CrocodocError> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| CrocodocError::ReadInput {
                name: display_name.to_string(),
                source: e,
            })?;

        info!("Uploading '{}' ({} bytes)", display_name, bytes.len());

        let request = self
            .request(Endpoint::Upload)
            .file("file", display_name, bytes);
        let policy = RetryPolicy::rate_limit(&self.config);
        let response = policy.run(Endpoint::Upload.operation(), || {
            self.transport.send(&request)
        })?;

        let body: UploadResponse = response
            .json()
            .map_err(|e| CrocodocError::decode("Upload", e))?;
        if body.uuid.is_empty() {
            return Err(CrocodocError::decode("Upload", "response carried an empty uuid"));
        }

        info!("Uploaded '{}' as {}", display_name, body.uuid);
        Ok(Document::uploaded(body.uuid, display_name, body.session))
    }

    /// Open `path` and upload it, using its file name as display name.
    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<Document, CrocodocError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path).map_err(|e| CrocodocError::ReadInput {
            name: path.display().to_string(),
            source: e,
        })?;
        self.upload(file, &name)
    }

    // ── Status ───────────────────────────────────────────────────────────

    /// Query the conversion status of several documents in one request.
    pub fn statuses<S: AsRef<str>>(&self, uuids: &[S]) -> Result<Vec<StatusRecord>, CrocodocError> {
        if uuids.is_empty() {
            return Err(CrocodocError::EmptyBatch);
        }
        if uuids.iter().any(|u| u.as_ref().is_empty()) {
            return Err(CrocodocError::MissingIdentifier {
                operation: Endpoint::Status.operation(),
            });
        }

        let joined = uuids
            .iter()
            .map(|u| u.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        let request = with_param(self.request(Endpoint::Status), "uuids", joined);
        let response = self.execute(Endpoint::Status, &request)?;

        let records: Vec<StatusRecord> = response
            .json()
            .map_err(|e| CrocodocError::decode("GetStatuses", e))?;
        debug!("Received {} status record(s)", records.len());
        Ok(records)
    }

    /// Refresh every document with one status query.
    ///
    /// Documents whose record is found are updated and reported in
    /// [`BatchRefresh::updates`]; the rest are listed in
    /// [`BatchRefresh::missing`] and left unchanged. `Err` means the query
    /// itself failed and no document changed.
    pub fn refresh_statuses(
        &self,
        documents: &mut [Document],
    ) -> Result<BatchRefresh, CrocodocError> {
        let uuids: Vec<String> = documents
            .iter()
            .map(|d| d.require_uuid("GetStatuses").map(str::to_string))
            .collect::<Result<_, _>>()?;
        let records = self.statuses(&uuids)?;

        let mut batch = BatchRefresh::default();
        for doc in documents.iter_mut() {
            match records.iter().find(|r| r.uuid == doc.uuid()) {
                Some(record) => batch.updates.push(doc.apply_status(record)),
                None => batch.missing.push(doc.uuid().to_string()),
            }
        }

        if !batch.is_complete() {
            warn!(
                "No status record for {} document(s): {}",
                batch.missing.len(),
                batch.missing.join(", ")
            );
        }
        Ok(batch)
    }

    // ── Local sink ───────────────────────────────────────────────────────

    /// Write `body` to the resolved location of `target`, atomically.
    pub(crate) fn save(&self, target: &str, body: &[u8]) -> Result<PathBuf, CrocodocError> {
        let path = resolve_save_path(&self.config.save_dir, target);
        let failed = |source| CrocodocError::SaveFailed {
            path: path.clone(),
            source,
        };

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(failed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(failed)?;
        tmp.write_all(body).map_err(failed)?;
        tmp.persist(&path).map_err(|e| failed(e.error))?;

        info!("Saved {} bytes to {}", body.len(), path.display());
        Ok(path)
    }
}
