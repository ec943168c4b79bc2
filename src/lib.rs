//! # crocodoc
//!
//! Blocking client for the Crocodoc document conversion API.
//!
//! Upload an office document, poll until the service has converted it, then
//! open viewing sessions, pull the extracted text, download the original or
//! a PDF rendition, fetch thumbnails, and finally delete it.
//!
//! ## Request path
//!
//! ```text
//! Document op
//!  │
//!  ├─ 1. Guard     uuid present, size/filename valid   (no request on failure)
//!  ├─ 2. Build     endpoint + token + params
//!  ├─ 3. Send      crocodoc-http Transport (blocking reqwest)
//!  ├─ 4. Classify  200 / 4xx (phrase + JSON error) / 5xx
//!  ├─ 5. Retry     upload only: 400 = rate limited, 3 attempts, 5 s apart
//!  └─ 6. Apply     decode body, update document state or save to disk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crocodoc::{Client, ClientConfig, DocumentStatus, DownloadOptions};
//! use std::{thread, time::Duration};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::builder("my-api-token").build()?)?;
//!     let mut doc = client.upload_file("report.docx")?;
//!
//!     // Conversion is asynchronous on the service side.
//!     loop {
//!         let update = doc.refresh_status(&client)?;
//!         if !update.status.is_pending() {
//!             update.into_result()?;
//!             break;
//!         }
//!         thread::sleep(Duration::from_secs(2));
//!     }
//!     assert_eq!(doc.status(), Some(DocumentStatus::Done));
//!
//!     let session = doc.create_or_refresh_session(&client)?.to_string();
//!     println!("view at https://crocodoc.com/view/{session}");
//!     println!("{}", doc.fetch_text(&client)?);
//!     doc.download(&client, "report.pdf", &DownloadOptions::pdf())?;
//!     doc.thumbnail(&client, "150x200", "")?;
//!     doc.delete(&client)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature      | Default | Description                     |
//! |--------------|---------|---------------------------------|
//! | `rustls-tls` | on      | TLS via rustls                  |
//! | `native-tls` | off     | TLS via the platform library    |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classify;
pub mod client;
pub mod config;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod params;
pub mod retry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{Client, Clock};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use crocodoc_http::{HttpTransport, Method, Request, Response, Transport, TransportError};
pub use document::{BatchRefresh, Document, DocumentStatus, StatusRecord, StatusUpdate};
pub use error::{CrocodocError, HttpError, HttpErrorKind};
pub use params::{AnnotationFilter, DownloadOptions, ThumbnailSize};
pub use retry::RetryPolicy;
