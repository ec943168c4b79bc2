//! # crocodoc-http
//!
//! Blocking HTTP transport used by the `crocodoc` client crate.
//!
//! The client never talks to `reqwest` directly. Every operation builds a
//! [`Request`] value, hands it to a [`Transport`], and gets back a fully
//! buffered [`Response`] (status, headers, body). Keeping the exchange as
//! plain data has two effects:
//!
//! 1. A request can be re-sent verbatim, which the upload retry loop relies on.
//! 2. Tests substitute a recording [`Transport`] and never open a socket.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crocodoc_http::{HttpTransport, Request, Transport};
//!
//! let transport = HttpTransport::new(30).expect("client");
//! let request = Request::get("https://crocodoc.com/api/v2/document/status")
//!     .query("token", "secret")
//!     .query("uuids", "a,b");
//! let response = transport.send(&request).expect("transport");
//! println!("HTTP {}", response.status);
//! ```
//!
//! ## TLS
//!
//! | Feature      | Default | Backend                |
//! |--------------|---------|------------------------|
//! | `rustls-tls` | on      | rustls                 |
//! | `native-tls` | off     | platform TLS (openssl) |

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

// ── Error type ───────────────────────────────────────────────────────────────

/// Connection-level failures and body decode failures.
///
/// Anything that produced an HTTP status code is *not* a `TransportError`;
/// interpreting status codes is the caller's job.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// The request did not complete within the configured timeout.
    #[error("Request to '{url}' timed out")]
    Timeout { url: String },

    /// No connection could be established.
    #[error("Could not connect to '{url}': {reason}")]
    Connect { url: String, reason: String },

    /// Any other failure while sending the request.
    #[error("Request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },

    /// The connection dropped while the body was being read.
    #[error("Failed to read response body from '{url}': {reason}")]
    Body { url: String, reason: String },

    /// The body was received but is not valid JSON/UTF-8 for the target type.
    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

impl TransportError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if e.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

// ── Request ──────────────────────────────────────────────────────────────────

/// HTTP verb. The service only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A file carried in a multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Multipart field name, e.g. `file`.
    pub field: String,
    /// Filename reported in the part's `Content-Disposition`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// A fully described, re-sendable HTTP request.
///
/// Query pairs are appended to the URL. For `POST`, form pairs become a
/// url-encoded body, or text fields of a multipart body when a
/// [`FilePart`] is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            file: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.file = Some(FilePart {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    /// Look up a parameter by name in the query pairs, then the form pairs.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .chain(self.form.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A completed HTTP exchange with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Header pairs; names are lower-case.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Shorthand for a response carrying a JSON body.
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response
            .headers
            .push(("content-type".into(), "application/json".into()));
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decode the body as UTF-8 text.
    pub fn text(&self) -> Result<String, TransportError> {
        String::from_utf8(self.body.clone())
            .map_err(|e| TransportError::Decode(format!("body is not UTF-8: {e}")))
    }

    /// Decode the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

// ── Transport seam ───────────────────────────────────────────────────────────

/// Sends a [`Request`] and returns the buffered [`Response`].
///
/// Implementations must not interpret status codes: a 404 is an `Ok`.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// The production transport, backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("crocodoc-http/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    fn build(&self, request: &Request) -> reqwest::blocking::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        match &request.file {
            Some(file) => {
                let mut form = reqwest::blocking::multipart::Form::new();
                for (key, value) in &request.form {
                    form = form.text(key.clone(), value.clone());
                }
                let part = reqwest::blocking::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone());
                form = form.part(file.field.clone(), part);
                builder = builder.multipart(form);
            }
            None if !request.form.is_empty() => {
                builder = builder.form(&request.form);
            }
            None => {}
        }

        builder
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        debug!("{} {}", request.method, request.url);

        let response = self
            .build(request)
            .send()
            .map_err(|e| TransportError::from_reqwest(&request.url, e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .map_err(|e| TransportError::Body {
                url: request.url.clone(),
                reason: e.to_string(),
            })?
            .to_vec();

        debug!("{} {} -> HTTP {} ({} bytes)", request.method, request.url, status, body.len());

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Accept one connection, capture the raw request, reply with `reply`.
    fn serve_once(reply: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&raw) {
                    let head = String::from_utf8_lossy(&raw[..end]).to_ascii_lowercase();
                    let wanted = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() - (end + 4) >= wanted {
                        break;
                    }
                }
            }
            stream.write_all(reply.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn find_header_end(raw: &[u8]) -> Option<usize> {
        raw.windows(4).position(|w| w == b"\r\n\r\n")
    }

    #[derive(Debug, Deserialize)]
    struct Upload {
        uuid: String,
    }

    #[test]
    fn request_builder_collects_params() {
        let req = Request::post("http://x/upload")
            .form("token", "t")
            .file("file", "a.docx", vec![1, 2, 3]);
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.param("token"), Some("t"));
        assert_eq!(req.param("missing"), None);
        let file = req.file.as_ref().unwrap();
        assert_eq!(file.file_name, "a.docx");
        assert!(format!("{file:?}").contains("<3 bytes>"));
    }

    #[test]
    fn response_helpers() {
        let resp = Response::json_body(200, &serde_json::json!({"uuid": "abc"}));
        assert!(resp.is_success());
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        let decoded: Upload = resp.json().unwrap();
        assert_eq!(decoded.uuid, "abc");

        let bad = Response::new(200, vec![0xff, 0xfe]);
        assert!(matches!(bad.text(), Err(TransportError::Decode(_))));
        assert!(matches!(bad.json::<Upload>(), Err(TransportError::Decode(_))));
    }

    #[test]
    fn get_sends_query_and_reads_body() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        );
        let transport = HttpTransport::new(10).unwrap();
        let req = Request::get(format!("{base}/download/text"))
            .query("token", "t0k")
            .query("uuids", "a,b");
        let resp = transport.send(&req).unwrap();
        let raw = server.join().unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.text().unwrap(), "hello");
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert!(raw.starts_with("GET /download/text?token=t0k&uuids=a%2Cb HTTP/1.1"), "got: {raw}");
    }

    #[test]
    fn post_form_is_url_encoded_and_error_status_is_ok() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 22\r\nConnection: close\r\n\r\n{\"error\":\"not found!\"}",
        );
        let transport = HttpTransport::new(10).unwrap();
        let req = Request::post(format!("{base}/document/delete"))
            .form("token", "t0k")
            .form("uuid", "u 1");
        let resp = transport.send(&req).unwrap();
        let raw = server.join().unwrap();

        assert_eq!(resp.status, 404);
        assert!(!resp.is_success());
        assert!(raw.starts_with("POST /document/delete HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("application/x-www-form-urlencoded"));
        assert!(raw.ends_with("token=t0k&uuid=u+1"), "got: {raw}");
    }

    #[test]
    fn post_with_file_is_multipart() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 15\r\nConnection: close\r\n\r\n{\"uuid\":\"u-1\"}\n",
        );
        let transport = HttpTransport::new(10).unwrap();
        let req = Request::post(format!("{base}/document/upload"))
            .form("token", "t0k")
            .file("file", "report.docx", b"PK-bytes".to_vec());
        let resp = transport.send(&req).unwrap();
        let raw = server.join().unwrap();

        let decoded: Upload = resp.json().unwrap();
        assert_eq!(decoded.uuid, "u-1");
        assert!(raw.to_ascii_lowercase().contains("multipart/form-data; boundary="));
        assert!(raw.contains("name=\"token\""));
        assert!(raw.contains("filename=\"report.docx\""));
        assert!(raw.contains("PK-bytes"));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = HttpTransport::new(5).unwrap();
        let err = transport
            .send(&Request::get(format!("http://127.0.0.1:{port}/x")))
            .unwrap_err();
        assert!(
            matches!(err, TransportError::Connect { .. } | TransportError::Request { .. }),
            "got: {err:?}"
        );
        assert!(err.to_string().contains("127.0.0.1"));
    }
}
