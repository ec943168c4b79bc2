//! Client configuration.
//!
//! Everything a [`crate::Client`] needs to know about the service and the
//! local machine lives in one [`ClientConfig`], built through
//! [`ClientConfigBuilder`]. The API token is part of the config rather than
//! process-global state, so two clients with different tokens can coexist in
//! one process.
//!
//! # Example
//! ```rust
//! use crocodoc::ClientConfig;
//!
//! let config = ClientConfig::builder("0123456789abcdef")
//!     .save_dir("/var/tmp/crocodoc")
//!     .rate_limit_delay_ms(2_000)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.rate_limit_max_attempts, 3);
//! ```

use crate::error::CrocodocError;
use crate::params::ThumbnailSize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Service root used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://crocodoc.com/api/v2";

/// Upper bound for the local session window; service sessions last an hour.
const MAX_SESSION_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Tokens that are obviously copied from documentation.
const PLACEHOLDER_TOKENS: &[&str] = &["your_token_here", "<token>", "changeme", "token"];

/// Configuration for a [`crate::Client`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Service access token sent with every request.
    pub api_token: String,

    /// Service root, without a trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Directory for downloads and thumbnails given as bare filenames.
    /// Default: the OS temp directory.
    pub save_dir: PathBuf,

    /// Size used when a thumbnail is requested with an empty size string.
    /// `None` makes an empty size an error. Default: `100x100`.
    pub default_thumbnail_size: Option<ThumbnailSize>,

    /// How long a created viewing session is reused, in seconds. Default: 3480.
    ///
    /// Sessions live for 60 minutes on the service. Reusing them for only 58
    /// leaves room for clock skew and for a request that is still in flight
    /// when the window closes.
    pub session_lifetime_secs: u64,

    /// Total upload attempts when the service answers with a rate-limit
    /// status. Default: 3.
    pub rate_limit_max_attempts: u32,

    /// Fixed wait between upload attempts, in milliseconds. Default: 5000.
    pub rate_limit_delay_ms: u64,

    /// Statuses that mean "rate limit exceeded" on upload. Default: `[400]`.
    ///
    /// The service signals throttling with a plain 400, not 429.
    pub rate_limit_statuses: Vec<u16>,

    /// Per-request transport timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("save_dir", &self.save_dir)
            .field("default_thumbnail_size", &self.default_thumbnail_size)
            .field("session_lifetime_secs", &self.session_lifetime_secs)
            .field("rate_limit_max_attempts", &self.rate_limit_max_attempts)
            .field("rate_limit_delay_ms", &self.rate_limit_delay_ms)
            .field("rate_limit_statuses", &self.rate_limit_statuses)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Start a builder with the given token and defaults for everything else.
    pub fn builder(api_token: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self {
                api_token: api_token.into(),
                base_url: DEFAULT_BASE_URL.to_string(),
                save_dir: std::env::temp_dir(),
                default_thumbnail_size: Some(ThumbnailSize::default()),
                session_lifetime_secs: 58 * 60,
                rate_limit_max_attempts: 3,
                rate_limit_delay_ms: 5_000,
                rate_limit_statuses: vec![400],
                request_timeout_secs: 120,
            },
        }
    }

    /// Build a config from the environment.
    ///
    /// * `CROCODOC_API_TOKEN`: required
    /// * `CROCODOC_BASE_URL`: optional service root
    /// * `CROCODOC_SAVE_DIR`: optional download directory
    pub fn from_env() -> Result<Self, CrocodocError> {
        let token = std::env::var("CROCODOC_API_TOKEN").map_err(|_| {
            CrocodocError::InvalidConfig("CROCODOC_API_TOKEN is not set".into())
        })?;

        let mut builder = Self::builder(token);
        if let Ok(url) = std::env::var("CROCODOC_BASE_URL") {
            if !url.is_empty() {
                builder = builder.base_url(url);
            }
        }
        if let Ok(dir) = std::env::var("CROCODOC_SAVE_DIR") {
            if !dir.is_empty() {
                builder = builder.save_dir(dir);
            }
        }
        builder.build()
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.save_dir = dir.into();
        self
    }

    pub fn default_thumbnail_size(mut self, size: Option<ThumbnailSize>) -> Self {
        self.config.default_thumbnail_size = size;
        self
    }

    pub fn session_lifetime_secs(mut self, secs: u64) -> Self {
        self.config.session_lifetime_secs = secs;
        self
    }

    pub fn rate_limit_max_attempts(mut self, n: u32) -> Self {
        self.config.rate_limit_max_attempts = n;
        self
    }

    pub fn rate_limit_delay_ms(mut self, ms: u64) -> Self {
        self.config.rate_limit_delay_ms = ms;
        self
    }

    pub fn rate_limit_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.config.rate_limit_statuses = statuses;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, CrocodocError> {
        let c = &self.config;
        let token = c.api_token.trim();
        if token.is_empty() {
            return Err(CrocodocError::InvalidConfig("API token must not be empty".into()));
        }
        if PLACEHOLDER_TOKENS
            .iter()
            .any(|p| token.eq_ignore_ascii_case(p))
        {
            return Err(CrocodocError::InvalidConfig(format!(
                "API token '{token}' is a placeholder; set a real token"
            )));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(CrocodocError::InvalidConfig(format!(
                "Base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if c.rate_limit_max_attempts == 0 {
            return Err(CrocodocError::InvalidConfig(
                "rate_limit_max_attempts must be ≥ 1".into(),
            ));
        }
        if c.session_lifetime_secs == 0 || c.session_lifetime_secs > MAX_SESSION_LIFETIME_SECS {
            return Err(CrocodocError::InvalidConfig(format!(
                "session_lifetime_secs must be 1–{MAX_SESSION_LIFETIME_SECS}, got {}",
                c.session_lifetime_secs
            )));
        }
        Ok(self.config)
    }
}
