//! Typed request parameters and local save-path rules.
//!
//! Validation here runs before any request is built, so a bad size or
//! filename never costs a round trip.

use crate::error::CrocodocError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Largest thumbnail side the service renders.
pub const MAX_THUMBNAIL_SIDE: u32 = 300;

static RE_THUMBNAIL_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)x(\d+)$").unwrap());

// ── Thumbnail size ───────────────────────────────────────────────────────

/// Thumbnail dimensions, each side within `1..=300`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    width: u32,
    height: u32,
}

impl ThumbnailSize {
    /// Build a size from known-good constants.
    pub(crate) const fn new(width: u32, height: u32) -> Self {
        assert!(width >= 1 && width <= MAX_THUMBNAIL_SIDE);
        assert!(height >= 1 && height <= MAX_THUMBNAIL_SIDE);
        Self { width, height }
    }

    /// Build a size, rejecting sides outside `1..=300`.
    pub fn try_new(width: u32, height: u32) -> Result<Self, CrocodocError> {
        let in_range = |side: u32| (1..=MAX_THUMBNAIL_SIDE).contains(&side);
        if !in_range(width) || !in_range(height) {
            return Err(CrocodocError::InvalidThumbnailSize {
                size: format!("{width}x{height}"),
            });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ThumbnailSize {
    type Err = CrocodocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CrocodocError::InvalidThumbnailSize { size: s.to_string() };
        let caps = RE_THUMBNAIL_SIZE.captures(s).ok_or_else(invalid)?;
        let width: u32 = caps[1].parse().map_err(|_| invalid())?;
        let height: u32 = caps[2].parse().map_err(|_| invalid())?;
        Self::try_new(width, height).map_err(|_| invalid())
    }
}

/// Resolve the size argument of a thumbnail request.
///
/// An empty string falls back to `default`; with no default it is rejected
/// like any other malformed size.
pub fn resolve_thumbnail_size(
    size: &str,
    default: Option<ThumbnailSize>,
) -> Result<ThumbnailSize, CrocodocError> {
    match (size.is_empty(), default) {
        (true, Some(default)) => Ok(default),
        _ => size.parse(),
    }
}

// ── Download options ─────────────────────────────────────────────────────

/// Whose annotations to include in an annotated download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnnotationFilter {
    /// Every user's annotations (service default).
    #[default]
    All,
    /// No annotations.
    None,
    /// Only annotations by these user ids.
    Users(Vec<String>),
}

impl AnnotationFilter {
    /// The value of the `filter` query parameter.
    pub fn as_param(&self) -> String {
        match self {
            AnnotationFilter::All => "all".to_string(),
            AnnotationFilter::None => "none".to_string(),
            AnnotationFilter::Users(ids) => ids.join(","),
        }
    }
}

/// Options for [`crate::Document::download`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Download the PDF rendition instead of the original file.
    pub as_pdf: bool,
    /// Burn annotations into the file. The service always returns a PDF
    /// when this is set, whatever `as_pdf` says.
    pub with_annotations: bool,
    pub filter: AnnotationFilter,
}

impl DownloadOptions {
    pub fn pdf() -> Self {
        Self {
            as_pdf: true,
            ..Self::default()
        }
    }

    pub fn original() -> Self {
        Self::default()
    }

    pub fn annotated(mut self, filter: AnnotationFilter) -> Self {
        self.with_annotations = true;
        self.filter = filter;
        self
    }
}

// ── Filenames and save paths ─────────────────────────────────────────────

/// `true` when every character is printable ASCII (`0x20..=0x7E`).
///
/// The service rejects request filenames containing anything else.
pub fn is_remote_safe_filename(name: &str) -> bool {
    name.chars().all(|c| (' '..='~').contains(&c))
}

/// Where a target name is written locally.
///
/// A bare filename lands in `save_dir`; a name with any directory component
/// (relative or absolute) is used as given.
pub fn resolve_save_path(save_dir: &Path, target: &str) -> PathBuf {
    let path = Path::new(target);
    let is_bare = path
        .parent()
        .map(|p| p.as_os_str().is_empty())
        .unwrap_or(true);
    if is_bare {
        save_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

/// The final path component of `target`, used as the request filename.
pub(crate) fn file_name_of(target: &str) -> &str {
    Path::new(target)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(target)
}

pub(crate) fn bool_param(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
