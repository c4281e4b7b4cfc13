use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub marked: bool,
}

impl Entry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marked: false,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.marked { '*' } else { ' ' };
        write!(f, "{marker} {}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResult {
    FileContent { kind: PreviewKind, payload: String },
    DirectoryMarker,
}

impl PreviewResult {
    pub fn text(payload: impl Into<String>) -> Self {
        Self::FileContent {
            kind: PreviewKind::Text,
            payload: payload.into(),
        }
    }
}

/// Which listing a refresh reads and which preview endpoint indices refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Files,
    Marked,
}

/// Failures reported by a [`crate::infra::BackendGateway`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;
