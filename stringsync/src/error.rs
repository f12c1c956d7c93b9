//! All error types for the stringsync crate.
//!
//! Loading distinguishes a missing file ([`Error::NotFound`]) from a broken one
//! ([`Error::Malformed`]) so callers decide explicitly whether to skip or abort.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed resource file {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("invalid language qualifier `{0}`")]
    InvalidLanguage(String),

    #[error("unknown quantity `{0}`")]
    UnknownQuantity(String),

    #[error("translation of `{key}` failed: {message}")]
    Translation { key: String, message: String },
}

impl Error {
    /// Creates a malformed-document error for `path`.
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a translation error for the resource `key`.
    pub fn translation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Translation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// True when the error means "the file is not there" rather than "the file is broken".
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
