use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the scanner: fatal traversal failures, registration
/// failures and dispatch failures. Transient per-file problems are logged
/// and never reach this type.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid file path pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{name} is an interface, not a regular class")]
    NotAClass { name: String },

    #[error("{name} is not an interface")]
    NotAnInterface { name: String },

    #[error("{name} is not an annotation")]
    NotAnAnnotation { name: String },

    #[error("failed to load type {name}: {error}")]
    TypeLoad { name: String, error: anyhow::Error },

    #[error("file match callback failed for {path}: {error}")]
    Callback { path: PathBuf, error: anyhow::Error },
}

/// Failure while decoding a single classfile. Every variant except `Io`
/// means the file is structurally unusable: the scan skips it and moves on.
/// `Io` is a real read failure and aborts the whole scan.
#[derive(Debug, Error)]
pub enum ClassfileError {
    #[error("classfile truncated")]
    Truncated,

    #[error("constant pool index {0} out of range")]
    BadPoolIndex(u16),

    #[error("constant pool entry {0} is not a string")]
    NotAString(u16),

    #[error("invalid modified UTF-8 in constant pool")]
    InvalidUtf8,

    #[error("constant value does not match field descriptor `{0}`")]
    ConstantMismatch(String),

    #[error(transparent)]
    Io(std::io::Error),
}

impl ClassfileError {
    /// Maps read errors: a short read means a truncated classfile (skip the
    /// file), anything else is a real I/O failure (fatal to the scan).
    pub(crate) fn from_io(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ClassfileError::Truncated
        } else {
            ClassfileError::Io(e)
        }
    }
}
