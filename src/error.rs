use crate::session::{SessionId, SessionStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("scenario has an empty phonetic sequence")]
    InvalidScenario,
    #[error("session is {status} and can no longer be changed")]
    SessionTerminated { status: SessionStatus },
    #[error("no characters left to judge (cursor {cursor} of {len})")]
    OutOfRange { cursor: usize, len: usize },
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("session {0} is already handling another request")]
    SessionBusy(SessionId),
    #[error("scenario unavailable: {0}")]
    Scenario(String),
    #[error("failed to persist session: {0}")]
    Persist(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("keymap has {0} keys, the binary format holds at most 65535")]
    TooManyKeys(usize),
    #[error("key {index} has code {code}, expected 0-255")]
    CodeOutOfRange { index: usize, code: u16 },
    #[error("key {index} has modifier bits {mods:#x}, expected 0-15")]
    ModifiersOutOfRange { index: usize, mods: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DecodeReason {
    BadMagic,
    Truncated,
    CountMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot decode keymap: {reason}")]
pub struct DecodeError {
    pub reason: DecodeReason,
}

impl DecodeError {
    pub fn new(reason: DecodeReason) -> Self {
        Self { reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
}

/// Any failure while moving a keymap between its textual, binary and structured forms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid keymap json: {0}")]
    Json(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Json(e.to_string())
    }
}

/// Failures of the file-backed collaborators (scenarios, keymaps, logs).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("validation failed: {0}")]
    Invalid(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario not found: {0}")]
    NotFound(String),
    #[error("scenario {0} has no sentences")]
    Empty(String),
    #[error("scenario {name} has no sentence #{index}")]
    NoSuchSentence { name: String, index: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// File names handed to stores must stay inside the store directory.
pub(crate) fn check_file_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
