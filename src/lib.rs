// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod judge;
pub mod keymap;
pub mod persist;
pub mod registry;
pub mod romaji;
pub mod runtime;
pub mod scenario;
pub mod session;
pub mod stats;
pub mod ui;
pub mod util;

pub use error::{CodecError, DecodeError, EncodeError, FormatError, SessionError};
pub use registry::SessionRegistry;
pub use session::{ProgressSnapshot, SessionId, SessionStatus, TypingSession};
pub use stats::SessionStatistics;
