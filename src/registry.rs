//! Live sessions keyed by id.
//!
//! Each session sits behind its own lock. Calls never wait for that lock: a
//! second call on a session that is still being served gets
//! [`SessionError::SessionBusy`], so keystrokes for one session are applied
//! strictly one at a time and never interleave. Distinct sessions share
//! nothing but the map.

use crate::error::SessionError;
use crate::judge::Keystroke;
use crate::persist::{PersistedFiles, SessionSink};
use crate::scenario::{ScenarioRef, ScenarioStore};
use crate::session::{ProgressSnapshot, SessionId, TypingSession};
use crate::stats::{self, SessionStatistics};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedSession {
    pub session_id: SessionId,
    pub target_text: String,
    pub target_phonetic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedSession {
    pub statistics: SessionStatistics,
    pub persisted: PersistedFiles,
}

impl CompletedSession {
    pub fn persisted_file_refs(&self) -> Vec<String> {
        self.persisted.refs()
    }
}

type Slot = Arc<Mutex<TypingSession>>;

pub struct SessionRegistry {
    sessions: DashMap<SessionId, Slot>,
    scenarios: Arc<ScenarioStore>,
    sink: Arc<dyn SessionSink>,
}

impl SessionRegistry {
    pub fn new(scenarios: Arc<ScenarioStore>, sink: Arc<dyn SessionSink>) -> Self {
        Self {
            sessions: DashMap::new(),
            scenarios,
            sink,
        }
    }

    pub fn scenarios(&self) -> &ScenarioStore {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn start_session(&self, scenario: &ScenarioRef) -> Result<StartedSession, SessionError> {
        let sentence = self
            .scenarios
            .resolve(scenario)
            .map_err(|e| SessionError::Scenario(e.to_string()))?;
        let session = TypingSession::start(sentence.text, &sentence.phonetic)?;

        let started = StartedSession {
            session_id: session.id(),
            target_text: session.target_text().to_string(),
            target_phonetic: sentence.phonetic,
        };
        self.sessions
            .insert(started.session_id, Arc::new(Mutex::new(session)));
        Ok(started)
    }

    fn slot(&self, id: SessionId) -> Result<Slot, SessionError> {
        self.sessions
            .get(&id)
            .map(|s| Arc::clone(s.value()))
            .ok_or(SessionError::SessionNotFound(id))
    }

    /// Run `f` on the session while holding its lock, failing fast if it is held.
    pub fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut TypingSession) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let slot = self.slot(id)?;
        let Some(mut session) = slot.try_lock() else {
            warn!(session = %id, "rejected concurrent call on busy session");
            return Err(SessionError::SessionBusy(id));
        };
        f(&mut session)
    }

    pub fn judge_char(
        &self,
        id: SessionId,
        keystroke: impl Into<Keystroke>,
        timestamp_ms: u64,
    ) -> Result<ProgressSnapshot, SessionError> {
        let keystroke = keystroke.into();
        self.with_session(id, |s| s.judge(keystroke, timestamp_ms))
    }

    pub fn backspace(&self, id: SessionId, timestamp_ms: u64) -> Result<ProgressSnapshot, SessionError> {
        self.with_session(id, |s| s.apply_backspace(timestamp_ms))
    }

    pub fn progress(&self, id: SessionId) -> Result<ProgressSnapshot, SessionError> {
        self.with_session(id, |s| Ok(s.snapshot()))
    }

    /// Finish the session, persist it and drop it from the registry.
    ///
    /// The session leaves the map only once it has been handed to the sink, so
    /// a busy session stays where it is and a failed hand-off can be retried.
    /// A retry re-measures the already finished session instead of failing
    /// with [`SessionError::SessionTerminated`].
    pub fn complete_session(&self, id: SessionId) -> Result<CompletedSession, SessionError> {
        let slot = self.slot(id)?;
        let Some(mut session) = slot.try_lock() else {
            warn!(session = %id, "rejected completion of busy session");
            return Err(SessionError::SessionBusy(id));
        };

        let statistics = if session.status().is_terminal() {
            stats::summarize(&session)
        } else {
            session.complete()?
        };

        let persisted = self.sink.persist(&session, &statistics).map_err(|e| {
            warn!(session = %id, error = %e, "persisting session failed, keeping it for retry");
            SessionError::Persist(e.to_string())
        })?;
        self.sessions.remove(&id);

        info!(
            session = %id,
            status = %statistics.status,
            accuracy = statistics.accuracy_percent,
            "session completed"
        );

        Ok(CompletedSession {
            statistics,
            persisted,
        })
    }
}
