use crate::error::SessionError;
use crate::judge::{self, Keystroke};
use crate::stats::{self, SessionStatistics};
use crate::util::ratio;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque session identifier, allocated once when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// One judged keystroke or backspace. Timestamps are milliseconds since session start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OutcomeEntry {
    pub expected: Option<char>,
    pub typed: Option<char>,
    pub is_correct: bool,
    pub is_backspace: bool,
    pub timestamp_ms: u64,
}

impl OutcomeEntry {
    pub fn keystroke(expected: char, typed: char, is_correct: bool, timestamp_ms: u64) -> Self {
        Self {
            expected: Some(expected),
            typed: Some(typed),
            is_correct,
            is_backspace: false,
            timestamp_ms,
        }
    }

    pub fn backspace(expected: Option<char>, timestamp_ms: u64) -> Self {
        Self {
            expected,
            typed: None,
            is_correct: false,
            is_backspace: true,
            timestamp_ms,
        }
    }

    /// A correct keystroke that moved the cursor forward.
    pub fn is_forward(&self) -> bool {
        self.is_correct && !self.is_backspace
    }
}

/// Point-in-time view of a session, returned after every mutation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub cursor: usize,
    pub target_len: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub backspace_count: usize,
    pub accuracy_ratio: f64,
    pub progress_percent: f64,
    pub is_completed: bool,
}

/// One in-progress or finished attempt at a target phrase.
#[derive(Debug, Clone)]
pub struct TypingSession {
    pub(crate) id: SessionId,
    pub(crate) target_text: String,
    pub(crate) target_phonetic: Vec<char>,
    pub(crate) cursor: usize,
    pub(crate) log: Vec<OutcomeEntry>,
    pub(crate) correct_count: usize,
    pub(crate) incorrect_count: usize,
    pub(crate) backspace_count: usize,
    pub(crate) started_at: DateTime<Local>,
    pub(crate) status: SessionStatus,
}

impl TypingSession {
    pub fn start(
        target_text: impl Into<String>,
        target_phonetic: &str,
    ) -> Result<Self, SessionError> {
        Self::start_at(target_text, target_phonetic, Local::now())
    }

    /// Like [`TypingSession::start`] with an explicit wall-clock anchor.
    pub fn start_at(
        target_text: impl Into<String>,
        target_phonetic: &str,
        started_at: DateTime<Local>,
    ) -> Result<Self, SessionError> {
        if target_phonetic.is_empty() {
            return Err(SessionError::InvalidScenario);
        }

        let session = Self {
            id: SessionId::new(),
            target_text: target_text.into(),
            target_phonetic: target_phonetic.chars().collect(),
            cursor: 0,
            log: Vec::new(),
            correct_count: 0,
            incorrect_count: 0,
            backspace_count: 0,
            started_at,
            status: SessionStatus::Active,
        };
        info!(session = %session.id, len = session.target_phonetic.len(), "session started");
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn target_text(&self) -> &str {
        &self.target_text
    }

    pub fn target_phonetic(&self) -> &[char] {
        &self.target_phonetic
    }

    pub fn target_len(&self) -> usize {
        self.target_phonetic.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn log(&self) -> &[OutcomeEntry] {
        &self.log
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn incorrect_count(&self) -> usize {
        self.incorrect_count
    }

    pub fn backspace_count(&self) -> usize {
        self.backspace_count
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at.timestamp_millis()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Character the user has to type next, if any remain.
    pub fn expected_char(&self) -> Option<char> {
        self.target_phonetic.get(self.cursor).copied()
    }

    pub fn typed_phonetic(&self) -> String {
        self.target_phonetic[..self.cursor].iter().collect()
    }

    pub fn remaining_phonetic(&self) -> String {
        self.target_phonetic[self.cursor..].iter().collect()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor == self.target_phonetic.len()
    }

    pub(crate) fn ensure_active(&self) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::SessionTerminated {
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let judged = self.correct_count + self.incorrect_count;
        let accuracy_ratio = ratio(self.correct_count, judged).unwrap_or(1.0);

        ProgressSnapshot {
            cursor: self.cursor,
            target_len: self.target_phonetic.len(),
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            backspace_count: self.backspace_count,
            accuracy_ratio,
            progress_percent: 100.0 * ratio(self.cursor, self.target_phonetic.len()).unwrap_or(0.0),
            is_completed: self.is_at_end(),
        }
    }

    /// Judge one typed character, see [`judge::judge`].
    pub fn judge(
        &mut self,
        keystroke: impl Into<Keystroke>,
        timestamp_ms: u64,
    ) -> Result<ProgressSnapshot, SessionError> {
        judge::judge(self, keystroke.into(), timestamp_ms)
    }

    /// Step the cursor back by one. At the start of the phrase this only returns a snapshot.
    pub fn apply_backspace(&mut self, timestamp_ms: u64) -> Result<ProgressSnapshot, SessionError> {
        self.ensure_active()?;

        if self.cursor > 0 {
            self.cursor -= 1;
            self.log.push(OutcomeEntry::backspace(
                self.target_phonetic.get(self.cursor).copied(),
                timestamp_ms,
            ));
            self.backspace_count += 1;
        }

        Ok(self.snapshot())
    }

    /// Finish the attempt. A session whose cursor reached the end is `Completed`,
    /// anything earlier is an explicit early finish and becomes `Abandoned`.
    pub fn complete(&mut self) -> Result<SessionStatistics, SessionError> {
        self.ensure_active()?;

        self.status = if self.is_at_end() {
            SessionStatus::Completed
        } else {
            SessionStatus::Abandoned
        };
        debug!(session = %self.id, status = %self.status, cursor = self.cursor, "session finished");

        Ok(stats::summarize(self))
    }
}
