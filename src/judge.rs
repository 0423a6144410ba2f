use crate::error::SessionError;
use crate::keymap::Modifiers;
use crate::session::{OutcomeEntry, ProgressSnapshot, TypingSession};
use tracing::trace;

pub const BACKSPACE: char = '\u{8}';

/// A single key press as delivered by the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keystroke {
    pub ch: char,
    pub modifiers: Modifiers,
}

impl Keystroke {
    pub fn new(ch: char, modifiers: Modifiers) -> Self {
        Self { ch, modifiers }
    }

    /// Backspace and Ctrl/Alt/Meta chords are not character input.
    pub fn is_character_input(&self) -> bool {
        self.ch != BACKSPACE && !self.modifiers.is_chord()
    }
}

impl From<char> for Keystroke {
    fn from(ch: char) -> Self {
        Self::new(ch, Modifiers::NONE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    Ignored,
}

/// Judge one keystroke against the character under the cursor.
///
/// A correct character advances the cursor, an incorrect one is logged and the
/// cursor stays put until the right character is typed.
pub fn judge(
    session: &mut TypingSession,
    keystroke: Keystroke,
    timestamp_ms: u64,
) -> Result<ProgressSnapshot, SessionError> {
    judge_with_verdict(session, keystroke, timestamp_ms).map(|(snapshot, _)| snapshot)
}

pub fn judge_with_verdict(
    session: &mut TypingSession,
    keystroke: Keystroke,
    timestamp_ms: u64,
) -> Result<(ProgressSnapshot, Verdict), SessionError> {
    session.ensure_active()?;

    if !keystroke.is_character_input() {
        return Ok((session.snapshot(), Verdict::Ignored));
    }

    let expected = session
        .expected_char()
        .ok_or(SessionError::OutOfRange {
            cursor: session.cursor,
            len: session.target_len(),
        })?;

    let verdict = if keystroke.ch == expected {
        session.correct_count += 1;
        session.cursor += 1;
        Verdict::Correct
    } else {
        session.incorrect_count += 1;
        Verdict::Incorrect
    };
    session.log.push(OutcomeEntry::keystroke(
        expected,
        keystroke.ch,
        verdict == Verdict::Correct,
        timestamp_ms,
    ));
    trace!(session = %session.id, ?verdict, expected = %expected, typed = %keystroke.ch, "judged");

    Ok((session.snapshot(), verdict))
}
