use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::judge::Keystroke;
use crate::keymap::Modifiers;

/// Unified event type consumed by the practice loop
#[derive(Clone, Debug)]
pub enum PracticeEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait PracticeEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<PracticeEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => PracticeEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => PracticeEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(ev).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-backed event source for tests and scripted runs
pub struct ChannelEventSource {
    rx: Receiver<PracticeEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<PracticeEvent>) -> Self {
        Self { rx }
    }
}

impl PracticeEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the practice loop one event/tick at a time
pub struct Runner<E: PracticeEventSource> {
    event_source: E,
    tick: Duration,
}

impl<E: PracticeEventSource> Runner<E> {
    pub fn new(event_source: E, tick: Duration) -> Self {
        Self { event_source, tick }
    }

    /// Blocks up to one tick and returns the next event, or Tick on timeout
    pub fn step(&self) -> PracticeEvent {
        match self.event_source.recv_timeout(self.tick) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                PracticeEvent::Tick
            }
        }
    }
}

/// What a key press means to the practice screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Char(Keystroke),
    Backspace,
    /// Finish the session early.
    Finish,
    Quit,
    Ignore,
}

pub fn modifiers_from(mods: KeyModifiers) -> Modifiers {
    [
        (KeyModifiers::SHIFT, Modifiers::SHIFT),
        (KeyModifiers::CONTROL, Modifiers::CTRL),
        (KeyModifiers::ALT, Modifiers::ALT),
        (KeyModifiers::SUPER, Modifiers::GUI),
        (KeyModifiers::META, Modifiers::GUI),
    ]
    .into_iter()
    .filter(|(ct, _)| mods.contains(*ct))
    .fold(Modifiers::NONE, |acc, (_, m)| acc | m)
}

pub fn classify_key(key: KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    let mods = modifiers_from(key.modifiers);

    match key.code {
        KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if mods.contains(Modifiers::CTRL) => KeyAction::Quit,
        KeyCode::Enter => KeyAction::Finish,
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Char(c) => KeyAction::Char(Keystroke::new(c, mods)),
        _ => KeyAction::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(1));

        assert!(matches!(runner.step(), PracticeEvent::Tick));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(PracticeEvent::Resize).unwrap();
        let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(10));

        assert!(matches!(runner.step(), PracticeEvent::Resize));
    }

    #[test]
    fn classify_plain_and_shifted_chars() {
        assert_eq!(
            classify_key(key(KeyCode::Char('a'), KeyModifiers::NONE)),
            KeyAction::Char(Keystroke::from('a'))
        );
        assert_eq!(
            classify_key(key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            KeyAction::Char(Keystroke::new('A', Modifiers::SHIFT))
        );
    }

    #[test]
    fn classify_controls() {
        assert_eq!(classify_key(key(KeyCode::Esc, KeyModifiers::NONE)), KeyAction::Quit);
        assert_eq!(
            classify_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Quit
        );
        assert_eq!(
            classify_key(key(KeyCode::Backspace, KeyModifiers::NONE)),
            KeyAction::Backspace
        );
        assert_eq!(classify_key(key(KeyCode::Enter, KeyModifiers::NONE)), KeyAction::Finish);
        assert_eq!(classify_key(key(KeyCode::Left, KeyModifiers::NONE)), KeyAction::Ignore);
    }

    #[test]
    fn chords_carry_modifiers_and_are_not_input() {
        let action = classify_key(key(KeyCode::Char('x'), KeyModifiers::ALT));
        let KeyAction::Char(ks) = action else {
            panic!("expected char, got {action:?}");
        };
        assert!(ks.modifiers.contains(Modifiers::ALT));
        assert!(!ks.is_character_input());
    }

    #[test]
    fn release_events_are_ignored() {
        let mut ev = key(KeyCode::Char('a'), KeyModifiers::NONE);
        ev.kind = KeyEventKind::Release;
        assert_eq!(classify_key(ev), KeyAction::Ignore);
    }
}
