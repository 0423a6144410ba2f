//! Practice loop state: which screen is up and which session it drives.
//!
//! Keystroke timestamps are milliseconds since the first key of the session,
//! taken from the `Instant` the caller hands in.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tracing::debug;

use crate::error::SessionError;
use crate::registry::SessionRegistry;
use crate::runtime::KeyAction;
use crate::scenario::{Pick, ScenarioRef, Sentence};
use crate::session::SessionId;
use crate::stats::inter_key_intervals;
use crate::ui::{PracticeView, ResultsView};

#[derive(Debug, Clone)]
pub enum Screen {
    Practice(PracticeView),
    Results(ResultsView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone)]
enum Source {
    File(String),
    Inline,
}

pub struct PracticeApp {
    registry: Arc<SessionRegistry>,
    source: Source,
    title: String,
    sentences: Vec<Sentence>,
    index: usize,
    session: Option<SessionId>,
    origin: Option<Instant>,
    screen: Screen,
}

fn scenario_err(e: impl std::fmt::Display) -> SessionError {
    SessionError::Scenario(e.to_string())
}

impl PracticeApp {
    /// Practise the sentences of a scenario file, starting at `pick`.
    pub fn from_file(
        registry: Arc<SessionRegistry>,
        name: &str,
        pick: Pick,
    ) -> Result<Self, SessionError> {
        let scenario = registry.scenarios().load(name).map_err(scenario_err)?;
        // Validates the pick before we settle on an index.
        scenario.pick(pick).map_err(scenario_err)?;
        let index = match pick {
            Pick::First => 0,
            Pick::Random => rand::thread_rng().gen_range(0..scenario.sentences.len()),
            Pick::Index(i) => i,
        };

        Self::build(
            registry,
            Source::File(name.to_string()),
            scenario.title.clone(),
            scenario.sentences.clone(),
            index,
        )
    }

    pub fn inline(registry: Arc<SessionRegistry>, sentence: Sentence) -> Result<Self, SessionError> {
        let title = sentence.text.clone();
        Self::build(registry, Source::Inline, title, vec![sentence], 0)
    }

    fn build(
        registry: Arc<SessionRegistry>,
        source: Source,
        title: String,
        sentences: Vec<Sentence>,
        index: usize,
    ) -> Result<Self, SessionError> {
        let placeholder = PracticeView::new(title.as_str(), "", "");
        let mut app = Self {
            registry,
            source,
            title,
            sentences,
            index,
            session: None,
            origin: None,
            screen: Screen::Practice(placeholder),
        };
        app.start()?;
        Ok(app)
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn scenario_ref(&self) -> ScenarioRef {
        match &self.source {
            Source::File(name) => ScenarioRef::file(name.as_str(), Pick::Index(self.index)),
            Source::Inline => ScenarioRef::Inline(self.sentences[self.index].clone()),
        }
    }

    fn start(&mut self) -> Result<(), SessionError> {
        let started = self.registry.start_session(&self.scenario_ref())?;
        debug!(session = %started.session_id, index = self.index, "practice started");

        self.session = Some(started.session_id);
        self.origin = None;
        self.screen = Screen::Practice(PracticeView::new(
            self.title.as_str(),
            started.target_text,
            &started.target_phonetic,
        ));
        Ok(())
    }

    fn stamp(&mut self, now: Instant) -> u64 {
        let origin = *self.origin.get_or_insert(now);
        now.saturating_duration_since(origin).as_millis() as u64
    }

    /// Complete the live session, if any, and show its results. When the
    /// hand-off to the sink fails the session stays live so `finish` can be retried.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        let Some(id) = self.session else {
            return Ok(());
        };
        let intervals = self
            .registry
            .with_session(id, |s| Ok(inter_key_intervals(s.log())))?;
        let done = self.registry.complete_session(id)?;
        self.session = None;

        self.screen = Screen::Results(ResultsView {
            target_text: self.sentences[self.index].text.clone(),
            persisted: done.persisted_file_refs(),
            statistics: done.statistics,
            intervals,
        });
        Ok(())
    }

    pub fn on_key(&mut self, action: KeyAction, now: Instant) -> Result<Flow, SessionError> {
        if matches!(self.screen, Screen::Results(_)) {
            return self.on_results_key(action);
        }
        let Some(id) = self.session else {
            return Ok(Flow::Continue);
        };

        match action {
            KeyAction::Quit => {
                self.finish()?;
                return Ok(Flow::Quit);
            }
            KeyAction::Finish => self.finish()?,
            KeyAction::Backspace => {
                let ts = self.stamp(now);
                let snapshot = self.registry.backspace(id, ts)?;
                if let Screen::Practice(view) = &mut self.screen {
                    view.update(snapshot, None);
                }
            }
            KeyAction::Char(ks) if ks.is_character_input() => {
                let ts = self.stamp(now);
                let snapshot = self.registry.judge_char(id, ks, ts)?;
                if let Screen::Practice(view) = &mut self.screen {
                    view.update(snapshot, Some(ks.ch));
                }
                if snapshot.is_completed {
                    self.finish()?;
                }
            }
            KeyAction::Char(_) | KeyAction::Ignore => {}
        }
        Ok(Flow::Continue)
    }

    fn on_results_key(&mut self, action: KeyAction) -> Result<Flow, SessionError> {
        match action {
            KeyAction::Quit => return Ok(Flow::Quit),
            KeyAction::Char(ks) if ks.ch == 'r' => self.start()?,
            KeyAction::Char(ks) if ks.ch == 'n' => {
                self.index = (self.index + 1) % self.sentences.len();
                self.start()?;
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::Keystroke;
    use crate::persist::MemorySink;
    use crate::scenario::ScenarioStore;
    use crate::session::SessionStatus;
    use std::time::Duration;

    fn app_for(phonetic: &str) -> (PracticeApp, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let reg = Arc::new(SessionRegistry::new(
            Arc::new(ScenarioStore::builtin_only()),
            sink.clone(),
        ));
        let app = PracticeApp::inline(reg, Sentence::new("テスト", phonetic)).unwrap();
        (app, sink)
    }

    fn ch(c: char) -> KeyAction {
        KeyAction::Char(Keystroke::from(c))
    }

    #[test]
    fn typing_to_the_end_shows_results() {
        let (mut app, sink) = app_for("ab");
        let t0 = Instant::now();

        app.on_key(ch('x'), t0).unwrap();
        app.on_key(ch('a'), t0 + Duration::from_millis(150)).unwrap();
        app.on_key(ch('b'), t0 + Duration::from_millis(300)).unwrap();

        let Screen::Results(results) = app.screen() else {
            panic!("expected results screen");
        };
        assert_eq!(results.statistics.status, SessionStatus::Completed);
        assert_eq!(results.statistics.total_duration_ms, 300);
        assert_eq!(results.intervals, vec![150]);
        assert_eq!(sink.len(), 1);
        assert!(app.session_id().is_none());
    }

    #[test]
    fn enter_abandons_and_retry_restarts() {
        let (mut app, sink) = app_for("abc");
        let t0 = Instant::now();
        app.on_key(ch('a'), t0).unwrap();
        app.on_key(KeyAction::Finish, t0).unwrap();

        let Screen::Results(results) = app.screen() else {
            panic!("expected results screen");
        };
        assert_eq!(results.statistics.status, SessionStatus::Abandoned);

        app.on_key(ch('r'), t0).unwrap();
        assert!(matches!(app.screen(), Screen::Practice(_)));
        assert!(app.session_id().is_some());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn quit_mid_session_persists_abandoned() {
        let (mut app, sink) = app_for("abc");
        let flow = app.on_key(KeyAction::Quit, Instant::now()).unwrap();

        assert_eq!(flow, Flow::Quit);
        assert_eq!(sink.records()[0].statistics.status, SessionStatus::Abandoned);
    }

    #[test]
    fn chords_are_not_timestamped() {
        let (mut app, _) = app_for("ab");
        let t0 = Instant::now();
        let chord = KeyAction::Char(Keystroke::new('a', crate::keymap::Modifiers::CTRL));

        app.on_key(chord, t0).unwrap();
        app.on_key(ch('a'), t0 + Duration::from_millis(500)).unwrap();
        app.on_key(ch('b'), t0 + Duration::from_millis(600)).unwrap();

        let Screen::Results(results) = app.screen() else {
            panic!("expected results screen");
        };
        assert_eq!(results.statistics.total_duration_ms, 100);
    }

    #[test]
    fn next_walks_scenario_sentences() {
        let reg = Arc::new(SessionRegistry::new(
            Arc::new(ScenarioStore::builtin_only()),
            Arc::new(MemorySink::new()),
        ));
        let mut app = PracticeApp::from_file(reg, "example.json", Pick::First).unwrap();
        assert_eq!(app.index(), 0);

        app.on_key(KeyAction::Finish, Instant::now()).unwrap();
        app.on_key(ch('n'), Instant::now()).unwrap();
        assert_eq!(app.index(), 1);

        let Screen::Practice(view) = app.screen() else {
            panic!("expected practice screen");
        };
        assert_eq!(view.target_text, "テキスト");
    }
}
