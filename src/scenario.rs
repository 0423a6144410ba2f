//! Practice scenarios: titled lists of sentences with the romaji the user types.
//!
//! Two JSON shapes are accepted. The `entries` form carries the reading
//! explicitly, the `sentences` form carries hiragana only and the reading is
//! derived with [`to_romaji`].
//!
//! ```json
//! {"title": "初級", "entries": {"1": {"text": "あいうえお", "rubi": "aiueo"}}}
//! {"title": "ひらがな", "sentences": ["さくら"]}
//! ```

use crate::error::{check_file_name, ScenarioError, StoreError};
use crate::romaji::to_romaji;
use dashmap::DashMap;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

static BUILTIN_DIR: Dir = include_dir!("src/scenarios");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub phonetic: String,
}

impl Sentence {
    pub fn new(text: impl Into<String>, phonetic: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            phonetic: phonetic.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub title: String,
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub title: String,
    pub sentence_count: usize,
    pub builtin: bool,
}

/// Which sentence of a scenario file to practise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pick {
    #[default]
    First,
    Random,
    /// Zero-based position in file order.
    Index(usize),
}

/// What a new session should be started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioRef {
    File { name: String, pick: Pick },
    Inline(Sentence),
}

impl ScenarioRef {
    pub fn file(name: impl Into<String>, pick: Pick) -> Self {
        ScenarioRef::File {
            name: name.into(),
            pick,
        }
    }
}

#[derive(Deserialize)]
struct RawEntry {
    text: Option<String>,
    rubi: Option<String>,
}

#[derive(Deserialize)]
struct RawScenario {
    title: Option<String>,
    entries: Option<HashMap<String, RawEntry>>,
    sentences: Option<Vec<String>>,
}

/// Numeric keys first in numeric order, anything else after them by name.
fn entry_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl Scenario {
    pub fn from_json(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawScenario = serde_json::from_str(json)?;

        let sentences = match (raw.entries, raw.sentences) {
            (Some(entries), _) => entries
                .into_iter()
                .sorted_by(|(a, _), (b, _)| entry_order(a, b))
                .filter_map(|(_, e)| Some(Sentence::new(e.text?, e.rubi?)))
                .collect(),
            (None, Some(sentences)) => sentences
                .into_iter()
                .map(|text| {
                    let phonetic = to_romaji(&text);
                    Sentence::new(text, phonetic)
                })
                .collect(),
            (None, None) => Vec::new(),
        };

        Ok(Self {
            name: name.to_string(),
            title: raw.title.unwrap_or_else(|| name.to_string()),
            sentences,
        })
    }

    pub fn pick(&self, pick: Pick) -> Result<&Sentence, ScenarioError> {
        if self.sentences.is_empty() {
            return Err(ScenarioError::Empty(self.name.clone()));
        }
        match pick {
            Pick::First => Ok(&self.sentences[0]),
            Pick::Random => self
                .sentences
                .choose(&mut rand::thread_rng())
                .ok_or_else(|| ScenarioError::Empty(self.name.clone())),
            Pick::Index(index) => {
                self.sentences
                    .get(index)
                    .ok_or_else(|| ScenarioError::NoSuchSentence {
                        name: self.name.clone(),
                        index,
                    })
            }
        }
    }
}

/// Scenario files from a directory, backed by the built-in set.
/// Parsed scenarios are cached until [`ScenarioStore::clear_cache`].
#[derive(Debug)]
pub struct ScenarioStore {
    dir: Option<PathBuf>,
    cache: DashMap<String, Arc<Scenario>>,
}

impl ScenarioStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
            cache: DashMap::new(),
        }
    }

    pub fn builtin_only() -> Self {
        Self {
            dir: None,
            cache: DashMap::new(),
        }
    }

    fn builtin_names() -> impl Iterator<Item = String> {
        BUILTIN_DIR
            .files()
            .filter_map(|f| f.path().file_name()?.to_str().map(str::to_string))
            .filter(|name| name.ends_with(".json"))
    }

    fn dir_names(&self) -> Result<Vec<String>, StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(vec![]);
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StoreError::io(dir, e)),
        };
        Ok(entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect())
    }

    /// Sorted file names from the directory and the built-in set.
    pub fn list(&self) -> Result<Vec<String>, ScenarioError> {
        Ok(self
            .dir_names()?
            .into_iter()
            .chain(Self::builtin_names())
            .sorted()
            .dedup()
            .collect())
    }

    /// A file in the directory shadows a built-in one of the same name.
    pub fn load(&self, name: &str) -> Result<Arc<Scenario>, ScenarioError> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(Arc::clone(hit.value()));
        }
        check_file_name(name)?;

        let scenario = match self.read_from_dir(name)? {
            Some(scenario) => scenario,
            None => {
                let file = BUILTIN_DIR
                    .get_file(name)
                    .ok_or_else(|| ScenarioError::NotFound(name.to_string()))?;
                let json = file.contents_utf8().ok_or_else(|| {
                    StoreError::Invalid(format!("built-in scenario {name} is not utf-8"))
                })?;
                Scenario::from_json(name, json)
                    .map_err(|e| StoreError::json(Path::new(name), e))?
            }
        };

        if scenario.sentences.is_empty() {
            warn!(scenario = name, "scenario has no usable sentences");
        }
        debug!(scenario = name, sentences = scenario.sentences.len(), "scenario loaded");

        let scenario = Arc::new(scenario);
        self.cache.insert(name.to_string(), Arc::clone(&scenario));
        Ok(scenario)
    }

    fn read_from_dir(&self, name: &str) -> Result<Option<Scenario>, StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = dir.join(name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        Scenario::from_json(name, &json)
            .map(Some)
            .map_err(|e| StoreError::json(&path, e))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn first_sentence(&self, name: &str) -> Result<Sentence, ScenarioError> {
        self.load(name)?.pick(Pick::First).cloned()
    }

    pub fn random_sentence(&self, name: &str) -> Result<Sentence, ScenarioError> {
        self.load(name)?.pick(Pick::Random).cloned()
    }

    pub fn all_sentences(&self, name: &str) -> Result<Vec<Sentence>, ScenarioError> {
        Ok(self.load(name)?.sentences.clone())
    }

    pub fn info(&self, name: &str) -> Result<ScenarioInfo, ScenarioError> {
        let scenario = self.load(name)?;
        let in_dir = self
            .dir
            .as_ref()
            .is_some_and(|dir| dir.join(name).is_file());

        Ok(ScenarioInfo {
            name: scenario.name.clone(),
            title: scenario.title.clone(),
            sentence_count: scenario.sentences.len(),
            builtin: !in_dir,
        })
    }

    pub fn resolve(&self, scenario: &ScenarioRef) -> Result<Sentence, ScenarioError> {
        match scenario {
            ScenarioRef::Inline(sentence) => Ok(sentence.clone()),
            ScenarioRef::File { name, pick } => self.load(name)?.pick(*pick).cloned(),
        }
    }
}
