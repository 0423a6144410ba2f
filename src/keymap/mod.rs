//! Keyboard keymaps: an ordered list of HID codes with modifier bits and
//! optional labels, plus the presets and validation used by the keymap editor.

pub mod codec;
pub mod hid;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

pub use codec::{binary_info, decode, encode, BinaryInfo, MAGIC};

/// Independent modifier flags in the low nibble. Stored wider than the nibble
/// so that out-of-range values read from JSON survive until validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(0b0001);
    pub const CTRL: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const GUI: Modifiers = Modifiers(0b1000);
    pub const MASK: u16 = 0b1111;

    pub const fn from_bits_retain(bits: u16) -> Self {
        Modifiers(bits)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any of Ctrl, Alt or GUI held.
    pub fn is_chord(&self) -> bool {
        self.0 & (Self::CTRL.0 | Self::ALT.0 | Self::GUI.0) != 0
    }

    pub fn is_valid(&self) -> bool {
        self.0 & !Self::MASK == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::CTRL, "Ctrl"),
            (Self::SHIFT, "Shift"),
            (Self::ALT, "Alt"),
            (Self::GUI, "Gui"),
        ];
        let held: Vec<&str> = names
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect();
        if held.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", held.join("+"))
        }
    }
}

/// One physical key position. `code` is kept wider than a byte so that
/// out-of-range values read from JSON survive until validation or encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub code: u16,
    pub mods: Modifiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl KeyEntry {
    pub fn new(code: u8, mods: Modifiers) -> Self {
        Self {
            code: code as u16,
            mods,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keymap {
    pub version: u8,
    #[serde(default)]
    pub keys: Vec<KeyEntry>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Keymap {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            keys: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn push(&mut self, entry: KeyEntry) {
        self.keys.push(entry);
    }

    /// Replace the entry at `index`, returning the previous one.
    pub fn replace(&mut self, index: usize, entry: KeyEntry) -> Option<KeyEntry> {
        self.keys
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, entry))
    }

    pub fn remove(&mut self, index: usize) -> Option<KeyEntry> {
        (index < self.keys.len()).then(|| self.keys.remove(index))
    }

    /// Copy of the keymap with every label dropped, i.e. what survives the binary form.
    pub fn without_labels(&self) -> Keymap {
        Keymap {
            version: self.version,
            keys: self
                .keys
                .iter()
                .map(|k| KeyEntry {
                    label: None,
                    ..k.clone()
                })
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Keymap, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keys[{}]: {}", self.index, self.message)
    }
}

pub fn validate(keymap: &Keymap) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (index, key) in keymap.keys.iter().enumerate() {
        if key.code > u8::MAX as u16 {
            issues.push(ValidationIssue {
                index,
                message: format!("code {} is outside 0-255", key.code),
            });
        }
        if !key.mods.is_valid() {
            issues.push(ValidationIssue {
                index,
                message: format!("mods {} is outside 0-15", key.mods.bits()),
            });
        }
    }
    if keymap.keys.len() > u16::MAX as usize {
        issues.push(ValidationIssue {
            index: keymap.keys.len() - 1,
            message: format!("{} keys exceed the 65535 limit", keymap.keys.len()),
        });
    }
    issues
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
pub enum Preset {
    Jis,
    Ansi,
    Dvorak,
}

const FUNCTION_ROW: [u8; 12] = [58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69];
const NUMBER_ROW: [u8; 14] = [53, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 45, 46, 42];

impl Preset {
    pub fn default_key_count(&self) -> usize {
        match self {
            Preset::Jis => 109,
            Preset::Ansi | Preset::Dvorak => 104,
        }
    }

    fn scan_order(&self) -> Vec<u8> {
        let rows: &[&[u8]] = match self {
            Preset::Jis => &[
                &[43, 20, 26, 8, 21, 23, 28, 24, 12, 18, 19, 47, 48, 49],
                &[57, 4, 22, 7, 9, 10, 11, 13, 14, 15, 51, 52, 40],
                &[225, 29, 27, 6, 25, 5, 17, 16, 54, 55, 56, 229],
                &[224, 227, 226, 44, 230, 231, 101, 228],
            ],
            Preset::Ansi => &[
                &[43, 20, 26, 8, 21, 23, 28, 24, 12, 18, 19, 47, 48, 49],
                &[57, 4, 22, 7, 9, 10, 11, 13, 14, 15, 51, 52, 40],
                &[225, 29, 27, 6, 25, 5, 17, 16, 54, 55, 56, 229],
                &[224, 227, 226, 44, 230, 231, 228],
            ],
            Preset::Dvorak => &[
                &[43, 52, 54, 55, 19, 28, 9, 10, 6, 21, 15, 56, 46, 49],
                &[57, 4, 18, 8, 24, 12, 7, 11, 23, 17, 22, 45, 40],
                &[225, 51, 20, 13, 14, 27, 5, 16, 26, 25, 29, 229],
                &[224, 227, 226, 44, 230, 231, 228],
            ],
        };

        FUNCTION_ROW
            .iter()
            .chain(NUMBER_ROW.iter())
            .chain(rows.iter().flat_map(|r| r.iter()))
            .copied()
            .collect()
    }

    /// Labelled keymap in scan order, truncated or padded with blank keys to `key_count`.
    pub fn build(&self, key_count: usize) -> Keymap {
        let order = self.scan_order();
        let keys = (0..key_count)
            .map(|i| match order.get(i) {
                Some(&code) => {
                    KeyEntry::new(code, Modifiers::NONE).with_label(hid::key_name(code as u16))
                }
                None => KeyEntry::new(0, Modifiers::NONE).with_label(format!("Key_{}", i + 1)),
            })
            .collect();

        Keymap { version: 1, keys }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_bits() {
        let m = Modifiers::SHIFT | Modifiers::ALT;
        assert_eq!(m.bits(), 0b0101);
        assert!(m.contains(Modifiers::SHIFT));
        assert!(!m.contains(Modifiers::CTRL));
        assert!(m.is_chord());
        assert!(!Modifiers::SHIFT.is_chord());
        assert_eq!(m.to_string(), "Shift+Alt");
        assert_eq!(Modifiers::NONE.to_string(), "-");
    }

    #[test]
    fn test_edit_entries() {
        let mut km = Keymap::default();
        km.push(KeyEntry::new(4, Modifiers::NONE));
        km.push(KeyEntry::new(5, Modifiers::SHIFT));

        let old = km.replace(0, KeyEntry::new(6, Modifiers::CTRL));
        assert_eq!(old, Some(KeyEntry::new(4, Modifiers::NONE)));
        assert_eq!(km.keys[0].code, 6);

        assert!(km.replace(9, KeyEntry::new(1, Modifiers::NONE)).is_none());
        assert_eq!(km.remove(1).map(|k| k.code), Some(5));
        assert!(km.remove(1).is_none());
        assert_eq!(km.len(), 1);
    }

    #[test]
    fn test_duplicate_codes_are_allowed() {
        let mut km = Keymap::default();
        km.push(KeyEntry::new(4, Modifiers::NONE));
        km.push(KeyEntry::new(4, Modifiers::SHIFT));
        assert!(validate(&km).is_empty());
    }

    #[test]
    fn test_validate_reports_out_of_range() {
        let km = Keymap {
            version: 1,
            keys: vec![
                KeyEntry::new(4, Modifiers::NONE),
                KeyEntry {
                    code: 300,
                    mods: Modifiers::from_bits_retain(16),
                    label: None,
                },
            ],
        };

        let issues = validate(&km);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.index == 1));
        assert_eq!(issues[0].to_string(), "keys[1]: code 300 is outside 0-255");
    }

    #[test]
    fn test_wide_json_values_reach_validation() {
        let km = Keymap::from_json(r#"{"version":1,"keys":[{"code":4,"mods":1},{"code":5,"mods":300}]}"#)
            .unwrap();

        assert_eq!(km.keys[1].mods.bits(), 300);
        let issues = validate(&km);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].to_string(), "keys[1]: mods 300 is outside 0-15");
    }

    #[test]
    fn test_json_shape() {
        let km = Keymap::from_json(r#"{"version":2,"keys":[{"code":4,"mods":1,"label":"A"},{"code":5,"mods":0}]}"#)
            .unwrap();

        assert_eq!(km.version, 2);
        assert_eq!(km.keys[0].mods, Modifiers::SHIFT);
        assert_eq!(km.keys[0].label.as_deref(), Some("A"));
        assert_eq!(km.keys[1].label, None);
        assert_eq!(Keymap::from_json(&km.to_json().unwrap()).unwrap(), km);
    }

    #[test]
    fn test_preset_padding_and_truncation() {
        let jis = Preset::Jis.build(Preset::Jis.default_key_count());
        assert_eq!(jis.len(), 109);
        assert_eq!(jis.keys[0].label.as_deref(), Some("F1"));
        assert_eq!(jis.keys[108].code, 0);
        assert_eq!(jis.keys[108].label.as_deref(), Some("Key_109"));

        let short = Preset::Ansi.build(3);
        assert_eq!(short.len(), 3);
        assert!(validate(&short).is_empty());
    }

    #[test]
    fn test_dvorak_home_row() {
        let dv = Preset::Dvorak.build(60);
        let labels: Vec<&str> = dv.keys[40..45]
            .iter()
            .filter_map(|k| k.label.as_deref())
            .collect();
        assert_eq!(labels, vec!["CAPSLOCK", "A", "O", "E", "U"]);
    }
}
