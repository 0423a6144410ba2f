//! HID usage names for keyboard codes.

/// Key name → HID usage code, in display order. Some codes have more than one
/// name (`RETURN`/`ENTER`), so reverse lookups depend on this order.
pub const HID_KEYS: &[(&str, u16)] = &[
    ("A", 4),
    ("B", 5),
    ("C", 6),
    ("D", 7),
    ("E", 8),
    ("F", 9),
    ("G", 10),
    ("H", 11),
    ("I", 12),
    ("J", 13),
    ("K", 14),
    ("L", 15),
    ("M", 16),
    ("N", 17),
    ("O", 18),
    ("P", 19),
    ("Q", 20),
    ("R", 21),
    ("S", 22),
    ("T", 23),
    ("U", 24),
    ("V", 25),
    ("W", 26),
    ("X", 27),
    ("Y", 28),
    ("Z", 29),
    ("1", 30),
    ("2", 31),
    ("3", 32),
    ("4", 33),
    ("5", 34),
    ("6", 35),
    ("7", 36),
    ("8", 37),
    ("9", 38),
    ("0", 39),
    ("ENTER", 40),
    ("RETURN", 40),
    ("ESC", 41),
    ("BACKSPACE", 42),
    ("TAB", 43),
    ("SPACE", 44),
    ("MINUS", 45),
    ("EQUALS", 46),
    ("LEFTBRACE", 47),
    ("RIGHTBRACE", 48),
    ("BACKSLASH", 49),
    ("SEMICOLON", 51),
    ("APOSTROPHE", 52),
    ("GRAVE", 53),
    ("COMMA", 54),
    ("DOT", 55),
    ("SLASH", 56),
    ("CAPSLOCK", 57),
    ("F1", 58),
    ("F2", 59),
    ("F3", 60),
    ("F4", 61),
    ("F5", 62),
    ("F6", 63),
    ("F7", 64),
    ("F8", 65),
    ("F9", 66),
    ("F10", 67),
    ("F11", 68),
    ("F12", 69),
    ("INSERT", 73),
    ("HOME", 74),
    ("PAGEUP", 75),
    ("DELETE", 76),
    ("END", 77),
    ("PAGEDOWN", 78),
    ("RIGHT", 79),
    ("LEFT", 80),
    ("DOWN", 81),
    ("UP", 82),
    ("APPLICATION", 101),
    ("LCTRL", 224),
    ("LSHIFT", 225),
    ("LALT", 226),
    ("LGUI", 227),
    ("RCTRL", 228),
    ("RSHIFT", 229),
    ("RALT", 230),
    ("RGUI", 231),
    ("NONE", 0),
];

/// First name in `keys_info` whose code equals `code`.
///
/// When several names share a code the winner is whichever comes first in
/// iteration order; callers should not rely on a particular one.
pub fn lookup_name<I, S>(keys_info: I, code: u16) -> Option<S>
where
    I: IntoIterator<Item = (S, u16)>,
{
    keys_info
        .into_iter()
        .find_map(|(name, c)| (c == code).then_some(name))
}

/// Name from the built-in table, or `CODE_<n>` for codes it does not know.
pub fn key_name(code: u16) -> String {
    lookup_name(HID_KEYS.iter().copied(), code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("CODE_{code}"))
}

pub fn key_code(name: &str) -> Option<u16> {
    HID_KEYS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, c)| c)
}

/// Names or codes containing `query`, case-insensitive, at most `limit` hits.
pub fn search(query: &str, limit: usize) -> Vec<(&'static str, u16)> {
    let query = query.to_ascii_lowercase();
    HID_KEYS
        .iter()
        .filter(|(name, code)| {
            name.to_ascii_lowercase().contains(&query) || code.to_string().contains(&query)
        })
        .take(limit)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_lookup_first_match_wins() {
        let info = vec![("ENTER", 40), ("RETURN", 40)];
        assert_eq!(lookup_name(info, 40), Some("ENTER"));
    }

    #[test]
    fn test_lookup_missing_code() {
        assert_eq!(lookup_name(HID_KEYS.iter().copied(), 250), None);
    }

    #[test]
    fn test_lookup_over_owned_map() {
        let mut info = BTreeMap::new();
        info.insert("KP_ENTER".to_string(), 88u16);
        assert_eq!(lookup_name(info, 88).as_deref(), Some("KP_ENTER"));
    }

    #[test]
    fn test_key_name_fallback() {
        assert_eq!(key_name(4), "A");
        assert_eq!(key_name(0), "NONE");
        assert_eq!(key_name(200), "CODE_200");
    }

    #[test]
    fn test_key_code_ignores_case() {
        assert_eq!(key_code("space"), Some(44));
        assert_eq!(key_code("LShift"), Some(225));
        assert_eq!(key_code("hyper"), None);
    }

    #[test]
    fn test_search() {
        let hits = search("shift", 10);
        assert_eq!(hits, vec![("LSHIFT", 225), ("RSHIFT", 229)]);
        assert_eq!(search("f1", 3).len(), 3);
    }
}
