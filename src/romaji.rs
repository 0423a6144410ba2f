//! Hiragana ⇄ romaji tables used to derive phonetic targets and echo input.

use std::collections::HashMap;

const ROMAJI_TO_KANA: &[(&str, &str)] = &[
    ("a", "あ"), ("i", "い"), ("u", "う"), ("e", "え"), ("o", "お"),
    ("ka", "か"), ("ki", "き"), ("ku", "く"), ("ke", "け"), ("ko", "こ"),
    ("sa", "さ"), ("si", "し"), ("su", "す"), ("se", "せ"), ("so", "そ"),
    ("sha", "しゃ"), ("shu", "しゅ"), ("sho", "しょ"), ("shi", "し"),
    ("ta", "た"), ("ti", "ち"), ("tu", "つ"), ("te", "て"), ("to", "と"),
    ("cha", "ちゃ"), ("chu", "ちゅ"), ("cho", "ちょ"), ("chi", "ち"), ("tsu", "つ"),
    ("na", "な"), ("ni", "に"), ("nu", "ぬ"), ("ne", "ね"), ("no", "の"),
    ("ha", "は"), ("hi", "ひ"), ("hu", "ふ"), ("fu", "ふ"), ("he", "へ"), ("ho", "ほ"),
    ("fa", "ふぁ"), ("fi", "ふぃ"), ("fe", "ふぇ"), ("fo", "ふぉ"),
    ("ma", "ま"), ("mi", "み"), ("mu", "む"), ("me", "め"), ("mo", "も"),
    ("ya", "や"), ("yu", "ゆ"), ("yo", "よ"),
    ("ra", "ら"), ("ri", "り"), ("ru", "る"), ("re", "れ"), ("ro", "ろ"),
    ("wa", "わ"), ("wo", "を"), ("n", "ん"), ("nn", "ん"), ("n'", "ん"),
    ("ga", "が"), ("gi", "ぎ"), ("gu", "ぐ"), ("ge", "げ"), ("go", "ご"),
    ("za", "ざ"), ("zi", "じ"), ("ji", "じ"), ("zu", "ず"), ("ze", "ぜ"), ("zo", "ぞ"),
    ("ja", "じゃ"), ("ju", "じゅ"), ("jo", "じょ"),
    ("da", "だ"), ("di", "ぢ"), ("du", "づ"), ("de", "で"), ("do", "ど"),
    ("ba", "ば"), ("bi", "び"), ("bu", "ぶ"), ("be", "べ"), ("bo", "ぼ"),
    ("pa", "ぱ"), ("pi", "ぴ"), ("pu", "ぷ"), ("pe", "ぺ"), ("po", "ぽ"),
    ("kya", "きゃ"), ("kyu", "きゅ"), ("kyo", "きょ"),
    ("sya", "しゃ"), ("syu", "しゅ"), ("syo", "しょ"),
    ("cya", "ちゃ"), ("cyu", "ちゅ"), ("cyo", "ちょ"),
    ("nya", "にゃ"), ("nyu", "にゅ"), ("nyo", "にょ"),
    ("hya", "ひゃ"), ("hyu", "ひゅ"), ("hyo", "ひょ"),
    ("mya", "みゃ"), ("myu", "みゅ"), ("myo", "みょ"),
    ("rya", "りゃ"), ("ryu", "りゅ"), ("ryo", "りょ"),
    ("gya", "ぎゃ"), ("gyu", "ぎゅ"), ("gyo", "ぎょ"),
    ("jya", "じゃ"), ("jyu", "じゅ"), ("jyo", "じょ"),
    ("bya", "びゃ"), ("byu", "びゅ"), ("byo", "びょ"),
    ("pya", "ぴゃ"), ("pyu", "ぴゅ"), ("pyo", "ぴょ"),
];

const KANA_TO_ROMAJI: &[(&str, &str)] = &[
    ("あ", "a"), ("い", "i"), ("う", "u"), ("え", "e"), ("お", "o"),
    ("か", "ka"), ("き", "ki"), ("く", "ku"), ("け", "ke"), ("こ", "ko"),
    ("さ", "sa"), ("し", "shi"), ("す", "su"), ("せ", "se"), ("そ", "so"),
    ("た", "ta"), ("ち", "chi"), ("つ", "tsu"), ("て", "te"), ("と", "to"),
    ("な", "na"), ("に", "ni"), ("ぬ", "nu"), ("ね", "ne"), ("の", "no"),
    ("は", "ha"), ("ひ", "hi"), ("ふ", "fu"), ("へ", "he"), ("ほ", "ho"),
    ("ま", "ma"), ("み", "mi"), ("む", "mu"), ("め", "me"), ("も", "mo"),
    ("や", "ya"), ("ゆ", "yu"), ("よ", "yo"),
    ("ら", "ra"), ("り", "ri"), ("る", "ru"), ("れ", "re"), ("ろ", "ro"),
    ("わ", "wa"), ("を", "wo"), ("ん", "n"),
    ("が", "ga"), ("ぎ", "gi"), ("ぐ", "gu"), ("げ", "ge"), ("ご", "go"),
    ("ざ", "za"), ("じ", "ji"), ("ず", "zu"), ("ぜ", "ze"), ("ぞ", "zo"),
    ("だ", "da"), ("ぢ", "di"), ("づ", "du"), ("で", "de"), ("ど", "do"),
    ("ば", "ba"), ("び", "bi"), ("ぶ", "bu"), ("べ", "be"), ("ぼ", "bo"),
    ("ぱ", "pa"), ("ぴ", "pi"), ("ぷ", "pu"), ("ぺ", "pe"), ("ぽ", "po"),
    ("きゃ", "kya"), ("きゅ", "kyu"), ("きょ", "kyo"),
    ("しゃ", "sha"), ("しゅ", "shu"), ("しょ", "sho"),
    ("ちゃ", "cha"), ("ちゅ", "chu"), ("ちょ", "cho"),
    ("にゃ", "nya"), ("にゅ", "nyu"), ("にょ", "nyo"),
    ("ひゃ", "hya"), ("ひゅ", "hyu"), ("ひょ", "hyo"),
    ("みゃ", "mya"), ("みゅ", "myu"), ("みょ", "myo"),
    ("りゃ", "rya"), ("りゅ", "ryu"), ("りょ", "ryo"),
    ("ぎゃ", "gya"), ("ぎゅ", "gyu"), ("ぎょ", "gyo"),
    ("じゃ", "ja"), ("じゅ", "ju"), ("じょ", "jo"),
    ("びゃ", "bya"), ("びゅ", "byu"), ("びょ", "byo"),
    ("ぴゃ", "pya"), ("ぴゅ", "pyu"), ("ぴょ", "pyo"),
];

const SOKUON: char = 'っ';

/// Transliterate hiragana to Hepburn-style romaji, two-character digraphs first.
/// A small `っ` doubles the consonant that follows it. Characters without a
/// reading pass through unchanged.
pub fn to_romaji(kana: &str) -> String {
    let table: HashMap<&str, &str> = KANA_TO_ROMAJI.iter().copied().collect();
    let chars: Vec<(usize, char)> = kana.char_indices().collect();
    let end_of = |j: usize| chars.get(j).map_or(kana.len(), |&(b, _)| b);

    // Reading of the kana starting at `i` and how many characters it spans.
    let reading_at = |i: usize| -> Option<(&str, usize)> {
        let start = chars.get(i)?.0;
        if i + 1 < chars.len() {
            if let Some(r) = table.get(&kana[start..end_of(i + 2)]) {
                return Some((*r, 2));
            }
        }
        table.get(&kana[start..end_of(i + 1)]).map(|r| (*r, 1))
    };

    let mut out = String::with_capacity(kana.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].1 == SOKUON {
            match reading_at(i + 1).and_then(|(r, _)| r.chars().next()) {
                Some(c) if !"aiueon".contains(c) => out.push(c),
                _ => out.push(SOKUON),
            }
            i += 1;
            continue;
        }

        match reading_at(i) {
            Some((r, span)) => {
                out.push_str(r);
                i += span;
            }
            None => {
                out.push(chars[i].1);
                i += 1;
            }
        }
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Matched {
        kana: String,
        consumed: String,
        remaining: String,
    },
    /// Input is a prefix of some table entry and may still match.
    Partial,
    NoMatch,
}

/// Romaji → kana matcher over the romaji table.
#[derive(Debug, Clone)]
pub struct RomajiConverter {
    table: HashMap<&'static str, &'static str>,
    longest: usize,
}

impl Default for RomajiConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl RomajiConverter {
    pub fn new() -> Self {
        let table: HashMap<_, _> = ROMAJI_TO_KANA.iter().copied().collect();
        let longest = table.keys().map(|k| k.len()).max().unwrap_or(0);
        Self { table, longest }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn can_convert(&self, romaji: &str) -> bool {
        self.table.contains_key(romaji.to_lowercase().as_str())
    }

    /// Longest table entry that prefixes `input`.
    pub fn convert(&self, input: &str) -> Conversion {
        let input = input.to_lowercase();

        let max = input.len().min(self.longest);
        for len in (1..=max).rev() {
            let Some(candidate) = input.get(..len) else {
                continue;
            };
            if let Some(kana) = self.table.get(candidate) {
                return Conversion::Matched {
                    kana: kana.to_string(),
                    consumed: candidate.to_string(),
                    remaining: input[len..].to_string(),
                };
            }
        }

        if !input.is_empty() && self.table.keys().any(|k| k.starts_with(input.as_str())) {
            Conversion::Partial
        } else {
            Conversion::NoMatch
        }
    }

    /// Convert as much of `input` as possible, returning the kana and the unconverted tail.
    pub fn convert_greedy(&self, input: &str) -> (String, String) {
        let mut kana = String::new();
        let mut rest = input.to_lowercase();

        while !rest.is_empty() {
            match self.convert(&rest) {
                Conversion::Matched {
                    kana: k, remaining, ..
                } => {
                    kana.push_str(&k);
                    rest = remaining;
                }
                Conversion::Partial | Conversion::NoMatch => break,
            }
        }

        (kana, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_romaji_single_and_digraph() {
        assert_eq!(to_romaji("か"), "ka");
        assert_eq!(to_romaji("しゃ"), "sha");
        assert_eq!(to_romaji("こんにちは"), "konnichiha");
    }

    #[test]
    fn test_to_romaji_sokuon() {
        assert_eq!(to_romaji("がっこう"), "gakkou");
        assert_eq!(to_romaji("まっちゃ"), "maccha");
        assert_eq!(to_romaji("あっ"), "aっ");
    }

    #[test]
    fn test_to_romaji_passes_unknown_through() {
        assert_eq!(to_romaji("テスト1"), "テスト1");
        assert_eq!(to_romaji(""), "");
    }

    #[test]
    fn test_convert_matched() {
        let conv = RomajiConverter::new();
        assert_eq!(
            conv.convert("ka"),
            Conversion::Matched {
                kana: "か".into(),
                consumed: "ka".into(),
                remaining: "".into()
            }
        );
    }

    #[test]
    fn test_convert_prefers_longest() {
        let conv = RomajiConverter::new();
        match conv.convert("shakai") {
            Conversion::Matched { kana, remaining, .. } => {
                assert_eq!(kana, "しゃ");
                assert_eq!(remaining, "kai");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_convert_partial_and_no_match() {
        let conv = RomajiConverter::new();
        assert_eq!(conv.convert("k"), Conversion::Partial);
        assert_eq!(conv.convert("xq"), Conversion::NoMatch);
        assert!(conv.can_convert("KA"));
        assert!(!conv.can_convert("xyz"));
    }

    #[test]
    fn test_convert_greedy_leaves_tail() {
        let conv = RomajiConverter::new();
        assert_eq!(
            conv.convert_greedy("sakurak"),
            ("さくら".to_string(), "k".to_string())
        );
    }
}
