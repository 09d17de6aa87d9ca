//! Spanish-aware name ordering.
//!
//! Three comparison levels, like a locale collator:
//! 1. base letters, case- and accent-insensitive, with `ñ` as its own letter
//!    between `n` and `o`;
//! 2. accents;
//! 3. case, lowercase first.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Combining marks in DUCET secondary order.
const ACCENT_ORDER: &[char] = &[
    '\u{0301}', // acute
    '\u{0300}', // grave
    '\u{0306}', // breve
    '\u{0302}', // circumflex
    '\u{030C}', // caron
    '\u{030A}', // ring above
    '\u{0308}', // diaeresis
    '\u{030B}', // double acute
    '\u{0303}', // tilde
    '\u{0307}', // dot above
    '\u{0327}', // cedilla
    '\u{0328}', // ogonek
    '\u{0304}', // macron
];

/// Secondary weight of one combining mark. Marks outside the table sort
/// after it, by code point.
fn accent_weight(mark: char) -> u32 {
    ACCENT_ORDER
        .iter()
        .position(|m| *m == mark)
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(0x100 + u32::from(mark))
}

/// Sort key for a display name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: Vec<u32>,
    /// Accent weights per character; unaccented is the empty sequence.
    secondary: Vec<Vec<u32>>,
    tertiary: Vec<bool>,
}

impl CollationKey {
    /// Build the key for a string.
    #[must_use]
    pub fn new(s: &str) -> Self {
        let mut primary = Vec::with_capacity(s.len());
        let mut secondary = Vec::with_capacity(s.len());
        let mut tertiary = Vec::with_capacity(s.len());

        for c in s.nfc() {
            let lower = c.to_lowercase().next().unwrap_or(c);
            tertiary.push(c != lower);

            if lower == 'ñ' {
                primary.push(u32::from('n') * 2 + 1);
                secondary.push(Vec::new());
                continue;
            }

            let mut decomposed = std::iter::once(lower).nfd();
            let base = decomposed.next().unwrap_or(lower);
            let accents: Vec<u32> = decomposed
                .filter(|m| is_combining_mark(*m))
                .map(accent_weight)
                .collect();
            primary.push(u32::from(base) * 2);
            secondary.push(accents);
        }

        Self {
            primary,
            secondary,
            tertiary,
        }
    }
}

/// Compare two names the way a Spanish reader expects.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    CollationKey::new(a).cmp(&CollationKey::new(b))
}
