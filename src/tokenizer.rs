//! Raw participant input to symbol units
//!
//! A text box submission can carry one or several units:
//!
//! 1. Input containing a space is split on whitespace, one unit per token.
//!    This is how a participant enters `"11 12"` without it becoming
//!    `"1","1","1","2"`.
//! 2. Otherwise an all-digit input is a single multi-digit unit (`"11"`).
//! 3. Otherwise every character is its own unit (`"AB"` → `"A","B"`).
//!
//! Letter units are uppercased. Blank input yields no units.

/// Split raw input into normalized symbol units, in input order
pub fn tokenize(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    if raw.contains(' ') {
        raw.split_whitespace().map(normalize_unit).collect()
    } else if raw.chars().all(|c| c.is_ascii_digit()) {
        vec![raw.to_string()]
    } else {
        raw.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| normalize_unit(&c.to_string()))
            .collect()
    }
}

/// Normalize a single unit (letters to uppercase, everything else untouched)
pub fn normalize_unit(unit: &str) -> String {
    unit.to_uppercase()
}
