//! Card UID handling.
//!
//! NFC readers report the same card in several formats (`27:9A:99:54`,
//! `27-9A-99-54`, `27 9A 99 54`, `279a9954`). Every UID entering the
//! system — tap or card-linking — goes through [`normalize_uid`] first so
//! the stored linkage is format-independent.

/// Normalise a raw card UID to uppercase hex with no separators.
pub fn normalize_uid(raw: &str) -> String {
  raw
    .chars()
    .filter(|c| !matches!(c, ':' | '-' | ' '))
    .collect::<String>()
    .to_ascii_uppercase()
}
