//! Redaction of secrets for display.
//!
//! Masked values keep their first and last character and their length, so an
//! operator can tell which credential is active without seeing it.

/// Character substituted for hidden characters.
pub const MASK_CHAR: char = '*';

/// Masks a secret, keeping only its first and last character.
///
/// Values of two characters or fewer are masked entirely.
///
/// # Examples
///
/// ```
/// use skopos_core::mask;
///
/// assert_eq!(mask("secretaccesskey"), "s*************y");
/// assert_eq!(mask("ab"), "**");
/// assert_eq!(mask(""), "");
/// ```
#[must_use]
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len <= 2 {
        return MASK_CHAR.to_string().repeat(len);
    }

    let mut masked = String::with_capacity(value.len());
    masked.push(chars[0]);
    masked.extend(std::iter::repeat(MASK_CHAR).take(len - 2));
    masked.push(chars[len - 1]);
    masked
}
