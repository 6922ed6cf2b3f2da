//! ISBN syntax check.
//!
//! Only the shape is checked (digit count after removing hyphens). Check
//! digits are not verified, so `123456789X` is rejected like any other
//! non-digit input.

/// True for a 10- or 13-digit ISBN, hyphens allowed anywhere
#[must_use]
pub fn is_valid(isbn: &str) -> bool {
    let mut digits = 0usize;
    for c in isbn.chars() {
        match c {
            '-' => {}
            '0'..='9' => digits += 1,
            _ => return false,
        }
    }
    digits == 10 || digits == 13
}
