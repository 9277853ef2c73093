//! Natural (numeric-aware) ordering for file and folder names.
//!
//! `Chapter 2` sorts before `Chapter 10`, and letter case is ignored. Names
//! that compare equal under the natural key fall back to a byte comparison
//! so the order is total and stable across runs.

use std::cmp::Ordering;

/// One run of a split name: either a digit run or a lowercased text run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Text(String),
    /// Digit run with leading zeros stripped, ordered by length first so
    /// arbitrarily long numbers compare numerically.
    Number(usize, String),
}

/// Split a name into alternating text and number parts.
///
/// The first part is always text (possibly empty), so two keys always line
/// up text-against-text and number-against-number.
pub fn natural_key(name: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();

    for c in name.chars() {
        if c.is_ascii_digit() {
            if digits.is_empty() {
                parts.push(KeyPart::Text(std::mem::take(&mut text).to_lowercase()));
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                parts.push(number_part(&std::mem::take(&mut digits)));
            }
            text.push(c);
        }
    }

    if !digits.is_empty() {
        parts.push(number_part(&digits));
    }
    parts.push(KeyPart::Text(text.to_lowercase()));
    parts
}

fn number_part(digits: &str) -> KeyPart {
    let trimmed = digits.trim_start_matches('0');
    KeyPart::Number(trimmed.len(), trimmed.to_string())
}

/// Compare two names by natural key, then by raw bytes.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a)
        .cmp(&natural_key(b))
        .then_with(|| a.cmp(b))
}

/// Sort names in place using [`natural_cmp`].
pub fn sort_natural(names: &mut [String]) {
    names.sort_by(|a, b| natural_cmp(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_numerically() {
        let mut names = vec![
            "item10".to_string(),
            "item2".to_string(),
            "item1".to_string(),
        ];
        sort_natural(&mut names);
        assert_eq!(names, vec!["item1", "item2", "item10"]);
    }

    #[test]
    fn case_is_ignored() {
        let mut names = vec!["beta".to_string(), "Alpha".to_string(), "alpha2".to_string()];
        sort_natural(&mut names);
        assert_eq!(names, vec!["Alpha", "alpha2", "beta"]);
    }

    #[test]
    fn leading_digits_sort_before_text() {
        let mut names = vec!["notes".to_string(), "2 intro".to_string(), "10 end".to_string()];
        sort_natural(&mut names);
        assert_eq!(names, vec!["2 intro", "10 end", "notes"]);
    }

    #[test]
    fn long_digit_runs_do_not_overflow() {
        let a = "v99999999999999999999999999999999999999999";
        let b = "v100000000000000000000000000000000000000000";
        assert_eq!(natural_cmp(a, b), Ordering::Less);
    }

    #[test]
    fn ties_are_broken_deterministically() {
        assert_eq!(natural_cmp("File01", "file1"), Ordering::Less);
        assert_ne!(natural_cmp("a", "A"), Ordering::Equal);
    }
}
