//! Natural ("human") ordering of file names
//!
//! Names are split into runs of digits and non-digits. Digit runs compare
//! by numeric value, text runs compare case-insensitively, so `track2`
//! sorts before `track10`.
//!
//! # Examples
//!
//! ```
//! use mbatch::utils::natural_sort::natural_cmp;
//! use std::cmp::Ordering;
//!
//! assert_eq!(natural_cmp("track2.m4a", "track10.m4a"), Ordering::Less);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+|\D+").expect("static regex"));

#[derive(Debug, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(String),
}

fn runs(s: &str) -> Vec<Run<'_>> {
    RUNS.find_iter(s)
        .map(|m| {
            let part = m.as_str();
            if part.as_bytes()[0].is_ascii_digit() {
                Run::Digits(part)
            } else {
                Run::Text(part.to_lowercase())
            }
        })
        .collect()
}

/// Compare two digit runs by value without parsing, so arbitrarily long
/// runs cannot overflow.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
}

/// Natural ordering of two strings
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = runs(a);
    let right = runs(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Run::Digits(x), Run::Digits(y)) => cmp_digits(x, y),
            (Run::Text(x), Run::Text(y)) => x.cmp(y),
            // Digits before text, as in a plain byte comparison
            (Run::Digits(_), Run::Text(_)) => Ordering::Less,
            (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // Equal under the key ("a01" vs "a1", "A" vs "a"): fall back to the raw text
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}
