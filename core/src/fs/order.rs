//! Canonical browsing order for raw entry names.
//!
//! Listings dominated by integer file stems (`1.png`, `2.png`, ...) are ordered by their parsed
//! value. Anything else goes through [`lexical_numeric_cmp`], which compares the first differing
//! path segment by its leading digit run when both sides share the same text prefix.

use std::cmp::Ordering;

use crate::config::OrderingPolicy;

use super::util;

/// Filter `names` to the recognized extensions and return them in browsing order.
pub fn order_pages<I, S>(names: I, policy: &OrderingPolicy) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut pages: Vec<String> = names
        .into_iter()
        .map(Into::into)
        .filter(|name| util::is_recognized(name, &policy.extensions))
        .collect();

    if pages.is_empty() {
        return pages;
    }

    if is_integer_dominant(&pages, policy.integer_ratio) {
        // Stable sort: unparsed stems keep their relative order after every parsed one.
        pages.sort_by_key(|name| match integer_stem(name) {
            Some(value) => (false, value),
            None => (true, 0),
        });
    } else {
        pages.sort_by(|a, b| lexical_numeric_cmp(a, b));
    }

    pages
}

/// Parse the file stem of `name` as a base-10 integer.
pub fn integer_stem(name: &str) -> Option<i128> {
    util::stem(name).parse().ok()
}

/// Whether at least `ratio` of the names have integer stems.
pub fn is_integer_dominant<S: AsRef<str>>(names: &[S], ratio: f64) -> bool {
    if names.is_empty() {
        return false;
    }
    let parsed = names.iter().filter(|name| integer_stem(name.as_ref()).is_some()).count();
    parsed as f64 / names.len() as f64 >= ratio
}

/// Compare two entry names segment by segment.
///
/// Shared leading segments are skipped. The first differing segments are compared by their
/// leading digit runs when both carry the same non-digit prefix; every other case (one side
/// exhausted, both segments starting with four or more digits, differing prefixes, missing
/// digit runs, numeric ties) falls back to ordinal comparison of the full names.
pub fn lexical_numeric_cmp(a: &str, b: &str) -> Ordering {
    let mut a_segments = util::segments(a);
    let mut b_segments = util::segments(b);

    loop {
        match (a_segments.next(), b_segments.next()) {
            (Some(x), Some(y)) if x == y => continue,
            (Some(x), Some(y)) => return compare_segments(a, b, x, y),
            _ => return a.cmp(b),
        }
    }
}

fn compare_segments(a: &str, b: &str, x: &str, y: &str) -> Ordering {
    if leading_digits(x) >= 4 && leading_digits(y) >= 4 {
        return a.cmp(b);
    }

    let (x_prefix, x_digits) = split_digit_run(x);
    let (y_prefix, y_digits) = split_digit_run(y);
    if x_prefix != y_prefix {
        return a.cmp(b);
    }

    if x_digits.is_empty() || y_digits.is_empty() {
        return a.cmp(b);
    }

    cmp_digit_runs(x_digits, y_digits).then_with(|| a.cmp(b))
}

fn leading_digits(segment: &str) -> usize {
    segment.bytes().take_while(u8::is_ascii_digit).count()
}

/// Split `segment` into its leading non-digit run and the digit run right after it.
fn split_digit_run(segment: &str) -> (&str, &str) {
    let prefix_len = segment.bytes().take_while(|b| !b.is_ascii_digit()).count();
    let (prefix, rest) = segment.split_at(prefix_len);
    let digits_len = leading_digits(rest);
    (prefix, &rest[..digits_len])
}

/// Numeric comparison of two ASCII digit runs of any length.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
