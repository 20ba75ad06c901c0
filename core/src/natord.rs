//! Natural ("human") ordering of testcase paths.
//!
//! Strings are split greedily into runs of ASCII letters and runs of digits; anything else
//! separates runs and is otherwise ignored. Runs are compared pairwise from the left:
//! two digit runs compare by numeric value, any other pair compares as plain strings.
//! A side without further runs yields the empty run, which sorts first.
//!
//! ```
//! use casetest_core::natord;
//!
//! let mut v = vec!["case2.in", "case10.in", "case1.in"];
//! v.sort_by(|a, b| natord::compare(a, b));
//! assert_eq!(v, ["case1.in", "case2.in", "case10.in"]);
//! ```

use std::{cmp::Ordering, path::Path};

use lazy_regex::{lazy_regex, Lazy, Regex};

static RE_CHUNK: Lazy<Regex> = lazy_regex!(r"[A-Za-z]+|[0-9]+");

pub fn compare(a: &str, b: &str) -> Ordering {
    let (mut rest_a, mut rest_b) = (a, b);
    loop {
        let (chunk_a, next_a) = next_chunk(rest_a);
        let (chunk_b, next_b) = next_chunk(rest_b);

        if chunk_a.is_empty() && chunk_b.is_empty() {
            // Equal run-wise ("a-1" vs "a_1", "07" vs "7"): fall back to bytes to stay total.
            return a.cmp(b);
        }
        match compare_chunk(chunk_a, chunk_b) {
            Ordering::Equal => (rest_a, rest_b) = (next_a, next_b),
            ord => return ord,
        }
    }
}

pub fn compare_paths(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Ordering {
    self::compare(
        &a.as_ref().to_string_lossy(),
        &b.as_ref().to_string_lossy(),
    )
}

/// Returns (chunk, remaining).
fn next_chunk(s: &str) -> (&str, &str) {
    match RE_CHUNK.find(s) {
        Some(m) => (m.as_str(), &s[m.end()..]),
        None => ("", ""),
    }
}

fn compare_chunk(a: &str, b: &str) -> Ordering {
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    if is_number(a) && is_number(b) {
        compare_digits(a, b)
    } else {
        a.cmp(b)
    }
}

/// Numeric comparison of digit strings of any length.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod test {
    use super::*;

    fn sorted(mut v: Vec<&'static str>) -> Vec<&'static str> {
        v.sort_by(|a, b| compare(a, b));
        v
    }

    #[test]
    fn numeric_runs_compare_by_value() {
        assert_eq!(
            sorted(vec!["case2.in", "case10.in", "case1.in"]),
            vec!["case1.in", "case2.in", "case10.in"]
        );
        assert_eq!(compare("a9b", "a10a"), Ordering::Less);
        assert_eq!(compare("x100", "x99"), Ordering::Greater);
    }

    #[test]
    fn alpha_runs_compare_lexically() {
        assert_eq!(
            sorted(vec!["b1", "a10", "a2", "B1"]),
            vec!["B1", "a2", "a10", "b1"]
        );
    }

    #[test]
    fn exhausted_side_sorts_first() {
        assert_eq!(compare("case", "case1"), Ordering::Less);
        assert_eq!(compare("tests/1", "tests/1/2"), Ordering::Less);
        assert_eq!(compare("", "a"), Ordering::Less);
    }

    #[test]
    fn directories_are_ordered_naturally_too() {
        assert_eq!(
            sorted(vec!["/t/sub10/1.in", "/t/sub2/5.in", "/t/sub2/10.in", "/t/sub2/9.in"]),
            vec!["/t/sub2/5.in", "/t/sub2/9.in", "/t/sub2/10.in", "/t/sub10/1.in"]
        );
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        assert_eq!(
            compare("99999999999999999999999999", "100000000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(compare("007", "8"), Ordering::Less);
    }

    #[test]
    fn reflexive_and_antisymmetric() {
        let xs = [
            "", "1", "01", "a", "a1", "a01", "a-1", "a_1", "1a", "10", "2", "b", "case2.in",
            "case10.in", "x/y/3.in",
        ];
        for a in xs {
            assert_eq!(compare(a, a), Ordering::Equal, "{:?}", a);
            for b in xs {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{:?} {:?}", a, b);
                if a != b {
                    assert_ne!(compare(a, b), Ordering::Equal, "{:?} {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn transitive() {
        let xs = ["2", "10", "100000000000000000000000", "a", "a2", "a10", "07", "7", "b"];
        for a in xs {
            for b in xs {
                for c in xs {
                    if compare(a, b).is_le() && compare(b, c).is_le() {
                        assert!(compare(a, c).is_le(), "{:?} {:?} {:?}", a, b, c);
                    }
                }
            }
        }
    }
}
