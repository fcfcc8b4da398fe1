//! Package version ordering.
//!
//! Versions have the shape `[epoch:]version[-release]`. Epochs compare first,
//! then the upstream version, then the release (only when both sides have
//! one). Each part is compared as alternating runs of digits and letters:
//! digit runs numerically, letter runs lexically, a digit run always beats a
//! letter run, and a trailing letter run marks a pre-release (`1.0a < 1.0`) while any other
//! trailing remainder makes a version newer (`1.0.a > 1.0`).

use std::cmp::Ordering;

/// Compare two package version strings.
///
/// ```
/// use pacstage_extract::vercmp;
/// use std::cmp::Ordering;
///
/// assert_eq!(vercmp("1.0-1", "1.0-2"), Ordering::Less);
/// assert_eq!(vercmp("1:0.5", "2.0"), Ordering::Greater);
/// assert_eq!(vercmp("1.0rc1", "1.0"), Ordering::Less);
/// ```
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (epoch_a, version_a, release_a) = split_evr(a);
    let (epoch_b, version_b, release_b) = split_evr(b);
    segment_cmp(epoch_a, epoch_b)
        .then_with(|| segment_cmp(version_a, version_b))
        .then_with(|| match (release_a, release_b) {
            (Some(release_a), Some(release_b)) => segment_cmp(release_a, release_b),
            _ => Ordering::Equal,
        })
}

/// Split into epoch (defaulting to `"0"`), version and optional release.
fn split_evr(evr: &str) -> (&str, &str, Option<&str>) {
    let digits = evr.bytes().take_while(u8::is_ascii_digit).count();
    let (epoch, rest) = match evr[digits..].strip_prefix(':') {
        Some(rest) if digits > 0 => (&evr[..digits], rest),
        Some(rest) => ("0", rest),
        None => ("0", evr),
    };
    match rest.rsplit_once('-') {
        Some((version, release)) => (epoch, version, Some(release)),
        None => (epoch, rest, None),
    }
}

fn segment_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (mut one, mut two) = (a.as_bytes(), b.as_bytes());
    while !one.is_empty() && !two.is_empty() {
        let separator_one = one.iter().take_while(|c| !c.is_ascii_alphanumeric()).count();
        let separator_two = two.iter().take_while(|c| !c.is_ascii_alphanumeric()).count();
        one = &one[separator_one..];
        two = &two[separator_two..];
        if one.is_empty() || two.is_empty() {
            break;
        }
        if separator_one != separator_two {
            return separator_one.cmp(&separator_two);
        }

        let numeric = one[0].is_ascii_digit();
        let run = |s: &[u8]| {
            s.iter()
                .take_while(|c| if numeric { c.is_ascii_digit() } else { c.is_ascii_alphabetic() })
                .count()
        };
        let (segment_one, rest_one) = one.split_at(run(one));
        let (segment_two, rest_two) = two.split_at(run(two));
        if segment_two.is_empty() {
            // Mixed kinds: numbers are newer than letters.
            return if numeric { Ordering::Greater } else { Ordering::Less };
        }

        let ordering = if numeric {
            let segment_one = strip_leading_zeros(segment_one);
            let segment_two = strip_leading_zeros(segment_two);
            segment_one.len().cmp(&segment_two.len()).then_with(|| segment_one.cmp(segment_two))
        } else {
            segment_one.cmp(segment_two)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
        one = rest_one;
        two = rest_two;
    }

    match (one.first(), two.first()) {
        (None, None) => Ordering::Equal,
        (None, Some(c)) if !c.is_ascii_alphabetic() => Ordering::Less,
        (Some(c), _) if c.is_ascii_alphabetic() => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn strip_leading_zeros(digits: &[u8]) -> &[u8] {
    let zeros = digits.iter().take_while(|&&c| c == b'0').count();
    &digits[zeros..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cmp::Ordering::{Equal, Greater, Less};

    #[rstest]
    // Simple
    #[case("1.0", "1.0", Equal)]
    #[case("1.0", "1.1", Less)]
    #[case("1.1", "1.0", Greater)]
    #[case("1.0.1", "1.0", Greater)]
    #[case("1.0", "1.0.1", Less)]
    #[case("1.10", "1.9", Greater)]
    #[case("1.01", "1.1", Equal)]
    // Letters
    #[case("1.0a", "1.0", Less)]
    #[case("1.0", "1.0a", Greater)]
    #[case("1.0alpha", "1.0beta", Less)]
    #[case("1.0rc1", "1.0", Less)]
    #[case("1.0a", "1.0.1", Less)]
    #[case("a", "1", Less)]
    #[case("1", "a", Greater)]
    // Separators
    #[case("1.0", "1_0", Equal)]
    #[case("1..0", "1.0", Greater)]
    #[case("1.0.", "1.0", Greater)]
    #[case("1.0.a", "1.0", Greater)]
    #[case("1.5.b", "1.5", Greater)]
    // Releases
    #[case("1.0-1", "1.0-2", Less)]
    #[case("1.0-10", "1.0-9", Greater)]
    #[case("1.0-1", "1.0", Equal)]
    #[case("1.0-1", "1.0.1-1", Less)]
    #[case("1.5.1-1", "1.5.b-1", Greater)]
    // Epochs
    #[case("1:1.0", "2.0", Greater)]
    #[case("0:1.0", "1.0", Equal)]
    #[case(":1.0", "1.0", Equal)]
    #[case("1:1.0-1", "1:1.0-2", Less)]
    #[case("2:0.1", "1:9.9", Greater)]
    fn version_ordering(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(vercmp(a, b), expected, "vercmp({a}, {b})");
        assert_eq!(vercmp(b, a), expected.reverse(), "vercmp({b}, {a})");
    }

    #[rstest]
    #[case("1.0", ("0", "1.0", None))]
    #[case("1.0-2", ("0", "1.0", Some("2")))]
    #[case("3:1.0-2", ("3", "1.0", Some("2")))]
    #[case("1.0-rc-2", ("0", "1.0-rc", Some("2")))]
    #[case("20240101", ("0", "20240101", None))]
    fn splits_evr(#[case] evr: &str, #[case] expected: (&str, &str, Option<&str>)) {
        assert_eq!(split_evr(evr), expected);
    }
}
