//! Classification number canonicalization.
//!
//! The reference site lists classes with "raw" numbers whose width depends
//! on the depth of the listing: a top-level class is shown as `6`, a
//! division as `63`, a section as `636`, and subdivisions below the decimal
//! point as `636.7`, `636.72` and so on. Inside the taxonomy every integer
//! code is right-padded with zeros to three characters (`6` -> `600`,
//! `63` -> `630`) while decimal codes are kept verbatim.
//!
//! # Parent resolution
//!
//! [`candidate_ancestors`] lists the canonical numbers that may be the
//! parent of a raw number, most specific first:
//!
//! | Raw | Candidates |
//! |-----|------------|
//! | `636.72` | `636.7`, `636`, `630`, `600` |
//! | `636.7` | `636`, `630`, `600` |
//! | `636` | `630`, `600` |
//! | `62` | `600` |
//! | `6` | (none, top-level) |
//!
//! The builder probes them in order against the registry and attaches the
//! node to the first hit, so a missing intermediate level never orphans a
//! deeper class.

/// Width of the integer part of a canonical number.
pub const CANONICAL_WIDTH: usize = 3;

/// Normalize a raw classification number.
///
/// Integer codes are right-padded with `0` to [`CANONICAL_WIDTH`]
/// characters; codes containing a decimal point are returned unchanged
/// (apart from surrounding whitespace).
///
/// ```rust
/// use mds_harness::number::canonicalize;
///
/// assert_eq!(canonicalize("6"), "600");
/// assert_eq!(canonicalize("62"), "620");
/// assert_eq!(canonicalize("636.7"), "636.7");
/// ```
pub fn canonicalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains('.') {
        return raw.to_string();
    }
    format!("{:0<width$}", raw, width = CANONICAL_WIDTH)
}

/// Whether `raw` looks like a classification number: ASCII digits with at
/// most one decimal point followed by at least one digit.
pub fn is_valid_number(raw: &str) -> bool {
    let raw = raw.trim();
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (raw, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    all_digits(whole) && whole.len() <= CANONICAL_WIDTH && fraction.map_or(true, all_digits)
}

/// Whether `raw` denotes a top-level class (a single digit).
pub fn is_top_level(raw: &str) -> bool {
    let raw = raw.trim();
    raw.len() == 1 && raw.bytes().all(|b| b.is_ascii_digit())
}

/// Canonical numbers that may be the parent of `raw`, most specific first.
///
/// Decimal codes first drop one fractional digit at a time, then fall back
/// to the integer part; integer parts drop one trailing digit at a time,
/// re-padding each prefix. The canonical form of `raw` itself and
/// duplicate candidates are never returned, so a top-level number yields
/// an empty list.
pub fn candidate_ancestors(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if !raw.is_ascii() {
        return Vec::new();
    }

    let own = canonicalize(raw);
    let mut candidates = Vec::new();

    let integer = match raw.split_once('.') {
        Some((whole, fraction)) => {
            for len in (1..fraction.len()).rev() {
                push_candidate(&mut candidates, format!("{}.{}", whole, &fraction[..len]), &own);
            }
            push_candidate(&mut candidates, canonicalize(whole), &own);
            whole
        }
        None => raw,
    };

    for len in (1..integer.len()).rev() {
        push_candidate(&mut candidates, canonicalize(&integer[..len]), &own);
    }

    candidates
}

fn push_candidate(candidates: &mut Vec<String>, candidate: String, own: &str) {
    if candidate != own && !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}

/// The integer part of a number with trailing padding zeros removed
/// (`"630"` -> `"63"`, `"636.7"` -> `"636"`, `"000"` -> `""`).
pub fn significant_digits(number: &str) -> &str {
    let integer = number.split_once('.').map_or(number, |(whole, _)| whole);
    integer.trim_end_matches('0')
}

/// Whether `child` is a structural extension of `parent`: it adds integer
/// digits to the parent's significant digits, or extends the parent below
/// the decimal point.
///
/// Both arguments are canonical numbers.
pub fn is_structural_extension(parent: &str, child: &str) -> bool {
    if parent == child {
        return false;
    }

    match (parent.contains('.'), child.split_once('.')) {
        (true, Some(_)) => child.starts_with(parent),
        (true, None) => false,
        (false, Some((whole, _))) => significant_digits(whole).starts_with(significant_digits(parent)),
        (false, None) => {
            let p = significant_digits(parent);
            let c = significant_digits(child);
            c.len() > p.len() && c.starts_with(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_pads_integer_codes() {
        assert_eq!(canonicalize("6"), "600");
        assert_eq!(canonicalize("62"), "620");
        assert_eq!(canonicalize("636"), "636");
        assert_eq!(canonicalize("0"), "000");
    }

    #[test]
    fn test_canonicalize_keeps_decimal_codes() {
        assert_eq!(canonicalize("636.7"), "636.7");
        assert_eq!(canonicalize("636.72"), "636.72");
        assert_eq!(canonicalize(" 636.7 "), "636.7");
    }

    #[test]
    fn test_candidates_for_decimal_code() {
        assert_eq!(candidate_ancestors("636.7"), vec!["636", "630", "600"]);
        assert_eq!(
            candidate_ancestors("636.72"),
            vec!["636.7", "636", "630", "600"]
        );
        assert_eq!(
            candidate_ancestors("636.728"),
            vec!["636.72", "636.7", "636", "630", "600"]
        );
    }

    #[test]
    fn test_candidates_for_integer_code() {
        assert_eq!(candidate_ancestors("636"), vec!["630", "600"]);
        assert_eq!(candidate_ancestors("62"), vec!["600"]);
        assert_eq!(candidate_ancestors("630"), vec!["600"]);
    }

    #[test]
    fn test_candidates_skip_self() {
        // "60" pads to "600", which is also what "6" pads to.
        assert!(candidate_ancestors("60").is_empty());
        assert!(candidate_ancestors("6").is_empty());
    }

    #[test]
    fn test_validity() {
        assert!(is_valid_number("6"));
        assert!(is_valid_number("636.72"));
        assert!(!is_valid_number(""));
        assert!(!is_valid_number("63a"));
        assert!(!is_valid_number("636."));
        assert!(!is_valid_number("1234"));
        assert!(!is_valid_number("636.7.2"));
    }

    #[test]
    fn test_top_level() {
        assert!(is_top_level("6"));
        assert!(!is_top_level("62"));
        assert!(!is_top_level("600"));
    }

    #[test]
    fn test_significant_digits() {
        assert_eq!(significant_digits("600"), "6");
        assert_eq!(significant_digits("630"), "63");
        assert_eq!(significant_digits("636.7"), "636");
        assert_eq!(significant_digits("000"), "");
    }

    #[test]
    fn test_structural_extension() {
        assert!(is_structural_extension("600", "630"));
        assert!(is_structural_extension("630", "636"));
        assert!(is_structural_extension("636", "636.7"));
        assert!(is_structural_extension("636.7", "636.72"));
        assert!(is_structural_extension("600", "636.7"));
        assert!(is_structural_extension("000", "004"));

        assert!(!is_structural_extension("636", "636"));
        assert!(!is_structural_extension("630", "620"));
        assert!(!is_structural_extension("636.7", "636"));
        assert!(!is_structural_extension("636.7", "636.8"));
        assert!(!is_structural_extension("636.72", "636.7"));
    }
}
