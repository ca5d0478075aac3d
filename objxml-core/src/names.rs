//! Bumpy-case identifier → XML tag name conversion
//!
//! Every tag the serializer generates from a field, column, join or binding
//! name goes through [`to_tag_name`]. The conversion runs in two passes:
//!
//! 1. Acronym repair: a run of capitals that ends the string, or that hands
//!    its last capital to a following bumpy word, keeps its first letter and
//!    lowercases the rest (`URLInfo` → `UrlInfo`, `myURL` → `myUrl`).
//! 2. Hyphenation: every lowercase/uppercase boundary gets a hyphen and the
//!    whole string is lowercased (`myUrlInfo` → `my-url-info`).
//!
//! Only ASCII letters and digits are accepted. Anything else (spaces,
//! hyphens, underscores, punctuation) is rejected with [`InvalidNameError`],
//! so a tag name produced here is always a valid XML name as long as it does
//! not start with a digit.
//!
//! Runs of capitals directly followed by digits or by another run with no
//! lowercase letter in between are left alone by the acronym pass; this
//! mirrors the regular expressions below and is deliberately not "cleaned up".

use crate::error::InvalidNameError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static INVALID_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());

// An acronym, followed either by the start of a bumpy word or the end of the
// string. Leftmost-first matching gives the same backtracking preference as
// a Perl-style engine: the longest run that still lets the tail match.
static ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<acronym>[A-Z]+)(?P<next>[A-Z][a-z]|$)").unwrap());

static WORD_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z][A-Z]").unwrap());

/// Convert a bumpy-case identifier into a lowercase, hyphen-separated tag name.
///
/// ```ignore
/// assert_eq!(to_tag_name("attributeName")?, "attribute-name");
/// assert_eq!(to_tag_name("IPAddress")?, "ip-address");
/// assert_eq!(to_tag_name("exhibitA")?, "exhibit-a");
/// ```
pub fn to_tag_name(identifier: &str) -> Result<String, InvalidNameError> {
    if !is_valid_identifier(identifier) {
        return Err(InvalidNameError::new(identifier));
    }

    let repaired = fix_acronyms(identifier);
    Ok(insert_hyphens(&repaired))
}

/// Whether `identifier` consists solely of ASCII letters and digits.
pub fn is_valid_identifier(identifier: &str) -> bool {
    !INVALID_CHAR.is_match(identifier)
}

/// Whether `name` is usable as an element name as-is.
///
/// Used for caller-supplied root tags, which are not normalized. Only the
/// ASCII subset of the XML `Name` production is accepted, and namespace
/// prefixes (`:`) are rejected since no namespace is ever declared.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn fix_acronyms(identifier: &str) -> String {
    ACRONYM
        .replace_all(identifier, |caps: &Captures<'_>| {
            let acronym = &caps["acronym"];
            // The run is ASCII, so splitting after the first byte is safe.
            let (head, tail) = acronym.split_at(1);
            format!("{head}{}{}", tail.to_ascii_lowercase(), &caps["next"])
        })
        .into_owned()
}

fn insert_hyphens(identifier: &str) -> String {
    WORD_BOUNDARY
        .replace_all(identifier, |caps: &Captures<'_>| {
            let pair = caps[0].to_ascii_lowercase();
            let (end, start) = pair.split_at(1);
            format!("{end}-{start}")
        })
        .to_ascii_lowercase()
}
