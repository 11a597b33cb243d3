//! Line-level tokenization of Appfile text using `nom`.
//!
//! Produces one [`Line`] per physical line. Blank lines and `#` comments are
//! reported as [`Line::Blank`] so the caller can keep accurate line numbers.

use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    character::complete::{char, space0},
    combinator::rest,
    sequence::separated_pair,
};

/// A classified Appfile line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Whitespace only, or a `#` comment.
    Blank,
    /// A `key: value` pair, both sides trimmed.
    Entry {
        /// Key text before the colon.
        key: &'a str,
        /// Value text after the colon, possibly empty.
        value: &'a str,
    },
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(is_key_char).parse(input)
}

/// Parses `key <ws>:<ws> value`.
fn entry(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(key, (space0, char(':'), space0), rest).parse(input)
}

/// Classifies a single line.
///
/// Returns `None` when the line is neither blank, a comment, nor an entry.
#[must_use]
pub fn classify(raw: &str) -> Option<Line<'_>> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Some(Line::Blank);
    }
    let (_, (key, value)) = entry(line).ok()?;
    Some(Line::Entry {
        key,
        value: value.trim_end(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_entry() {
        assert_eq!(
            classify("builder-image: golang"),
            Some(Line::Entry {
                key: "builder-image",
                value: "golang"
            })
        );
    }

    #[test]
    fn classify_trims_surrounding_whitespace() {
        assert_eq!(
            classify("  run-command :   echo hi  \r"),
            Some(Line::Entry {
                key: "run-command",
                value: "echo hi"
            })
        );
    }

    #[test]
    fn classify_value_keeps_later_colons() {
        assert_eq!(
            classify("run-command: echo a:b"),
            Some(Line::Entry {
                key: "run-command",
                value: "echo a:b"
            })
        );
    }

    #[test]
    fn classify_empty_value() {
        assert_eq!(
            classify("test-command:"),
            Some(Line::Entry {
                key: "test-command",
                value: ""
            })
        );
    }

    #[test]
    fn classify_blank_and_comment() {
        assert_eq!(classify(""), Some(Line::Blank));
        assert_eq!(classify("   \t"), Some(Line::Blank));
        assert_eq!(classify("# a comment"), Some(Line::Blank));
    }

    #[test]
    fn classify_rejects_missing_colon() {
        assert_eq!(classify("builder-image golang"), None);
    }

    #[test]
    fn classify_rejects_bad_key_chars() {
        assert_eq!(classify("builder image: golang"), None);
        assert_eq!(classify(": golang"), None);
    }
}
