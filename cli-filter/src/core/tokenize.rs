//! Pattern-driven string splitting.
//!
//! Semantics follow the classic `split(PATTERN, EXPR, LIMIT)` contract:
//!
//! - a positive limit caps the number of tokens, leaving the remainder unsplit;
//! - a zero limit keeps every token but drops trailing empty ones;
//! - a negative limit keeps everything, trailing empties included.
//!
//! A zero-width separator match only ends a token when that token is non-empty.
//! Otherwise the search moves forward one character, so `""` splits `"abc"` into
//! its characters instead of producing an endless run of empty tokens.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

/// Whitespace-run separator used when no pattern is given.
pub const DEFAULT_SEPARATOR: &str = r"\s+";

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_SEPARATOR).expect("default separator is valid"));

#[derive(Debug, Clone)]
enum Separator {
    Pattern(Regex),
    Literal(String),
}

impl Separator {
    /// Leftmost match at or after `from`, as a byte range.
    fn find_at(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        match self {
            Self::Pattern(regex) => regex
                .find_at(text, from)
                .map(|found| (found.start(), found.end())),
            Self::Literal(literal) => text
                .get(from..)?
                .find(literal.as_str())
                .map(|offset| (from + offset, from + offset + literal.len())),
        }
    }
}

/// Compiled separator, reusable across many inputs.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    separator: Separator,
}

impl Tokenizer {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("compile separator {pattern:?}"))?;
        Ok(Self {
            separator: Separator::Pattern(regex),
        })
    }

    /// Tokenizer splitting on a literal string rather than a pattern.
    pub fn literal(separator: &str) -> Self {
        Self {
            separator: Separator::Literal(separator.to_string()),
        }
    }

    pub fn whitespace() -> Self {
        Self {
            separator: Separator::Pattern(WHITESPACE.clone()),
        }
    }

    pub fn split(&self, text: &str, max_tokens: i32) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut tokens: Vec<String> = Vec::new();
        let mut token_start = 0usize;
        let mut search_from = 0usize;

        loop {
            if max_tokens > 0 && tokens.len() + 1 >= max_tokens as usize {
                break;
            }
            if search_from > text.len() {
                break;
            }
            let Some((start, end)) = self.separator.find_at(text, search_from) else {
                break;
            };

            if start == end && start == token_start {
                // Zero-width match with nothing before it: step over one character.
                search_from = next_boundary(text, start);
                continue;
            }

            tokens.push(text[token_start..start].to_string());
            token_start = end;
            search_from = end;
        }

        tokens.push(text[token_start..].to_string());

        if max_tokens == 0 {
            while tokens.last().is_some_and(String::is_empty) {
                tokens.pop();
            }
        }
        tokens
    }
}

/// Split `text` on `pattern` (whitespace runs when `None`).
///
/// Fails only when `pattern` is not a valid regular expression.
pub fn tokenize(text: &str, pattern: Option<&str>, max_tokens: i32) -> Result<Vec<String>> {
    let tokenizer = match pattern {
        Some(pattern) => Tokenizer::new(pattern)?,
        None => Tokenizer::whitespace(),
    };
    Ok(tokenizer.split(text, max_tokens))
}

fn next_boundary(text: &str, at: usize) -> usize {
    match text[at..].chars().next() {
        Some(ch) => at + ch.len_utf8(),
        None => text.len() + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, pattern: Option<&str>, max_tokens: i32) -> Vec<String> {
        tokenize(text, pattern, max_tokens).expect("valid pattern")
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(split("", None, 0).is_empty());
        assert!(split("", Some(","), -1).is_empty());
        assert!(split("", Some(""), 3).is_empty());
    }

    #[test]
    fn default_pattern_splits_on_whitespace_runs() {
        assert_eq!(split("a  b\tc", None, 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn leading_separator_produces_leading_empty_token() {
        assert_eq!(split(" a b", None, 0), vec!["", "a", "b"]);
    }

    #[test]
    fn zero_limit_strips_only_trailing_empties() {
        assert_eq!(split("a,,b,,", Some(","), 0), vec!["a", "", "b"]);
    }

    #[test]
    fn negative_limit_keeps_trailing_empties() {
        assert_eq!(split("a,,b,,", Some(","), -1), vec!["a", "", "b", "", ""]);
    }

    #[test]
    fn positive_limit_leaves_remainder_unsplit() {
        assert_eq!(split("a=b=c=d", Some("="), 2), vec!["a", "b=c=d"]);
        assert_eq!(split("a=b=c=d", Some("="), 3), vec!["a", "b", "c=d"]);
        assert_eq!(split("a=b=c=d", Some("="), 1), vec!["a=b=c=d"]);
    }

    #[test]
    fn positive_limit_with_fewer_separators_returns_all_tokens() {
        assert_eq!(split("a=b", Some("="), 5), vec!["a", "b"]);
    }

    #[test]
    fn empty_pattern_splits_into_characters() {
        assert_eq!(split("abc", Some(""), 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_pattern_with_negative_limit_keeps_trailing_empty() {
        assert_eq!(split("a", Some(""), -1), vec!["a", ""]);
    }

    #[test]
    fn empty_pattern_handles_multibyte_characters() {
        assert_eq!(split("µs", Some(""), 0), vec!["µ", "s"]);
    }

    #[test]
    fn word_boundary_tokens_start_at_boundary_character() {
        assert_eq!(split("foo bar", Some(r"\b"), 0), vec!["foo", " ", "bar"]);
    }

    #[test]
    fn literal_tokenizer_escapes_metacharacters() {
        let tokenizer = Tokenizer::literal(".");
        assert_eq!(tokenizer.split("1.5.x", -1), vec!["1", "5", "x"]);
    }

    #[test]
    fn literal_tokenizer_matches_pattern_semantics() {
        for (text, max_tokens) in [("a::b::", 0), ("a::b::", -1), ("::a", 2)] {
            assert_eq!(
                Tokenizer::literal("::").split(text, max_tokens),
                split(text, Some("::"), max_tokens),
                "{text} {max_tokens}"
            );
        }
        assert_eq!(Tokenizer::literal("").split("ab", 0), vec!["a", "b"]);
        assert_eq!(Tokenizer::literal("").split("a", -1), vec!["a", ""]);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(tokenize("abc", Some("("), 0).is_err());
    }
}
