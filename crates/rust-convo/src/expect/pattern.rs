//! Expectation patterns.
//!
//! An expectation pattern is the regular expression built from an
//! expected message: literal segments are escaped (unless the run uses
//! regexp matching) and every `$word` placeholder becomes a capturing
//! group, bound positionally to the placeholder's name.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::cache::PatternCache;
use crate::config::MatchingMode;

/// Placeholder tokens: `$` followed by word characters.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\w+").expect("placeholder pattern is a valid regex"));

/// Capturing group substituted for each placeholder.
const CAPTURE_GROUP: &str = r"\S+";

/// Prefix for generated group names.
const GROUP_PREFIX: &str = "__ph";

/// How an expectation pattern is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternOptions {
    /// Literal or regexp mode.
    pub mode: MatchingMode,
    /// Whether `$word` placeholders become capturing groups.
    pub capture_placeholders: bool,
}

impl PatternOptions {
    /// Create pattern options.
    #[must_use]
    pub const fn new(mode: MatchingMode, capture_placeholders: bool) -> Self {
        Self {
            mode,
            capture_placeholders,
        }
    }
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self::new(MatchingMode::Literal, true)
    }
}

/// Find the placeholder tokens in `text`, in order of appearance.
#[must_use]
pub fn placeholders(text: &str) -> Vec<&str> {
    PLACEHOLDER.find_iter(text).map(|m| m.as_str()).collect()
}

/// The regex source and placeholder names for an expected text.
#[must_use]
pub fn build_source(expected: &str, options: PatternOptions) -> (String, Vec<String>) {
    let regexp = options.mode.is_regexp();
    let mut source = String::with_capacity(expected.len() + 8);
    let mut names = Vec::new();
    let mut last = 0;

    let push_segment = |source: &mut String, segment: &str| {
        if regexp {
            source.push_str(segment);
        } else {
            source.push_str(&regex::escape(segment));
        }
    };

    if options.capture_placeholders {
        for m in PLACEHOLDER.find_iter(expected) {
            // `\$` in a raw regex is a literal dollar; `\\$` is a literal
            // backslash followed by a placeholder.
            let backslashes = expected[..m.start()]
                .bytes()
                .rev()
                .take_while(|&b| b == b'\\')
                .count();
            if regexp && backslashes % 2 == 1 {
                continue;
            }
            push_segment(&mut source, &expected[last..m.start()]);
            source.push_str(&format!("(?P<{GROUP_PREFIX}{}>{CAPTURE_GROUP})", names.len()));
            names.push(m.as_str().to_string());
            last = m.end();
        }
    }
    push_segment(&mut source, &expected[last..]);

    if regexp {
        (source, names)
    } else {
        (format!("(?s)^{source}$"), names)
    }
}

/// A compiled expectation pattern.
#[derive(Clone)]
pub struct ExpectationPattern {
    expected: String,
    source: String,
    regex: Arc<Regex>,
    placeholders: Vec<String>,
}

impl ExpectationPattern {
    /// Compile an expected text.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting regex is invalid (only possible in
    /// regexp mode, or when the pattern exceeds the regex size limit).
    pub fn compile(expected: &str, options: PatternOptions) -> Result<Self, regex::Error> {
        let (source, placeholders) = build_source(expected, options);
        let regex = Arc::new(Regex::new(&source)?);
        Ok(Self {
            expected: expected.to_string(),
            source,
            regex,
            placeholders,
        })
    }

    /// Compile an expected text, reusing compiled regexes from `cache`.
    pub fn compile_cached(
        expected: &str,
        options: PatternOptions,
        cache: &PatternCache,
    ) -> Result<Self, regex::Error> {
        let (source, placeholders) = build_source(expected, options);
        let regex = cache.get_or_compile(&source)?;
        Ok(Self {
            expected: expected.to_string(),
            source,
            regex,
            placeholders,
        })
    }

    /// Get the expected text this pattern was built from.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Get the regex source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the placeholder names, in capture order.
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Check if `text` satisfies this pattern.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Match `text` and pair each captured value with its placeholder name.
    ///
    /// Returns `None` when the text does not match.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(text)?;
        Some(
            self.placeholders
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.name(&format!("{GROUP_PREFIX}{i}"))
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl fmt::Debug for ExpectationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectationPattern")
            .field("expected", &self.expected)
            .field("source", &self.source)
            .field("placeholders", &self.placeholders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LITERAL: PatternOptions = PatternOptions::new(MatchingMode::Literal, true);
    const REGEXP: PatternOptions = PatternOptions::new(MatchingMode::Regexp, true);

    #[test]
    fn literal_escapes_metacharacters() {
        let pattern = ExpectationPattern::compile("Total: 3.50 (incl. tax)+", LITERAL).unwrap();
        assert!(pattern.is_match("Total: 3.50 (incl. tax)+"));
        assert!(!pattern.is_match("Total: 3x50 (incl. tax)"));
    }

    #[test]
    fn literal_matches_whole_reply() {
        let pattern = ExpectationPattern::compile("hello", LITERAL).unwrap();
        assert!(pattern.is_match("hello"));
        assert!(!pattern.is_match("hello world"));
        assert!(!pattern.is_match("oh hello"));
    }

    #[test]
    fn literal_spans_lines() {
        let pattern = ExpectationPattern::compile("line one\nline $n", LITERAL).unwrap();
        assert!(pattern.is_match("line one\nline two"));
    }

    #[test]
    fn placeholders_become_groups_in_order() {
        let pattern = ExpectationPattern::compile("$first meets $second_name", LITERAL).unwrap();
        assert_eq!(pattern.placeholders(), ["$first", "$second_name"]);

        let caps = pattern.captures("Alice meets Bob").unwrap();
        assert_eq!(
            caps,
            vec![
                ("$first".to_string(), "Alice".to_string()),
                ("$second_name".to_string(), "Bob".to_string()),
            ]
        );
    }

    #[test]
    fn shorter_placeholder_first_still_binds_positionally() {
        let pattern = ExpectationPattern::compile("$a then $abc", LITERAL).unwrap();
        let caps = pattern.captures("1 then 2").unwrap();
        assert_eq!(caps[0], ("$a".to_string(), "1".to_string()));
        assert_eq!(caps[1], ("$abc".to_string(), "2".to_string()));
    }

    #[test]
    fn placeholder_stops_at_punctuation_boundary() {
        let pattern = ExpectationPattern::compile("Hello $name, welcome", LITERAL).unwrap();
        let caps = pattern.captures("Hello Joe, welcome").unwrap();
        assert_eq!(caps[0].1, "Joe");
    }

    #[test]
    fn disabled_placeholders_match_literally() {
        let options = PatternOptions::new(MatchingMode::Literal, false);
        let pattern = ExpectationPattern::compile("costs $5", options).unwrap();
        assert!(pattern.placeholders().is_empty());
        assert!(pattern.is_match("costs $5"));
        assert!(!pattern.is_match("costs 5"));
    }

    #[test]
    fn regexp_is_verbatim_and_unanchored() {
        let pattern = ExpectationPattern::compile(r"\d{3}-\d{4}", REGEXP).unwrap();
        assert!(pattern.is_match("call 555-1234 now"));
    }

    #[test]
    fn regexp_user_groups_do_not_shift_placeholders() {
        let pattern = ExpectationPattern::compile(r"(hi|hello) $name", REGEXP).unwrap();
        let caps = pattern.captures("hello Ann").unwrap();
        assert_eq!(caps, vec![("$name".to_string(), "Ann".to_string())]);
    }

    #[test]
    fn regexp_escaped_dollar_is_not_placeholder() {
        let pattern = ExpectationPattern::compile(r"costs \$five", REGEXP).unwrap();
        assert!(pattern.placeholders().is_empty());
        assert!(pattern.is_match("it costs $five"));
    }

    #[test]
    fn regexp_escaped_backslash_keeps_placeholder() {
        let pattern = ExpectationPattern::compile(r"path C:\\$dir", REGEXP).unwrap();
        assert_eq!(pattern.placeholders(), ["$dir"]);
        let caps = pattern.captures(r"path C:\temp").unwrap();
        assert_eq!(caps, vec![("$dir".to_string(), "temp".to_string())]);

        let pattern = ExpectationPattern::compile(r"odd \\\$dir", REGEXP).unwrap();
        assert!(pattern.placeholders().is_empty());
        assert!(pattern.is_match(r"odd \$dir"));
    }

    #[test]
    fn malformed_regexp_is_error() {
        assert!(ExpectationPattern::compile("(unclosed", REGEXP).is_err());
        assert!(ExpectationPattern::compile("(unclosed", LITERAL).is_ok());
    }

    #[test]
    fn placeholder_scan() {
        assert_eq!(placeholders("$a and $b_c but not $"), vec!["$a", "$b_c"]);
    }
}
