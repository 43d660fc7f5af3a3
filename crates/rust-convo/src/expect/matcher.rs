//! Expectation matching engine.
//!
//! This module decides whether a bot reply satisfies a scripted
//! expectation: the text alternatives, the structured-data assertions and
//! the negation flag are combined into a single verdict, and satisfied
//! expectations bind their placeholders in the run's scripting memory.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::cache::PatternCache;
use super::pattern::ExpectationPattern;
use super::structured::{self, KeyMismatch};
use crate::error::{ConvoError, Result};
use crate::memory::{Binding, ScriptingMemory};
use crate::types::Message;

/// What a bot step expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expectation {
    /// Text alternatives; the reply must match one of them.
    pub alternatives: Vec<String>,
    /// Structured-data assertions keyed by dotted path.
    pub json: Option<Map<String, Value>>,
    /// Whether the step is negated.
    pub not: bool,
}

impl Expectation {
    /// Expect a single text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![text.into()],
            ..Default::default()
        }
    }

    /// Expect any of several texts.
    #[must_use]
    pub fn any<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alternatives: alternatives.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add structured-data assertions.
    #[must_use]
    pub fn with_json(mut self, json: Map<String, Value>) -> Self {
        self.json = Some(json);
        self
    }

    /// Set the negation flag.
    #[must_use]
    pub const fn negated(mut self, not: bool) -> Self {
        self.not = not;
        self
    }

    /// Substitute bound variables and builtins into the alternatives and
    /// the expected JSON values. Unbound placeholders are left in place.
    #[must_use]
    pub fn substitute(&self, memory: &ScriptingMemory) -> Self {
        Self {
            alternatives: memory.apply_to_args(&self.alternatives),
            json: self.json.as_ref().map(|json| {
                json.iter()
                    .map(|(k, v)| (k.clone(), memory.apply_to_json(v)))
                    .collect()
            }),
            not: self.not,
        }
    }

    /// Get the non-empty text alternatives.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.alternatives
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Check if the expectation constrains the reply text.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.texts().next().is_some()
    }

    /// Render the alternatives for display.
    #[must_use]
    pub fn display(&self) -> String {
        self.texts().collect::<Vec<_>>().join(" | ")
    }
}

/// The outcome of evaluating an expectation, before negation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether some text alternative matched; `None` when there was no text.
    pub text: Option<bool>,
    /// The first structured assertion that did not hold.
    pub structured: Option<KeyMismatch>,
    /// The negation flag of the expectation.
    pub not: bool,
}

impl Verdict {
    /// Check if the unnegated expectation matched.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.text.unwrap_or(true) && self.structured.is_none()
    }

    /// Check if the step is satisfied: a match XOR the negation flag.
    #[must_use]
    pub fn satisfied(&self) -> bool {
        self.matched() != self.not
    }
}

/// The expectation matcher.
#[derive(Debug, Clone, Default)]
pub struct ExpectationMatcher {
    cache: Arc<PatternCache>,
}

impl ExpectationMatcher {
    /// Create a matcher with its own pattern cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher using the given pattern cache.
    #[must_use]
    pub const fn with_cache(cache: Arc<PatternCache>) -> Self {
        Self { cache }
    }

    /// Get the pattern cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<PatternCache> {
        &self.cache
    }

    /// Evaluate a (substituted) expectation against a reply.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoError::MalformedPattern`] if an alternative cannot be
    /// compiled, regardless of negation.
    pub fn evaluate(
        &self,
        memory: &ScriptingMemory,
        step: usize,
        expectation: &Expectation,
        actual: &Message,
    ) -> Result<Verdict> {
        let options = memory.pattern_options();

        let text = if expectation.has_text() {
            let mut matched = false;
            for alternative in expectation.texts() {
                let pattern = ExpectationPattern::compile_cached(alternative, options, &self.cache)
                    .map_err(|source| ConvoError::MalformedPattern {
                        step,
                        pattern: alternative.to_string(),
                        source,
                    })?;
                if pattern.is_match(actual.text()) {
                    matched = true;
                    break;
                }
            }
            Some(matched)
        } else {
            None
        };

        let structured = expectation.json.as_ref().and_then(|json| {
            let payload = structured::payload(actual);
            structured::check(json, payload.as_deref()).err()
        });

        Ok(Verdict {
            text,
            structured,
            not: expectation.not,
        })
    }

    /// Resolve a reply against a (substituted) expectation.
    ///
    /// On a satisfied, unnegated expectation the reply's placeholders are
    /// bound in `memory` and the new bindings are returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoError::UnmetExpectation`] or
    /// [`ConvoError::StructuredMismatch`] if the step is not satisfied, and
    /// [`ConvoError::MalformedPattern`] if an alternative cannot be compiled.
    pub fn resolve(
        &self,
        memory: &mut ScriptingMemory,
        step: usize,
        expectation: &Expectation,
        actual: &Message,
    ) -> Result<Vec<Binding>> {
        let verdict = self.evaluate(memory, step, expectation, actual)?;

        if verdict.satisfied() {
            tracing::debug!(step, negated = verdict.not, "expectation satisfied");
            if verdict.not {
                return Ok(Vec::new());
            }
            let candidates: Vec<&str> = expectation.texts().collect();
            return Ok(memory.fill(actual.text(), &candidates));
        }

        Err(unmet(step, expectation, &verdict, actual))
    }
}

fn unmet(step: usize, expectation: &Expectation, verdict: &Verdict, actual: &Message) -> ConvoError {
    match &verdict.structured {
        Some(mismatch) if !verdict.not && verdict.text != Some(false) => {
            ConvoError::StructuredMismatch {
                step,
                key: mismatch.key.clone(),
                expected: mismatch.expected.clone(),
                actual: mismatch.actual.clone(),
            }
        }
        _ => ConvoError::UnmetExpectation {
            step,
            expected: expectation.display(),
            actual: actual.text().to_string(),
            negated: verdict.not,
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::MatchingMode;
    use crate::error::ErrorKind;
    use crate::memory::BuiltinRegistry;

    fn memory() -> ScriptingMemory {
        ScriptingMemory::new(Arc::new(BuiltinRegistry::empty()))
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn plain_match() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let result = matcher.resolve(&mut memory, 0, &Expectation::text("Hello"), &Message::bot("Hello"));
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn plain_mismatch_is_unmet() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let err = matcher
            .resolve(&mut memory, 2, &Expectation::text("Hello"), &Message::bot("Bye"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmetExpectation);
        assert_eq!(err.step(), Some(2));
    }

    #[test]
    fn negation_inverts_verdict() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let expectation = Expectation::text("error").negated(true);

        assert!(matcher.resolve(&mut memory, 0, &expectation, &Message::bot("fine")).is_ok());

        let err = matcher
            .resolve(&mut memory, 0, &expectation, &Message::bot("error"))
            .unwrap_err();
        assert!(err.to_string().contains("not to match"));
    }

    #[test]
    fn empty_expectation_matches_anything() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        assert!(
            matcher
                .resolve(&mut memory, 0, &Expectation::default(), &Message::bot("whatever"))
                .is_ok()
        );
    }

    #[test]
    fn any_alternative_matches() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let expectation = Expectation::any(["Hi", "Hello"]);
        assert!(matcher.resolve(&mut memory, 0, &expectation, &Message::bot("Hello")).is_ok());
        assert_eq!(expectation.display(), "Hi | Hello");
    }

    #[test]
    fn satisfied_step_binds_placeholders() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let bindings = matcher
            .resolve(
                &mut memory,
                0,
                &Expectation::text("Your order $order is ready"),
                &Message::bot("Your order A-17 is ready"),
            )
            .unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(memory.get("$order"), Some("A-17"));
    }

    #[test]
    fn negated_step_binds_nothing() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let expectation = Expectation::text("Goodbye $name").negated(true);
        matcher
            .resolve(&mut memory, 0, &expectation, &Message::bot("Hello Ann"))
            .unwrap();
        assert!(memory.is_empty());
    }

    #[test]
    fn malformed_pattern_fails_even_when_negated() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory().with_mode(MatchingMode::Regexp);
        let expectation = Expectation::text("(unclosed").negated(true);
        let err = matcher
            .resolve(&mut memory, 1, &expectation, &Message::bot("anything"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPattern);
    }

    #[test]
    fn structured_match_and_mismatch() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let expectation = Expectation::default().with_json(object(json!({"intent.name": "greet"})));

        let good = Message::bot("").with_source_data(json!({"intent": {"name": "greet"}}));
        assert!(matcher.resolve(&mut memory, 0, &expectation, &good).is_ok());

        let bad = Message::bot("").with_source_data(json!({"intent": {"name": "bye"}}));
        let err = matcher.resolve(&mut memory, 0, &expectation, &bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuredMismatch);

        let missing = Message::bot("no payload");
        let err = matcher.resolve(&mut memory, 0, &expectation, &missing).unwrap_err();
        assert!(matches!(err, ConvoError::StructuredMismatch { actual: None, .. }));
    }

    #[test]
    fn text_failure_wins_over_structured() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        let expectation = Expectation::text("Hello").with_json(object(json!({"a": 1})));
        let err = matcher
            .resolve(&mut memory, 0, &expectation, &Message::bot("Bye"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmetExpectation);
    }

    #[test]
    fn substitute_keeps_unbound_placeholders() {
        let mut memory = memory();
        memory.set("$city", "Vienna");
        let expectation = Expectation::text("Weather in $city for $day")
            .with_json(object(json!({"location": "$city"})))
            .substitute(&memory);
        assert_eq!(expectation.alternatives, vec!["Weather in Vienna for $day".to_string()]);
        assert_eq!(expectation.json, Some(object(json!({"location": "Vienna"}))));
    }

    #[test]
    fn repeated_expectations_hit_cache() {
        let matcher = ExpectationMatcher::new();
        let mut memory = memory();
        for _ in 0..3 {
            matcher
                .resolve(&mut memory, 0, &Expectation::text("ping"), &Message::bot("ping"))
                .unwrap();
        }
        assert_eq!(matcher.cache().stats().total_hits, 2);
    }
}
