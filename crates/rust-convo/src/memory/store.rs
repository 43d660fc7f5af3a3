//! The per-run variable store.
//!
//! [`ScriptingMemory`] substitutes bound variables and builtin functions
//! into outgoing text ([`ScriptingMemory::apply`]) and binds variables
//! from incoming text ([`ScriptingMemory::fill`]). Substitution always
//! walks keys longest first so that `$year` never eats the head of
//! `$years`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::builtin::BuiltinRegistry;
use crate::config::{MatchingMode, RunConfig};
use crate::expect::{ExpectationPattern, PatternCache, PatternOptions};

/// A variable bound by [`ScriptingMemory::fill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Variable name, including its `$` prefix.
    pub name: String,
    /// Captured value.
    pub value: String,
}

/// A non-fatal observation recorded while filling variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The variable that was bound.
    pub variable: String,
    /// The builtin token it collides with.
    pub builtin: String,
    /// The value that was bound anyway.
    pub value: String,
}

impl Diagnostic {
    /// Render the diagnostic as a sentence.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "variable {} collides with builtin {}; bound to '{}' anyway",
            self.variable, self.builtin, self.value
        )
    }
}

/// Find the first occurrence of `token` that ends on a word boundary.
fn find_token(text: &str, token: &str) -> Option<usize> {
    text.match_indices(token).map(|(pos, _)| pos).find(|&pos| {
        !text[pos + token.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

/// Variable store for one conversation run.
#[derive(Debug, Clone)]
pub struct ScriptingMemory {
    vars: BTreeMap<String, String>,
    builtins: Arc<BuiltinRegistry>,
    options: PatternOptions,
    enabled: bool,
    cache: Option<Arc<PatternCache>>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for ScriptingMemory {
    fn default() -> Self {
        Self::new(BuiltinRegistry::standard())
    }
}

impl ScriptingMemory {
    /// Create an empty, enabled memory in literal mode.
    #[must_use]
    pub fn new(builtins: Arc<BuiltinRegistry>) -> Self {
        Self {
            vars: BTreeMap::new(),
            builtins,
            options: PatternOptions::new(MatchingMode::Literal, true),
            enabled: true,
            cache: None,
            diagnostics: Vec::new(),
        }
    }

    /// Create a memory configured for a run.
    #[must_use]
    pub fn for_run(builtins: Arc<BuiltinRegistry>, config: &RunConfig) -> Self {
        Self::new(builtins)
            .with_mode(config.matching_mode)
            .enabled(config.scripting_memory)
    }

    /// Set the matching mode used to build fill patterns.
    #[must_use]
    pub const fn with_mode(mut self, mode: MatchingMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Enable or disable substitution and extraction.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self.options.capture_placeholders = enabled;
        self
    }

    /// Share a compiled-pattern cache with the matcher of the same run.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<PatternCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Check if the memory is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the options used to build expectation patterns.
    #[must_use]
    pub const fn pattern_options(&self) -> PatternOptions {
        self.options
    }

    /// Get the builtin registry.
    #[must_use]
    pub const fn builtins(&self) -> &Arc<BuiltinRegistry> {
        &self.builtins
    }

    /// Bind a variable. A missing `$` prefix is added.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let mut name = name.into();
        if !name.starts_with('$') {
            name.insert(0, '$');
        }
        self.vars.insert(name, value.into());
    }

    /// Get a bound variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Remove a bound variable.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// Get the number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if no variables are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate bound variables, longest name first (ties in name order).
    pub fn iter_longest_first(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        entries.into_iter()
    }

    /// Get the diagnostics recorded by [`fill`](Self::fill).
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Check if a builtin is shadowed by a bound variable extending its token.
    fn is_shadowed(&self, token: &str) -> bool {
        self.vars.keys().any(|k| k.starts_with(token))
    }

    /// Substitute builtins and bound variables into `text`.
    ///
    /// Each builtin (longest first) not shadowed by a bound variable, then
    /// each variable (longest first), replaces its first occurrence that is
    /// not followed by a word character, so `$year` leaves `$year_born` alone.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        if !self.enabled || !text.contains('$') {
            return text.to_string();
        }

        let mut result = text.to_string();

        for builtin in self.builtins.iter() {
            let token = builtin.token();
            if self.is_shadowed(token) {
                continue;
            }
            if let Some(pos) = find_token(&result, token) {
                result.replace_range(pos..pos + token.len(), &builtin.call());
            }
        }

        for (key, value) in self.iter_longest_first() {
            if let Some(pos) = find_token(&result, key) {
                result.replace_range(pos..pos + key.len(), value);
            }
        }

        result
    }

    /// Apply substitution to each auxiliary argument independently.
    #[must_use]
    pub fn apply_to_args<S: AsRef<str>>(&self, args: &[S]) -> Vec<String> {
        args.iter().map(|arg| self.apply(arg.as_ref())).collect()
    }

    /// Apply substitution to every string leaf of a JSON value.
    #[must_use]
    pub fn apply_to_json(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.apply_to_json(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.apply_to_json(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn compile(&self, expected: &str) -> Result<ExpectationPattern, regex::Error> {
        match &self.cache {
            Some(cache) => ExpectationPattern::compile_cached(expected, self.options, cache),
            None => ExpectationPattern::compile(expected, self.options),
        }
    }

    /// Bind placeholders in the expected alternatives from `actual`.
    ///
    /// Every alternative is tried; each one that matches binds its captured
    /// placeholders. Returns the bindings made, in order.
    pub fn fill<S: AsRef<str>>(&mut self, actual: &str, expected: &[S]) -> Vec<Binding> {
        let mut bindings = Vec::new();
        if !self.enabled {
            return bindings;
        }

        for candidate in expected {
            let candidate = candidate.as_ref();
            if !candidate.contains('$') {
                continue;
            }

            let pattern = match self.compile(candidate) {
                Ok(pattern) => pattern,
                Err(e) => {
                    tracing::warn!(pattern = candidate, error = %e, "cannot build fill pattern");
                    continue;
                }
            };

            let Some(captures) = pattern.captures(actual) else {
                continue;
            };

            for (name, value) in captures {
                if let Some(builtin) = self.builtins.collision(&name) {
                    let diagnostic = Diagnostic {
                        variable: name.clone(),
                        builtin: builtin.to_string(),
                        value: value.clone(),
                    };
                    tracing::warn!("{}", diagnostic.message());
                    self.diagnostics.push(diagnostic);
                }
                tracing::debug!(variable = %name, value = %value, "bound scripting variable");
                self.vars.insert(name.clone(), value.clone());
                bindings.push(Binding { name, value });
            }
        }

        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_registry() -> Arc<BuiltinRegistry> {
        Arc::new(
            BuiltinRegistry::builder()
                .constant("$year", "2026")
                .constant("$now", "NOW")
                .constant("$now_DE", "JETZT")
                .build(),
        )
    }

    fn memory() -> ScriptingMemory {
        ScriptingMemory::new(fixed_registry())
    }

    #[test]
    fn apply_without_placeholders_is_identity() {
        let memory = memory();
        assert_eq!(memory.apply("plain text"), "plain text");
        assert_eq!(memory.apply(""), "");
    }

    #[test]
    fn apply_substitutes_builtins_longest_first() {
        let memory = memory();
        assert_eq!(memory.apply("at $now_DE"), "at JETZT");
        assert_eq!(memory.apply("at $now"), "at NOW");
    }

    #[test]
    fn apply_replaces_first_occurrence_only() {
        let mut memory = memory();
        memory.set("$x", "1");
        assert_eq!(memory.apply("$x and $x"), "1 and $x");
    }

    #[test]
    fn apply_prefers_longer_variable() {
        let mut memory = memory();
        memory.set("$a", "short");
        memory.set("$ab", "long");
        assert_eq!(memory.apply("$a/$ab"), "short/long");
    }

    #[test]
    fn variable_shadows_builtin_it_extends() {
        let mut memory = memory();
        memory.set("$years", "5");
        // `$year` is suppressed because `$years` starts with it.
        assert_eq!(memory.apply("$years old in $year"), "5 old in $year");
    }

    #[test]
    fn variable_equal_to_builtin_overrides_it() {
        let mut memory = memory();
        memory.set("$now", "custom");
        assert_eq!(memory.apply("it is $now"), "it is custom");
    }

    #[test]
    fn apply_skips_tokens_inside_longer_names() {
        let memory = memory();
        assert_eq!(memory.apply("born in $year_born"), "born in $year_born");
        assert_eq!(memory.apply("$years, $year."), "$years, 2026.");

        let mut memory = memory;
        memory.set("$id", "7");
        assert_eq!(memory.apply("code $id_code"), "code $id_code");
        assert_eq!(memory.apply("$idx or $id"), "$idx or 7");
    }

    #[test]
    fn apply_bound_prefix_leaves_longer_placeholder() {
        let mut memory = memory();
        memory.set("$year", "X");
        assert_eq!(memory.apply("in $years"), "in $years");
    }

    #[test]
    fn set_adds_missing_prefix() {
        let mut memory = memory();
        memory.set("name", "Ann");
        assert_eq!(memory.get("$name"), Some("Ann"));
    }

    #[test]
    fn disabled_memory_is_inert() {
        let mut memory = memory().enabled(false);
        memory.set("$x", "1");
        assert_eq!(memory.apply("$x $now"), "$x $now");
        assert!(memory.fill("Hello Ann", &["Hello $name"]).is_empty());
        assert_eq!(memory.get("$name"), None);
    }

    #[test]
    fn apply_to_args_is_per_element() {
        let mut memory = memory();
        memory.set("$id", "42");
        assert_eq!(
            memory.apply_to_args(&["order $id", "static", "$id$id"]),
            vec!["order 42".to_string(), "static".to_string(), "42$id".to_string()]
        );
    }

    #[test]
    fn apply_to_json_rewrites_string_leaves() {
        let mut memory = memory();
        memory.set("$user", "ann");
        let value = serde_json::json!({"who": "$user", "n": 1, "tags": ["$user", true]});
        assert_eq!(
            memory.apply_to_json(&value),
            serde_json::json!({"who": "ann", "n": 1, "tags": ["ann", true]})
        );
    }

    #[test]
    fn fill_binds_positionally() {
        let mut memory = memory();
        let bindings = memory.fill("Order 77 for Ann", &["Order $order for $customer"]);
        assert_eq!(bindings.len(), 2);
        assert_eq!(memory.get("$order"), Some("77"));
        assert_eq!(memory.get("$customer"), Some("Ann"));
    }

    #[test]
    fn fill_escapes_literal_metacharacters() {
        let mut memory = memory();
        memory.fill("Price (net): 9.99", &["Price (net): $price"]);
        assert_eq!(memory.get("$price"), Some("9.99"));
    }

    #[test]
    fn fill_without_match_binds_nothing() {
        let mut memory = memory();
        assert!(memory.fill("Goodbye", &["Hello $name"]).is_empty());
        assert!(memory.is_empty());
    }

    #[test]
    fn fill_tries_every_alternative() {
        let mut memory = memory();
        memory.fill("Bye Ann", &["Hello $greeted", "Bye $left"]);
        assert_eq!(memory.get("$greeted"), None);
        assert_eq!(memory.get("$left"), Some("Ann"));
    }

    #[test]
    fn fill_over_builtin_binds_with_diagnostic() {
        let mut memory = memory();
        memory.fill("Now is 5pm", &["Now is $now_local"]);
        assert_eq!(memory.get("$now_local"), Some("5pm"));
        assert_eq!(memory.diagnostics().len(), 1);
        assert_eq!(memory.diagnostics()[0].builtin, "$now");
    }

    #[test]
    fn fill_in_regexp_mode_uses_pattern_verbatim() {
        let mut memory = memory().with_mode(MatchingMode::Regexp);
        memory.fill("ticket #123 opened", &[r"ticket #$id (opened|closed)"]);
        assert_eq!(memory.get("$id"), Some("123"));
    }

    #[test]
    fn fill_then_apply_round_trips() {
        let mut memory = memory();
        memory.fill("your code is X-9!", &["your code is $code"]);
        assert_eq!(memory.apply("confirm $code"), "confirm X-9!");
    }

    #[test]
    fn fill_with_shared_cache() {
        let cache = Arc::new(PatternCache::default());
        let mut memory = memory().with_cache(Arc::clone(&cache));
        memory.fill("Hi Ann", &["Hi $name"]);
        memory.fill("Hi Bob", &["Hi $name"]);
        assert_eq!(memory.get("$name"), Some("Bob"));
        assert_eq!(cache.stats().total_hits, 1);
    }

    #[test]
    fn iteration_order_is_longest_first() {
        let mut memory = memory();
        memory.set("$b", "1");
        memory.set("$abc", "2");
        memory.set("$aa", "3");
        memory.set("$ab", "4");
        let keys: Vec<&str> = memory.iter_longest_first().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["$abc", "$aa", "$ab", "$b"]);
    }
}
