//! Error handling tests.
//!
//! Tests for error messages, kinds and the failure carried out of a run.

use std::error::Error as _;
use std::time::Duration;

use rust_convo::error::{ContainerError, ConvoError, ErrorKind};
use rust_convo::mock::echo_container;
use rust_convo::{Convo, ConvoRunner, MatchingMode, RunConfig};

// =============================================================================
// ConvoError introspection
// =============================================================================

#[test]
fn structured_mismatch_shows_both_values() {
    let err = ConvoError::StructuredMismatch {
        step: 2,
        key: "temperature".to_string(),
        expected: serde_json::json!(30),
        actual: Some(serde_json::json!(21)),
    };

    let msg = err.to_string();
    assert!(msg.contains("step 2"));
    assert!(msg.contains("30"));
    assert!(msg.contains("21"));
    assert_eq!(err.kind(), ErrorKind::StructuredMismatch);
}

#[test]
fn container_errors_are_not_expectation_failures() {
    let err: ConvoError = ContainerError::Closed {
        id: "c1".to_string(),
    }
    .into();

    assert!(!err.is_expectation_failure());
    assert!(err.to_string().contains("c1"));
}

#[test]
fn timeout_error_mentions_duration() {
    let err = ContainerError::Timeout {
        duration: Duration::from_millis(1500),
    };
    assert!(err.to_string().contains("1.5s"));
}

#[test]
fn error_kind_display() {
    assert_eq!(ErrorKind::UnmetExpectation.to_string(), "unmet expectation");
    assert_eq!(ErrorKind::MalformedPattern.to_string(), "malformed pattern");
}

// =============================================================================
// RunFailure
// =============================================================================

#[tokio::test]
async fn run_failure_exposes_source_chain() {
    let runner = ConvoRunner::default();
    let mut container = echo_container("chain");
    let convo = Convo::builder("chain").me("ping").bot("pong").build();

    let failure = runner.run_session(&mut container, &convo).await.unwrap_err();

    assert_eq!(failure.convo, "chain");
    let source = failure.source().unwrap().to_string();
    assert!(source.contains("'pong'"));
    assert!(source.contains("'ping'"));
    assert_eq!(failure.into_transcript().len(), 2);
}

#[tokio::test]
async fn malformed_pattern_fails_even_when_negated() {
    let runner = ConvoRunner::new(RunConfig::new().matching_mode(MatchingMode::Regexp));
    let mut container = echo_container("regexp");
    let convo = Convo::builder("broken regex")
        .me("anything")
        .not_bot("(unclosed")
        .build();

    let failure = runner.run_session(&mut container, &convo).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::MalformedPattern);
    assert_eq!(failure.error().step(), Some(1));
    assert!(failure.transcript().steps[1].not);
}
