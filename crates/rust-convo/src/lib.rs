//! rust-convo: Scripted conversation testing for chat-capable systems
//!
//! This crate drives a scripted dialogue against a system under test,
//! resolves dynamic placeholders, matches replies against expected text,
//! regular expressions or structured data, and produces a timestamped,
//! step-by-step transcript for assertions and failure diagnostics.
//!
//! # Features
//!
//! - **Async-first design** with Tokio runtime
//! - **Scripting memory** with builtin dynamic values (`$now`, `$uniqueId`, ...)
//!   and variables captured from replies
//! - **Literal and regexp matching** with negation and JSON assertions
//! - **Fail-fast runs** whose partial transcript travels with the error
//! - **Transcript bus** publishing every finished run exactly once
//! - **Mock connector** for testing (feature: `mock`)
//!
//! # Example
//!
//! ```rust
//! use rust_convo::prelude::*;
//!
//! # async fn demo() -> std::result::Result<(), RunFailure> {
//! let convo = convo! {
//!     name "order";
//!     me "I want a pizza";
//!     bot "Your order number is $order";
//!     me "status of $order";
//!     bot "Order $order is on its way";
//! };
//!
//! let mut container = Container::new("demo", MockConnector::new(order_scenario("4711")));
//! let runner = ConvoRunner::new(RunConfig::default());
//! let transcript = runner.run_session(&mut container, &convo).await?;
//! assert_eq!(transcript.steps.len(), 4);
//! # Ok(())
//! # }
//! ```

// Re-export macros
pub use rust_convo_macros::convo;

// Core types
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod types;

// Core modules
pub mod container;
pub mod convo;
pub mod expect;
pub mod memory;
pub mod transcript;

// Feature modules
pub mod metrics;
pub mod multi;

/// Mock connector for testing.
#[cfg(feature = "mock")]
pub mod mock;

pub use config::{LogFormat, LoggingConfig, MatchingMode, RunConfig, TimeoutConfig};
pub use container::{BoxFuture, Connector, ConnectorResult, Container, ReplySink};
pub use convo::{Convo, ConvoBuilder, ConvoRunner, ConvoStep, RunResult};
pub use error::{ContainerError, ConvoError, ErrorKind, Result, RunFailure};
pub use expect::{Expectation, ExpectationMatcher, ExpectationPattern, PatternCache, Verdict};
pub use memory::{Binding, BuiltinRegistry, Diagnostic, ScriptingMemory};
pub use metrics::{Counter, Histogram, MetricsSnapshot, RunMetrics};
#[cfg(feature = "mock")]
pub use mock::{MockConnector, MockReply, Scenario};
pub use multi::{BatchResult, BatchSummary, ConvoBatch};
pub use transcript::{
    ListenerId, StepError, Transcript, TranscriptBus, TranscriptEvent, TranscriptListener,
    TranscriptRecorder, TranscriptStep,
};
pub use types::{Message, RunContext, RunOutcome, RunState, Sender};
