//! Convenient re-exports for common rust-convo usage.
//!
//! This module provides a single import to access the most commonly used
//! types and traits from rust-convo.
//!
//! # Example
//!
//! ```rust
//! use rust_convo::prelude::*;
//!
//! let convo = Convo::builder("greeting").me("hi").bot("Hello! What is your name?").build();
//! assert_eq!(convo.len(), 2);
//! ```

// Configuration
pub use crate::config::{LogFormat, LoggingConfig, MatchingMode, RunConfig, TimeoutConfig};

// Error handling
pub use crate::error::{ContainerError, ConvoError, ErrorKind, Result, RunFailure};

// Common types
pub use crate::types::{Message, RunContext, RunOutcome, RunState, Sender};

// Macros (re-exported from rust-convo-macros)
pub use crate::convo;

// Conversations
pub use crate::convo::{Convo, ConvoBuilder, ConvoRunner, ConvoStep};

// Container
pub use crate::container::{Connector, Container, ReplySink};

// Scripting memory
pub use crate::memory::{BuiltinRegistry, ScriptingMemory};

// Transcripts
pub use crate::transcript::{
    Transcript, TranscriptBus, TranscriptEvent, TranscriptListener, TranscriptStep,
};

// Concurrency
pub use crate::multi::ConvoBatch;

// Mock support
#[cfg(feature = "mock")]
pub use crate::mock::{MockConnector, Scenario, greeting_scenario, order_scenario, weather_scenario};
