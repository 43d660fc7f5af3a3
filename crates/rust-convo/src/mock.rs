//! Mock connector support for testing.
//!
//! This module provides mock implementations for running conversations
//! without a real system under test. It includes:
//!
//! - [`MockConnector`]: A connector answering from a scenario
//! - [`Scenario`]: Trigger texts mapped to canned replies or failures
//! - Built-in scenarios for common use cases
//!
//! # Example
//!
//! ```rust
//! use rust_convo::mock::{MockConnector, Scenario};
//!
//! let scenario = Scenario::new("greeter")
//!     .greeting("Welcome!")
//!     .on("hi", "Hello! What is your name?");
//!
//! let connector = MockConnector::new(scenario);
//! ```

pub mod builtin;
pub mod connector;
pub mod scenario;

pub use builtin::*;
pub use connector::MockConnector;
pub use scenario::{Fallback, MockReply, Reaction, Scenario, ScenarioRule};

use crate::container::Container;

/// Create an unstarted container around an echo connector.
#[must_use]
pub fn echo_container(id: impl Into<String>) -> Container<MockConnector> {
    Container::new(id, MockConnector::echo())
}

/// Create an unstarted container around a scenario.
#[must_use]
pub fn scenario_container(id: impl Into<String>, scenario: Scenario) -> Container<MockConnector> {
    Container::new(id, MockConnector::new(scenario))
}
