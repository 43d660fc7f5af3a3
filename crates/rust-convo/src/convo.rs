//! Scripted conversations.
//!
//! This module provides the conversation definition (ordered steps plus
//! identity) and the runner that executes it against a container.

pub mod definition;
pub mod runner;

pub use definition::{Convo, ConvoBuilder, ConvoStep};
pub use runner::{ConvoRunner, RunResult};
