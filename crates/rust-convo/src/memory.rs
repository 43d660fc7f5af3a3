//! Scripting memory.
//!
//! This module provides the per-run variable store and the registry of
//! builtin dynamic functions it substitutes alongside bound variables.

mod builtin;
mod store;

pub use builtin::{Builtin, BuiltinFn, BuiltinRegistry, BuiltinRegistryBuilder};
pub use store::{Binding, Diagnostic, ScriptingMemory};
