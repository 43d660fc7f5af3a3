//! rust-convo-macros: Procedural macros for rust-convo
//!
//! This crate provides compile-time macros for the rust-convo conversation
//! testing library:
//!
//! - [`convo!`] - Define a scripted conversation
//!
//! # Example: Conversation Script
//!
//! ```ignore
//! use rust_convo_macros::convo;
//!
//! let script = convo! {
//!     name "greeting";
//!     me "hi";
//!     bot "Hello! What is your name?";
//!     me "Ann";
//!     not bot "error";
//! };
//! ```

// In proc-macro crates, passing parsed input by value is idiomatic
#![allow(clippy::needless_pass_by_value)]

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod convo;

/// Define a scripted conversation.
///
/// Creates a `rust_convo::convo::Convo` from a compact list of steps.
///
/// # Commands
///
/// - `name "text"` - Conversation name (at most once)
/// - `source "text"` - Where the conversation came from
/// - `utterance "NAME" ["a", "b"]` - Named alternatives a step text may refer to
/// - `me "text"` - Send text
/// - `bot "text"` - Expect text
/// - `not bot "text"` - Expect the reply not to match
/// - `pause 1000` - Wait for milliseconds
/// - `sender "who" "text"` - Step with a raw sender
///
/// # Examples
///
/// ```ignore
/// use rust_convo_macros::convo;
///
/// let order = convo! {
///     name "order";
///     me "I want a pizza";
///     bot "Your order number is $order";
///     pause 500;
///     me "status of $order";
///     bot "Order $order is on its way";
/// };
///
/// runner.run(&mut container, &order).await?;
/// ```
#[proc_macro]
pub fn convo(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as convo::ConvoInput);
    convo::expand(input).into()
}
