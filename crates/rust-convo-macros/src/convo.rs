//! Conversation script macro implementation.
//!
//! This module implements the `convo!` macro for defining scripted
//! conversations as a compact list of me/bot/pause steps.

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Ident, LitInt, LitStr, Result, Token, braced, bracketed};

/// A single statement in a conversation script.
pub enum ConvoItem {
    /// Set the conversation name.
    Name(LitStr),
    /// Set the conversation source.
    Source(LitStr),
    /// Send text.
    Me(LitStr),
    /// Expect text, optionally negated.
    Bot {
        /// Expected text.
        text: LitStr,
        /// Whether the expectation is negated.
        not: bool,
    },
    /// Wait for a number of milliseconds.
    Pause(LitInt),
    /// A step with a raw sender.
    Sender {
        /// Sender as written.
        sender: LitStr,
        /// Message text.
        text: LitStr,
    },
    /// A named list of utterance alternatives.
    Utterance {
        /// Utterance name.
        name: LitStr,
        /// Alternatives.
        alternatives: Vec<LitStr>,
    },
}

impl Parse for ConvoItem {
    fn parse(input: ParseStream) -> Result<Self> {
        let keyword: Ident = input.parse()?;

        match keyword.to_string().as_str() {
            "name" => Ok(Self::Name(input.parse()?)),
            "source" => Ok(Self::Source(input.parse()?)),
            "me" => Ok(Self::Me(input.parse()?)),
            "bot" => Ok(Self::Bot {
                text: input.parse()?,
                not: false,
            }),
            "not" => {
                let next: Ident = input.parse()?;
                if next != "bot" {
                    return Err(syn::Error::new(next.span(), "expected `bot` after `not`"));
                }
                Ok(Self::Bot {
                    text: input.parse()?,
                    not: true,
                })
            }
            "pause" => {
                let ms: LitInt = input.parse()?;
                ms.base10_parse::<u64>()?;
                Ok(Self::Pause(ms))
            }
            "sender" => Ok(Self::Sender {
                sender: input.parse()?,
                text: input.parse()?,
            }),
            "utterance" => {
                let name: LitStr = input.parse()?;
                let content;
                bracketed!(content in input);
                let alternatives: Punctuated<LitStr, Token![,]> =
                    Punctuated::parse_terminated(&content)?;
                if alternatives.is_empty() {
                    return Err(syn::Error::new(name.span(), "utterance needs at least one alternative"));
                }
                Ok(Self::Utterance {
                    name,
                    alternatives: alternatives.into_iter().collect(),
                })
            }
            other => Err(syn::Error::new(
                keyword.span(),
                format!("unknown convo command: {other}"),
            )),
        }
    }
}

/// The convo! macro input.
pub struct ConvoInput {
    /// The statements, in order.
    pub items: Punctuated<ConvoItem, Token![;]>,
}

impl Parse for ConvoInput {
    fn parse(input: ParseStream) -> Result<Self> {
        // Handle braced or unbraced syntax
        let items = if input.peek(syn::token::Brace) {
            let content;
            braced!(content in input);
            Punctuated::parse_terminated(&content)?
        } else {
            Punctuated::parse_terminated(input)?
        };

        let names = items
            .iter()
            .filter_map(|item| match item {
                ConvoItem::Name(name) => Some(name),
                _ => None,
            })
            .collect::<Vec<_>>();
        if let Some(duplicate) = names.get(1) {
            return Err(syn::Error::new(duplicate.span(), "convo name given twice"));
        }

        Ok(Self { items })
    }
}

impl ConvoInput {
    /// Get the conversation name, if given.
    #[must_use]
    pub fn name(&self) -> Option<&LitStr> {
        self.items.iter().find_map(|item| match item {
            ConvoItem::Name(name) => Some(name),
            _ => None,
        })
    }

    /// Count the steps (everything but name, source and utterances).
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                !matches!(
                    item,
                    ConvoItem::Name(_) | ConvoItem::Source(_) | ConvoItem::Utterance { .. }
                )
            })
            .count()
    }
}

/// Generate code for the convo! macro.
pub fn expand(input: ConvoInput) -> TokenStream {
    let name = input
        .name()
        .map_or_else(|| quote! { "unnamed" }, |name| quote! { #name });

    let calls: Vec<_> = input
        .items
        .iter()
        .filter_map(|item| match item {
            ConvoItem::Name(_) => None,
            ConvoItem::Source(source) => Some(quote! { .source(#source) }),
            ConvoItem::Me(text) => Some(quote! { .me(#text) }),
            ConvoItem::Bot { text, not: false } => Some(quote! { .bot(#text) }),
            ConvoItem::Bot { text, not: true } => Some(quote! { .not_bot(#text) }),
            ConvoItem::Pause(ms) => Some(quote! { .pause_ms(#ms) }),
            ConvoItem::Sender { sender, text } => Some(quote! { .sender(#sender, #text) }),
            ConvoItem::Utterance { name, alternatives } => {
                Some(quote! { .utterance(#name, [#(#alternatives),*]) })
            }
        })
        .collect();

    quote! {
        ::rust_convo::convo::ConvoBuilder::new(#name)
            #(#calls)*
            .build()
    }
}
