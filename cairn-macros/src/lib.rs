//! Procedural macros for Cairn
//!
//! This crate provides the derive that turns a plain argument struct into a
//! memoization key. It is re-exported by `cairn-core`, so users only need one
//! dependency.

use proc_macro::TokenStream;

mod call_args;

/// Derive macro for `cairn_core::memo::CallArgs`
///
/// Named fields become keyword arguments (order-independent, keyed by field
/// name); tuple-struct fields become positional arguments. Every included field
/// must implement `cairn_core::memo::IntoArg`.
///
/// # Example
///
/// ```rust,ignore
/// use cairn_core::CallArgs;
///
/// #[derive(CallArgs)]
/// struct EpisodeQuery {
///     show: String,
///     season: u32,
///     episode: u32,
///     #[call_args(skip)]
///     client: HttpClient, // not part of the key
/// }
/// ```
#[proc_macro_derive(CallArgs, attributes(call_args))]
pub fn derive_call_args(input: TokenStream) -> TokenStream {
    call_args::derive_call_args(input.into()).into()
}
