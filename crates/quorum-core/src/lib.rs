//! Core types and the vote ledger for Quorum.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::DocumentStore`]; the HTTP layers drive a
//! [`ledger::Ledger`] built over one.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod ledger;
pub mod post;
pub mod profile;
pub mod store;

pub use error::{Error, Result};
pub use ledger::Ledger;
