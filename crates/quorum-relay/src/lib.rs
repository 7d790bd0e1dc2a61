//! Authentication-token propagation for Quorum.
//!
//! Sign-in on the client produces a short-lived bearer token. The
//! [`relay::TokenRelay`] mirrors it into the `authToken` cookie and forwards it
//! to the [`agent::InterceptionAgent`], whose [`agent::BearerLayer`] attaches
//! it to same-origin requests. On the server, [`recover::recover_token`] reads
//! it back from the `Authorization` header or the cookie.
//!
//! [`provider::LocalIdentityProvider`] is a process-local stand-in for the
//! external identity provider.

// Native `async fn` in traits; the `Send` bounds are spelled out on the trait.
#![allow(async_fn_in_trait)]

pub mod agent;
pub mod cookie;
pub mod error;
pub mod provider;
pub mod recover;
pub mod relay;
pub mod token;

pub use error::{Error, Result};
pub use token::BearerToken;
