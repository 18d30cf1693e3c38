//! Credential acquisition for Parley.
//!
//! Before the session manager can open a connection to the messaging
//! platform it needs a short-lived credential for the user. This crate
//! provides:
//!
//! 1. **The seam**: the [`TokenProvider`] trait, one async method from
//!    identity to credential.
//! 2. **The production implementation**: [`HttpTokenProvider`], a single
//!    `GET /token?identity=…` against the dashboard backend.
//!
//! Retrying is not this crate's job. A failed fetch is reported once and the
//! session layer decides what happens next.

mod error;
mod http;
mod provider;

pub use error::TokenError;
pub use http::{
    DEFAULT_IDENTITY, HttpTokenProvider, HttpTokenProviderBuilder,
    LOCAL_ORIGIN,
};
pub use provider::TokenProvider;
