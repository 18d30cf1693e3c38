//! Shared data model for Parley.
//!
//! This crate defines the values every other layer speaks in:
//!
//! - **Who**: [`Identity`] and the short-lived [`Credential`] issued for it.
//! - **What**: [`Conversation`] and [`Message`], read-only projections of
//!   the hosted messaging platform's data.
//! - **How much**: [`Page`] and [`Cursor`], the uniform shape every paged
//!   platform listing is converted into.
//!
//! # Architecture
//!
//! ```text
//! Token backend ─┐
//!                ├─→ Session (identity + connection) ─→ Dashboard views
//! Platform SDK ──┘
//! ```
//!
//! The protocol crate sits underneath all of them and has no behavior of
//! its own beyond construction and formatting.

mod types;

pub use types::{
    Conversation, ConversationId, Credential, Cursor, Identity, Message,
    MessageId, Page,
};
