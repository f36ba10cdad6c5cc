//! Sokoni Core - Shared domain types.
//!
//! This crate provides the common types used across all Sokoni components:
//! - `console` - Client-side stores and adapters for the REST backend
//! - `cli` - Command-line console driving the stores
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Everything
//! here mirrors the wire shapes the backend serves, so the stores and the
//! CLI share one vocabulary.
//!
//! # Modules
//!
//! - [`types`] - Products, user profiles, cart lines, and paging math

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
