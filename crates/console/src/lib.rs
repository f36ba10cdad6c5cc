//! Sokoni Console - client-side stores and adapters.
//!
//! This crate is the state layer of the Sokoni console: everything a view
//! surface (the CLI, or any future UI) needs to talk to the REST backend and
//! the object store, and to hold what came back.
//!
//! # Architecture
//!
//! - [`config`] - Environment-driven configuration
//! - [`api`] - Thin HTTP client wrapper over the REST backend
//! - [`storage`] - Key-value persistence port (tokens, cart)
//! - [`stores`] - Session, cart, and catalog state containers
//! - [`media`] - Object-store uploads, deletes, and image downscaling
//!
//! Stores are cheap-clone handles over shared inner state. Every
//! network-calling action returns its own `Result`; the stores additionally
//! record a last-error string for display surfaces that want one.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod media;
pub mod storage;
pub mod stores;

pub use api::{ApiClient, ApiError};
pub use config::{Config, ConfigError};
pub use media::{FileUpload, MediaClient, MediaError};
pub use storage::{KvStore, SharedKv, StorageError};
pub use stores::{CartStore, CatalogStore, SessionError, SessionStore};
