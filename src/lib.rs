//! # docshelf
//!
//! A self-hostable document shelf: hierarchical markdown documents with tags,
//! groups and per-document access policies. Usable as a standalone binary or
//! as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! docshelf = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docshelf::config::ServerConfig;
//! use docshelf::server::{AppState, create_router};
//!
//! let state = Arc::new(AppState::open(&ServerConfig::default()).await?);
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! The backends can also be composed directly:
//!
//! ```rust,ignore
//! use docshelf::content::MemoryContentStore;
//! use docshelf::index::SearchIndex;
//! use docshelf::service::{DocumentService, ServiceConfig};
//! use docshelf::store::{CollectionNames, MetadataStore, SqliteStore};
//!
//! let store = SqliteStore::open_in_memory(CollectionNames::default())?;
//! store.ensure_schema().await?;
//! let docs = DocumentService::new(
//!     Arc::new(store),
//!     Arc::new(MemoryContentStore::new()),
//!     Arc::new(SearchIndex::in_memory()?),
//!     ServiceConfig::default(),
//! );
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Pulls in `clap` for the binary. Disable with `default-features = false`.

pub mod access;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod index;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
