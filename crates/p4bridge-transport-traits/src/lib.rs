//! # p4bridge Transport Traits
//!
//! The seam between the p4bridge session layer and the external engine that
//! actually talks to the server.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Traits**: [`Transport`] (implemented by the engine) and [`ClientUser`]
//!   (implemented by the session's callback sink, driven by the engine)
//! - **Collaborators**: [`ClientMerge`], [`ClientResolveAction`], [`ClientProgress`], [`KeepAlive`]
//! - **Config**: [`ConnectionSettings`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//!
//! ## Usage
//!
//! Engine implementations depend on this crate and implement [`Transport`]:
//!
//! ```rust,ignore
//! use p4bridge_transport_traits::{ClientUser, Transport, TransportResult};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct RpcEngine { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for RpcEngine {
//!     async fn run(&mut self, command: &str, args: &[String], ui: &mut dyn ClientUser) -> TransportResult<()> {
//!         // stream server responses into `ui`
//!     }
//!     // ... other trait methods
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod config;
mod error;
mod traits;

// Re-export all public items
pub use config::ConnectionSettings;
pub use error::{TransportError, TransportResult};
pub use traits::{
    ClientMerge, ClientProgress, ClientResolveAction, ClientUser, KeepAlive, Transport,
};
