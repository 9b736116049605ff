//! # p4bridge Client
//!
//! Session layer for driving Perforce commands through an external command
//! engine and turning what comes back into structured, caller-friendly data.
//!
//! ## Features
//!
//! - One command at a time per session, with nested commands refused
//! - Tagged output converted to records, spec output to field-checked spec records
//! - Diagnostics split by severity and escalated according to an exception level
//! - Output handlers that can consume output or cancel a command early
//! - Resolve, progress and single-sign-on callbacks
//! - Handler failures and panics captured and re-raised once the engine has unwound
//! - Helpers for spec workflows, `login`, `password`, `submit`, `shelve` and `filelog`
//!
//! ## Architecture
//!
//! ```text
//! Application
//!        ↓
//! Session (this crate)  ←  ClientSink callbacks
//!        ↓                        ↑
//! Transport engine (p4bridge-transport-traits)
//!        ↓
//! Data model (p4bridge-protocol)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use p4bridge_client::{SessionBuilder, CommandOutput};
//!
//! let p4 = SessionBuilder::from_env().with_exception_level(1).build(engine);
//! p4.connect().await?;
//!
//! let opened = p4.run("opened", &["-c", "default"]).await?;
//! for unit in &opened.output {
//!     if let Some(path) = unit.field_str("depotFile") {
//!         println!("{path}");
//!     }
//! }
//!
//! let mut job = p4.fetch_spec("job", &["new"]).await?.and_then(|o| o.as_spec().cloned()).unwrap();
//! job.set("description", "Frobnicator leaks\n")?;
//! p4.save_spec("job", job, &[]).await?;
//!
//! p4.disconnect().await?;
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
    clippy::must_use_candidate
)]

pub mod builder;
pub mod config;
pub mod handlers;
pub mod input;
pub mod merge;
pub mod result;
pub mod session;
pub mod sink;
pub mod sso;

pub use builder::SessionBuilder;
pub use config::{DEFAULT_API_LEVEL, DEFAULT_PROG, SessionConfig};
pub use handlers::{
    DefaultSsoHandler, HandlerError, HandlerRegistry, HandlerResult, OutputDisposition,
    OutputHandler, Progress, ReportHandler, Resolver, SsoHandler, SsoReply,
};
pub use input::{Input, InputValue};
pub use merge::{MergeInfo, ResolveKind};
pub use result::{CommandOutput, CommandResult, ResultAccumulator};
pub use session::{DepotFile, FilelogEntry, Integration, Revision, Session};
pub use sink::{ClientSink, Liveness};
pub use sso::SsoFallback;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
