//! # p4bridge
//!
//! Client-side mediation between an application and a Perforce command
//! engine. The engine speaks the wire protocol; p4bridge turns what it
//! reports into structured results and runs the interactive protocols
//! (prompts, resolve, progress, single sign-on) against caller-supplied
//! handlers.
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |---|---|---|
//! | [`protocol`] | `p4bridge-protocol` | Messages, wire dictionaries, spec definitions, records, forms, errors |
//! | [`transport`] | `p4bridge-transport-traits` | The `Transport` an engine implements and the `ClientUser` callbacks it drives |
//! | [`client`] | `p4bridge-client` | `Session`, `SessionBuilder`, handler traits and the callback sink |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use p4bridge::prelude::*;
//!
//! #[derive(Debug)]
//! struct Printer;
//!
//! #[async_trait]
//! impl OutputHandler for Printer {
//!     async fn output_stat(&self, stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
//!         println!("{:?}", stat.field_str("depotFile"));
//!         Ok(OutputDisposition::HANDLED)
//!     }
//!     async fn output_info(&self, text: &str) -> HandlerResult<OutputDisposition> {
//!         println!("{text}");
//!         Ok(OutputDisposition::HANDLED)
//!     }
//!     async fn output_text(&self, _text: &str) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::REPORT)
//!     }
//!     async fn output_binary(&self, _data: &Bytes) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::REPORT)
//!     }
//!     async fn output_message(&self, _message: &Message) -> HandlerResult<OutputDisposition> {
//!         Ok(OutputDisposition::REPORT)
//!     }
//! }
//!
//! let p4 = SessionBuilder::from_env()
//!     .with_exception_level(1)
//!     .with_output_handler(Arc::new(Printer))
//!     .build(engine);
//! p4.connect().await?;
//! p4.run("files", &["//depot/main/..."]).await?;
//! p4.disconnect().await?;
//! ```
//!
//! ## Exception Levels
//!
//! | Level | Server errors | Server warnings |
//! |---|---|---|
//! | 0 | collected | collected |
//! | 1 | `Err(P4Error)` | collected |
//! | 2 (default) | `Err(P4Error)` | `Err(P4Error)` |
//!
//! Failures of caller handlers are always returned as errors, after the
//! engine has stopped the command.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub use p4bridge_client as client;
pub use p4bridge_protocol as protocol;
pub use p4bridge_transport_traits as transport;

pub use p4bridge_client::{
    CommandOutput, CommandResult, MergeInfo, Session, SessionBuilder, SessionConfig,
};
pub use p4bridge_protocol::{ErrorKind, P4Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types for applications and handler implementations
///
/// ```rust,ignore
/// use p4bridge::prelude::*;
/// ```
pub mod prelude {
    // Session surface
    pub use p4bridge_client::{
        CommandOutput, CommandResult, DepotFile, FilelogEntry, Input, InputValue, Integration,
        MergeInfo, Revision, Session, SessionBuilder, SessionConfig,
    };

    // Handler protocols
    pub use p4bridge_client::handlers::{
        DefaultSsoHandler, HandlerError, HandlerResult, OutputDisposition, OutputHandler,
        Progress, ReportHandler, Resolver, SsoHandler, SsoReply,
    };

    // Data model
    pub use p4bridge_protocol::{
        ErrorKind, Message, MergeStatus, P4Error, ProgressDone, Record, Result, Severity,
        SpecRecord, SsoStatus, WireDict,
    };

    // Engine seam
    pub use p4bridge_transport_traits::{
        ClientMerge, ClientProgress, ClientResolveAction, ClientUser, ConnectionSettings,
        KeepAlive, Transport, TransportError, TransportResult,
    };

    // Commonly needed external types
    pub use async_trait::async_trait;
    pub use bytes::Bytes;
    pub use std::sync::Arc;
}
