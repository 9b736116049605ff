//! Session controller
//!
//! The session is decomposed into focused modules:
//!
//! - `core`: `Session<T>`, connection lifecycle and the command loop
//! - `operations`: settings, handler registration, result access, spec
//!   helpers, command helpers and the filelog model

pub mod core;
pub mod operations;

pub use self::core::Session;
pub use operations::filelog::{DepotFile, FilelogEntry, Integration, Revision};
