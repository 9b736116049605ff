//! Session operations
//!
//! Each module adds an `impl` block to [`Session`](super::Session).

pub mod filelog;
pub mod handlers;
pub mod helpers;
pub mod results;
pub mod settings;
pub mod specs;
