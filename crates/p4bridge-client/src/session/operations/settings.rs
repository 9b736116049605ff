//! Session settings
//!
//! Per-command settings take effect on the next command. Settings negotiated
//! at connect time (`track`, `port`) cannot change while connected.

use std::sync::atomic::Ordering;

use p4bridge_protocol::{P4Error, Result};
use p4bridge_transport_traits::Transport;
use tracing::debug;

use crate::config::SessionConfig;
use crate::session::Session;

impl<T: Transport + 'static> Session<T> {
    /// Snapshot of the current configuration
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.inner.config.read().clone()
    }

    /// 0 never raises, 1 raises on errors, 2 raises on errors and warnings
    #[must_use]
    pub fn exception_level(&self) -> u8 {
        self.inner.config.read().exception_level
    }

    /// Set the exception level
    pub fn set_exception_level(&self, level: u8) {
        self.inner.config.write().exception_level = level;
    }

    /// Whether tagged output is requested
    #[must_use]
    pub fn tagged(&self) -> bool {
        self.inner.config.read().tagged
    }

    /// Request tagged or untagged output
    pub fn set_tagged(&self, tagged: bool) {
        self.inner.config.write().tagged = tagged;
    }

    /// Whether performance tracking is enabled
    #[must_use]
    pub fn track(&self) -> bool {
        self.inner.config.read().track
    }

    /// Enable or disable performance tracking
    ///
    /// # Errors
    ///
    /// Returns a `State` error when connected and the exception level is
    /// above 0. At level 0 the change is ignored.
    pub fn set_track(&self, track: bool) -> Result<()> {
        if self.is_connected() {
            if self.exception_level() > 0 {
                return Err(P4Error::state(
                    "Can't change performance tracking once you've connected.",
                )
                .with_operation("set_track"));
            }
            debug!("Ignoring track change while connected");
            return Ok(());
        }
        self.inner.config.write().track = track;
        self.inner.sink_state.track.store(track, Ordering::Relaxed);
        Ok(())
    }

    /// Whether stream support is requested
    #[must_use]
    pub fn streams(&self) -> bool {
        self.inner.config.read().streams
    }

    /// Request stream support
    pub fn set_streams(&self, streams: bool) {
        self.inner.config.write().streams = streams;
    }

    /// Whether graph depot support is requested
    #[must_use]
    pub fn graph(&self) -> bool {
        self.inner.config.read().graph
    }

    /// Request graph depot support
    pub fn set_graph(&self, graph: bool) {
        self.inner.config.write().graph = graph;
    }

    /// The API level commands are gated on
    #[must_use]
    pub fn api_level(&self) -> u32 {
        self.inner.config.read().effective_api_level()
    }

    /// Pin the client API level; takes effect on the next connect
    pub fn set_api_level(&self, level: u32) {
        self.inner.config.write().api_level = Some(level);
    }

    /// Server-side result limit
    #[must_use]
    pub fn max_results(&self) -> Option<u32> {
        self.inner.config.read().max_results
    }

    /// Set or clear the server-side result limit
    pub fn set_max_results(&self, max: Option<u32>) {
        self.inner.config.write().max_results = max;
    }

    /// Server-side scan limit
    #[must_use]
    pub fn max_scan_rows(&self) -> Option<u32> {
        self.inner.config.read().max_scan_rows
    }

    /// Set or clear the server-side scan limit
    pub fn set_max_scan_rows(&self, max: Option<u32>) {
        self.inner.config.write().max_scan_rows = max;
    }

    /// Server-side lock time limit in milliseconds
    #[must_use]
    pub fn max_lock_time(&self) -> Option<u32> {
        self.inner.config.read().max_lock_time
    }

    /// Set or clear the server-side lock time limit
    pub fn set_max_lock_time(&self, max: Option<u32>) {
        self.inner.config.write().max_lock_time = max;
    }

    /// Server address
    #[must_use]
    pub fn port(&self) -> Option<String> {
        self.inner.config.read().connection.port.clone()
    }

    /// Set the server address
    ///
    /// # Errors
    ///
    /// Returns a `State` error when connected.
    pub fn set_port(&self, port: impl Into<String>) -> Result<()> {
        if self.is_connected() {
            return Err(P4Error::state("Can't change port once you've connected.")
                .with_operation("set_port"));
        }
        self.inner.config.write().connection.port = Some(port.into());
        Ok(())
    }

    /// User name
    #[must_use]
    pub fn user(&self) -> Option<String> {
        self.inner.config.read().connection.user.clone()
    }

    /// Set the user name
    pub fn set_user(&self, user: impl Into<String>) {
        self.inner.config.write().connection.user = Some(user.into());
    }

    /// Client workspace
    #[must_use]
    pub fn client(&self) -> Option<String> {
        self.inner.config.read().connection.client.clone()
    }

    /// Set the client workspace
    pub fn set_client(&self, client: impl Into<String>) {
        self.inner.config.write().connection.client = Some(client.into());
    }

    /// Host name override
    #[must_use]
    pub fn host(&self) -> Option<String> {
        self.inner.config.read().connection.host.clone()
    }

    /// Set the host name override
    pub fn set_host(&self, host: impl Into<String>) {
        self.inner.config.write().connection.host = Some(host.into());
    }

    /// Password or ticket
    #[must_use]
    pub fn password(&self) -> Option<String> {
        self.inner.config.read().connection.password.clone()
    }

    /// Set the password or ticket
    pub fn set_password(&self, password: impl Into<String>) {
        self.inner.config.write().connection.password = Some(password.into());
    }

    /// Character set
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        self.inner.config.read().connection.charset.clone()
    }

    /// Set the character set
    pub fn set_charset(&self, charset: impl Into<String>) {
        self.inner.config.write().connection.charset = Some(charset.into());
    }

    /// Working directory
    #[must_use]
    pub fn cwd(&self) -> Option<String> {
        self.inner.config.read().connection.cwd.clone()
    }

    /// Set the working directory
    pub fn set_cwd(&self, cwd: impl Into<String>) {
        self.inner.config.write().connection.cwd = Some(cwd.into());
    }

    /// Program name reported to the server
    #[must_use]
    pub fn prog(&self) -> Option<String> {
        self.inner.config.read().connection.prog.clone()
    }

    /// Set the program name; takes effect on the next connect
    pub fn set_prog(&self, prog: impl Into<String>) {
        self.inner.config.write().connection.prog = Some(prog.into());
    }

    /// Program version reported to the server
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.inner.config.read().connection.version.clone()
    }

    /// Set the program version; takes effect on the next connect
    pub fn set_version(&self, version: impl Into<String>) {
        self.inner.config.write().connection.version = Some(version.into());
    }
}
