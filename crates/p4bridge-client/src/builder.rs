//! Session builder
//!
//! Provides a fluent interface for configuring a session before creation.

use std::sync::Arc;

use p4bridge_transport_traits::Transport;

use crate::config::SessionConfig;
use crate::handlers::{OutputHandler, Progress, SsoHandler};
use crate::session::Session;

/// Builder for configuring and creating sessions
///
/// # Examples
///
/// ```rust,ignore
/// use p4bridge_client::SessionBuilder;
/// use p4bridge_client::handlers::ReportHandler;
/// use std::sync::Arc;
///
/// let p4 = SessionBuilder::from_env()
///     .with_client("bruno-ws")
///     .with_exception_level(1)
///     .with_max_results(10_000)
///     .with_output_handler(Arc::new(ReportHandler))
///     .build(engine);
/// p4.connect().await?;
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    output_handler: Option<Arc<dyn OutputHandler>>,
    progress_handler: Option<Arc<dyn Progress>>,
    sso_handler: Option<Arc<dyn SsoHandler>>,
    sso_enabled: Option<bool>,
}

impl SessionBuilder {
    /// Create a builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded from the `P4*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::new().with_config(SessionConfig::from_env())
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    // ============================================================================
    // COMMAND BEHAVIOUR
    // ============================================================================

    /// 0 never raises, 1 raises on errors, 2 raises on errors and warnings
    pub fn with_exception_level(mut self, level: u8) -> Self {
        self.config.exception_level = level;
        self
    }

    /// Pin the client API level
    pub fn with_api_level(mut self, level: u32) -> Self {
        self.config.api_level = Some(level);
        self
    }

    /// Request tagged or untagged output
    pub fn with_tagged(mut self, tagged: bool) -> Self {
        self.config.tagged = tagged;
        self
    }

    /// Collect performance-tracking output
    pub fn with_track(mut self, track: bool) -> Self {
        self.config.track = track;
        self
    }

    /// Request stream support
    pub fn with_streams(mut self, streams: bool) -> Self {
        self.config.streams = streams;
        self
    }

    /// Request graph depot support
    pub fn with_graph(mut self, graph: bool) -> Self {
        self.config.graph = graph;
        self
    }

    /// Server-side result limit
    pub fn with_max_results(mut self, max: u32) -> Self {
        self.config.max_results = Some(max);
        self
    }

    /// Server-side scan limit
    pub fn with_max_scan_rows(mut self, max: u32) -> Self {
        self.config.max_scan_rows = Some(max);
        self
    }

    /// Server-side lock time limit in milliseconds
    pub fn with_max_lock_time(mut self, max: u32) -> Self {
        self.config.max_lock_time = Some(max);
        self
    }

    // ============================================================================
    // CONNECTION SETTINGS
    // ============================================================================

    /// Server address
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.config.connection.port = Some(port.into());
        self
    }

    /// User name
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.config.connection.user = Some(user.into());
        self
    }

    /// Client workspace
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.config.connection.client = Some(client.into());
        self
    }

    /// Host name override
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = Some(host.into());
        self
    }

    /// Password or ticket
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Character set
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.config.connection.charset = Some(charset.into());
        self
    }

    /// Working directory
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.config.connection.cwd = Some(cwd.into());
        self
    }

    /// Ticket file path
    pub fn with_ticket_file(mut self, path: impl Into<String>) -> Self {
        self.config.connection.ticket_file = Some(path.into());
        self
    }

    /// Trust file path
    pub fn with_trust_file(mut self, path: impl Into<String>) -> Self {
        self.config.connection.trust_file = Some(path.into());
        self
    }

    /// Program name reported to the server
    pub fn with_prog(mut self, prog: impl Into<String>) -> Self {
        self.config.connection.prog = Some(prog.into());
        self
    }

    /// Program version reported to the server
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.config.connection.version = Some(version.into());
        self
    }

    // ============================================================================
    // HANDLERS
    // ============================================================================

    /// Output handler consulted for every output unit
    pub fn with_output_handler(mut self, handler: Arc<dyn OutputHandler>) -> Self {
        self.output_handler = Some(handler);
        self
    }

    /// Progress handler
    pub fn with_progress_handler(mut self, handler: Arc<dyn Progress>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    /// SSO handler
    pub fn with_sso_handler(mut self, handler: Arc<dyn SsoHandler>) -> Self {
        self.sso_handler = Some(handler);
        self
    }

    /// SSO fallback enablement
    pub fn with_sso_enabled(mut self, enabled: bool) -> Self {
        self.sso_enabled = Some(enabled);
        self
    }

    /// The configuration built so far
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build a disconnected session over `transport`
    pub fn build<T: Transport + 'static>(self, transport: T) -> Session<T> {
        let session = Session::new(transport, self.config);
        if let Some(handler) = self.output_handler {
            session.set_output_handler(handler);
        }
        if let Some(handler) = self.progress_handler {
            session.set_progress_handler(handler);
        }
        if let Some(handler) = self.sso_handler {
            session.set_sso_handler(handler);
        }
        if self.sso_enabled.is_some() {
            session.set_sso_enabled(self.sso_enabled);
        }
        session
    }
}
