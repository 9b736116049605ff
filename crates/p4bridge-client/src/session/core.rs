//! Core `Session<T>` implementation
//!
//! This module holds the session state and the command loop:
//!
//! - Connection lifecycle (`connect`, `disconnect`)
//! - Per-command variable negotiation
//! - Driving [`Transport::run`] with a fresh [`ClientSink`]
//! - Re-raising captured callback errors and escalating server diagnostics
//!
//! # Architecture
//!
//! `Session<T>` is a cheaply-cloneable Arc wrapper with interior mutability:
//!
//! - **AtomicBool** for the in-flight flag (lock-free reentrancy check)
//! - **parking_lot** locks for configuration and status (never held across `.await`)
//! - **tokio Mutex** for the transport, held for the whole command

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use p4bridge_protocol::{P4Error, Result, SpecDefinitionCache};
use p4bridge_transport_traits::{KeepAlive, Transport, TransportError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::handlers::Resolver;
use crate::input::Input;
use crate::result::CommandResult;
use crate::sink::{ClientSink, SinkState};

/// What the session knows about its connection
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct ConnectionStatus {
    pub(super) connected: bool,
    /// At least one command has run since connecting
    pub(super) cmd_run: bool,
    pub(super) server_level: i32,
    pub(super) unicode: bool,
    pub(super) case_fold: bool,
}

/// Inner session state
///
/// Wrapped in `Arc` so that clones of [`Session`] share one connection.
pub(super) struct SessionInner<T: Transport + 'static> {
    /// The engine; held for the duration of a command
    pub(super) transport: tokio::sync::Mutex<T>,

    /// Settings; read once per command
    pub(super) config: RwLock<SessionConfig>,

    /// Connection flags and server capabilities
    pub(super) status: Mutex<ConnectionStatus>,

    /// State shared with each command's sink
    pub(super) sink_state: Arc<SinkState>,

    /// Set while a command is running
    pub(super) in_flight: AtomicBool,

    /// Result of the most recent command
    pub(super) last: Mutex<CommandResult>,
}

impl<T: Transport + 'static> std::fmt::Debug for SessionInner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionInner")
            .field("config", &*self.config.read())
            .field("status", &*self.status.lock())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// A client session against one server
///
/// The session owns a [`Transport`] and runs one command at a time through
/// it. Results come back as a [`CommandResult`]; server errors and warnings
/// are escalated to [`P4Error`] according to the exception level.
///
/// # Clone Pattern
///
/// `Session<T>` is cheaply cloneable. All clones share the same connection,
/// handlers and spec definitions. A command started while another is running
/// on any clone is refused with a warning.
///
/// # Examples
///
/// ```rust,ignore
/// use p4bridge_client::{Session, SessionConfig};
///
/// let p4 = Session::new(engine, SessionConfig::from_env());
/// p4.connect().await?;
/// let info = p4.run("info", &[]).await?;
/// println!("{:?}", info.first());
/// p4.disconnect().await?;
/// ```
pub struct Session<T: Transport + 'static> {
    pub(super) inner: Arc<SessionInner<T>>,
}

impl<T: Transport + 'static> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("inner", &self.inner).finish()
    }
}

/// Clears the in-flight flag when the command returns, however it returns
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// `p4 cmd arg...`, the form used in logs and error text
pub(super) fn command_string(cmd: &str, args: &[String]) -> String {
    let mut s = format!("p4 {cmd}");
    for arg in args {
        s.push(' ');
        s.push_str(arg);
    }
    s
}

/// Leading-integer parse; non-numeric text is 0
pub(super) fn atoi(text: &str) -> i64 {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

impl<T: Transport + 'static> Session<T> {
    /// Create a disconnected session over `transport`
    #[must_use]
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let specs = Arc::new(RwLock::new(SpecDefinitionCache::new()));
        let sink_state = SinkState::new(specs);
        sink_state.track.store(config.track, Ordering::Relaxed);

        Self {
            inner: Arc::new(SessionInner {
                transport: tokio::sync::Mutex::new(transport),
                config: RwLock::new(config),
                status: Mutex::new(ConnectionStatus::default()),
                sink_state: Arc::new(sink_state),
                in_flight: AtomicBool::new(false),
                last: Mutex::new(CommandResult::default()),
            }),
        }
    }

    /// Whether `connect` has succeeded and `disconnect` has not been called
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.status.lock().connected
    }

    /// Whether a command is currently running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Open the connection
    ///
    /// Returns `Ok(true)` when connected (including when already connected)
    /// and `Ok(false)` when the connection failed at exception level 0.
    ///
    /// # Errors
    ///
    /// Returns the transport's failure at exception level 1 and above, or a
    /// `State` error when called from inside a running command.
    pub async fn connect(&self) -> Result<bool> {
        if self.is_connected() {
            warn!("Perforce client already connected!");
            return Ok(true);
        }
        if self.is_running() {
            return Err(P4Error::state("Can't connect while a command is running.")
                .with_operation("connect"));
        }

        let (settings, api_level, track, level) = {
            let config = self.inner.config.read();
            (
                config.connection.clone(),
                config.api_level,
                config.track,
                config.exception_level,
            )
        };

        let mut transport = self.inner.transport.lock().await;
        transport.set_protocol("specstring", "");
        if let Some(api) = api_level {
            transport.set_protocol("api", &api.to_string());
        }
        if track {
            transport.set_protocol("track", "");
        }

        if let Err(e) = transport.init(&settings).await {
            let err = P4Error::from(e).with_operation("connect");
            if level > 0 {
                return Err(err);
            }
            warn!(error = %err, "Connect failed");
            return Ok(false);
        }

        let liveness: Arc<dyn KeepAlive> = self.inner.sink_state.liveness.clone();
        transport.set_break(Some(liveness));
        drop(transport);

        self.inner.sink_state.track.store(track, Ordering::Relaxed);
        *self.inner.status.lock() = ConnectionStatus {
            connected: true,
            ..ConnectionStatus::default()
        };
        debug!(port = ?settings.port, user = ?settings.user, "Connected");
        Ok(true)
    }

    /// Close the connection
    ///
    /// Server-supplied spec definitions are forgotten and the last result is
    /// cleared. Disconnecting a session that is not connected only warns.
    ///
    /// # Errors
    ///
    /// Returns a `State` error when called from inside a running command.
    pub async fn disconnect(&self) -> Result<()> {
        if !self.is_connected() {
            warn!("Perforce client not connected!");
            return Ok(());
        }
        if self.is_running() {
            return Err(P4Error::state("Can't disconnect while a command is running.")
                .with_operation("disconnect"));
        }

        {
            let mut transport = self.inner.transport.lock().await;
            if let Err(e) = transport.finalize().await {
                debug!(error = %e, "Ignoring error while disconnecting");
            }
            transport.set_break(None);
        }

        *self.inner.status.lock() = ConnectionStatus::default();
        self.inner.sink_state.specs.write().reset();
        *self.inner.last.lock() = CommandResult::default();
        debug!("Disconnected");
        Ok(())
    }

    /// Run a command
    ///
    /// # Errors
    ///
    /// - A captured handler, resolver, progress or SSO failure, re-raised
    ///   after the command has unwound
    /// - A transport failure
    /// - A `Command` error when the server reported errors (exception level
    ///   1 and above) or warnings (level 2)
    /// - A `State` error when not connected at exception level 1 and above
    ///
    /// A command started while another is running is refused with a warning
    /// and yields an empty result.
    pub async fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandResult> {
        let args = args.iter().map(|a| (*a).to_owned()).collect();
        self.execute(cmd, args, None, None).await
    }

    /// Run a command with owned arguments
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn run_args(&self, cmd: &str, args: Vec<String>) -> Result<CommandResult> {
        self.execute(cmd, args, None, None).await
    }

    pub(crate) async fn execute(
        &self,
        cmd: &str,
        args: Vec<String>,
        resolver: Option<Arc<dyn Resolver>>,
        input: Option<Input>,
    ) -> Result<CommandResult> {
        let command = command_string(cmd, &args);

        let Some(_guard) = InFlight::acquire(&self.inner.in_flight) else {
            warn!(command = %command, "Can't execute nested Perforce commands.");
            return Ok(CommandResult::default());
        };

        let config = self.inner.config.read().clone();
        let level = config.exception_level;

        if !self.is_connected() {
            // Staged input belongs to this command even though it never ran
            self.inner.sink_state.input.lock().take();
            if level > 0 {
                return Err(P4Error::state("not connected.")
                    .with_operation("run")
                    .with_command(command));
            }
            warn!(command = %command, "Not connected, command skipped");
            return Ok(CommandResult::default());
        }

        let state = Arc::clone(&self.inner.sink_state);
        if let Some(input) = input {
            *state.input.lock() = Some(input);
        }
        state.liveness.revive();
        if let Some(stale) = state.take_captured() {
            trace!(error = %stale, "Discarding error captured outside a command");
        }
        let has_progress = state.handlers.lock().has_progress_handler();

        debug!(command = %command, "Running command");
        let mut sink = ClientSink::new(Arc::clone(&state), cmd, resolver);

        let run_result = {
            let mut transport = self.inner.transport.lock().await;
            apply_vars(&mut *transport, &config, has_progress);

            let run_result = transport.run(cmd, &args, &mut sink).await;

            if !self.inner.status.lock().cmd_run {
                self.read_capabilities(&*transport);
            }

            if !state.liveness.is_alive() && transport.dropped() {
                self.reconnect(&mut *transport, &config).await;
            }
            run_result
        };

        state.input.lock().take();
        let (result, captured) = sink.finish();
        *self.inner.last.lock() = result.clone();
        trace!(
            command = %command,
            outputs = result.output.len(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Command finished"
        );

        if let Some(err) = captured {
            return Err(err.with_command(command));
        }

        match run_result {
            Ok(()) => {}
            Err(TransportError::Aborted) if !state.liveness.is_alive() => {
                debug!(command = %command, "Command stopped early");
            }
            Err(e) => {
                return Err(P4Error::from(e)
                    .with_operation("run")
                    .with_command(&command)
                    .with_diagnostics(Some(result.fmt_errors()), Some(result.fmt_warnings())));
            }
        }

        if !result.errors.is_empty() && level >= 1 {
            return Err(escalate("Errors", &command, &result));
        }
        if !result.warnings.is_empty() && level > 1 {
            return Err(escalate("Warnings", &command, &result));
        }
        Ok(result)
    }

    fn read_capabilities(&self, transport: &T) {
        let server_level = transport
            .protocol("server2")
            .map_or(0, |v| i32::try_from(atoi(&v)).unwrap_or(0));
        let unicode = transport.protocol("unicode").is_some_and(|v| atoi(&v) != 0);
        let case_fold = transport.protocol("nocase").is_some();

        let mut status = self.inner.status.lock();
        status.cmd_run = true;
        status.server_level = server_level;
        status.unicode = unicode;
        status.case_fold = case_fold;
        debug!(server_level, unicode, case_fold, "Server capabilities");
    }

    /// Re-open a connection the engine lost while a command was stopping
    async fn reconnect(&self, transport: &mut T, config: &SessionConfig) {
        warn!("Connection dropped during a cancelled command, reconnecting");
        if let Err(e) = transport.finalize().await {
            debug!(error = %e, "Ignoring error while finalizing dropped connection");
        }
        match transport.init(&config.connection).await {
            Ok(()) => {
                let liveness: Arc<dyn KeepAlive> = self.inner.sink_state.liveness.clone();
                transport.set_break(Some(liveness));
                let mut status = self.inner.status.lock();
                status.cmd_run = false;
            }
            Err(e) => {
                warn!(error = %e, "Reconnect failed");
                *self.inner.status.lock() = ConnectionStatus::default();
            }
        }
    }
}

fn apply_vars<T: Transport>(transport: &mut T, config: &SessionConfig, has_progress: bool) {
    let api = config.effective_api_level();
    let limit = |v: Option<u32>| v.map(|n| n.to_string());

    transport.set_var("tag", config.tagged.then_some(""));
    if api > 69 {
        transport.set_var("enableStreams", config.streams.then_some(""));
    }
    if api > 81 {
        transport.set_var("enableGraph", config.graph.then_some(""));
    }
    transport.set_var("maxResults", limit(config.max_results).as_deref());
    transport.set_var("maxScanRows", limit(config.max_scan_rows).as_deref());
    transport.set_var("maxLockTime", limit(config.max_lock_time).as_deref());
    transport.set_var("progress", has_progress.then_some("1"));
}

fn escalate(what: &str, command: &str, result: &CommandResult) -> P4Error {
    P4Error::command(format!("{what} during command execution( \"{command}\" )"))
        .with_operation("Session::run")
        .with_command(command)
        .with_diagnostics(Some(result.fmt_errors()), Some(result.fmt_warnings()))
}
