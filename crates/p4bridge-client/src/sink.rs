//! The callback sink the transport engine drives during a command.
//!
//! [`ClientSink`] implements [`ClientUser`]: it converts wire dictionaries into
//! records, routes messages by severity, consults the output handler, and
//! runs the resolve, progress and SSO protocols. Caller code never runs on
//! the engine's stack unguarded: handler errors and panics are captured here,
//! the liveness flag is cleared, and the session re-raises the first captured
//! error after [`Transport::run`](p4bridge_transport_traits::Transport::run)
//! has returned.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use p4bridge_protocol::{
    Message, MergeStatus, P4Error, ProgressDone, Record, Severity, SpecDefinition,
    SpecDefinitionCache, SsoStatus, WireDict, form, marshal,
};
use p4bridge_transport_traits::{
    ClientMerge, ClientProgress, ClientResolveAction, ClientUser, KeepAlive,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace, warn};

use crate::handlers::{HandlerRegistry, HandlerResult, OutputDisposition, Progress, Resolver};
use crate::input::{Input, InputValue};
use crate::merge::MergeInfo;
use crate::result::{CommandOutput, CommandResult, ResultAccumulator};
use crate::sso::SsoFallback;

const TRACK_MARKER: &str = "--- ";

/// Cooperative cancellation flag polled by the engine
#[derive(Debug)]
pub struct Liveness(AtomicBool);

impl Liveness {
    /// A live flag
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    /// Whether the running command may continue
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Ask the engine to stop the running command
    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Clear a previous cancellation
    pub fn revive(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl KeepAlive for Liveness {
    fn is_alive(&self) -> bool {
        Liveness::is_alive(self)
    }
}

/// State shared between the session and the sink of each command
#[derive(Debug)]
pub(crate) struct SinkState {
    pub(crate) handlers: Mutex<HandlerRegistry>,
    pub(crate) specs: Arc<RwLock<SpecDefinitionCache>>,
    pub(crate) input: Mutex<Option<Input>>,
    pub(crate) sso: Mutex<SsoFallback>,
    pub(crate) liveness: Arc<Liveness>,
    pub(crate) track: AtomicBool,
    captured: Mutex<Option<P4Error>>,
}

impl SinkState {
    pub(crate) fn new(specs: Arc<RwLock<SpecDefinitionCache>>) -> Self {
        Self {
            handlers: Mutex::new(HandlerRegistry::new()),
            specs,
            input: Mutex::new(None),
            sso: Mutex::new(SsoFallback::new()),
            liveness: Arc::new(Liveness::new()),
            track: AtomicBool::new(false),
            captured: Mutex::new(None),
        }
    }

    /// Record a callback failure; the first one wins
    pub(crate) fn capture(&self, err: P4Error) {
        error!(error = %err, "Callback failed, stopping command");
        self.liveness.cancel();
        let mut slot = self.captured.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn has_captured(&self) -> bool {
        self.captured.lock().is_some()
    }

    pub(crate) fn take_captured(&self) -> Option<P4Error> {
        self.captured.lock().take()
    }

    /// Run a caller callback, capturing errors and panics
    pub(crate) async fn call<T, F>(&self, operation: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = HandlerResult<T>>,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                self.capture(P4Error::from(err).with_operation(operation));
                None
            }
            Err(payload) => {
                let message = format!("{operation} panicked: {}", panic_message(payload.as_ref()));
                self.capture(P4Error::callback(message).with_operation(operation));
                None
            }
        }
    }

    fn track_mode(&self) -> bool {
        self.track.load(Ordering::Relaxed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputMethod {
    Stat,
    Info,
    Text,
    Binary,
}

/// The [`ClientUser`] for one command
///
/// Created by the session for each command and consumed when the command
/// returns.
pub struct ClientSink {
    state: Arc<SinkState>,
    command: String,
    results: ResultAccumulator,
    resolver: Option<Arc<dyn Resolver>>,
}

impl std::fmt::Debug for ClientSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSink")
            .field("command", &self.command)
            .field("results", &self.results)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl ClientSink {
    pub(crate) fn new(
        state: Arc<SinkState>,
        command: impl Into<String>,
        resolver: Option<Arc<dyn Resolver>>,
    ) -> Self {
        Self {
            state,
            command: command.into(),
            results: ResultAccumulator::new(),
            resolver,
        }
    }

    /// The command this sink is collecting for
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Results so far
    #[must_use]
    pub fn results(&self) -> &ResultAccumulator {
        &self.results
    }

    /// Consume the sink, yielding the results and the first captured error
    pub(crate) fn finish(mut self) -> (CommandResult, Option<P4Error>) {
        (self.results.take(), self.state.take_captured())
    }

    /// Consult the output handler; `true` means buffer the unit
    async fn dispatch<F>(&self, fut: F) -> bool
    where
        F: Future<Output = HandlerResult<OutputDisposition>>,
    {
        match self.state.call("output handler", fut).await {
            Some(disposition) => {
                if disposition.is_cancel() {
                    debug!(command = %self.command, "Output handler cancelled the command");
                    self.state.liveness.cancel();
                }
                !disposition.is_handled()
            }
            None => true,
        }
    }

    async fn process_output(&mut self, method: OutputMethod, output: CommandOutput) {
        let handler = self.state.handlers.lock().output.clone();
        let report = match handler {
            Some(handler) => match (method, &output) {
                (OutputMethod::Text, CommandOutput::Text(text)) => {
                    self.dispatch(handler.output_text(text)).await
                }
                (OutputMethod::Info, CommandOutput::Text(text)) => {
                    self.dispatch(handler.output_info(text)).await
                }
                (OutputMethod::Binary, CommandOutput::Binary(data)) => {
                    self.dispatch(handler.output_binary(data)).await
                }
                _ => self.dispatch(handler.output_stat(&output)).await,
            },
            None => true,
        };
        if report {
            self.results.add_output(output).await;
        }
    }

    async fn process_message(&mut self, message: Message) {
        let handler = self.state.handlers.lock().output.clone();
        let Some(handler) = handler else {
            self.results.add_message(message).await;
            return;
        };

        if message.severity.is_informational() {
            self.process_output(OutputMethod::Info, CommandOutput::Text(message.text))
                .await;
        } else if self.dispatch(handler.output_message(&message)).await {
            self.results.add_message(message).await;
        }
    }

    /// Record `--- `-prefixed lines as tracking output
    ///
    /// Returns `false` as soon as a line is unterminated, empty or lacks the
    /// marker; the caller then rolls back.
    async fn accumulate_track(&mut self, text: &str) -> bool {
        let mut rest = text;
        while !rest.is_empty() {
            let Some(body) = rest.strip_prefix(TRACK_MARKER) else {
                return false;
            };
            let Some((line, tail)) = body.split_once('\n') else {
                return false;
            };
            if line.is_empty() {
                return false;
            }
            self.results.add_track(line).await;
            rest = tail;
        }
        true
    }

    fn register_spec(&self, raw: &str) -> Option<Arc<SpecDefinition>> {
        match self.state.specs.write().put(&self.command, raw) {
            Ok(def) => Some(def),
            Err(e) => {
                self.state
                    .capture(P4Error::from(e).with_operation("output_stat").with_command(&self.command));
                None
            }
        }
    }

    fn format_input(&self, spec_def: Option<&str>, record: &Record) -> Result<String, P4Error> {
        if let Some(raw) = spec_def {
            self.state.specs.write().put(&self.command, raw)?;
        }
        let def = self
            .state
            .specs
            .read()
            .get(&self.command)
            .ok_or_else(P4Error::no_specdef)?;
        let dict = marshal::record_to_dict(record, &def);
        Ok(form::format_form(&def, &dict))
    }

    async fn ask_resolver(&self, resolver: Arc<dyn Resolver>, info: MergeInfo) -> MergeStatus {
        let reply = self.state.call("resolve", resolver.resolve(&info)).await;
        info.invalidate();

        let Some(reply) = reply else {
            return MergeStatus::Quit;
        };
        MergeStatus::from_reply(&reply).unwrap_or_else(|| {
            warn!("[P4] Invalid 'p4 resolve' response: {}", reply);
            MergeStatus::Quit
        })
    }
}

#[async_trait]
impl ClientUser for ClientSink {
    async fn output_text(&mut self, text: &str) {
        trace!(len = text.len(), "output_text");
        if self.state.track_mode() && text.len() > TRACK_MARKER.len() && text.starts_with(TRACK_MARKER) {
            if self.accumulate_track(text).await {
                return;
            }
            // Not tracking data after all
            self.results.delete_track();
        }
        self.process_output(OutputMethod::Text, CommandOutput::Text(text.to_owned()))
            .await;
    }

    async fn output_binary(&mut self, data: &[u8]) {
        trace!(len = data.len(), "output_binary");
        self.process_output(OutputMethod::Binary, CommandOutput::Binary(Bytes::copy_from_slice(data)))
            .await;
    }

    async fn output_stat(&mut self, dict: &WireDict) {
        let spec_def = dict.get("specdef");
        let data = dict.get("data");
        let is_spec = spec_def.is_some() && (dict.contains_key("specFormatted") || data.is_some());

        let def = spec_def.and_then(|raw| self.register_spec(raw));

        let parsed;
        let source = match (&def, data) {
            (Some(def), Some(form_text)) => {
                trace!(command = %self.command, "Parsing form supplied as data");
                match form::parse_form(def, form_text, false) {
                    Ok(d) => {
                        parsed = d;
                        &parsed
                    }
                    Err(e) => {
                        self.process_message(Message::new(Severity::Failed, e.to_string()))
                            .await;
                        return;
                    }
                }
            }
            _ => dict,
        };

        let output = match def {
            Some(def) if is_spec => CommandOutput::Spec(marshal::dict_to_spec_record(source, &def)),
            _ => CommandOutput::Record(marshal::dict_to_record(source)),
        };
        self.process_output(OutputMethod::Stat, output).await;
    }

    async fn message(&mut self, message: Message) {
        trace!(severity = message.severity.code(), "message");
        self.process_message(message).await;
    }

    async fn input_data(&mut self, spec_def: Option<&str>) -> Result<String, Message> {
        let next = self.state.input.lock().as_mut().and_then(Input::next_value);
        let Some(value) = next else {
            warn!(command = %self.command, "Prompted for input but none was supplied");
            return Err(Message::new(Severity::Failed, "No user-input supplied."));
        };

        match value {
            InputValue::Text(text) => Ok(text),
            InputValue::Form(record) => self
                .format_input(spec_def, &record)
                .map_err(|e| Message::new(Severity::Failed, e.message)),
        }
    }

    async fn prompt(&mut self, prompt: &str, _no_echo: bool) -> Result<String, Message> {
        trace!(prompt, "prompt");
        self.input_data(None).await
    }

    async fn resolve(&mut self, merger: &mut dyn ClientMerge) -> MergeStatus {
        if self.state.has_captured() {
            return MergeStatus::Quit;
        }

        let recommendation = merger.auto_resolve(true);
        let Some(resolver) = self.resolver.clone() else {
            return recommendation;
        };

        let output = self.results.output();
        let context = if output.len() > 1 {
            output[output.len() - 2..].to_vec()
        } else {
            Vec::new()
        };
        let info = MergeInfo::content(&*merger, recommendation, context);
        self.ask_resolver(resolver, info).await
    }

    async fn resolve_action(
        &mut self,
        resolver: &mut dyn ClientResolveAction,
        preview: bool,
    ) -> MergeStatus {
        if self.state.has_captured() {
            return MergeStatus::Quit;
        }

        let recommendation = resolver.auto_resolve(true);
        let Some(callback) = self.resolver.clone() else {
            return recommendation;
        };

        trace!(preview, "Action resolve");
        let context: Vec<CommandOutput> = self.results.output().last().cloned().into_iter().collect();
        let info = MergeInfo::action(&*resolver, recommendation, context);
        self.ask_resolver(callback, info).await
    }

    async fn authorize(&mut self, vars: &WireDict, max_length: usize) -> (SsoStatus, String) {
        self.state.sso.lock().clear_vars();

        let handler = self.state.handlers.lock().sso.clone();
        if let Some(handler) = handler {
            let Some(reply) = self.state.call("authorize", handler.authorize(vars, max_length)).await else {
                return (SsoStatus::Fail, String::new());
            };
            match reply.into_status() {
                Ok((SsoStatus::Skip, _)) => {
                    debug!("SSO handler skipped, using fallback");
                }
                Ok(answer) => return answer,
                Err(e) => {
                    self.state.capture(e.with_operation("authorize"));
                    return (SsoStatus::Fail, String::new());
                }
            }
        }

        self.state.sso.lock().authorize(vars)
    }

    fn progress_indicator(&self) -> bool {
        self.state.handlers.lock().has_progress_handler()
    }

    async fn create_progress(&mut self, kind: i32) -> Option<Box<dyn ClientProgress>> {
        let progress = self.state.handlers.lock().progress.clone()?;
        self.state.call("progress init", progress.init(kind)).await?;
        Some(Box::new(ProgressBridge {
            progress,
            state: Arc::clone(&self.state),
        }))
    }

    async fn finished(&mut self) {
        trace!(command = %self.command, "Command finished, dropping input");
        self.state.input.lock().take();
    }
}

/// Forwards engine progress calls to the registered [`Progress`] handler
struct ProgressBridge {
    progress: Arc<dyn Progress>,
    state: Arc<SinkState>,
}

#[async_trait]
impl ClientProgress for ProgressBridge {
    async fn description(&mut self, description: &str, units: i32) {
        self.state
            .call("progress description", self.progress.description(description, units))
            .await;
    }

    async fn total(&mut self, total: i64) {
        self.state.call("progress total", self.progress.total(total)).await;
    }

    async fn update(&mut self, position: i64) -> bool {
        self.state.call("progress update", self.progress.update(position)).await;
        !self.state.liveness.is_alive()
    }

    async fn done(&mut self, state: ProgressDone) {
        self.state.call("progress done", self.progress.done(state)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerError, ReportHandler, SsoHandler, SsoReply};
    use pretty_assertions::assert_eq;

    fn state() -> Arc<SinkState> {
        Arc::new(SinkState::new(Arc::new(RwLock::new(SpecDefinitionCache::new()))))
    }

    fn sink(state: &Arc<SinkState>, command: &str) -> ClientSink {
        ClientSink::new(Arc::clone(state), command, None)
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl SsoHandler for Failing {
        async fn authorize(&self, _vars: &WireDict, _max: usize) -> HandlerResult<SsoReply> {
            Err(HandlerError::generic("no token"))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait]
    impl SsoHandler for Panicking {
        async fn authorize(&self, _vars: &WireDict, _max: usize) -> HandlerResult<SsoReply> {
            panic!("sso exploded")
        }
    }

    #[tokio::test]
    async fn test_track_lines() {
        let state = state();
        state.track.store(true, Ordering::Relaxed);
        let mut sink = sink(&state, "sync");
        sink.output_text("--- lapse .002s\n--- rpc msgs/size in+out 2/0mb+0/0mb\n")
            .await;

        let (result, err) = sink.finish();
        assert!(err.is_none());
        assert_eq!(result.track, vec!["lapse .002s", "rpc msgs/size in+out 2/0mb+0/0mb"]);
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn test_track_rollback() {
        let state = state();
        state.track.store(true, Ordering::Relaxed);
        let mut sink = sink(&state, "print");
        sink.output_text("--- lapse .001s\n").await;
        sink.output_text("--- partial").await;
        sink.output_text("plain text").await;

        let (result, _) = sink.finish();
        assert!(result.track.is_empty());
        assert_eq!(
            result.output,
            vec![CommandOutput::Text("--- partial".into()), CommandOutput::Text("plain text".into())]
        );
    }

    #[tokio::test]
    async fn test_track_marker_ignored_without_track_mode() {
        let state = state();
        let mut sink = sink(&state, "diff");
        sink.output_text("--- a/file\n").await;
        let (result, _) = sink.finish();
        assert!(result.track.is_empty());
        assert_eq!(result.output.len(), 1);
    }

    #[tokio::test]
    async fn test_output_stat_spec_registers_definition() {
        let state = state();
        let mut sink = sink(&state, "job");
        let dict: WireDict = [
            ("specdef", "Job;code:101;rq;;Status;code:102;type:select;val:open/closed;;"),
            ("specFormatted", ""),
            ("Job", "job000001"),
            ("Status", "open"),
            ("func", "client-FstatInfo"),
        ]
        .into_iter()
        .collect();
        sink.output_stat(&dict).await;

        let (result, err) = sink.finish();
        assert!(err.is_none());
        let spec = result.output[0].as_spec().unwrap();
        assert_eq!(spec.get_str("status"), Some("open"));
        assert!(spec.as_record().get("func").is_none());
        assert_eq!(state.specs.read().get("job").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_output_stat_legacy_form_data() {
        let state = state();
        let mut sink = sink(&state, "job");
        let dict: WireDict = [
            ("specdef", "Job;code:101;rq;;Status;code:102;type:select;val:open/closed;;"),
            ("data", "Job:\tjob000002\n\nStatus:\tbogus\n"),
        ]
        .into_iter()
        .collect();
        sink.output_stat(&dict).await;

        let (result, _) = sink.finish();
        let spec = result.output[0].as_spec().unwrap();
        assert_eq!(spec.get_str("Job"), Some("job000002"));
        assert_eq!(spec.get_str("Status"), Some("bogus"));
    }

    #[tokio::test]
    async fn test_output_stat_bad_form_becomes_error() {
        let state = state();
        let mut sink = sink(&state, "job");
        let dict: WireDict = [("specdef", "Job;code:101;;"), ("data", "Colour:\tred\n")]
            .into_iter()
            .collect();
        sink.output_stat(&dict).await;

        let (result, _) = sink.finish();
        assert!(result.output.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_output_stat_plain_record() {
        let state = state();
        let mut sink = sink(&state, "fstat");
        let dict: WireDict = [("depotFile", "//depot/a"), ("otherOpen0", "bob@ws")]
            .into_iter()
            .collect();
        sink.output_stat(&dict).await;
        let (result, _) = sink.finish();
        let record = result.output[0].as_record().unwrap();
        assert_eq!(record.get_str("depotFile"), Some("//depot/a"));
        assert!(result.output[0].as_spec().is_none());
    }

    #[tokio::test]
    async fn test_info_with_handler_skips_message_list() {
        let state = state();
        state.handlers.lock().set_output_handler(Arc::new(ReportHandler));
        let mut sink = sink(&state, "info");
        sink.message(Message::new(Severity::Info, "hello")).await;
        sink.message(Message::new(Severity::Warn, "careful")).await;

        let (result, _) = sink.finish();
        assert_eq!(result.output, vec![CommandOutput::Text("hello".into())]);
        assert_eq!(result.warnings, vec!["careful".to_string()]);
        assert_eq!(result.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_input_queue_and_missing_input() {
        let state = state();
        *state.input.lock() = Some(Input::from(vec!["old", "new"]));
        let mut sink = sink(&state, "password");
        assert_eq!(sink.prompt("Enter old password: ", true).await.unwrap(), "old");
        assert_eq!(sink.prompt("Enter new password: ", true).await.unwrap(), "new");
        let err = sink.prompt("Again: ", true).await.unwrap_err();
        assert_eq!(err.text, "No user-input supplied.");

        sink.finished().await;
        assert!(state.input.lock().is_none());
    }

    #[tokio::test]
    async fn test_form_input_uses_specdef() {
        let state = state();
        let mut record = Record::new();
        record.insert("Job", "new");
        record.insert("Description", "Fix it\n");
        *state.input.lock() = Some(Input::from(record));

        let mut sink = sink(&state, "job");
        let text = sink
            .input_data(Some("Job;code:101;;Description;code:105;type:text;;"))
            .await
            .unwrap();
        assert_eq!(text, "Job:\tnew\n\nDescription:\n\tFix it\n\n");
    }

    #[tokio::test]
    async fn test_sso_handler_error_is_captured() {
        let state = state();
        state.handlers.lock().set_sso_handler(Arc::new(Failing));
        let mut sink = sink(&state, "login");
        let answer = sink.authorize(&WireDict::new(), 128).await;
        assert_eq!(answer.0, SsoStatus::Fail);
        assert!(!state.liveness.is_alive());

        let (_, err) = sink.finish();
        assert_eq!(err.unwrap().kind, p4bridge_protocol::ErrorKind::Callback);
    }

    #[tokio::test]
    async fn test_sso_handler_panic_is_captured() {
        let state = state();
        state.handlers.lock().set_sso_handler(Arc::new(Panicking));
        let mut sink = sink(&state, "login");
        assert_eq!(sink.authorize(&WireDict::new(), 128).await.0, SsoStatus::Fail);

        let (_, err) = sink.finish();
        assert!(err.unwrap().message.contains("sso exploded"));
    }

    #[tokio::test]
    async fn test_sso_fallback_without_handler() {
        let state = state();
        state.sso.lock().set_enabled(Some(true));
        let mut sink = sink(&state, "login");
        let vars: WireDict = [("ssoArgs", "x")].into_iter().collect();
        assert_eq!(sink.authorize(&vars, 128).await, (SsoStatus::Exit, String::new()));
        assert_eq!(state.sso.lock().vars().get("ssoArgs"), Some("x"));
    }
}
