//! Common test utilities for integration tests
//!
//! [`ScriptedTransport`] stands in for the command engine: each command name
//! maps to a list of [`Event`]s that are replayed into the session's sink.
//! Everything the session asks of the engine is written to a shared
//! [`Journal`] the test can inspect after handing the transport over.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use p4bridge_client::{Session, SessionConfig};
use p4bridge_protocol::{Message, MergeStatus, ProgressDone, Severity, SsoStatus, WireDict};
use p4bridge_transport_traits::{
    ClientMerge, ClientResolveAction, ClientUser, ConnectionSettings, KeepAlive, Transport,
    TransportError, TransportResult,
};
use parking_lot::Mutex;

/// One thing the engine does during a command
#[derive(Debug, Clone)]
pub enum Event {
    Text(String),
    Binary(Vec<u8>),
    Stat(WireDict),
    Message(Severity, String),
    /// Ask for standard input, with an optional `specdef`
    Input(Option<String>),
    Prompt(String),
    Resolve(FakeMerge),
    ResolveAction(FakeAction),
    Authorize(WireDict),
    Progress { kind: i32, total: i64, steps: Vec<i64> },
    /// Lose the connection
    Drop,
    /// Fail the command
    Fail(TransportError),
}

/// What the sink answered to an interactive event
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Input(Result<String, String>),
    Resolve(MergeStatus),
    Authorize(SsoStatus, String),
    ProgressCancel(bool),
}

#[derive(Debug, Default)]
pub struct Journal {
    pub scripts: HashMap<String, Vec<Event>>,
    pub protocol: HashMap<String, String>,
    pub set_protocols: Vec<(String, String)>,
    pub vars: HashMap<String, Option<String>>,
    pub runs: Vec<(String, Vec<String>)>,
    pub replies: Vec<Reply>,
    pub settings: Option<ConnectionSettings>,
    pub inits: usize,
    pub finalizes: usize,
    pub dropped: bool,
    pub fail_init: bool,
    /// Events delivered to the sink
    pub delivered: usize,
    pub break_wired: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    pub journal: Arc<Mutex<Journal>>,
    keep_alive: Option<Arc<dyn KeepAlive>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, command: &str, events: Vec<Event>) -> &Self {
        self.journal.lock().scripts.insert(command.to_owned(), events);
        self
    }

    pub fn server_protocol(&self, key: &str, value: &str) -> &Self {
        self.journal
            .lock()
            .protocol
            .insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn var(&self, key: &str) -> Option<String> {
        self.journal.lock().vars.get(key).cloned().flatten()
    }

    pub fn runs(&self) -> Vec<(String, Vec<String>)> {
        self.journal.lock().runs.clone()
    }

    pub fn last_args(&self) -> Vec<String> {
        self.runs().last().map(|(_, a)| a.clone()).unwrap_or_default()
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.journal.lock().replies.clone()
    }

    fn reply(&self, reply: Reply) {
        self.journal.lock().replies.push(reply);
    }

    fn cancelled(&self) -> bool {
        self.keep_alive.as_ref().is_some_and(|k| !k.is_alive())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn init(&mut self, settings: &ConnectionSettings) -> TransportResult<()> {
        let mut journal = self.journal.lock();
        if journal.fail_init {
            return Err(TransportError::ConnectionFailed("connect to server failed".into()));
        }
        journal.inits += 1;
        journal.dropped = false;
        journal.settings = Some(settings.clone());
        Ok(())
    }

    async fn finalize(&mut self) -> TransportResult<()> {
        self.journal.lock().finalizes += 1;
        Ok(())
    }

    fn dropped(&self) -> bool {
        self.journal.lock().dropped
    }

    fn set_break(&mut self, keep_alive: Option<Arc<dyn KeepAlive>>) {
        self.journal.lock().break_wired = keep_alive.is_some();
        self.keep_alive = keep_alive;
    }

    fn set_protocol(&mut self, key: &str, value: &str) {
        self.journal
            .lock()
            .set_protocols
            .push((key.to_owned(), value.to_owned()));
    }

    fn set_var(&mut self, key: &str, value: Option<&str>) {
        self.journal
            .lock()
            .vars
            .insert(key.to_owned(), value.map(str::to_owned));
    }

    fn protocol(&self, key: &str) -> Option<String> {
        self.journal.lock().protocol.get(key).cloned()
    }

    async fn run(&mut self, command: &str, args: &[String], ui: &mut dyn ClientUser) -> TransportResult<()> {
        let script = {
            let mut journal = self.journal.lock();
            journal.runs.push((command.to_owned(), args.to_vec()));
            journal.scripts.get(command).cloned().unwrap_or_default()
        };

        for event in script {
            if self.cancelled() {
                ui.finished().await;
                return Err(TransportError::Aborted);
            }
            self.journal.lock().delivered += 1;

            match event {
                Event::Text(text) => ui.output_text(&text).await,
                Event::Binary(data) => ui.output_binary(&data).await,
                Event::Stat(dict) => ui.output_stat(&dict).await,
                Event::Message(severity, text) => ui.message(Message::new(severity, text)).await,
                Event::Input(spec_def) => {
                    let answer = ui.input_data(spec_def.as_deref()).await;
                    self.reply(Reply::Input(answer.map_err(|m| m.text)));
                }
                Event::Prompt(prompt) => {
                    let answer = ui.prompt(&prompt, true).await;
                    self.reply(Reply::Input(answer.map_err(|m| m.text)));
                }
                Event::Resolve(mut merge) => {
                    let status = ui.resolve(&mut merge).await;
                    self.reply(Reply::Resolve(status));
                }
                Event::ResolveAction(mut action) => {
                    let status = ui.resolve_action(&mut action, false).await;
                    self.reply(Reply::Resolve(status));
                }
                Event::Authorize(vars) => {
                    let (status, result) = ui.authorize(&vars, 1024).await;
                    self.reply(Reply::Authorize(status, result));
                }
                Event::Progress { kind, total, steps } => {
                    if !ui.progress_indicator() {
                        continue;
                    }
                    if let Some(mut progress) = ui.create_progress(kind).await {
                        progress.description("Syncing files", 1).await;
                        progress.total(total).await;
                        for step in steps {
                            let cancel = progress.update(step).await;
                            self.reply(Reply::ProgressCancel(cancel));
                            if cancel {
                                break;
                            }
                        }
                        progress.done(ProgressDone::Done).await;
                    }
                }
                Event::Drop => self.journal.lock().dropped = true,
                Event::Fail(err) => {
                    ui.finished().await;
                    return Err(err);
                }
            }
        }

        ui.finished().await;
        Ok(())
    }
}

/// A content conflict with fixed names and recommendation
#[derive(Debug, Clone)]
pub struct FakeMerge {
    pub recommendation: MergeStatus,
}

impl ClientMerge for FakeMerge {
    fn auto_resolve(&mut self, _force: bool) -> MergeStatus {
        self.recommendation
    }

    fn base_name(&self) -> Option<String> {
        Some("//depot/main/a.c#3".into())
    }

    fn your_name(&self) -> Option<String> {
        Some("//bruno-ws/a.c".into())
    }

    fn their_name(&self) -> Option<String> {
        Some("//depot/main/a.c#4".into())
    }

    fn base_path(&self) -> Option<String> {
        Some("/tmp/base.c".into())
    }

    fn your_path(&self) -> Option<String> {
        Some("/ws/a.c".into())
    }

    fn their_path(&self) -> Option<String> {
        Some("/tmp/theirs.c".into())
    }

    fn result_path(&self) -> Option<String> {
        Some("/tmp/result.c".into())
    }
}

/// An action conflict
#[derive(Debug, Clone)]
pub struct FakeAction {
    pub recommendation: MergeStatus,
}

impl ClientResolveAction for FakeAction {
    fn auto_resolve(&mut self, _force: bool) -> MergeStatus {
        self.recommendation
    }

    fn merge_action(&self) -> String {
        "delete".into()
    }

    fn yours_action(&self) -> String {
        "edit".into()
    }

    fn their_action(&self) -> String {
        "delete".into()
    }

    fn action_type(&self) -> String {
        "Delete resolve".into()
    }
}

pub fn dict(pairs: &[(&str, &str)]) -> WireDict {
    pairs.iter().copied().collect()
}

pub fn stat(pairs: &[(&str, &str)]) -> Event {
    Event::Stat(dict(pairs))
}

pub fn text(s: &str) -> Event {
    Event::Text(s.to_owned())
}

/// A session at the given exception level over a fresh transport
pub fn session(level: u8) -> (Session<ScriptedTransport>, ScriptedTransport) {
    let transport = ScriptedTransport::new();
    let config = SessionConfig {
        exception_level: level,
        ..SessionConfig::default()
    };
    (Session::new(transport.clone(), config), transport)
}

/// Like [`session`], already connected
pub async fn connected(level: u8) -> (Session<ScriptedTransport>, ScriptedTransport) {
    let (p4, transport) = session(level);
    assert!(p4.connect().await.unwrap());
    (p4, transport)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
