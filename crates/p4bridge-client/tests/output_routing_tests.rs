//! Output routing tests
//!
//! Severity routing, exception-level escalation, the output handler
//! protocol (report, handled, cancel) and the capture of handler failures.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use common::{Event, ScriptedTransport, connected, stat, text};
use p4bridge_client::handlers::{HandlerError, HandlerResult, OutputDisposition, OutputHandler};
use p4bridge_client::{CommandOutput, Session, SessionBuilder};
use p4bridge_protocol::{ErrorKind, Message, Severity};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

/// Records which callback saw what, answering with fixed dispositions
#[derive(Debug)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    stat: OutputDisposition,
    text: OutputDisposition,
}

impl Recorder {
    fn new(stat: OutputDisposition, text: OutputDisposition) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            stat,
            text,
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl OutputHandler for Recorder {
    async fn output_stat(&self, stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
        let name = stat.field_str("depotFile").unwrap_or_default();
        self.calls.lock().push(format!("stat {name}"));
        Ok(self.stat)
    }

    async fn output_info(&self, text: &str) -> HandlerResult<OutputDisposition> {
        self.calls.lock().push(format!("info {text}"));
        Ok(self.text)
    }

    async fn output_text(&self, text: &str) -> HandlerResult<OutputDisposition> {
        self.calls.lock().push(format!("text {text}"));
        Ok(self.text)
    }

    async fn output_binary(&self, data: &Bytes) -> HandlerResult<OutputDisposition> {
        self.calls.lock().push(format!("binary {}", data.len()));
        Ok(self.text)
    }

    async fn output_message(&self, message: &Message) -> HandlerResult<OutputDisposition> {
        self.calls.lock().push(format!("message {}", message.text));
        Ok(self.text)
    }
}

/// Cancels the command on the n-th stat
#[derive(Debug)]
struct CancelAt {
    n: usize,
    seen: AtomicUsize,
}

#[async_trait]
impl OutputHandler for CancelAt {
    async fn output_stat(&self, _stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if seen == self.n {
            Ok(OutputDisposition::CANCEL)
        } else {
            Ok(OutputDisposition::REPORT)
        }
    }

    async fn output_info(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_text(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_binary(&self, _data: &Bytes) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_message(&self, _message: &Message) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }
}

/// Fails or panics on tagged output
#[derive(Debug)]
struct Faulty {
    panic: bool,
}

#[async_trait]
impl OutputHandler for Faulty {
    async fn output_stat(&self, _stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
        if self.panic {
            panic!("kaboom");
        }
        Err(HandlerError::generic("disk full"))
    }

    async fn output_info(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_text(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_binary(&self, _data: &Bytes) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_message(&self, _message: &Message) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }
}

/// Tries to run another command from inside a callback
#[derive(Debug, Default)]
struct Nested {
    session: OnceLock<Session<ScriptedTransport>>,
    inner_outputs: Mutex<Option<usize>>,
}

#[async_trait]
impl OutputHandler for Nested {
    async fn output_stat(&self, _stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
        if let Some(p4) = self.session.get() {
            let inner = p4
                .run("info", &[])
                .await
                .map_err(|e| HandlerError::generic(e.message))?;
            *self.inner_outputs.lock() = Some(inner.output.len());
        }
        Ok(OutputDisposition::REPORT)
    }

    async fn output_info(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_text(&self, _text: &str) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_binary(&self, _data: &Bytes) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }

    async fn output_message(&self, _message: &Message) -> HandlerResult<OutputDisposition> {
        Ok(OutputDisposition::REPORT)
    }
}

fn diagnostics() -> Vec<Event> {
    vec![
        Event::Message(Severity::Info, "//depot/x#1 - opened for edit".into()),
        Event::Message(Severity::Warn, "//depot/y - file(s) up-to-date.".into()),
        Event::Message(Severity::Failed, "//depot/z - no such file(s).".into()),
    ]
}

// ============================================================================
// SEVERITY ROUTING AND ESCALATION
// ============================================================================

#[tokio::test]
async fn test_messages_routed_by_severity() {
    let (p4, transport) = connected(0).await;
    transport.script("edit", diagnostics());

    let result = p4.run("edit", &["//depot/..."]).await.unwrap();
    assert_eq!(
        result.output,
        vec![CommandOutput::Text("//depot/x#1 - opened for edit".into())]
    );
    assert_eq!(result.warnings, vec!["//depot/y - file(s) up-to-date.".to_string()]);
    assert_eq!(result.errors, vec!["//depot/z - no such file(s).".to_string()]);
    assert_eq!(result.messages.len(), 3);
    assert_eq!(result.messages[2].severity, Severity::Failed);
    assert!(!result.is_ok());
    assert_eq!(p4.last_result(), result);
}

#[tokio::test]
async fn test_errors_escalate_at_level_one() {
    let (p4, transport) = connected(1).await;
    transport.script(
        "edit",
        vec![Event::Message(Severity::Failed, "no such file".into())],
    );

    let err = p4.run("edit", &["x"]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Command);
    assert_eq!(err.message, "Errors during command execution( \"p4 edit x\" )");
    assert_eq!(
        err.to_string(),
        "[Session::run] Errors during command execution( \"p4 edit x\" )\n\n\t[Error]: no such file\n\n"
    );
    // The result is still available
    assert_eq!(p4.errors(), vec!["no such file".to_string()]);
}

#[tokio::test]
async fn test_warnings_escalate_only_at_level_two() {
    let (p4, transport) = connected(1).await;
    transport.script(
        "sync",
        vec![Event::Message(Severity::Warn, "File(s) up-to-date.".into())],
    );

    let result = p4.run("sync", &[]).await.unwrap();
    assert_eq!(result.warnings.len(), 1);

    p4.set_exception_level(2);
    let err = p4.run("sync", &[]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Command);
    assert_eq!(err.message, "Warnings during command execution( \"p4 sync\" )");
    let context = err.context.as_ref().unwrap();
    assert_eq!(context.warnings.as_deref(), Some("\n\t[Warning]: File(s) up-to-date."));
    assert_eq!(context.errors, None);
}

#[tokio::test]
async fn test_tagged_and_binary_output() {
    let (p4, transport) = connected(0).await;
    transport.script(
        "print",
        vec![
            stat(&[("depotFile", "//depot/logo.png"), ("rev", "2"), ("type", "binary")]),
            Event::Binary(vec![0x89, b'P', b'N', b'G']),
        ],
    );

    let result = p4.run("print", &["//depot/logo.png"]).await.unwrap();
    assert_eq!(result.output.len(), 2);
    let record = result.output[0].as_record().unwrap();
    assert_eq!(record.get_str("rev"), Some("2"));
    assert_eq!(
        result.output[1],
        CommandOutput::Binary(Bytes::from_static(&[0x89, b'P', b'N', b'G']))
    );
}

#[tokio::test]
async fn test_track_rollback_keeps_text() {
    let transport = ScriptedTransport::new();
    let p4 = SessionBuilder::new()
        .with_track(true)
        .with_exception_level(0)
        .build(transport.clone());
    p4.connect().await.unwrap();
    transport.script("sync", vec![text("--- lapse .044s\n--- partial")]);

    let result = p4.run("sync", &[]).await.unwrap();
    assert!(result.track.is_empty());
    assert_eq!(
        result.output,
        vec![CommandOutput::Text("--- lapse .044s\n--- partial".into())]
    );
}

// ============================================================================
// OUTPUT HANDLER PROTOCOL
// ============================================================================

#[tokio::test]
async fn test_handler_sees_every_unit() {
    let (p4, transport) = connected(0).await;
    let recorder = Recorder::new(OutputDisposition::REPORT, OutputDisposition::REPORT);
    p4.set_output_handler(recorder.clone());
    transport.script(
        "fstat",
        vec![
            stat(&[("depotFile", "//depot/a.c")]),
            text("plain"),
            Event::Binary(vec![1, 2, 3]),
            Event::Message(Severity::Info, "informational".into()),
            Event::Message(Severity::Failed, "broken".into()),
        ],
    );

    let result = p4.run("fstat", &[]).await.unwrap();
    assert_eq!(
        recorder.calls(),
        vec![
            "stat //depot/a.c",
            "text plain",
            "binary 3",
            "info informational",
            "message broken",
        ]
    );
    assert_eq!(result.output.len(), 4);
    assert_eq!(result.errors, vec!["broken".to_string()]);
}

#[tokio::test]
async fn test_handled_units_are_not_buffered() {
    let (p4, transport) = connected(0).await;
    let recorder = Recorder::new(OutputDisposition::HANDLED, OutputDisposition::REPORT);
    p4.set_output_handler(recorder.clone());
    transport.script(
        "files",
        vec![
            stat(&[("depotFile", "//depot/a.c")]),
            text("kept"),
            stat(&[("depotFile", "//depot/b.c")]),
        ],
    );

    let result = p4.run("files", &[]).await.unwrap();
    assert_eq!(result.output, vec![CommandOutput::Text("kept".into())]);
    assert_eq!(recorder.calls().len(), 3);
}

#[tokio::test]
async fn test_cancel_stops_the_command() {
    let (p4, transport) = connected(1).await;
    p4.set_output_handler(Arc::new(CancelAt {
        n: 2,
        seen: AtomicUsize::new(0),
    }));
    let events = (1..=5)
        .map(|i| stat(&[("depotFile", format!("//depot/f{i}").as_str())]))
        .collect();
    transport.script("files", events);

    let result = p4.run("files", &["//depot/..."]).await.unwrap();
    assert_eq!(result.output.len(), 2);
    assert_eq!(transport.journal.lock().delivered, 2);
    assert_eq!(transport.journal.lock().inits, 1);

    // The next command runs normally
    transport.script("info", vec![text("ok")]);
    let result = p4.run("info", &[]).await.unwrap();
    assert_eq!(result.output.len(), 1);
}

#[tokio::test]
async fn test_handled_and_cancel_combine() {
    let (p4, transport) = connected(0).await;
    let recorder = Recorder::new(
        OutputDisposition::HANDLED | OutputDisposition::CANCEL,
        OutputDisposition::REPORT,
    );
    p4.set_output_handler(recorder.clone());
    transport.script(
        "files",
        vec![stat(&[("depotFile", "//depot/a.c")]), stat(&[("depotFile", "//depot/b.c")])],
    );

    let result = p4.run("files", &[]).await.unwrap();
    assert!(result.output.is_empty());
    assert_eq!(recorder.calls(), vec!["stat //depot/a.c"]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_output_collection_lets_other_tasks_run() {
    let (p4, transport) = connected(0).await;
    transport.script("print", vec![text("line 1\n"), text("line 2\n"), text("line 3\n")]);

    let flag = Arc::new(AtomicBool::new(false));
    tokio::spawn({
        let flag = flag.clone();
        async move { flag.store(true, Ordering::SeqCst) }
    });

    let result = p4.run("print", &[]).await.unwrap();
    assert_eq!(result.output.len(), 3);
    // Nothing else awaits on this thread, so only the collector's yields let it run
    assert!(flag.load(Ordering::SeqCst));
}

// ============================================================================
// CAPTURED FAILURES
// ============================================================================

#[tokio::test]
async fn test_handler_error_is_reraised_after_the_command() {
    let (p4, transport) = connected(0).await;
    p4.set_output_handler(Arc::new(Faulty { panic: false }));
    transport.script(
        "fstat",
        vec![
            text("before"),
            stat(&[("depotFile", "//depot/a.c")]),
            stat(&[("depotFile", "//depot/b.c")]),
        ],
    );

    let err = p4.run("fstat", &["//depot/..."]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(err.message, "Handler error: disk full");
    assert_eq!(err.command_string(), Some("p4 fstat //depot/..."));
    assert_eq!(
        err.context.as_ref().and_then(|c| c.operation.as_deref()),
        Some("output handler")
    );

    // Stopped at the failing unit; earlier output kept
    assert_eq!(transport.journal.lock().delivered, 2);
    assert_eq!(p4.last_result().output.len(), 2);
    assert!(!p4.is_running());
}

#[tokio::test]
async fn test_handler_panic_is_captured() {
    common::init_tracing();
    let (p4, transport) = connected(0).await;
    p4.set_output_handler(Arc::new(Faulty { panic: true }));
    transport.script("fstat", vec![stat(&[("depotFile", "//depot/a.c")])]);

    let err = p4.run("fstat", &[]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(err.message, "output handler panicked: kaboom");

    // The session stays usable
    p4.clear_output_handler();
    transport.script("info", vec![text("alive")]);
    let result = p4.run("info", &[]).await.unwrap();
    assert_eq!(result.output, vec![CommandOutput::Text("alive".into())]);
}

#[tokio::test]
async fn test_nested_command_is_refused() {
    let (p4, transport) = connected(0).await;
    let handler = Arc::new(Nested::default());
    handler.session.set(p4.clone()).unwrap();
    p4.set_output_handler(handler.clone());
    transport.script("fstat", vec![stat(&[("depotFile", "//depot/a.c")])]);
    transport.script("info", vec![text("should not run")]);

    let result = p4.run("fstat", &[]).await.unwrap();
    assert_eq!(result.output.len(), 1);
    assert_eq!(*handler.inner_outputs.lock(), Some(0));
    assert_eq!(transport.runs(), vec![("fstat".to_string(), Vec::new())]);

    p4.clear_output_handler();
}
