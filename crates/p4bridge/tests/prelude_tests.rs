//! Facade tests
//!
//! A handler and an engine written against `p4bridge::prelude` alone.

use p4bridge::prelude::*;
use parking_lot::Mutex;

/// Engine that answers every command with one record and a warning
#[derive(Debug, Default)]
struct EchoEngine {
    open: bool,
}

#[async_trait]
impl Transport for EchoEngine {
    async fn init(&mut self, _settings: &ConnectionSettings) -> TransportResult<()> {
        self.open = true;
        Ok(())
    }

    async fn finalize(&mut self) -> TransportResult<()> {
        self.open = false;
        Ok(())
    }

    fn dropped(&self) -> bool {
        !self.open
    }

    fn set_break(&mut self, _keep_alive: Option<Arc<dyn KeepAlive>>) {}

    fn set_protocol(&mut self, _key: &str, _value: &str) {}

    fn set_var(&mut self, _key: &str, _value: Option<&str>) {}

    fn protocol(&self, _key: &str) -> Option<String> {
        None
    }

    async fn run(
        &mut self,
        command: &str,
        args: &[String],
        ui: &mut dyn ClientUser,
    ) -> TransportResult<()> {
        let dict: WireDict = [("command", command.to_string()), ("args", args.join(" "))]
            .into_iter()
            .collect();
        ui.output_stat(&dict).await;
        ui.message(Message::new(Severity::Warn, "no such file(s).")).await;
        ui.finished().await;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Collect {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl OutputHandler for Collect {
    async fn output_stat(&self, stat: &CommandOutput) -> HandlerResult<OutputDisposition> {
        if let Some(command) = stat.field_str("command") {
            self.seen.lock().push(command.to_string());
        }
        Ok(OutputDisposition::HANDLED)
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

#[tokio::test]
async fn test_prelude_covers_a_full_round() {
    let collect = Arc::new(Collect::default());
    let p4 = SessionBuilder::new()
        .with_exception_level(0)
        .with_output_handler(collect.clone())
        .build(EchoEngine::default());

    assert!(p4.connect().await.unwrap());
    let result = p4.run("files", &["//depot/..."]).await.unwrap();

    assert!(result.output.is_empty());
    assert_eq!(result.warnings, vec!["no such file(s).".to_string()]);
    assert_eq!(*collect.seen.lock(), vec!["files".to_string()]);

    p4.disconnect().await.unwrap();
    assert!(!p4.is_connected());
}

#[tokio::test]
async fn test_warnings_escalate_by_default() {
    let p4 = SessionBuilder::new().build(EchoEngine::default());
    p4.connect().await.unwrap();

    let err: P4Error = p4.run("files", &[]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Command);
    assert_eq!(p4.warnings(), vec!["no such file(s).".to_string()]);
}

#[test]
fn test_layers_are_reachable() {
    assert_eq!(p4bridge::VERSION, p4bridge::client::VERSION);
    assert_eq!(p4bridge::protocol::Severity::from_code(9), Severity::Fatal);
    let settings = p4bridge::transport::ConnectionSettings::default();
    assert!(settings.port.is_none());
}
