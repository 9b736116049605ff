//! Per-command result accumulation.
//!
//! The [`ResultAccumulator`] is the buffer the callback sink fills while a
//! command runs. Every append yields to the tokio scheduler so that other
//! tasks on the same runtime can make progress during long result streams.

use bytes::Bytes;
use p4bridge_protocol::{Message, Record, Severity, SpecRecord};
use serde::Serialize;

/// One unit of command output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    /// Plain text, including informational messages
    Text(String),
    /// Opaque binary output
    Binary(Bytes),
    /// Generic tagged output
    Record(Record),
    /// Spec-typed tagged output
    Spec(SpecRecord),
}

impl CommandOutput {
    /// Text content, if this is a text unit
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The underlying record for tagged units
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Spec(spec) => Some(spec.as_record()),
            _ => None,
        }
    }

    /// The spec record, if this is spec-typed output
    #[must_use]
    pub fn as_spec(&self) -> Option<&SpecRecord> {
        match self {
            Self::Spec(spec) => Some(spec),
            _ => None,
        }
    }

    /// A string field of a tagged unit
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        match self {
            Self::Spec(spec) => spec.get_str(name),
            Self::Record(record) => record.get_str(name),
            _ => None,
        }
    }
}

impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for CommandOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Record> for CommandOutput {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<SpecRecord> for CommandOutput {
    fn from(spec: SpecRecord) -> Self {
        Self::Spec(spec)
    }
}

/// Buffers for the command in flight
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    output: Vec<CommandOutput>,
    warnings: Vec<String>,
    errors: Vec<String>,
    messages: Vec<Message>,
    track: Vec<String>,
}

impl ResultAccumulator {
    /// Create empty buffers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an output unit
    pub async fn add_output(&mut self, output: impl Into<CommandOutput>) {
        self.output.push(output.into());
        tokio::task::yield_now().await;
    }

    /// Append a diagnostic
    ///
    /// Empty and informational messages land in the output, warnings in the
    /// warnings and everything else in the errors, each as formatted text.
    /// The message object itself always lands in the message list.
    pub async fn add_message(&mut self, message: Message) {
        let text = message.text.clone();
        match message.severity {
            Severity::Empty | Severity::Info => self.output.push(CommandOutput::Text(text)),
            Severity::Warn => self.warnings.push(text),
            _ => self.errors.push(text),
        }
        self.messages.push(message);
        tokio::task::yield_now().await;
    }

    /// Append a performance-tracking line
    pub async fn add_track(&mut self, line: impl Into<String>) {
        self.track.push(line.into());
        tokio::task::yield_now().await;
    }

    /// Discard all tracking lines of the current command
    pub fn delete_track(&mut self) {
        self.track.clear();
    }

    /// Clear every buffer
    pub fn reset(&mut self) {
        self.output.clear();
        self.warnings.clear();
        self.errors.clear();
        self.messages.clear();
        self.track.clear();
    }

    /// Output units so far
    #[must_use]
    pub fn output(&self) -> &[CommandOutput] {
        &self.output
    }

    /// Number of errors so far
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of warnings so far
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Errors formatted for exception text
    #[must_use]
    pub fn fmt_errors(&self) -> String {
        fmt_labeled("[Error]: ", &self.errors)
    }

    /// Warnings formatted for exception text
    #[must_use]
    pub fn fmt_warnings(&self) -> String {
        fmt_labeled("[Warning]: ", &self.warnings)
    }

    /// Move the buffers out into a [`CommandResult`], leaving them empty
    pub fn take(&mut self) -> CommandResult {
        CommandResult {
            output: std::mem::take(&mut self.output),
            warnings: std::mem::take(&mut self.warnings),
            errors: std::mem::take(&mut self.errors),
            messages: std::mem::take(&mut self.messages),
            track: std::mem::take(&mut self.track),
        }
    }
}

fn fmt_labeled(label: &str, entries: &[String]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str("\n\t");
        out.push_str(label);
        out.push_str(entry);
    }
    out
}

/// Everything one command produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandResult {
    /// Output units in arrival order
    pub output: Vec<CommandOutput>,
    /// Warning texts
    pub warnings: Vec<String>,
    /// Error texts
    pub errors: Vec<String>,
    /// Every diagnostic, regardless of severity
    pub messages: Vec<Message>,
    /// Performance-tracking lines
    pub track: Vec<String>,
}

impl CommandResult {
    /// First output unit
    #[must_use]
    pub fn first(&self) -> Option<&CommandOutput> {
        self.output.first()
    }

    /// Whether the command reported no errors
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors formatted for exception text
    #[must_use]
    pub fn fmt_errors(&self) -> String {
        fmt_labeled("[Error]: ", &self.errors)
    }

    /// Warnings formatted for exception text
    #[must_use]
    pub fn fmt_warnings(&self) -> String {
        fmt_labeled("[Warning]: ", &self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_severity_routing() {
        let mut results = ResultAccumulator::new();
        results.add_message(Message::new(Severity::Info, "info")).await;
        results.add_message(Message::new(Severity::Warn, "careful")).await;
        results.add_message(Message::new(Severity::Failed, "bad")).await;
        results.add_message(Message::new(Severity::Fatal, "worse")).await;

        let result = results.take();
        assert_eq!(result.output, vec![CommandOutput::Text("info".into())]);
        assert_eq!(result.warnings, vec!["careful".to_string()]);
        assert_eq!(result.errors, vec!["bad".to_string(), "worse".to_string()]);
        assert_eq!(result.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_warning_never_in_errors_or_output() {
        let mut results = ResultAccumulator::new();
        results.add_message(Message::new(Severity::Warn, "w")).await;
        assert_eq!(results.warning_count(), 1);
        assert_eq!(results.error_count(), 0);
        assert!(results.output().is_empty());
    }

    #[tokio::test]
    async fn test_fmt_labels() {
        let mut results = ResultAccumulator::new();
        assert_eq!(results.fmt_errors(), "");
        results.add_message(Message::new(Severity::Failed, "one")).await;
        results.add_message(Message::new(Severity::Failed, "two")).await;
        results.add_message(Message::new(Severity::Warn, "w")).await;
        assert_eq!(results.fmt_errors(), "\n\t[Error]: one\n\t[Error]: two");
        assert_eq!(results.fmt_warnings(), "\n\t[Warning]: w");
    }

    #[tokio::test]
    async fn test_track_and_reset() {
        let mut results = ResultAccumulator::new();
        results.add_track("a").await;
        results.add_track("b").await;
        results.delete_track();
        results.add_output("x").await;
        assert!(results.take().track.is_empty());

        results.add_output("y").await;
        results.reset();
        assert!(results.output().is_empty());
    }
}
