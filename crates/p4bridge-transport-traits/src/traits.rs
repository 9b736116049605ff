//! Core engine and callback traits.
//!
//! The engine (implementing [`Transport`]) drives one command at a time and
//! reports everything it receives through a [`ClientUser`]. All callbacks for a
//! command run on the call stack of [`Transport::run`], never concurrently with
//! each other.

use std::sync::Arc;

use async_trait::async_trait;
use p4bridge_protocol::{MergeStatus, Message, ProgressDone, SsoStatus, WireDict};

use crate::config::ConnectionSettings;
use crate::error::TransportResult;

/// Cooperative cancellation check
///
/// The engine polls this between message units and aborts the running command
/// promptly once it reports `false`.
pub trait KeepAlive: Send + Sync + std::fmt::Debug {
    /// Whether the current command should keep running
    fn is_alive(&self) -> bool;
}

/// The external command engine
///
/// Wire bytes, authentication handshakes and timeouts are the engine's
/// business; this trait covers only the contract the session relies on.
#[async_trait]
pub trait Transport: Send + std::fmt::Debug {
    /// Open a connection
    async fn init(&mut self, settings: &ConnectionSettings) -> TransportResult<()>;

    /// Close the connection
    async fn finalize(&mut self) -> TransportResult<()>;

    /// Whether the connection was lost since `init`
    fn dropped(&self) -> bool;

    /// Wire or unwire the cancellation check
    fn set_break(&mut self, keep_alive: Option<Arc<dyn KeepAlive>>);

    /// Negotiate a protocol capability before `init`
    fn set_protocol(&mut self, key: &str, value: &str);

    /// Set or clear a per-command variable before `run`
    fn set_var(&mut self, key: &str, value: Option<&str>);

    /// Protocol value reported by the server, available after the first command
    fn protocol(&self, key: &str) -> Option<String>;

    /// Run one command, reporting through `ui`
    ///
    /// Returns once the server has finished the command or the liveness
    /// check has gone false.
    async fn run(&mut self, command: &str, args: &[String], ui: &mut dyn ClientUser) -> TransportResult<()>;
}

/// The callback contract the engine drives during [`Transport::run`]
#[async_trait]
pub trait ClientUser: Send {
    /// A chunk of plain text output
    async fn output_text(&mut self, text: &str);

    /// A chunk of binary output
    async fn output_binary(&mut self, data: &[u8]);

    /// A tagged dictionary
    async fn output_stat(&mut self, dict: &WireDict);

    /// A diagnostic message
    async fn message(&mut self, message: Message);

    /// The command needs input on its standard input
    ///
    /// `spec_def` is the engine's `specdef` variable, present when the input
    /// is expected to be a form.
    async fn input_data(&mut self, spec_def: Option<&str>) -> Result<String, Message>;

    /// The command is prompting interactively
    async fn prompt(&mut self, prompt: &str, no_echo: bool) -> Result<String, Message>;

    /// A content conflict needs resolving
    async fn resolve(&mut self, merger: &mut dyn ClientMerge) -> MergeStatus;

    /// An action conflict (add, delete, branch, filetype) needs resolving
    async fn resolve_action(
        &mut self,
        resolver: &mut dyn ClientResolveAction,
        preview: bool,
    ) -> MergeStatus;

    /// Single-sign-on authorization
    ///
    /// Returns the status and, for pass and fail, the result payload.
    async fn authorize(&mut self, vars: &WireDict, max_length: usize) -> (SsoStatus, String);

    /// Whether a progress indicator is available
    fn progress_indicator(&self) -> bool;

    /// Create a progress indicator of the given type
    async fn create_progress(&mut self, kind: i32) -> Option<Box<dyn ClientProgress>>;

    /// The command has finished
    async fn finished(&mut self);
}

/// Engine-side state of a content conflict
pub trait ClientMerge: Send {
    /// The engine's recommendation
    fn auto_resolve(&mut self, force: bool) -> MergeStatus;

    /// Display name of the base revision
    fn base_name(&self) -> Option<String>;

    /// Display name of your revision
    fn your_name(&self) -> Option<String>;

    /// Display name of their revision
    fn their_name(&self) -> Option<String>;

    /// Local path of the base file
    fn base_path(&self) -> Option<String>;

    /// Local path of your file
    fn your_path(&self) -> Option<String>;

    /// Local path of their file
    fn their_path(&self) -> Option<String>;

    /// Local path of the merge result
    fn result_path(&self) -> Option<String>;
}

/// Engine-side state of an action conflict
pub trait ClientResolveAction: Send {
    /// The engine's recommendation
    fn auto_resolve(&mut self, force: bool) -> MergeStatus;

    /// Description of the merged action
    fn merge_action(&self) -> String;

    /// Description of your action
    fn yours_action(&self) -> String;

    /// Description of their action
    fn their_action(&self) -> String;

    /// Kind of action conflict
    fn action_type(&self) -> String;
}

/// A progress indicator created by [`ClientUser::create_progress`]
#[async_trait]
pub trait ClientProgress: Send {
    /// Describe what is being measured and in which units
    async fn description(&mut self, description: &str, units: i32);

    /// Set the expected total
    async fn total(&mut self, total: i64);

    /// Report the current position; `true` asks the engine to cancel
    async fn update(&mut self, position: i64) -> bool;

    /// The measured operation has finished
    async fn done(&mut self, state: ProgressDone);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Meter {
        total: i64,
        position: i64,
        finished: Option<ProgressDone>,
    }

    #[async_trait]
    impl ClientProgress for Meter {
        async fn description(&mut self, _description: &str, _units: i32) {}

        async fn total(&mut self, total: i64) {
            self.total = total;
        }

        async fn update(&mut self, position: i64) -> bool {
            self.position = position;
            position >= self.total
        }

        async fn done(&mut self, state: ProgressDone) {
            self.finished = Some(state);
        }
    }

    #[test]
    fn test_progress_through_trait_object() {
        tokio_test::block_on(async {
            let mut meter = Meter::default();
            {
                let progress: &mut dyn ClientProgress = &mut meter;
                progress.description("Syncing", 1).await;
                progress.total(10).await;
                assert!(!progress.update(4).await);
                assert!(progress.update(10).await);
                progress.done(ProgressDone::Done).await;
            }
            assert_eq!(meter.position, 10);
            assert_eq!(meter.finished, Some(ProgressDone::Done));
        });
    }
}
