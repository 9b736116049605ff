//! Access to the last command's results and to server capabilities

use p4bridge_protocol::{Message, P4Error, Result};
use p4bridge_transport_traits::Transport;

use crate::result::CommandResult;
use crate::session::Session;

impl<T: Transport + 'static> Session<T> {
    /// Everything the last command produced
    #[must_use]
    pub fn last_result(&self) -> CommandResult {
        self.inner.last.lock().clone()
    }

    /// Errors reported by the last command
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.inner.last.lock().errors.clone()
    }

    /// Warnings reported by the last command
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.inner.last.lock().warnings.clone()
    }

    /// Every diagnostic of the last command
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.last.lock().messages.clone()
    }

    /// Performance-tracking lines of the last command
    #[must_use]
    pub fn track_output(&self) -> Vec<String> {
        self.inner.last.lock().track.clone()
    }

    /// The server's protocol level
    ///
    /// Runs `info` first if no command has run on this connection yet.
    ///
    /// # Errors
    ///
    /// Returns a `State` error when not connected, or the error of the
    /// `info` command.
    pub async fn server_level(&self) -> Result<i32> {
        self.ensure_capabilities("server_level").await?;
        Ok(self.inner.status.lock().server_level)
    }

    /// Whether the server runs in unicode mode
    ///
    /// # Errors
    ///
    /// As for [`server_level`](Self::server_level).
    pub async fn server_unicode(&self) -> Result<bool> {
        self.ensure_capabilities("server_unicode").await?;
        Ok(self.inner.status.lock().unicode)
    }

    /// Whether the server compares names case-insensitively
    ///
    /// # Errors
    ///
    /// As for [`server_level`](Self::server_level).
    pub async fn server_case_insensitive(&self) -> Result<bool> {
        self.ensure_capabilities("server_case_insensitive").await?;
        Ok(self.inner.status.lock().case_fold)
    }

    async fn ensure_capabilities(&self, operation: &'static str) -> Result<()> {
        let status = *self.inner.status.lock();
        if !status.connected {
            return Err(P4Error::state("Not connected to a Perforce Server.").with_operation(operation));
        }
        if !status.cmd_run {
            self.run("info", &[]).await?;
        }
        Ok(())
    }
}
