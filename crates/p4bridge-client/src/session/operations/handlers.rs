//! Handler registration, prompt input and the SSO fallback
//!
//! Handlers are shared by every clone of a session and stay registered across
//! commands until cleared.

use std::sync::Arc;

use p4bridge_protocol::WireDict;
use p4bridge_transport_traits::Transport;

use crate::handlers::{OutputHandler, Progress, SsoHandler};
use crate::input::Input;
use crate::session::Session;

impl<T: Transport + 'static> Session<T> {
    /// Register an output handler
    ///
    /// Every output unit and diagnostic of subsequent commands is offered to
    /// the handler before it is accumulated. Registering a handler clears a
    /// previous cancellation.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use p4bridge_client::handlers::ReportHandler;
    /// use std::sync::Arc;
    ///
    /// p4.set_output_handler(Arc::new(ReportHandler));
    /// ```
    pub fn set_output_handler(&self, handler: Arc<dyn OutputHandler>) {
        self.inner.sink_state.handlers.lock().set_output_handler(handler);
        self.inner.sink_state.liveness.revive();
    }

    /// Remove the output handler, returning it
    pub fn clear_output_handler(&self) -> Option<Arc<dyn OutputHandler>> {
        self.inner.sink_state.handlers.lock().clear_output_handler()
    }

    /// The registered output handler
    #[must_use]
    pub fn output_handler(&self) -> Option<Arc<dyn OutputHandler>> {
        self.inner.sink_state.handlers.lock().output.clone()
    }

    /// Register a progress handler
    ///
    /// While one is registered, commands ask the server for progress reports.
    pub fn set_progress_handler(&self, handler: Arc<dyn Progress>) {
        self.inner.sink_state.handlers.lock().set_progress_handler(handler);
    }

    /// Remove the progress handler, returning it
    pub fn clear_progress_handler(&self) -> Option<Arc<dyn Progress>> {
        self.inner.sink_state.handlers.lock().clear_progress_handler()
    }

    /// The registered progress handler
    #[must_use]
    pub fn progress_handler(&self) -> Option<Arc<dyn Progress>> {
        self.inner.sink_state.handlers.lock().progress.clone()
    }

    /// Register an SSO handler, consulted before the static fallback
    pub fn set_sso_handler(&self, handler: Arc<dyn SsoHandler>) {
        self.inner.sink_state.handlers.lock().set_sso_handler(handler);
    }

    /// Remove the SSO handler, returning it
    pub fn clear_sso_handler(&self) -> Option<Arc<dyn SsoHandler>> {
        self.inner.sink_state.handlers.lock().clear_sso_handler()
    }

    /// The registered SSO handler
    #[must_use]
    pub fn sso_handler(&self) -> Option<Arc<dyn SsoHandler>> {
        self.inner.sink_state.handlers.lock().sso.clone()
    }

    /// Supply answers for the next command's prompts
    ///
    /// A single value answers every prompt; a `Vec` answers one prompt per
    /// entry. The input is dropped when the command finishes.
    ///
    /// ```rust,ignore
    /// p4.set_input(vec!["old", "new", "new"]);
    /// p4.run("password", &[]).await?;
    /// ```
    pub fn set_input(&self, input: impl Into<Input>) {
        *self.inner.sink_state.input.lock() = Some(input.into());
    }

    /// Drop any pending input
    pub fn clear_input(&self) {
        self.inner.sink_state.input.lock().take();
    }

    // ========================================================================
    // SSO fallback
    // ========================================================================

    /// `None` skips SSO, `Some(false)` reports no SSO support, `Some(true)` enables it
    pub fn set_sso_enabled(&self, enabled: Option<bool>) {
        self.inner.sink_state.sso.lock().set_enabled(enabled);
    }

    /// Current SSO fallback enablement
    #[must_use]
    pub fn sso_enabled(&self) -> Option<bool> {
        self.inner.sink_state.sso.lock().enabled()
    }

    /// Answer SSO requests with pass and these results, the last one repeating
    pub fn set_sso_passes<I, S>(&self, results: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.sink_state.sso.lock().set_pass_results(results);
    }

    /// Answer SSO requests with fail and these results, the last one repeating
    pub fn set_sso_fails<I, S>(&self, results: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.sink_state.sso.lock().set_fail_results(results);
    }

    /// Remaining pass results
    #[must_use]
    pub fn sso_passes(&self) -> Option<Vec<String>> {
        self.inner.sink_state.sso.lock().pass_results()
    }

    /// Remaining fail results
    #[must_use]
    pub fn sso_fails(&self) -> Option<Vec<String>> {
        self.inner.sink_state.sso.lock().fail_results()
    }

    /// Drop canned SSO results
    pub fn clear_sso_results(&self) {
        self.inner.sink_state.sso.lock().clear_results();
    }

    /// Variables the server sent with the last SSO request answered with exit
    #[must_use]
    pub fn sso_vars(&self) -> WireDict {
        self.inner.sink_state.sso.lock().vars().clone()
    }
}
