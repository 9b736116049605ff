//! Static single-sign-on fallback.
//!
//! Used when no [`SsoHandler`](crate::handlers::SsoHandler) is registered or
//! the registered one answers `Skip`.

use std::collections::VecDeque;

use p4bridge_protocol::{SsoStatus, WireDict};

/// Fallback configuration and the variables captured by the last request
#[derive(Debug, Clone, Default)]
pub struct SsoFallback {
    enabled: Option<bool>,
    canned: Option<(SsoStatus, VecDeque<String>)>,
    vars: WireDict,
}

impl SsoFallback {
    /// Create a disabled fallback
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` skips, `Some(false)` reports no SSO support, `Some(true)` enables
    pub fn set_enabled(&mut self, enabled: Option<bool>) {
        self.enabled = enabled;
    }

    /// Current enablement
    #[must_use]
    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    /// Answer pass with these results, one per request
    ///
    /// The last result is reused once the others are consumed.
    pub fn set_pass_results<I, S>(&mut self, results: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canned = Some((SsoStatus::Pass, results.into_iter().map(Into::into).collect()));
    }

    /// Answer fail with these results, one per request
    ///
    /// The last result is reused once the others are consumed.
    pub fn set_fail_results<I, S>(&mut self, results: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canned = Some((SsoStatus::Fail, results.into_iter().map(Into::into).collect()));
    }

    /// Remaining pass results, if pass results are configured
    #[must_use]
    pub fn pass_results(&self) -> Option<Vec<String>> {
        self.results_for(SsoStatus::Pass)
    }

    /// Remaining fail results, if fail results are configured
    #[must_use]
    pub fn fail_results(&self) -> Option<Vec<String>> {
        self.results_for(SsoStatus::Fail)
    }

    fn results_for(&self, status: SsoStatus) -> Option<Vec<String>> {
        match &self.canned {
            Some((s, results)) if *s == status => Some(results.iter().cloned().collect()),
            _ => None,
        }
    }

    /// Drop any configured results
    pub fn clear_results(&mut self) {
        self.canned = None;
    }

    /// Variables captured by the last request that returned `Exit`
    #[must_use]
    pub fn vars(&self) -> &WireDict {
        &self.vars
    }

    /// Forget captured variables
    pub fn clear_vars(&mut self) {
        self.vars = WireDict::new();
    }

    /// Answer one authorization request
    pub fn authorize(&mut self, vars: &WireDict) -> (SsoStatus, String) {
        match self.enabled {
            None => return (SsoStatus::Skip, String::new()),
            Some(false) => return (SsoStatus::Unset, String::new()),
            Some(true) => {}
        }

        if let Some((status, results)) = self.canned.as_mut() {
            let result = if results.len() > 1 {
                results.pop_front().unwrap_or_default()
            } else {
                results.front().cloned().unwrap_or_default()
            };
            return (*status, result);
        }

        self.vars = vars.clone();
        (SsoStatus::Exit, String::new())
    }
}
