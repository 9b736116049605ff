//! Command helpers
//!
//! Thin wrappers over [`Session::run`] for the common spec workflows
//! (`-o` to fetch, `-i` to save, `-d` to delete), the interactive commands
//! that need prompt input, and scoped changes to the exception level or
//! output handler.

use std::future::Future;
use std::sync::Arc;

use p4bridge_protocol::{P4Error, Record, Result};
use p4bridge_transport_traits::Transport;
use tracing::debug;

use crate::handlers::{OutputHandler, Resolver};
use crate::input::Input;
use crate::result::{CommandOutput, CommandResult};
use crate::session::Session;

/// Plural listing command to (singular command, name field)
const SPEC_TYPES: &[(&str, &str, &str)] = &[
    ("clients", "client", "client"),
    ("labels", "label", "label"),
    ("branches", "branch", "branch"),
    ("changes", "change", "change"),
    ("streams", "stream", "Stream"),
    ("jobs", "job", "Job"),
    ("users", "user", "User"),
    ("groups", "group", "group"),
    ("depots", "depot", "name"),
    ("servers", "server", "Name"),
];

fn with_flag(flag: &str, args: &[&str]) -> Vec<String> {
    std::iter::once(flag)
        .chain(args.iter().copied())
        .map(str::to_owned)
        .collect()
}

impl<T: Transport + 'static> Session<T> {
    /// Fetch a spec with `kind -o`, returning the first output unit
    ///
    /// ```rust,ignore
    /// let client = p4.fetch_spec("client", &["my-ws"]).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn fetch_spec(&self, kind: &str, args: &[&str]) -> Result<Option<CommandOutput>> {
        let result = self.run_args(kind, with_flag("-o", args)).await?;
        Ok(result.output.into_iter().next())
    }

    /// Save a spec with `kind -i`, supplying it as input
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn save_spec(
        &self,
        kind: &str,
        spec: impl Into<Input>,
        args: &[&str],
    ) -> Result<CommandResult> {
        self.execute(kind, with_flag("-i", args), None, Some(spec.into()))
            .await
    }

    /// Delete a spec with `kind -d`
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn delete_spec(&self, kind: &str, args: &[&str]) -> Result<CommandResult> {
        self.run_args(kind, with_flag("-d", args)).await
    }

    /// `p4 login`, answering the password prompt with the configured password
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn run_login(&self, args: &[&str]) -> Result<CommandResult> {
        let args = args.iter().map(|a| (*a).to_owned()).collect();
        let input = self.password().map(Input::from);
        self.execute("login", args, None, input).await
    }

    /// `p4 password`, answering the old, new and confirmation prompts
    ///
    /// An empty `old` password skips the first prompt.
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn run_password(&self, old: &str, new: &str) -> Result<CommandResult> {
        let answers = if old.is_empty() {
            vec![new, new]
        } else {
            vec![old, new, new]
        };
        self.execute("password", Vec::new(), None, Some(answers.into()))
            .await
    }

    /// `p4 submit`, optionally with a change form supplied as input
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn run_submit(&self, form: Option<Record>, args: &[&str]) -> Result<CommandResult> {
        self.run_with_form("submit", form, args).await
    }

    /// `p4 shelve`, optionally with a change form supplied as input
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn run_shelve(&self, form: Option<Record>, args: &[&str]) -> Result<CommandResult> {
        self.run_with_form("shelve", form, args).await
    }

    async fn run_with_form(&self, cmd: &str, form: Option<Record>, args: &[&str]) -> Result<CommandResult> {
        let mut args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        let input = form.map(|form| {
            args.push("-i".to_owned());
            Input::from(form)
        });
        self.execute(cmd, args, None, input).await
    }

    /// Delete shelved files with `p4 shelve -d -c ...`
    ///
    /// `-c` is added when `args` does not already carry it.
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run).
    pub async fn delete_shelve(&self, args: &[&str]) -> Result<CommandResult> {
        let mut full = vec!["-d".to_owned()];
        if !args.contains(&"-c") {
            full.push("-c".to_owned());
        }
        full.extend(args.iter().map(|a| (*a).to_owned()));
        self.run_args("shelve", full).await
    }

    /// `p4 resolve` with an interactive resolver
    ///
    /// Without a resolver every conflict takes the server's recommendation.
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run); a failing resolver is re-raised after the
    /// command has stopped.
    pub async fn run_resolve(
        &self,
        args: &[&str],
        resolver: Option<Arc<dyn Resolver>>,
    ) -> Result<CommandResult> {
        let args = args.iter().map(|a| (*a).to_owned()).collect();
        self.execute("resolve", args, resolver, None).await
    }

    /// Entries of the ticket file as `Host`, `User` and `Ticket` records
    ///
    /// A missing or unreadable ticket file yields no entries.
    pub fn run_tickets(&self) -> Vec<Record> {
        let Some(path) = self.inner.config.read().connection.ticket_file.clone() else {
            return Vec::new();
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => text.lines().filter_map(parse_ticket_line).collect(),
            Err(e) => {
                debug!(path = %path, error = %e, "No ticket file");
                Vec::new()
            }
        }
    }

    /// List specs of a kind, then fetch and visit each one
    ///
    /// `plural` is the listing command (`clients`, `jobs`, ...). Returns the
    /// listing.
    ///
    /// # Errors
    ///
    /// A `Configuration` error for an unknown listing command, otherwise as
    /// for [`run`](Self::run).
    pub async fn each_spec<F>(&self, plural: &str, args: &[&str], mut visit: F) -> Result<CommandResult>
    where
        F: FnMut(CommandOutput),
    {
        let &(_, singular, key) = SPEC_TYPES
            .iter()
            .find(|(p, _, _)| *p == plural)
            .ok_or_else(|| {
                P4Error::configuration(format!("No such spec listing: {plural}"))
                    .with_operation("each_spec")
            })?;

        let listing = self.run(plural, args).await?;
        for entry in &listing.output {
            let Some(name) = entry.field_str(key) else {
                debug!(plural, key, "Listing entry without a name");
                continue;
            };
            if let Some(spec) = self.fetch_spec(singular, &[name]).await? {
                visit(spec);
            }
        }
        Ok(listing)
    }

    /// Run `f` at a different exception level, restoring the previous level
    ///
    /// ```rust,ignore
    /// // Warnings are expected here
    /// p4.at_exception_level(1, |p4| async move { p4.run("sync", &[]).await }).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Whatever `f` returns.
    pub async fn at_exception_level<F, Fut, R>(&self, level: u8, f: F) -> Result<R>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let previous = self.exception_level();
        self.set_exception_level(level);
        let result = f(self.clone()).await;
        self.set_exception_level(previous);
        result
    }

    /// Run `f` with a different output handler, restoring the previous one
    ///
    /// # Errors
    ///
    /// Whatever `f` returns.
    pub async fn with_handler<F, Fut, R>(&self, handler: Arc<dyn OutputHandler>, f: F) -> Result<R>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let previous = self.output_handler();
        self.set_output_handler(handler);
        let result = f(self.clone()).await;
        match previous {
            Some(previous) => self.set_output_handler(previous),
            None => {
                self.clear_output_handler();
            }
        }
        result
    }
}

/// `host=user:ticket`
fn parse_ticket_line(line: &str) -> Option<Record> {
    let (host, rest) = line.split_once('=')?;
    let (user, ticket) = rest.rsplit_once(':')?;
    Some(
        [("Host", host), ("User", user), ("Ticket", ticket.trim_end())]
            .into_iter()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_flag() {
        assert_eq!(with_flag("-o", &["ws"]), vec!["-o", "ws"]);
        assert_eq!(with_flag("-d", &[]), vec!["-d"]);
    }

    #[test]
    fn test_parse_ticket_line() {
        let ticket = parse_ticket_line("localhost:1666=bruno:8A3C1F2E").unwrap();
        assert_eq!(ticket.get_str("Host"), Some("localhost:1666"));
        assert_eq!(ticket.get_str("User"), Some("bruno"));
        assert_eq!(ticket.get_str("Ticket"), Some("8A3C1F2E"));
        assert!(parse_ticket_line("garbage").is_none());
    }

    #[test]
    fn test_spec_types_are_unique() {
        let mut plurals: Vec<_> = SPEC_TYPES.iter().map(|(p, _, _)| *p).collect();
        plurals.sort_unstable();
        plurals.dedup();
        assert_eq!(plurals.len(), SPEC_TYPES.len());
    }
}
