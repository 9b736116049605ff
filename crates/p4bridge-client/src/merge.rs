//! Merge context handed to an interactive resolver.
//!
//! A [`MergeInfo`] is a snapshot of one conflict, taken from the engine's
//! merger before the resolver runs. The sink invalidates it as soon as the
//! resolver returns; clones kept by the caller see every accessor fail with an
//! `Invalidated` error from then on.

use std::fmt;
use std::sync::Arc;

use p4bridge_protocol::{MergeStatus, P4Error, Result};
use p4bridge_transport_traits::{ClientMerge, ClientResolveAction};
use parking_lot::Mutex;
use serde::Serialize;

use crate::result::CommandOutput;

/// Which resolve protocol produced a [`MergeInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveKind {
    /// A content conflict
    Content,
    /// An action conflict (add, delete, branch, filetype)
    Action,
}

#[derive(Debug, Clone, Default)]
struct ContentDetail {
    base_name: Option<String>,
    your_name: Option<String>,
    their_name: Option<String>,
    base_path: Option<String>,
    your_path: Option<String>,
    their_path: Option<String>,
    result_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ActionDetail {
    merge_action: String,
    yours_action: String,
    their_action: String,
    action_type: String,
}

#[derive(Debug, Clone)]
enum Detail {
    Content(ContentDetail),
    Action(ActionDetail),
}

#[derive(Debug, Clone)]
struct MergeData {
    hint: MergeStatus,
    info: Vec<CommandOutput>,
    detail: Detail,
}

/// Context of one conflict, valid until the resolver returns
///
/// Cloning is cheap and every clone shares the same validity.
#[derive(Debug, Clone)]
pub struct MergeInfo {
    kind: ResolveKind,
    data: Arc<Mutex<Option<MergeData>>>,
}

impl MergeInfo {
    /// Snapshot a content conflict
    #[must_use]
    pub fn content(merger: &dyn ClientMerge, hint: MergeStatus, info: Vec<CommandOutput>) -> Self {
        let detail = ContentDetail {
            base_name: merger.base_name(),
            your_name: merger.your_name(),
            their_name: merger.their_name(),
            base_path: merger.base_path(),
            your_path: merger.your_path(),
            their_path: merger.their_path(),
            result_path: merger.result_path(),
        };
        Self::new(ResolveKind::Content, hint, info, Detail::Content(detail))
    }

    /// Snapshot an action conflict
    #[must_use]
    pub fn action(
        resolver: &dyn ClientResolveAction,
        hint: MergeStatus,
        info: Vec<CommandOutput>,
    ) -> Self {
        let detail = ActionDetail {
            merge_action: resolver.merge_action(),
            yours_action: resolver.yours_action(),
            their_action: resolver.their_action(),
            action_type: resolver.action_type(),
        };
        Self::new(ResolveKind::Action, hint, info, Detail::Action(detail))
    }

    fn new(kind: ResolveKind, hint: MergeStatus, info: Vec<CommandOutput>, detail: Detail) -> Self {
        Self {
            kind,
            data: Arc::new(Mutex::new(Some(MergeData { hint, info, detail }))),
        }
    }

    /// Drop the snapshot; idempotent
    pub fn invalidate(&self) {
        self.data.lock().take();
    }

    /// Whether the snapshot is still readable
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.data.lock().is_some()
    }

    /// Whether this is a content conflict
    #[must_use]
    pub fn is_content_resolve(&self) -> bool {
        self.kind == ResolveKind::Content
    }

    /// Whether this is an action conflict
    #[must_use]
    pub fn is_action_resolve(&self) -> bool {
        self.kind == ResolveKind::Action
    }

    /// Which resolve protocol produced this snapshot
    #[must_use]
    pub fn kind(&self) -> ResolveKind {
        self.kind
    }

    fn read<R>(&self, f: impl FnOnce(&MergeData) -> R) -> Result<R> {
        self.data
            .lock()
            .as_ref()
            .map(f)
            .ok_or_else(|| P4Error::invalidated("MergeInfo"))
    }

    fn content_field(&self, f: impl FnOnce(&ContentDetail) -> Option<String>) -> Result<Option<String>> {
        self.read(|data| match &data.detail {
            Detail::Content(content) => f(content),
            Detail::Action(_) => None,
        })
    }

    fn action_field(&self, f: impl FnOnce(&ActionDetail) -> String) -> Result<Option<String>> {
        self.read(|data| match &data.detail {
            Detail::Action(action) => Some(f(action)),
            Detail::Content(_) => None,
        })
    }

    /// The engine's recommendation as a short hint code (`am`, `at`, ...)
    pub fn merge_hint(&self) -> Result<&'static str> {
        self.read(|data| data.hint.hint())
    }

    /// The engine's recommendation
    pub fn recommendation(&self) -> Result<MergeStatus> {
        self.read(|data| data.hint)
    }

    /// Recent output preceding the conflict
    ///
    /// Content conflicts carry the last two output units, action conflicts
    /// the last one.
    pub fn info(&self) -> Result<Vec<CommandOutput>> {
        self.read(|data| data.info.clone())
    }

    /// Display name of the base revision
    pub fn base_name(&self) -> Result<Option<String>> {
        self.content_field(|c| c.base_name.clone())
    }

    /// Display name of your revision
    pub fn your_name(&self) -> Result<Option<String>> {
        self.content_field(|c| c.your_name.clone())
    }

    /// Display name of their revision
    pub fn their_name(&self) -> Result<Option<String>> {
        self.content_field(|c| c.their_name.clone())
    }

    /// Local path of the base file
    pub fn base_path(&self) -> Result<Option<String>> {
        self.content_field(|c| c.base_path.clone())
    }

    /// Local path of your file
    pub fn your_path(&self) -> Result<Option<String>> {
        self.content_field(|c| c.your_path.clone())
    }

    /// Local path of their file
    pub fn their_path(&self) -> Result<Option<String>> {
        self.content_field(|c| c.their_path.clone())
    }

    /// Local path of the merge result
    pub fn result_path(&self) -> Result<Option<String>> {
        self.content_field(|c| c.result_path.clone())
    }

    /// The merged action; `None` for content conflicts
    pub fn merge_action(&self) -> Result<Option<String>> {
        self.action_field(|a| a.merge_action.clone())
    }

    /// Your action; `None` for content conflicts
    pub fn yours_action(&self) -> Result<Option<String>> {
        self.action_field(|a| a.yours_action.clone())
    }

    /// Their action; `None` for content conflicts
    pub fn their_action(&self) -> Result<Option<String>> {
        self.action_field(|a| a.their_action.clone())
    }

    /// Kind of action conflict; `None` for content conflicts
    pub fn action_type(&self) -> Result<Option<String>> {
        self.action_field(|a| a.action_type.clone())
    }
}

impl fmt::Display for MergeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ResolveKind::Content => "Content",
            ResolveKind::Action => "Action",
        };
        writeln!(f, "MergeInfo - {label}")?;

        let guard = self.data.lock();
        let Some(data) = guard.as_ref() else {
            return writeln!(f, "\t(invalidated)");
        };

        match &data.detail {
            Detail::Action(action) => {
                writeln!(f, "\tmergeAction: {}", action.merge_action)?;
                writeln!(f, "\ttheirAction: {}", action.their_action)?;
                writeln!(f, "\tyoursAction: {}", action.yours_action)?;
                writeln!(f, "\ttype: {}", action.action_type)?;
            }
            Detail::Content(content) => {
                let lines = [
                    ("yourName", &content.your_name),
                    ("theirName", &content.their_name),
                    ("baseName", &content.base_name),
                    ("yourFile", &content.your_path),
                    ("theirFile", &content.their_path),
                    ("baseFile", &content.base_path),
                ];
                for (label, value) in lines {
                    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                        writeln!(f, "\t{label}: {value}")?;
                    }
                }
            }
        }
        writeln!(f, "\thint: {}", data.hint.hint())
    }
}
