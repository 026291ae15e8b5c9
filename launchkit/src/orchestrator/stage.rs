//! Pipeline stages and their transition table.
//!
//! ```text
//! EnsurePrerequisite ─► ResolveBaseTarget ─► StreamBaseDownload ─► ResolveAddOnTargets ─► StreamAddOnDownloads ─► Done
//!                               │
//!                               └── NothingToDo ─────────────────────────────────────────────────────────────► Done
//!
//! any stage ── Failed ──► Aborted
//! ```

use std::fmt;

/// A stage of an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Make sure the runtime environment exists.
    EnsurePrerequisite,
    /// Fetch metadata and pick the base package target.
    ResolveBaseTarget,
    /// Download the base package unless it is already complete.
    StreamBaseDownload,
    /// Pick a target for every selected add-on locale.
    ResolveAddOnTargets,
    /// Download add-on packages one at a time.
    StreamAddOnDownloads,
    /// The run finished.
    Done,
    /// The run failed; completed artifacts stay on disk.
    Aborted,
}

impl Stage {
    /// Whether the run ends in this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EnsurePrerequisite => "ensure-prerequisite",
            Self::ResolveBaseTarget => "resolve-base-target",
            Self::StreamBaseDownload => "stream-base-download",
            Self::ResolveAddOnTargets => "resolve-add-on-targets",
            Self::StreamAddOnDownloads => "stream-add-on-downloads",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of executing one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Continue with the next stage.
    Advance,
    /// Nothing is left to do for this run.
    NothingToDo,
    /// The stage failed.
    Failed,
}

/// Every allowed `(stage, outcome) → stage` move besides `Failed`.
pub const TRANSITIONS: &[(Stage, Outcome, Stage)] = &[
    (Stage::EnsurePrerequisite, Outcome::Advance, Stage::ResolveBaseTarget),
    (Stage::ResolveBaseTarget, Outcome::Advance, Stage::StreamBaseDownload),
    (Stage::ResolveBaseTarget, Outcome::NothingToDo, Stage::Done),
    (Stage::StreamBaseDownload, Outcome::Advance, Stage::ResolveAddOnTargets),
    (Stage::ResolveAddOnTargets, Outcome::Advance, Stage::StreamAddOnDownloads),
    (Stage::StreamAddOnDownloads, Outcome::Advance, Stage::Done),
];

/// Next stage after `stage` ended with `outcome`.
///
/// `Failed`, and any pair missing from [`TRANSITIONS`], lead to `Aborted`.
/// Terminal stages stay where they are.
pub fn transition(stage: Stage, outcome: Outcome) -> Stage {
    if stage.is_terminal() {
        return stage;
    }

    TRANSITIONS
        .iter()
        .find(|(from, on, _)| *from == stage && *on == outcome)
        .map(|(_, _, to)| *to)
        .unwrap_or(Stage::Aborted)
}
