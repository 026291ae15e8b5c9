//! Results of an update run.

use std::fmt;

use thiserror::Error;

use super::stage::Stage;
use crate::manager::{ManagerError, ResolveMode};
use crate::package::Locale;

/// What happened to one artifact during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// The archive was streamed; `bytes` were fetched by this run.
    Transferred { bytes: u64 },
    /// The archive was already fully downloaded.
    AlreadyComplete,
    /// The installed version already is the target version.
    UpToDate,
}

impl fmt::Display for ArtifactOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transferred { bytes } => write!(f, "downloaded {} bytes", bytes),
            Self::AlreadyComplete => write!(f, "already downloaded"),
            Self::UpToDate => write!(f, "up to date"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage ran.
    Completed,
    /// No pre-download package is published.
    NothingToDo,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: ResolveMode,
    pub outcome: RunOutcome,
    /// Version the run brought the install to (or predownloaded).
    pub target_version: Option<String>,
    /// Base package result; `None` when there was nothing to do.
    pub base: Option<ArtifactOutcome>,
    /// Add-on results, in selection order.
    pub add_ons: Vec<(Locale, ArtifactOutcome)>,
    /// Bytes fetched over the network by this run.
    pub bytes_transferred: u64,
}

impl RunReport {
    pub(crate) fn new(mode: ResolveMode) -> Self {
        Self {
            mode,
            outcome: RunOutcome::Completed,
            target_version: None,
            base: None,
            add_ons: Vec::new(),
            bytes_transferred: 0,
        }
    }

    pub(crate) fn record_base(&mut self, outcome: ArtifactOutcome) {
        if let ArtifactOutcome::Transferred { bytes } = outcome {
            self.bytes_transferred += bytes;
        }
        self.base = Some(outcome);
    }

    pub(crate) fn record_add_on(&mut self, locale: Locale, outcome: ArtifactOutcome) {
        if let ArtifactOutcome::Transferred { bytes } = outcome {
            self.bytes_transferred += bytes;
        }
        self.add_ons.push((locale, outcome));
    }

    /// Outcome recorded for an add-on locale.
    pub fn add_on(&self, locale: Locale) -> Option<ArtifactOutcome> {
        self.add_ons
            .iter()
            .find(|(l, _)| *l == locale)
            .map(|(_, outcome)| *outcome)
    }

    /// Whether any archive was streamed by this run.
    pub fn transferred_anything(&self) -> bool {
        self.base
            .iter()
            .chain(self.add_ons.iter().map(|(_, outcome)| outcome))
            .any(|outcome| matches!(outcome, ArtifactOutcome::Transferred { .. }))
    }
}

/// What to do when the installed base version has no diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingDiffPolicy {
    /// Abort the run with the not-found error.
    #[default]
    Abort,
    /// Download the full package instead.
    FullPackage,
}

/// A failed update run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A stage failed; artifacts completed before it stay on disk.
    #[error("update aborted during {stage}: {source}")]
    Aborted { stage: Stage, source: ManagerError },
}

impl OrchestratorError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Aborted { stage, .. } => *stage,
        }
    }

    /// The underlying failure.
    pub fn cause(&self) -> &ManagerError {
        match self {
            Self::Aborted { source, .. } => source,
        }
    }

    /// Whether the run stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause(), ManagerError::Cancelled)
    }
}
