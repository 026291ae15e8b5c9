//! Update orchestration.
//!
//! Drives one update or predownload run through a fixed sequence of stages:
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌──────────────────────┐
//! │ EnsurePrerequisite   │──►│ ResolveBaseTarget    │──►│ StreamBaseDownload   │
//! │ (wine prefix)        │   │ (metadata + version) │   │ (skip if complete)   │
//! └──────────────────────┘   └──────────┬───────────┘   └──────────┬───────────┘
//!                                       │ nothing to do            │
//!                                       ▼                          ▼
//!                                     Done ◄──────┐   ┌──────────────────────┐
//!                                                 │   │ ResolveAddOnTargets  │
//!                            ┌────────────────────┴─┐ │ (per-locale version) │
//!                            │ StreamAddOnDownloads │◄┴──────────────────────┘
//!                            │ (one at a time)      │
//!                            └──────────────────────┘
//! ```
//!
//! Progress is published as [`PipelineEvent`]s on an optional channel.
//! A failed stage ends the run with [`OrchestratorError::Aborted`]; archives
//! completed before it stay on disk and are skipped by the next run.

mod events;
mod prerequisite;
mod report;
mod runner;
mod stage;

pub use events::{Artifact, PipelineEvent};
pub use prerequisite::{Prerequisite, WinePrefix};
pub use report::{ArtifactOutcome, MissingDiffPolicy, OrchestratorError, RunOutcome, RunReport};
pub use runner::UpdateOrchestrator;
pub use stage::{transition, Outcome, Stage, TRANSITIONS};
