//! Events published by an update run.

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use super::stage::Stage;
use crate::manager::download::DownloadEvent;
use crate::package::Locale;

/// An archive handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The base package.
    Base,
    /// The add-on package of one locale.
    AddOn(Locale),
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base package"),
            Self::AddOn(locale) => write!(f, "{} add-on", locale),
        }
    }
}

/// A notification from a running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The pipeline entered a stage.
    Stage(Stage),
    /// A lifecycle event of an artifact's transfer.
    Download { artifact: Artifact, event: DownloadEvent },
}

/// Optional sending half for pipeline events.
///
/// A consumer that went away does not fail the run.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<mpsc::Sender<PipelineEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) async fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                debug!("pipeline event receiver closed");
            }
        }
    }
}
