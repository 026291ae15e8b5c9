//! Terminal rendering of pipeline events.

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use launchkit::manager::download::DownloadEvent;
use launchkit::orchestrator::{Artifact, PipelineEvent, Stage};
use tokio::sync::mpsc;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";

/// Buffer between the pipeline and the renderer.
pub const EVENT_BUFFER: usize = 64;

/// Create a styled progress bar for an archive download.
fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");

    let pb = ProgressBar::new(size);
    pb.set_style(style);
    pb.set_message(message);
    pb
}

fn describe(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::EnsurePrerequisite => Some("Checking Wine prefix"),
        Stage::ResolveBaseTarget => Some("Checking for updates"),
        Stage::StreamBaseDownload => Some("Game package"),
        Stage::ResolveAddOnTargets => Some("Checking voice packs"),
        Stage::StreamAddOnDownloads => Some("Voice packs"),
        Stage::Done | Stage::Aborted => None,
    }
}

/// Maps pipeline events onto one progress bar per artifact.
pub struct ProgressRenderer {
    multi: MultiProgress,
    bars: HashMap<Artifact, ProgressBar>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
        }
    }

    pub fn handle(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Stage(stage) => {
                if let Some(text) = describe(stage) {
                    self.multi.println(format!(":: {}", text)).ok();
                }
            }
            PipelineEvent::Download { artifact, event } => self.handle_download(artifact, event),
        }
    }

    fn handle_download(&mut self, artifact: Artifact, event: DownloadEvent) {
        match event {
            DownloadEvent::Start { file_name, total } => {
                let bar = create_progress_bar(total, format!("{}: {}", artifact, file_name));
                let bar = self.multi.add(bar);
                if let Some(old) = self.bars.insert(artifact, bar) {
                    old.finish_and_clear();
                }
            }
            DownloadEvent::Progress { done, total, .. } => {
                if let Some(bar) = self.bars.get(&artifact) {
                    bar.set_length(total);
                    bar.set_position(done);
                }
            }
            DownloadEvent::Finish => {
                if let Some(bar) = self.bars.get(&artifact) {
                    bar.finish_with_message(format!("{}: done", artifact));
                }
            }
        }
    }

    /// Stop bars left running by an aborted run.
    pub fn finish(&mut self) {
        for (_, bar) in self.bars.drain() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render events until the pipeline drops its sender.
pub async fn render(mut events: mpsc::Receiver<PipelineEvent>) {
    let mut renderer = ProgressRenderer::new();
    while let Some(event) = events.recv().await {
        renderer.handle(event);
    }
    renderer.finish();
}
