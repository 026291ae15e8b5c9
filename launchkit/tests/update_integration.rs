//! Integration tests for the update pipeline.
//!
//! These tests run the orchestrator against a local HTTP version server and
//! CDN, exercising metadata fetching, resolution, resumable transfers and
//! installation end to end.

mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use launchkit::manager::download::{DownloadEvent, HttpTransport};
use launchkit::manager::{
    default_base_version_file, ArchiveExtractor, Channel, HttpMetadataClient, ManagerConfig,
    ManagerError, ManagerResult, ResolveMode, TargetNotFound,
};
use launchkit::orchestrator::{
    Artifact, ArtifactOutcome, OrchestratorError, PipelineEvent, RunOutcome, RunReport, Stage,
    UpdateOrchestrator,
};
use launchkit::package::{Locale, PackageDescriptor, Version, VersionMetadata, DELETE_LIST_FILE};
use tempfile::TempDir;
use tokio::sync::mpsc;

use common::{md5_hex, payload, write_base_version, write_marker, TestServer};

// =============================================================================
// Helpers
// =============================================================================

struct Install {
    _temp: TempDir,
    config: ManagerConfig,
}

impl Install {
    fn new(server: &TestServer, add_ons: &[Locale]) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = ManagerConfig::new(temp.path().join("game"))
            .with_download_dir(temp.path().join("downloads"))
            .with_metadata_url(Channel::Global, server.versions_url())
            .with_timeout(Duration::from_secs(10));
        for &locale in add_ons {
            config = config.with_add_on(locale);
        }

        Self {
            _temp: temp,
            config,
        }
    }

    fn set_base_version(&self, version: &str) {
        write_base_version(&self.config.base_version_file, version);
    }

    fn set_marker(&self, locale: Locale, bytes: [u8; 3]) {
        write_marker(&self.config.add_on_dir, locale, bytes);
    }

    fn archive(&self, name: &str) -> std::path::PathBuf {
        self.config.download_dir.join(name)
    }

    fn seed_archive(&self, name: &str, contents: &[u8]) {
        std::fs::create_dir_all(&self.config.download_dir).unwrap();
        std::fs::write(self.archive(name), contents).unwrap();
    }
}

/// Run the pipeline and collect every event it publishes.
async fn run_collecting(
    orchestrator: &UpdateOrchestrator,
    mode: ResolveMode,
) -> (Result<RunReport, OrchestratorError>, Vec<PipelineEvent>) {
    let (tx, mut rx) = mpsc::channel(256);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });

    let result = orchestrator.run(mode, Some(tx)).await;
    let events = collector.await.unwrap();
    (result, events)
}

fn stages(events: &[PipelineEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Stage(stage) => Some(*stage),
            _ => None,
        })
        .collect()
}

/// Artifacts in the order they streamed, one entry per transfer.
fn streamed(events: &[PipelineEvent]) -> Vec<Artifact> {
    let mut artifacts: Vec<Artifact> = Vec::new();
    for event in events {
        if let PipelineEvent::Download { artifact, .. } = event {
            if artifacts.last() != Some(artifact) {
                artifacts.push(*artifact);
            }
        }
    }
    artifacts
}

fn downloads_of(events: &[PipelineEvent], wanted: Artifact) -> Vec<DownloadEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Download { artifact, event } if *artifact == wanted => {
                Some(event.clone())
            }
            _ => None,
        })
        .collect()
}

fn publish_with_pre_download(server: &TestServer) {
    server.publish(&VersionMetadata {
        game: server.released(),
        pre_download_game: Some(server.pre_download()),
    });
}

/// Extractor standing in for the real archive tool.
///
/// Base archives bump the base version file to 4.0.0 and ship a delete list.
#[derive(Default)]
struct FakeExtractor {
    extracted: Mutex<Vec<String>>,
}

impl ArchiveExtractor for FakeExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> ManagerResult<usize> {
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        if name.starts_with("game_") {
            write_base_version(&default_base_version_file(dest_dir), "4.0.0");
            std::fs::write(dest_dir.join(DELETE_LIST_FILE), "stale.dat\n").unwrap();
        }
        self.extracted.lock().unwrap().push(name);
        Ok(1)
    }
}

// =============================================================================
// Pre-download
// =============================================================================

#[tokio::test]
async fn test_predownload_fetches_diffs_in_order_and_is_idempotent() {
    let server = TestServer::start().await;
    publish_with_pre_download(&server);

    let install = Install::new(&server, &[Locale::EnUs, Locale::JaJp]);
    install.set_base_version("4.0.0");
    install.set_marker(Locale::EnUs, [4, 0, 0]);
    install.set_marker(Locale::JaJp, [4, 0, 0]);

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, events) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;
    let report = result.unwrap();

    assert_eq!(report.target_version.as_deref(), Some("4.1.0"));
    assert_eq!(report.base, Some(ArtifactOutcome::Transferred { bytes: 410 }));
    assert_eq!(
        report.add_on(Locale::EnUs),
        Some(ArtifactOutcome::Transferred { bytes: 205 })
    );
    assert_eq!(
        report.add_on(Locale::JaJp),
        Some(ArtifactOutcome::Transferred { bytes: 205 })
    );
    assert_eq!(report.bytes_transferred, 820);

    assert_eq!(
        stages(&events),
        vec![
            Stage::EnsurePrerequisite,
            Stage::ResolveBaseTarget,
            Stage::StreamBaseDownload,
            Stage::ResolveAddOnTargets,
            Stage::StreamAddOnDownloads,
            Stage::Done,
        ]
    );
    assert_eq!(
        streamed(&events),
        vec![
            Artifact::Base,
            Artifact::AddOn(Locale::EnUs),
            Artifact::AddOn(Locale::JaJp),
        ]
    );

    let base_archive = std::fs::read(install.archive("game_4.0.0_4.1.0_hdiff.zip")).unwrap();
    assert_eq!(base_archive, payload(410));
    assert!(install
        .archive("Audio_Japanese_game_4.0.0_4.1.0_hdiff.zip")
        .exists());

    // Pre-downloading never touches the install
    let version_file = std::fs::read(&install.config.base_version_file).unwrap();
    assert!(String::from_utf8_lossy(&version_file).contains("4.0.0_"));

    // Second run: everything is on disk, nothing goes over the wire
    let requests = server.file_requests();
    let (result, events) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;
    let report = result.unwrap();

    assert_eq!(report.base, Some(ArtifactOutcome::AlreadyComplete));
    assert_eq!(report.add_on(Locale::EnUs), Some(ArtifactOutcome::AlreadyComplete));
    assert_eq!(report.add_on(Locale::JaJp), Some(ArtifactOutcome::AlreadyComplete));
    assert_eq!(report.bytes_transferred, 0);
    assert!(!report.transferred_anything());
    assert!(streamed(&events).is_empty());
    assert_eq!(server.file_requests(), requests);

    // Metadata is served from cache on the second run
    assert_eq!(server.metadata_requests(), 1);
}

#[tokio::test]
async fn test_predownload_resumes_partial_add_on_only() {
    let server = TestServer::start().await;
    publish_with_pre_download(&server);

    let install = Install::new(&server, &[Locale::EnUs, Locale::JaJp]);
    install.set_base_version("4.0.0");
    install.set_marker(Locale::EnUs, [4, 0, 0]);
    install.set_marker(Locale::JaJp, [4, 0, 0]);

    install.seed_archive("game_4.0.0_4.1.0_hdiff.zip", &payload(410));
    install.seed_archive("Audio_English(US)_game_4.0.0_4.1.0_hdiff.zip", &payload(205));
    install.seed_archive("Audio_Japanese_game_4.0.0_4.1.0_hdiff.zip", &payload(205)[..100]);

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, events) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;
    let report = result.unwrap();

    assert_eq!(report.base, Some(ArtifactOutcome::AlreadyComplete));
    assert_eq!(report.add_on(Locale::EnUs), Some(ArtifactOutcome::AlreadyComplete));
    assert_eq!(
        report.add_on(Locale::JaJp),
        Some(ArtifactOutcome::Transferred { bytes: 105 })
    );
    assert_eq!(server.ranges(), vec!["bytes=100-".to_string()]);

    // Only the partial archive produced download events
    assert_eq!(streamed(&events), vec![Artifact::AddOn(Locale::JaJp)]);

    let ja_events = downloads_of(&events, Artifact::AddOn(Locale::JaJp));
    assert!(matches!(
        ja_events.first(),
        Some(DownloadEvent::Start { total: 205, .. })
    ));
    assert_eq!(ja_events.last(), Some(&DownloadEvent::Finish));

    let mut last_done = 0;
    for event in &ja_events {
        if let DownloadEvent::Progress { done, total, .. } = event {
            assert!(*done >= last_done);
            assert_eq!(*total, 205);
            last_done = *done;
        }
    }
    assert_eq!(last_done, 205);

    let resumed = std::fs::read(install.archive("Audio_Japanese_game_4.0.0_4.1.0_hdiff.zip")).unwrap();
    assert_eq!(resumed, payload(205));
}

#[tokio::test]
async fn test_predownload_without_published_package_is_nothing_to_do() {
    let server = TestServer::start().await;
    server.publish(&VersionMetadata {
        game: server.released(),
        pre_download_game: None,
    });

    let install = Install::new(&server, &[Locale::EnUs]);
    install.set_base_version("4.0.0");

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, events) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;

    let report = result.unwrap();
    assert_eq!(report.outcome, RunOutcome::NothingToDo);
    assert_eq!(
        stages(&events),
        vec![Stage::EnsurePrerequisite, Stage::ResolveBaseTarget, Stage::Done]
    );
    assert_eq!(server.file_requests(), 0);
}

// =============================================================================
// Damaged and partial archives
// =============================================================================

const PRE_DIFF: &str = "game_4.0.0_4.1.0_hdiff.zip";

/// Publish the pre-download with its base diff adjusted by `edit`.
fn publish_pre_diff(server: &TestServer, edit: impl FnOnce(&mut PackageDescriptor)) {
    let mut pre = server.pre_download();
    edit(&mut pre.diffs[0]);
    server.publish(&VersionMetadata {
        game: server.released(),
        pre_download_game: Some(pre),
    });
}

#[tokio::test]
async fn test_full_size_archive_with_wrong_md5_is_fetched_again() {
    let server = TestServer::start().await;
    publish_pre_diff(&server, |diff| diff.md5 = Some(md5_hex(&payload(410))));

    let mut install = Install::new(&server, &[]);
    install.config = install.config.clone().with_verify_checksums(true);
    install.set_base_version("4.0.0");
    install.seed_archive(PRE_DIFF, &[0xAA; 410]);

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, _) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;
    let report = result.unwrap();

    assert_eq!(report.base, Some(ArtifactOutcome::Transferred { bytes: 410 }));
    assert_eq!(std::fs::read(install.archive(PRE_DIFF)).unwrap(), payload(410));

    let (result, events) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;
    assert_eq!(result.unwrap().base, Some(ArtifactOutcome::AlreadyComplete));
    assert!(streamed(&events).is_empty());
}

#[tokio::test]
async fn test_download_not_matching_published_md5_fails_the_run() {
    let server = TestServer::start().await;
    publish_pre_diff(&server, |diff| {
        diff.md5 = Some("00000000000000000000000000000000".to_string())
    });

    let mut install = Install::new(&server, &[]);
    install.config = install.config.clone().with_verify_checksums(true);
    install.set_base_version("4.0.0");

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, _) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;

    let err = result.unwrap_err();
    assert_eq!(err.stage(), Stage::StreamBaseDownload);
    assert!(matches!(err.cause(), ManagerError::ChecksumMismatch { .. }));

    // The corrupt archive is not left behind for a later run to trust
    assert!(!install.archive(PRE_DIFF).exists());
}

#[tokio::test]
async fn test_partial_archive_without_published_size_is_resumed() {
    let server = TestServer::start().await;
    publish_pre_diff(&server, |diff| diff.size = None);

    let install = Install::new(&server, &[]);
    install.set_base_version("4.0.0");
    install.seed_archive(PRE_DIFF, &payload(410)[..100]);

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, _) = run_collecting(&orchestrator, ResolveMode::PreDownload).await;
    let report = result.unwrap();

    assert_eq!(report.base, Some(ArtifactOutcome::Transferred { bytes: 310 }));
    assert_eq!(server.ranges(), vec!["bytes=100-".to_string()]);
    assert_eq!(std::fs::read(install.archive(PRE_DIFF)).unwrap(), payload(410));
}

// =============================================================================
// Latest
// =============================================================================

#[tokio::test]
async fn test_update_applies_diff_and_cleans_up() {
    let server = TestServer::start().await;
    publish_with_pre_download(&server);

    let install = Install::new(&server, &[Locale::EnUs]);
    install.set_base_version("3.9.0");
    install.set_marker(Locale::EnUs, [3, 9, 0]);
    std::fs::write(install.config.install_dir.join("stale.dat"), b"old").unwrap();

    let extractor = Arc::new(FakeExtractor::default());
    let metadata = HttpMetadataClient::new(
        Channel::Global,
        server.versions_url(),
        Duration::from_secs(10),
    )
    .unwrap();
    let transport = HttpTransport::with_timeout(Duration::from_secs(10))
        .unwrap()
        .with_extractor(extractor.clone());
    let orchestrator =
        UpdateOrchestrator::new(&install.config, Arc::new(metadata), Arc::new(transport))
            .with_extractor(extractor.clone());

    let (result, _events) = run_collecting(&orchestrator, ResolveMode::Latest).await;
    let report = result.unwrap();

    assert_eq!(report.target_version.as_deref(), Some("4.0.0"));
    assert_eq!(report.base, Some(ArtifactOutcome::Transferred { bytes: 400 }));
    assert_eq!(
        report.add_on(Locale::EnUs),
        Some(ArtifactOutcome::Transferred { bytes: 200 })
    );
    assert_eq!(
        *extractor.extracted.lock().unwrap(),
        vec![
            "game_3.9.0_4.0.0_hdiff.zip".to_string(),
            "Audio_English(US)_game_3.9.0_4.0.0_hdiff.zip".to_string(),
        ]
    );

    // Delete list applied and consumed, archives dropped
    let install_dir = &install.config.install_dir;
    assert!(!install_dir.join("stale.dat").exists());
    assert!(!install_dir.join(DELETE_LIST_FILE).exists());
    assert!(!install.archive("game_3.9.0_4.0.0_hdiff.zip").exists());
    assert!(!install
        .archive("Audio_English(US)_game_3.9.0_4.0.0_hdiff.zip")
        .exists());

    assert_eq!(
        orchestrator.inspector().current_base_version().await,
        Some(Version::new(4, 0, 0))
    );
    let marker = install
        .config
        .add_on_dir
        .join(Locale::EnUs.folder_name())
        .join(".version");
    assert_eq!(std::fs::read(marker).unwrap(), vec![4, 0, 0]);

    // Nothing left to do on the next run
    let requests = server.file_requests();
    let (result, _) = run_collecting(&orchestrator, ResolveMode::Latest).await;
    let report = result.unwrap();
    assert_eq!(report.base, Some(ArtifactOutcome::UpToDate));
    assert_eq!(report.add_on(Locale::EnUs), Some(ArtifactOutcome::UpToDate));
    assert_eq!(server.file_requests(), requests);
}

#[tokio::test]
async fn test_update_without_matching_diff_aborts_before_downloading() {
    let server = TestServer::start().await;
    publish_with_pre_download(&server);

    let install = Install::new(&server, &[Locale::EnUs]);
    install.set_base_version("3.1.0");

    let orchestrator = UpdateOrchestrator::from_config(&install.config).unwrap();
    let (result, events) = run_collecting(&orchestrator, ResolveMode::Latest).await;

    let err = result.unwrap_err();
    assert_eq!(err.stage(), Stage::ResolveBaseTarget);
    assert!(matches!(
        err.cause(),
        ManagerError::TargetNotFound(TargetNotFound::NoMatchingDiff { .. })
    ));
    assert_eq!(stages(&events).last(), Some(&Stage::Aborted));
    assert_eq!(server.file_requests(), 0);
}
