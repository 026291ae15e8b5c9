//! The update pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{Artifact, EventSink, PipelineEvent};
use super::prerequisite::Prerequisite;
use super::report::{ArtifactOutcome, MissingDiffPolicy, OrchestratorError, RunOutcome, RunReport};
use super::stage::{transition, Outcome, Stage};
use crate::manager::download::{DownloadEvent, DownloadStream, HttpTransport, TransferRequest};
use crate::manager::{
    add_on_of, apply_delete_list, resolve, resolve_add_on, resolve_full, AddOnTarget,
    ArchiveExtractor, DownloadCompletionChecker, DownloadTarget, HttpMetadataClient,
    InstalledStateInspector, ManagerConfig, ManagerError, ManagerResult, MetadataClient,
    PackageTransport, ResolveMode, ShellExtractor, TargetNotFound,
};
use crate::package::{
    add_on_folder, archive_path, encode_version_marker, installed_version, version_marker_path,
    Locale, VersionMetadata,
};

/// Per-run state carried between stages.
struct RunContext {
    mode: ResolveMode,
    sink: EventSink,
    metadata: Option<Arc<VersionMetadata>>,
    /// Base target; `None` when the base is already at the target version.
    base: Option<DownloadTarget>,
    /// Add-on targets in selection order; `None` when up to date.
    add_ons: Vec<(Locale, Option<AddOnTarget>)>,
    report: RunReport,
}

impl RunContext {
    fn new(mode: ResolveMode, sink: EventSink) -> Self {
        Self {
            mode,
            sink,
            metadata: None,
            base: None,
            add_ons: Vec::new(),
            report: RunReport::new(mode),
        }
    }

    fn is_target_version(&self, version: Option<&Version>) -> bool {
        match (version, &self.report.target_version) {
            (Some(version), Some(target)) => version.to_string() == *target,
            _ => false,
        }
    }
}

/// Brings an install up to date, or predownloads the next release.
///
/// A run walks the stages in [`Stage`] order. Only one archive streams at a
/// time: the base package first, then each selected add-on in selection
/// order. Archives already fully downloaded are skipped without events, so
/// re-running after a failure or interruption resumes where it stopped.
///
/// # Example
///
/// ```ignore
/// use launchkit::manager::{ManagerConfig, ResolveMode};
/// use launchkit::orchestrator::UpdateOrchestrator;
///
/// let orchestrator = UpdateOrchestrator::from_config(&config)?;
/// let (tx, mut rx) = tokio::sync::mpsc::channel(64);
///
/// tokio::spawn(async move {
///     while let Some(event) = rx.recv().await {
///         println!("{:?}", event);
///     }
/// });
///
/// let report = orchestrator.run(ResolveMode::PreDownload, Some(tx)).await?;
/// ```
pub struct UpdateOrchestrator {
    metadata: Arc<dyn MetadataClient>,
    transport: Arc<dyn PackageTransport>,
    extractor: Arc<dyn ArchiveExtractor>,
    prerequisite: Option<Arc<dyn Prerequisite>>,
    inspector: InstalledStateInspector,
    checker: DownloadCompletionChecker,
    install_dir: PathBuf,
    download_dir: PathBuf,
    add_ons: Vec<Locale>,
    policy: MissingDiffPolicy,
    keep_archives: bool,
    cancellation: Option<CancellationToken>,
}

impl UpdateOrchestrator {
    /// Create an orchestrator for the install described by `config`.
    pub fn new(
        config: &ManagerConfig,
        metadata: Arc<dyn MetadataClient>,
        transport: Arc<dyn PackageTransport>,
    ) -> Self {
        Self {
            metadata,
            transport,
            extractor: Arc::new(ShellExtractor::new()),
            prerequisite: None,
            inspector: InstalledStateInspector::new(
                config.add_on_dir.clone(),
                config.base_version_file.clone(),
            ),
            checker: DownloadCompletionChecker::new(config.download_dir.clone())
                .with_md5_verification(config.verify_checksums),
            install_dir: config.install_dir.clone(),
            download_dir: config.download_dir.clone(),
            add_ons: config.add_ons.clone(),
            policy: MissingDiffPolicy::default(),
            keep_archives: config.keep_archives,
            cancellation: None,
        }
    }

    /// Create an orchestrator with the HTTP metadata client and transport.
    pub fn from_config(config: &ManagerConfig) -> ManagerResult<Self> {
        let url = config.metadata_url().ok_or_else(|| {
            ManagerError::InvalidConfig(format!(
                "no versions URL configured for channel {}",
                config.channel
            ))
        })?;

        let metadata = HttpMetadataClient::new(config.channel, url, config.timeout)?;
        let transport = HttpTransport::with_timeout(config.timeout)?;

        Ok(Self::new(config, Arc::new(metadata), Arc::new(transport)))
    }

    /// Gate the run on `prerequisite`.
    pub fn with_prerequisite(mut self, prerequisite: Arc<dyn Prerequisite>) -> Self {
        self.prerequisite = Some(prerequisite);
        self
    }

    /// Set what happens when the installed version has no diff.
    pub fn with_missing_diff_policy(mut self, policy: MissingDiffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the add-on selection.
    pub fn with_add_ons(mut self, add_ons: Vec<Locale>) -> Self {
        self.add_ons = add_ons;
        self
    }

    /// Replace the extractor used for archives that were already downloaded.
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the installed state inspector.
    pub fn with_inspector(mut self, inspector: InstalledStateInspector) -> Self {
        self.inspector = inspector;
        self
    }

    /// Stop the run when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn add_ons(&self) -> &[Locale] {
        &self.add_ons
    }

    pub fn inspector(&self) -> &InstalledStateInspector {
        &self.inspector
    }

    pub fn completion_checker(&self) -> &DownloadCompletionChecker {
        &self.checker
    }

    pub fn metadata_client(&self) -> &Arc<dyn MetadataClient> {
        &self.metadata
    }

    /// Run the pipeline once.
    ///
    /// Progress is published to `events` when given. A receiver that is
    /// dropped mid-run does not affect the run.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Aborted`] naming the failed stage.
    pub async fn run(
        &self,
        mode: ResolveMode,
        events: Option<mpsc::Sender<PipelineEvent>>,
    ) -> Result<RunReport, OrchestratorError> {
        let mut ctx = RunContext::new(mode, EventSink::new(events));
        let mut stage = Stage::EnsurePrerequisite;

        info!(%mode, add_ons = ?self.add_ons, "update run started");

        while !stage.is_terminal() {
            ctx.sink.send(PipelineEvent::Stage(stage)).await;
            debug!(%stage, "entering stage");

            let result = match self.check_cancelled() {
                Ok(()) => self.execute(stage, &mut ctx).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) => {
                    if outcome == Outcome::NothingToDo {
                        ctx.report.outcome = RunOutcome::NothingToDo;
                    }
                    stage = transition(stage, outcome);
                }
                Err(source) => {
                    warn!(%stage, error = %source, "update run aborted");
                    ctx.sink
                        .send(PipelineEvent::Stage(transition(stage, Outcome::Failed)))
                        .await;
                    return Err(OrchestratorError::Aborted { stage, source });
                }
            }
        }

        ctx.sink.send(PipelineEvent::Stage(stage)).await;
        info!(
            %mode,
            outcome = ?ctx.report.outcome,
            bytes = ctx.report.bytes_transferred,
            "update run finished"
        );
        Ok(ctx.report)
    }

    async fn execute(&self, stage: Stage, ctx: &mut RunContext) -> ManagerResult<Outcome> {
        match stage {
            Stage::EnsurePrerequisite => self.ensure_prerequisite().await,
            Stage::ResolveBaseTarget => self.resolve_base_target(ctx).await,
            Stage::StreamBaseDownload => self.stream_base_download(ctx).await,
            Stage::ResolveAddOnTargets => self.resolve_add_on_targets(ctx).await,
            Stage::StreamAddOnDownloads => self.stream_add_on_downloads(ctx).await,
            Stage::Done | Stage::Aborted => Ok(Outcome::Advance),
        }
    }

    async fn ensure_prerequisite(&self) -> ManagerResult<Outcome> {
        let Some(prerequisite) = &self.prerequisite else {
            return Ok(Outcome::Advance);
        };

        if prerequisite.is_satisfied().await {
            debug!(name = prerequisite.name(), "prerequisite satisfied");
            return Ok(Outcome::Advance);
        }

        info!(name = prerequisite.name(), "prerequisite missing, provisioning");
        prerequisite.provision().await?;
        Ok(Outcome::Advance)
    }

    async fn resolve_base_target(&self, ctx: &mut RunContext) -> ManagerResult<Outcome> {
        let metadata = self.metadata.fetch().await?;
        ctx.metadata = Some(Arc::clone(&metadata));

        let channel = match ctx.mode {
            ResolveMode::Latest => &metadata.game,
            ResolveMode::PreDownload => match &metadata.pre_download_game {
                Some(channel) => channel,
                None => {
                    info!("no pre-download package is published");
                    return Ok(Outcome::NothingToDo);
                }
            },
        };
        ctx.report.target_version = Some(channel.latest.version.clone());

        let current = self.inspector.current_base_version().await;
        if ctx.is_target_version(current.as_ref()) {
            info!(version = %channel.latest.version, "base package is up to date");
            ctx.base = None;
            return Ok(Outcome::Advance);
        }

        let target = match resolve(&metadata, current.as_ref(), ctx.mode) {
            Ok(target) => target,
            Err(TargetNotFound::NoPreDownload) => return Ok(Outcome::NothingToDo),
            Err(TargetNotFound::NoMatchingDiff { from }) => match self.policy {
                MissingDiffPolicy::Abort => {
                    return Err(TargetNotFound::NoMatchingDiff { from }.into())
                }
                MissingDiffPolicy::FullPackage => {
                    warn!(%from, "no diff from installed version, using full package");
                    resolve_full(&metadata, ctx.mode)?
                }
            },
            Err(e) => return Err(e.into()),
        };

        info!(
            kind = %target.kind,
            archive = target.archive_name(),
            from = ?current.as_ref().map(ToString::to_string),
            to = %target.target_version,
            "base target resolved"
        );
        ctx.base = Some(target);
        Ok(Outcome::Advance)
    }

    async fn stream_base_download(&self, ctx: &mut RunContext) -> ManagerResult<Outcome> {
        let Some(target) = ctx.base.take() else {
            ctx.report.record_base(ArtifactOutcome::UpToDate);
            return Ok(Outcome::Advance);
        };

        let package = &target.package;
        let outcome = self
            .stream_artifact(
                ctx,
                Artifact::Base,
                &package.path,
                &package.name,
                package.size,
                package.md5.as_deref(),
            )
            .await?;

        if ctx.mode.unpacks() {
            self.finish_install(&package.name).await?;
        }

        ctx.report.record_base(outcome);
        Ok(Outcome::Advance)
    }

    async fn resolve_add_on_targets(&self, ctx: &mut RunContext) -> ManagerResult<Outcome> {
        if self.add_ons.is_empty() {
            return Ok(Outcome::Advance);
        }

        let metadata = match &ctx.metadata {
            Some(metadata) => Arc::clone(metadata),
            None => self.metadata.fetch().await?,
        };

        let installed = match Version::parse(metadata.latest_version()) {
            Ok(latest_known) => self.inspector.list_installed(&self.add_ons, &latest_known).await,
            Err(e) => {
                warn!(version = metadata.latest_version(), error = %e, "latest version is not semver");
                Vec::new()
            }
        };

        for add_on in &installed {
            debug!(locale = %add_on.locale, version = %add_on.version, source = ?add_on.source, "installed add-on");
        }

        for &locale in &self.add_ons {
            let current = installed_version(&installed, locale).cloned();

            if ctx.is_target_version(current.as_ref()) {
                info!(%locale, "add-on is up to date");
                ctx.add_ons.push((locale, None));
                continue;
            }

            let target = match resolve_add_on(&metadata, locale, current.as_ref(), ctx.mode) {
                Ok(target) => target,
                Err(TargetNotFound::NoMatchingDiff { from })
                    if self.policy == MissingDiffPolicy::FullPackage =>
                {
                    warn!(%locale, %from, "no add-on diff from installed version, using full package");
                    add_on_of(&resolve_full(&metadata, ctx.mode)?, locale)?
                }
                Err(e) => return Err(e.into()),
            };

            info!(%locale, kind = %target.kind, archive = %target.package.name, "add-on target resolved");
            ctx.add_ons.push((locale, Some(target)));
        }

        Ok(Outcome::Advance)
    }

    async fn stream_add_on_downloads(&self, ctx: &mut RunContext) -> ManagerResult<Outcome> {
        let targets = std::mem::take(&mut ctx.add_ons);

        for (locale, target) in targets {
            let Some(target) = target else {
                ctx.report.record_add_on(locale, ArtifactOutcome::UpToDate);
                continue;
            };

            self.check_cancelled()?;

            let package = &target.package;
            let outcome = self
                .stream_artifact(
                    ctx,
                    Artifact::AddOn(locale),
                    &package.path,
                    &package.name,
                    package.size,
                    package.md5.as_deref(),
                )
                .await?;

            if ctx.mode.unpacks() {
                self.finish_install(&package.name).await?;
                self.write_version_marker(locale, &target.target_version).await?;
            }

            ctx.report.record_add_on(locale, outcome);
        }

        Ok(Outcome::Advance)
    }

    /// Stream one archive unless it is already complete.
    async fn stream_artifact(
        &self,
        ctx: &RunContext,
        artifact: Artifact,
        url: &str,
        name: &str,
        size: Option<u64>,
        md5: Option<&str>,
    ) -> ManagerResult<ArtifactOutcome> {
        if self.checker.archive_complete(name, size, md5).await {
            info!(%artifact, archive = name, "archive already downloaded");
            if ctx.mode.unpacks() {
                self.unpack_existing(name).await?;
            }
            return Ok(ArtifactOutcome::AlreadyComplete);
        }

        let expected_md5 = md5
            .filter(|_| self.checker.verifies_md5())
            .map(str::to_string);
        let mut request = TransferRequest::new(url, name, self.download_dir.clone())
            .with_expected_size(size)
            .with_expected_md5(expected_md5)
            .with_unpack_dir(self.install_dir.clone());
        if !ctx.mode.unpacks() {
            request = request.skip_unpack();
        }

        info!(%artifact, archive = name, "downloading");
        let mut stream = self.transport.open(request).await?;

        while let Some(event) = self.next_event(&mut stream).await? {
            ctx.sink.send(PipelineEvent::Download { artifact, event }).await;
        }

        let bytes = stream.finish().await?;
        info!(%artifact, archive = name, bytes, "download finished");
        Ok(ArtifactOutcome::Transferred { bytes })
    }

    async fn next_event(&self, stream: &mut DownloadStream) -> ManagerResult<Option<DownloadEvent>> {
        let Some(token) = &self.cancellation else {
            return Ok(stream.next_event().await);
        };

        let next = tokio::select! {
            _ = token.cancelled() => None,
            event = stream.next_event() => Some(event),
        };

        match next {
            Some(event) => Ok(event),
            None => {
                stream.abort();
                Err(ManagerError::Cancelled)
            }
        }
    }

    fn check_cancelled(&self) -> ManagerResult<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(ManagerError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Unpack an archive downloaded by an earlier run.
    async fn unpack_existing(&self, name: &str) -> ManagerResult<()> {
        let extractor = Arc::clone(&self.extractor);
        let archive = archive_path(&self.download_dir, name);
        let dest = self.install_dir.clone();
        let path = archive.clone();

        let count = run_blocking(&path, move || extractor.extract(&archive, &dest)).await?;
        info!(archive = name, files = count, "archive unpacked");
        Ok(())
    }

    /// Apply the delete list and drop the archive after unpacking.
    async fn finish_install(&self, name: &str) -> ManagerResult<()> {
        let install_dir = self.install_dir.clone();
        let removed = run_blocking(&self.install_dir, move || apply_delete_list(&install_dir)).await?;
        if removed > 0 {
            info!(files = removed, "removed stale files");
        }

        if !self.keep_archives {
            let archive = archive_path(&self.download_dir, name);
            match tokio::fs::remove_file(&archive).await {
                Ok(()) => debug!(archive = %archive.display(), "archive removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ManagerError::WriteFailed {
                        path: archive,
                        source: e,
                    })
                }
            }
        }

        Ok(())
    }

    /// Record the installed add-on version.
    async fn write_version_marker(&self, locale: Locale, version: &str) -> ManagerResult<()> {
        let marker = match Version::parse(version).ok().as_ref().and_then(encode_version_marker) {
            Some(marker) => marker,
            None => {
                warn!(%locale, version, "version cannot be stored in a marker");
                return Ok(());
            }
        };

        let add_on_dir = self.inspector.add_on_dir();
        let folder = add_on_folder(add_on_dir, locale);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| ManagerError::CreateDirFailed {
                path: folder.clone(),
                source: e,
            })?;

        let path = version_marker_path(add_on_dir, locale);
        tokio::fs::write(&path, marker)
            .await
            .map_err(|e| ManagerError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!(%locale, version, "version marker written");
        Ok(())
    }
}

/// Run filesystem work on the blocking pool.
async fn run_blocking<T, F>(path: &Path, work: F) -> ManagerResult<T>
where
    F: FnOnce() -> ManagerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ManagerError::ExtractionFailed {
            path: path.to_path_buf(),
            reason: format!("blocking task failed: {}", e),
        })?
}
