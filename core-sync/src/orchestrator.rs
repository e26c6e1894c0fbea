//! # Catalog Sync Orchestrator
//!
//! Keeps each provider playlist in step with the catalog whenever a song is
//! created or updated.
//!
//! ## Per-provider state machine
//!
//! ```text
//! Start → Resolved → Diffed → Reconciled → Persisted
//!   └──────→ Skipped (resolution failed, stored binding kept)
//! ```
//!
//! Providers run one after another in [`ProviderKind::ALL`] order. A
//! provider failure is recorded in its [`ProviderReport`] and never stops
//! the other provider or the catalog write. Only catalog failures are
//! returned as errors.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = CatalogSyncOrchestrator::new(repository, SyncOptions::default())
//!     .with_provider(ProviderKind::YouTube, youtube, Some("PL123".into()));
//!
//! let synced = orchestrator
//!     .create_song(NewSong::new("Grace").with_artist("Choir"))
//!     .await?;
//! assert!(synced.song.youtube_id.is_some());
//! ```

use bridge_traits::media::MediaProvider;
use chrono::{DateTime, Utc};
use core_auth::ProviderKind;
use core_catalog::{ExternalBinding, NewSong, Song, SongRepository, SongUpdate};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::diff::{MembershipStep, ReconciliationDiff, ReconciliationPlan};
use crate::error::{Outcome, Result, SyncError};
use crate::membership::{MembershipChange, PlaylistMembershipService, DEFAULT_SCAN_LIMIT};
use crate::resolver::{IdentifierResolver, ResolvedTrack, DEFAULT_REQUEST_TIMEOUT};

// ============================================================================
// Options
// ============================================================================

/// Tunables shared by every provider.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound on each provider call
    pub request_timeout: Duration,
    /// Playlist entries inspected per membership check
    pub playlist_scan_limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            playlist_scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

// ============================================================================
// Report Types
// ============================================================================

/// Where a provider's sync ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Start,
    Resolved,
    Diffed,
    Reconciled,
    Persisted,
    Skipped,
}

/// Outcome of one membership step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: MembershipStep,
    pub outcome: Outcome<MembershipChange>,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// What happened for one provider during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderReport {
    pub provider: ProviderKind,
    pub state: SyncState,
    /// Track the song is bound to after the run
    pub resolved: Option<ResolvedTrack>,
    /// `None` when resolution was skipped
    pub diff: Option<ReconciliationDiff>,
    pub plan: Option<ReconciliationPlan>,
    /// `false` when no playlist is configured for the provider
    pub reconciliation_enabled: bool,
    pub steps: Vec<StepRecord>,
    /// First failure of the run for this provider
    pub error: Option<SyncError>,
}

impl ProviderReport {
    fn new(provider: ProviderKind, reconciliation_enabled: bool) -> Self {
        Self {
            provider,
            state: SyncState::Start,
            resolved: None,
            diff: None,
            plan: None,
            reconciliation_enabled,
            steps: Vec::new(),
            error: None,
        }
    }

    fn transition(&mut self, state: SyncState) {
        debug!(provider = %self.provider.as_str(), from = ?self.state, to = ?state, "Sync state transition");
        self.state = state;
    }

    fn record_error(&mut self, error: SyncError) {
        warn!(provider = %self.provider.as_str(), error = %error, "Provider sync step failed");
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-run summary returned with every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Correlates log lines of one run
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub providers: Vec<ProviderReport>,
}

impl SyncReport {
    pub fn provider(&self, provider: ProviderKind) -> Option<&ProviderReport> {
        self.providers.iter().find(|r| r.provider == provider)
    }

    pub fn has_failures(&self) -> bool {
        self.providers.iter().any(|r| r.error.is_some())
    }

    pub fn errors(&self) -> impl Iterator<Item = &SyncError> {
        self.providers.iter().filter_map(|r| r.error.as_ref())
    }
}

/// A persisted song and the report of the sync that preceded the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncedSong {
    pub song: Song,
    pub report: SyncReport,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// How the caller asked a provider link to be treated.
///
/// An update that leaves a link untouched resolves the stored URL as
/// explicit, so bindings stay put instead of drifting with search results.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkIntent {
    Explicit(String),
    Search,
}

impl LinkIntent {
    fn explicit_url(&self) -> Option<&str> {
        match self {
            LinkIntent::Explicit(url) => Some(url),
            LinkIntent::Search => None,
        }
    }
}

/// Binding decision for one provider.
enum BindingChange {
    Set(ExternalBinding),
    Keep,
}

struct ProviderSync {
    kind: ProviderKind,
    playlist_id: Option<String>,
    resolver: IdentifierResolver,
    membership: PlaylistMembershipService,
}

pub struct CatalogSyncOrchestrator {
    repository: Arc<dyn SongRepository>,
    options: SyncOptions,
    providers: Vec<ProviderSync>,
}

impl CatalogSyncOrchestrator {
    pub fn new(repository: Arc<dyn SongRepository>, options: SyncOptions) -> Self {
        Self {
            repository,
            options,
            providers: Vec::new(),
        }
    }

    /// Register a provider. `playlist_id: None` binds songs without touching
    /// any playlist. Registering a provider twice replaces it.
    pub fn with_provider(
        mut self,
        kind: ProviderKind,
        provider: Arc<dyn MediaProvider>,
        playlist_id: Option<String>,
    ) -> Self {
        let resolver = IdentifierResolver::new(kind, Arc::clone(&provider))
            .with_request_timeout(self.options.request_timeout);
        let membership = PlaylistMembershipService::new(kind, provider)
            .with_scan_limit(self.options.playlist_scan_limit)
            .with_request_timeout(self.options.request_timeout);

        self.providers.retain(|p| p.kind != kind);
        self.providers.push(ProviderSync {
            kind,
            playlist_id: playlist_id.filter(|id| !id.trim().is_empty()),
            resolver,
            membership,
        });
        self.providers
            .sort_by_key(|p| ProviderKind::ALL.iter().position(|k| *k == p.kind));
        self
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind).collect()
    }

    fn is_configured(&self, kind: ProviderKind) -> bool {
        self.providers.iter().any(|p| p.kind == kind)
    }

    pub async fn get_song(&self, id: i64) -> Result<Option<Song>> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(|e| SyncError::CatalogPersistenceFailed(e.to_string()))
    }

    /// Create a song, bind it on every provider and add it to the playlists.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidSong`] for an empty title and
    /// [`SyncError::CatalogPersistenceFailed`] when the insert fails.
    /// Provider failures are only reported.
    pub async fn create_song(&self, song: NewSong) -> Result<SyncedSong> {
        let run_id = Uuid::new_v4();
        let span = info_span!("catalog_sync", %run_id, operation = "create");
        self.create_song_inner(run_id, song).instrument(span).await
    }

    async fn create_song_inner(&self, run_id: Uuid, mut song: NewSong) -> Result<SyncedSong> {
        song.validate().map_err(SyncError::InvalidSong)?;
        let started_at = Utc::now();
        info!(title = %song.title, "Creating song");

        let mut reports = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let intent = match song.url(provider.kind).map(str::trim) {
                Some(url) if !url.is_empty() => LinkIntent::Explicit(url.to_string()),
                _ => LinkIntent::Search,
            };

            let (change, report) = self
                .sync_provider(
                    provider,
                    &song.title,
                    song.artist.as_deref(),
                    ExternalBinding::default(),
                    intent,
                )
                .await;

            let binding = match change {
                BindingChange::Set(binding) => binding,
                BindingChange::Keep => ExternalBinding::default(),
            };
            song.set_binding(provider.kind, binding);
            reports.push(report);
        }

        for kind in ProviderKind::ALL {
            if !self.is_configured(kind) {
                let url = song.url(kind).map(str::to_string);
                song.set_binding(kind, ExternalBinding::unresolved(url));
            }
        }

        let stored = self.repository.insert(&song).await.map_err(|e| {
            error!(error = %e, "Failed to persist new song");
            SyncError::CatalogPersistenceFailed(e.to_string())
        })?;

        let report = Self::finish(run_id, started_at, reports);
        info!(song_id = stored.id, failures = report.errors().count(), "Song created");

        Ok(SyncedSong {
            song: stored,
            report,
        })
    }

    /// Apply `update` to song `id`, re-evaluating every provider binding.
    ///
    /// A url field set in `update` is an explicit link, a cleared url field
    /// triggers a search, and an untouched url field reuses the stored link
    /// (or searches when none is stored).
    ///
    /// # Errors
    ///
    /// [`SyncError::SongNotFound`], [`SyncError::InvalidSong`] and
    /// [`SyncError::CatalogPersistenceFailed`].
    pub async fn update_song(&self, id: i64, update: SongUpdate) -> Result<SyncedSong> {
        let run_id = Uuid::new_v4();
        let span = info_span!("catalog_sync", %run_id, operation = "update", song_id = id);
        self.update_song_inner(run_id, id, update).instrument(span).await
    }

    async fn update_song_inner(
        &self,
        run_id: Uuid,
        id: i64,
        mut update: SongUpdate,
    ) -> Result<SyncedSong> {
        update.validate().map_err(SyncError::InvalidSong)?;

        let mut song = self
            .get_song(id)
            .await?
            .ok_or(SyncError::SongNotFound { id })?;
        let started_at = Utc::now();
        info!("Updating song");

        let title = update.title.clone().unwrap_or_else(|| song.title.clone());
        let artist = match &update.artist {
            Some(artist) => artist.clone(),
            None => song.artist.clone(),
        };

        let mut reports = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let stored = song.binding(provider.kind);
            let intent = match update.url_change(provider.kind) {
                Some(Some(url)) if !url.trim().is_empty() => {
                    LinkIntent::Explicit(url.trim().to_string())
                }
                Some(_) => LinkIntent::Search,
                None => match stored.url.as_deref().map(str::trim) {
                    Some(url) if !url.is_empty() => LinkIntent::Explicit(url.to_string()),
                    _ => LinkIntent::Search,
                },
            };

            let (change, report) = self
                .sync_provider(provider, &title, artist.as_deref(), stored, intent)
                .await;

            match change {
                BindingChange::Set(binding) => update.set_binding(provider.kind, binding),
                BindingChange::Keep => update.keep_binding(provider.kind),
            }
            reports.push(report);
        }

        for kind in ProviderKind::ALL {
            if self.is_configured(kind) {
                continue;
            }
            match update.url_change(kind).map(|url| url.map(str::to_string)) {
                Some(url) => update.set_binding(kind, ExternalBinding::unresolved(url)),
                None => update.keep_binding(kind),
            }
        }

        update.apply_to(&mut song);
        let stored = self.repository.update(&song).await.map_err(|e| {
            if e.is_not_found() {
                return SyncError::SongNotFound { id };
            }
            error!(error = %e, "Failed to persist song update");
            SyncError::CatalogPersistenceFailed(e.to_string())
        })?;

        let report = Self::finish(run_id, started_at, reports);
        info!(failures = report.errors().count(), "Song updated");

        Ok(SyncedSong {
            song: stored,
            report,
        })
    }

    /// Resolve, diff and reconcile one provider.
    async fn sync_provider(
        &self,
        provider: &ProviderSync,
        title: &str,
        artist: Option<&str>,
        previous: ExternalBinding,
        intent: LinkIntent,
    ) -> (BindingChange, ProviderReport) {
        let mut report = ProviderReport::new(provider.kind, provider.playlist_id.is_some());

        let resolved = match provider
            .resolver
            .resolve(title, artist, intent.explicit_url())
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                report.record_error(e);
                report.transition(SyncState::Skipped);
                return (BindingChange::Keep, report);
            }
        };
        report.resolved = resolved.clone();
        report.transition(SyncState::Resolved);

        let binding = match (&resolved, &intent) {
            (Some(track), _) => ExternalBinding::new(track.url.clone(), track.id.clone()),
            (None, LinkIntent::Explicit(url)) => ExternalBinding::unresolved(Some(url.clone())),
            (None, LinkIntent::Search) => ExternalBinding::default(),
        };

        let diff = ReconciliationDiff::new(previous.id, resolved.map(|t| t.id));
        let plan = diff.plan();
        debug!(provider = %provider.kind.as_str(), ?plan, "Reconciliation planned");
        report.diff = Some(diff);
        report.plan = Some(plan.clone());
        report.transition(SyncState::Diffed);

        match &provider.playlist_id {
            Some(playlist_id) => {
                for step in plan.steps() {
                    let outcome = match &step {
                        MembershipStep::EnsureAbsent(track_id) => {
                            provider.membership.ensure_absent(track_id, playlist_id).await
                        }
                        MembershipStep::EnsurePresent(track_id) => {
                            provider.membership.ensure_present(track_id, playlist_id).await
                        }
                    };
                    if let Err(e) = &outcome {
                        report.record_error(e.clone());
                    }
                    report.steps.push(StepRecord { step, outcome });
                }
            }
            None if !plan.is_unchanged() => {
                debug!(provider = %provider.kind.as_str(), "No playlist configured, reconciliation disabled");
            }
            None => {}
        }
        report.transition(SyncState::Reconciled);

        (BindingChange::Set(binding), report)
    }

    fn finish(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        mut reports: Vec<ProviderReport>,
    ) -> SyncReport {
        for report in &mut reports {
            if report.state == SyncState::Reconciled {
                report.transition(SyncState::Persisted);
            }
        }
        SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            providers: reports,
        }
    }
}
