//! # Catalog Sync Module
//!
//! Keeps external provider playlists consistent with the song catalog.
//!
//! ## Overview
//!
//! Every create or update of a song runs one sync pass per configured
//! provider:
//! - Resolve the provider track from an explicit link or a search
//! - Diff the stored track id against the resolved one
//! - Reconcile the provider playlist, removal before addition
//! - Persist the song with its new bindings
//!
//! Provider failures never block the catalog write; they are collected in
//! the [`SyncReport`] returned with the song.
//!
//! ## Components
//!
//! - **Identifier Resolver** (`resolver`): Link parsing and search fallback
//! - **Reconciliation Diff** (`diff`): Previous/desired id to ordered steps
//! - **Playlist Membership** (`membership`): Idempotent, bounded playlist checks
//! - **Orchestrator** (`orchestrator`): Runs the per-provider state machine

pub mod diff;
pub mod error;
pub mod membership;
pub mod orchestrator;
pub mod resolver;

pub use diff::{MembershipStep, ReconciliationDiff, ReconciliationPlan};
pub use error::{Outcome, ProviderOperation, Result, SyncError};
pub use membership::{MembershipChange, PlaylistMembershipService, DEFAULT_SCAN_LIMIT};
pub use orchestrator::{
    CatalogSyncOrchestrator, ProviderReport, StepRecord, SyncOptions, SyncReport, SyncState,
    SyncedSong,
};
pub use resolver::{search_query, IdentifierResolver, ResolvedTrack, DEFAULT_REQUEST_TIMEOUT};
