//! # Spotify Provider
//!
//! Implements `MediaProvider` for the Spotify Web API.
//!
//! ## Overview
//!
//! This module provides:
//! - Recognition of `open.spotify.com` links and `spotify:` URIs
//! - Track search (best match only)
//! - Offset-paginated playlist listing, track addition and removal by URI
//! - Rate limiting with `Retry-After`, token invalidation on 401

pub mod connector;
pub mod error;
pub mod types;
pub mod urls;

pub use connector::SpotifyConnector;
pub use error::{Result, SpotifyError};
pub use urls::{canonical_track_url, parse_link, parse_track_id, track_uri, SpotifyKind, SpotifyLink};
