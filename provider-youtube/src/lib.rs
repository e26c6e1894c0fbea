//! # YouTube Provider
//!
//! Implements `MediaProvider` for the YouTube Data API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Recognition of YouTube watch, short, embed, live and app links
//! - Video search (best match only)
//! - Playlist membership listing, insertion and deletion via `playlistItems`
//! - Rate limiting and exponential backoff, token invalidation on 401

pub mod connector;
pub mod error;
pub mod types;
pub mod urls;

pub use connector::YouTubeConnector;
pub use error::{Result, YouTubeError};
pub use urls::{canonical_video_url, parse_link, parse_video_id, YouTubeLink};
