//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! - Traits define the interface the sync engine depends on
//! - SQLite implementations use sqlx for async database access

pub mod song;

pub use song::{SongRepository, SqliteSongRepository};
