//! # Song Catalog
//!
//! Owns the song table and the repository the sync engine persists through.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite connection pooling and embedded migrations
//! - The `Song` entity with one external binding per provider
//! - Write models for creating and patching songs
//! - The `SongRepository` contract and its SQLite implementation

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{CatalogError, Result};
pub use models::{ExternalBinding, NewSong, Song, SongUpdate};
pub use repositories::{SongRepository, SqliteSongRepository};
