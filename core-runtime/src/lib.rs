//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the catalog sync engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and the configuration surface used
//! throughout the system.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
