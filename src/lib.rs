//! Workspace umbrella crate.
//!
//! Host applications can depend on `catalog-sync-workspace` and enable the
//! documented features without wiring each workspace crate individually.
//! With `desktop-shims` (the default) the [`core_service`] façade is
//! re-exported at the crate root.

#[cfg(feature = "desktop-shims")]
pub use core_service::{CatalogService, CoreError, Result};
