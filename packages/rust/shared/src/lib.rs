//! Shared types, error model, and configuration for Runoff.
//!
//! This crate is the foundation depended on by all other Runoff crates.
//! It provides:
//! - [`RunoffError`] — the unified error type
//! - Domain types ([`RasterHandle`], [`RunId`], [`ProvenanceRecord`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ToolkitConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_project,
};
pub use error::{Result, RunoffError};
pub use types::{PROVENANCE_SCHEMA_VERSION, ProvenanceRecord, RasterHandle, RasterKind, RunId};
