//! Shared types, error model, and configuration for syncreport.
//!
//! This crate is the foundation depended on by all other syncreport crates.
//! It provides:
//! - [`SyncReportError`]: the unified error type
//! - Record types ([`AppRecord`], [`Classification`])
//! - Configuration ([`AppConfig`], [`ControllerSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ControllerConfig, ControllerOverrides, ControllerSettings, IdentifierPolicy,
    ReportConfig, RevisionPreference, SourceKind, WriteMode, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, SyncReportError};
pub use types::{AppRecord, Classification, UNKNOWN_REVISION};
