//! Shared types, error model, and configuration for docsmith.
//!
//! This crate is the foundation depended on by all other docsmith crates.
//! It provides:
//! - [`DocsmithError`]: the unified error type
//! - Domain types ([`Section`], [`CodeBlock`], [`QaPair`], [`ParsedDocument`], [`RunManifest`])
//! - Configuration ([`AppConfig`], [`EnhancementConfig`], [`QaConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EnhancementConfig, EnhancementToggles, OutputConfig, QaConfig,
    QaStyle, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocsmithError, Result};
pub use types::{
    ArtifactMeta, CURRENT_SCHEMA_VERSION, CodeBlock, DetectedWorkflow, DocumentMeta,
    ParsedDocument, QaCategory, QaPair, QaSource, RunId, RunManifest, Section, SectionType,
    TocEntry, content_hash, flatten_sections,
};
