//! Output directory assembler.
//!
//! Writes the generated files and a `manifest.json` describing them:
//!
//! ```text
//! <output_dir>/
//! ├── enhanced_readme.md   (name configurable)
//! ├── faq.md
//! ├── qa_pairs.json        (optional)
//! └── manifest.json
//! ```
//!
//! Every file is written to a dot-prefixed temp file and renamed into place.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, instrument};

use docsmith_shared::{
    ArtifactMeta, CURRENT_SCHEMA_VERSION, DocsmithError, DocumentMeta, QaPair, Result, RunId,
    RunManifest, content_hash,
};

use crate::qa::category_counts;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FAQ_FILE: &str = "faq.md";
pub const QA_JSON_FILE: &str = "qa_pairs.json";

/// Everything one run writes.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    pub output_dir: PathBuf,
    /// File name of the enhanced document.
    pub output_file: String,
    pub qa_style: String,
    pub write_qa_json: bool,
    pub tool_version: String,
}

/// Rendered content handed to [`assemble`].
#[derive(Debug, Clone)]
pub struct AssembleInput<'a> {
    pub document: &'a str,
    pub faq: &'a str,
    pub qa_pairs: &'a [QaPair],
    pub documents: Vec<DocumentMeta>,
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub output_dir: PathBuf,
    /// Path of the enhanced document.
    pub document_path: PathBuf,
    pub manifest: RunManifest,
}

/// Write all artifacts, then the manifest that lists them.
#[instrument(skip_all, fields(out = %config.output_dir.display()))]
pub fn assemble(config: &AssembleConfig, input: &AssembleInput<'_>) -> Result<AssembleResult> {
    validate_file_name(&config.output_file)?;
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| DocsmithError::io(&config.output_dir, e))?;

    let mut files: Vec<(&str, String)> = vec![
        (config.output_file.as_str(), input.document.to_string()),
        (FAQ_FILE, input.faq.to_string()),
    ];
    if config.write_qa_json {
        files.push((QA_JSON_FILE, serde_json::to_string_pretty(input.qa_pairs)?));
    }

    let mut artifacts = Vec::with_capacity(files.len());
    for (filename, content) in &files {
        artifacts.push(write_artifact(&config.output_dir, filename, content)?);
    }

    let manifest = RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: RunId::new(),
        tool_version: config.tool_version.clone(),
        created_at: Utc::now(),
        qa_style: config.qa_style.clone(),
        documents: input.documents.clone(),
        artifacts,
        qa_counts: category_counts(input.qa_pairs)
            .into_iter()
            .map(|(category, n)| (category.as_str().to_string(), n))
            .collect(),
    };
    write_atomic(
        &config.output_dir,
        MANIFEST_FILE,
        &serde_json::to_string_pretty(&manifest)?,
    )?;

    info!(
        artifacts = manifest.artifacts.len(),
        qa_pairs = input.qa_pairs.len(),
        "output assembled"
    );

    Ok(AssembleResult {
        document_path: config.output_dir.join(&config.output_file),
        output_dir: config.output_dir.clone(),
        manifest,
    })
}

/// Check an output directory against its manifest.
///
/// The manifest must exist, parse, carry the current schema version, and
/// every listed artifact must exist with a matching SHA-256.
pub fn validate_output(dir: &Path) -> Result<RunManifest> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(DocsmithError::validation(format!("missing {MANIFEST_FILE}")));
    }

    let raw = std::fs::read_to_string(&manifest_path)
        .map_err(|e| DocsmithError::io(&manifest_path, e))?;
    let manifest: RunManifest = serde_json::from_str(&raw)
        .map_err(|e| DocsmithError::validation(format!("invalid {MANIFEST_FILE}: {e}")))?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(DocsmithError::validation(format!(
            "unsupported schema_version: {} (expected {CURRENT_SCHEMA_VERSION})",
            manifest.schema_version
        )));
    }

    for artifact in &manifest.artifacts {
        let path = dir.join(&artifact.filename);
        if !path.exists() {
            return Err(DocsmithError::validation(format!(
                "missing artifact {}",
                artifact.filename
            )));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| DocsmithError::io(&path, e))?;
        if content_hash(&content) != artifact.sha256 {
            return Err(DocsmithError::validation(format!(
                "checksum mismatch for {}",
                artifact.filename
            )));
        }
    }

    debug!(dir = %dir.display(), artifacts = manifest.artifacts.len(), "output validated");
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_artifact(dir: &Path, filename: &str, content: &str) -> Result<ArtifactMeta> {
    write_atomic(dir, filename, content)?;
    Ok(ArtifactMeta {
        filename: filename.to_string(),
        sha256: content_hash(content),
        size_bytes: content.len(),
    })
}

/// Write to `.{filename}.tmp`, then rename over the target.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<()> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| DocsmithError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| DocsmithError::io(&target, e))?;

    debug!(file = %filename, size = content.len(), "wrote file");
    Ok(())
}

/// The enhanced document must land directly in the output directory and not
/// shadow another artifact.
fn validate_file_name(name: &str) -> Result<()> {
    let reserved = [MANIFEST_FILE, FAQ_FILE, QA_JSON_FILE];
    if name.is_empty()
        || name.contains(['/', '\\'])
        || name.starts_with('.')
        || reserved.contains(&name)
    {
        return Err(DocsmithError::config(format!(
            "invalid output_file '{name}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
