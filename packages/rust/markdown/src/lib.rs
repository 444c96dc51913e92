//! Markdown input layer: normalization, parsing into sections, and the
//! classification rules the enrichment engine relies on.
//!
//! The parser turns raw markdown into a [`ParsedDocument`] tree of
//! [`docsmith_shared::Section`]s with their code blocks and tables attached.

mod cleanup;

pub mod classify;
pub mod fences;
pub mod parser;

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use docsmith_shared::{DocsmithError, ParsedDocument, Result};

pub use classify::{LanguageFamily, classify_title, detect_language, is_shell_block};
pub use fences::{fenced_blocks, map_fenced_blocks, strip_fenced_blocks};
pub use parser::parse_document;

/// Inputs larger than this are rejected.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read and parse a markdown file.
///
/// Non-UTF-8 input is decoded lossily rather than rejected.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_document(path: &Path) -> Result<ParsedDocument> {
    let meta = std::fs::metadata(path).map_err(|e| DocsmithError::io(path, e))?;
    if meta.len() > MAX_FILE_SIZE {
        return Err(DocsmithError::validation(format!(
            "{} is {} bytes (limit {MAX_FILE_SIZE})",
            path.display(),
            meta.len()
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| DocsmithError::io(path, e))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "input is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(parse_document(&file_name, &text))
}

/// List markdown files to process.
///
/// A directory yields its `.md`/`.markdown` files (non-recursive), sorted by
/// lowercased name. A file path yields itself.
pub fn discover_documents(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let entries = std::fs::read_dir(source).map_err(|e| DocsmithError::io(source, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DocsmithError::io(source, e))?;
        let path = entry.path();
        if path.is_file() && is_markdown(&path) {
            files.push(path);
        }
    }

    files.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });

    debug!(dir = %source.display(), count = files.len(), "discovered markdown files");
    Ok(files)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| ext == "md" || ext == "markdown")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("docsmith-md-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn discovers_markdown_sorted() {
        let dir = temp_dir();
        std::fs::write(dir.join("b_guide.MD"), "# B\n").unwrap();
        std::fs::write(dir.join("README.md"), "# R\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "skip").unwrap();
        std::fs::write(dir.join("a.markdown"), "# A\n").unwrap();

        let files = discover_documents(&dir).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.markdown", "b_guide.MD", "README.md"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn single_file_source() {
        let dir = temp_dir();
        let file = dir.join("only.md");
        std::fs::write(&file, "# Only\n").unwrap();
        assert_eq!(discover_documents(&file).unwrap(), vec![file]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_document_decodes_lossily() {
        let dir = temp_dir();
        let file = dir.join("latin.md");
        std::fs::write(&file, b"# Caf\xe9\n\nText.\n").unwrap();

        let doc = read_document(&file).unwrap();
        assert_eq!(doc.file_name, "latin.md");
        assert!(doc.title.starts_with("Caf"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_document(Path::new("/nonexistent/docsmith.md")).unwrap_err();
        assert!(matches!(err, DocsmithError::Io { .. }));
    }

    #[test]
    fn fixture_readme_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/markdown/radp_readme.md");
        let doc = read_document(&path).expect("read fixture");
        assert_eq!(doc.title, "RADP Digital Twin");
        assert!(doc.flat_sections().len() >= 6);
        assert!(!doc.workflows.is_empty());
    }
}
