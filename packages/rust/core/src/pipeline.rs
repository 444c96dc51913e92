//! End-to-end `generate` pipeline: discover → parse → enhance → QA → compose → assemble.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use docsmith_markdown::{discover_documents, read_document};
use docsmith_shared::{
    AppConfig, DocsmithError, DocumentMeta, EnhancementConfig, ParsedDocument, QaConfig, Result,
    RunManifest,
};

use crate::assembler::{AssembleConfig, AssembleInput, assemble};
use crate::enhancer::SectionEnhancer;
use crate::format::format_qa_section;
use crate::qa::generate_qa_pairs;
use crate::toc::{build_toc, render_toc};

/// Title used when more than one document is combined.
pub const DEFAULT_TITLE: &str = "Project Documentation";

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Markdown file or directory of markdown files.
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub output_file: String,
    pub qa_style: String,
    pub include_toc: bool,
    pub module_separators: bool,
    pub write_qa_json: bool,
    /// Maximum documents parsed or enhanced at once.
    pub concurrency: usize,
    pub enhancement: EnhancementConfig,
    pub qa: QaConfig,
    pub tool_version: String,
}

impl RunConfig {
    /// Lift the file-level config into a run config.
    pub fn from_app_config(config: &AppConfig, tool_version: impl Into<String>) -> Self {
        Self {
            source: PathBuf::from(&config.defaults.source_dir),
            output_dir: PathBuf::from(&config.defaults.output_dir),
            output_file: config.output.output_file.clone(),
            qa_style: config.output.qa_style.clone(),
            include_toc: config.defaults.include_toc,
            module_separators: config.defaults.module_separators,
            write_qa_json: config.output.write_qa_json,
            concurrency: config.defaults.concurrency,
            enhancement: config.enhancement.clone(),
            qa: config.qa.clone(),
            tool_version: tool_version.into(),
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct RunResult {
    pub output_dir: PathBuf,
    /// Path of the enhanced document.
    pub document_path: PathBuf,
    pub document_count: usize,
    pub section_count: usize,
    pub qa_pair_count: usize,
    pub manifest: RunManifest,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each parsed document is collected, in input order.
    fn document_parsed(&self, file_name: &str, current: usize, total: usize);
    /// Called as each enhanced section is collected, in document order.
    fn section_enhanced(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_parsed(&self, _file_name: &str, _current: usize, _total: usize) {}
    fn section_enhanced(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// Run the full pipeline.
///
/// 1. Discover markdown files under `source`
/// 2. Parse them in parallel
/// 3. Enhance every section, one task per document
/// 4. Mine and format QA pairs
/// 5. Compose the output document
/// 6. Assemble the output directory
#[instrument(skip_all, fields(source = %config.source.display(), out = %config.output_dir.display()))]
pub async fn run(config: &RunConfig, progress: &dyn ProgressReporter) -> Result<RunResult> {
    let start = Instant::now();
    info!("starting generate pipeline");

    // --- Phase 1: Discovery ---
    progress.phase("Discovering documents");
    let paths = discover_documents(&config.source)?;
    if paths.is_empty() {
        return Err(DocsmithError::validation(format!(
            "no markdown files found in {}",
            config.source.display()
        )));
    }

    // --- Phase 2: Parse ---
    progress.phase("Parsing documents");
    let docs = parse_documents(&paths, config.concurrency, progress).await?;

    // --- Phase 3: Enhance ---
    progress.phase("Enhancing sections");
    let enhancer = SectionEnhancer::new(config.enhancement.clone());
    let bodies = enhance_documents(&docs, &enhancer, config.concurrency, progress).await?;
    let section_count = bodies.iter().map(Vec::len).sum();

    // --- Phase 4: QA ---
    progress.phase("Generating Q&A pairs");
    let pairs = generate_qa_pairs(&docs, &config.qa)?;
    let faq = format_qa_section(&pairs, &config.qa_style);

    // --- Phase 5: Compose ---
    progress.phase("Composing document");
    let title = document_title(&docs);
    let toc = config
        .include_toc
        .then(|| render_toc(&build_toc(&title, &docs, !faq.is_empty())));
    let document = compose_document(&title, toc.as_deref(), &bodies, &faq, config.module_separators);

    // --- Phase 6: Assemble ---
    progress.phase("Writing output");
    let assemble_config = AssembleConfig {
        output_dir: config.output_dir.clone(),
        output_file: config.output_file.clone(),
        qa_style: config.qa_style.clone(),
        write_qa_json: config.write_qa_json,
        tool_version: config.tool_version.clone(),
    };
    let input = AssembleInput {
        document: &document,
        faq: &faq,
        qa_pairs: &pairs,
        documents: docs.iter().map(document_meta).collect(),
    };
    let assembled = assemble(&assemble_config, &input)?;

    let result = RunResult {
        output_dir: assembled.output_dir,
        document_path: assembled.document_path,
        document_count: docs.len(),
        section_count,
        qa_pair_count: pairs.len(),
        manifest: assembled.manifest,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        documents = result.document_count,
        sections = result.section_count,
        qa_pairs = result.qa_pair_count,
        elapsed_ms = result.elapsed.as_millis(),
        "generate pipeline complete"
    );

    Ok(result)
}

/// Read and parse `paths` on the blocking pool, at most `concurrency` at a
/// time. Results come back in input order.
///
/// A file that cannot be read is skipped with a warning; it is an error only
/// when none of `paths` can be read.
pub async fn parse_documents(
    paths: &[PathBuf],
    concurrency: usize,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ParsedDocument>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DocsmithError::parse(format!("parse queue closed: {e}")))?;
        let path = path.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            read_document(&path)
        }));
    }

    let total = handles.len();
    let mut docs = Vec::with_capacity(total);
    for (i, (path, handle)) in paths.iter().zip(handles).enumerate() {
        let parsed = handle
            .await
            .map_err(|e| DocsmithError::parse(format!("parse task failed: {e}")))?;
        match parsed {
            Ok(doc) => {
                progress.document_parsed(&doc.file_name, i + 1, total);
                docs.push(doc);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
        }
    }

    if docs.is_empty() && !paths.is_empty() {
        return Err(DocsmithError::validation(format!(
            "none of the {total} markdown files could be read"
        )));
    }

    debug!(documents = docs.len(), skipped = total - docs.len(), "documents parsed");
    Ok(docs)
}

/// Enhance each document on the blocking pool. The outer vec follows
/// `docs`, the inner one the document's sections.
async fn enhance_documents(
    docs: &[ParsedDocument],
    enhancer: &SectionEnhancer,
    concurrency: usize,
    progress: &dyn ProgressReporter,
) -> Result<Vec<Vec<String>>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(docs.len());

    for doc in docs {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DocsmithError::validation(format!("enhance queue closed: {e}")))?;
        let doc = doc.clone();
        let enhancer = enhancer.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            enhancer.enhance_document(&doc)
        }));
    }

    let total: usize = docs.iter().map(|d| d.flat_sections().len()).sum();
    let mut current = 0;
    let mut bodies = Vec::with_capacity(docs.len());
    for (doc, handle) in docs.iter().zip(handles) {
        let sections = handle
            .await
            .map_err(|e| DocsmithError::validation(format!("enhance task failed: {e}")))??;
        for section in doc.flat_sections() {
            current += 1;
            progress.section_enhanced(&section.title, current, total);
        }
        bodies.push(sections);
    }

    Ok(bodies)
}

/// Title of the combined document.
pub fn document_title(docs: &[ParsedDocument]) -> String {
    match docs {
        [only] => only.title.clone(),
        _ => DEFAULT_TITLE.to_string(),
    }
}

/// Join the rendered pieces into the final markdown document.
///
/// When the first module opens with the title as its own H1, that heading
/// becomes the document heading instead of being repeated.
pub fn compose_document(
    title: &str,
    toc: Option<&str>,
    bodies: &[Vec<String>],
    faq: &str,
    module_separators: bool,
) -> String {
    let heading = format!("# {title}");
    let mut modules: Vec<String> = bodies
        .iter()
        .filter(|sections| !sections.is_empty())
        .map(|sections| sections.join("\n\n"))
        .collect();

    let rest = modules
        .first()
        .and_then(|first| first.strip_prefix(heading.as_str()))
        .filter(|rest| rest.is_empty() || rest.starts_with('\n'))
        .map(|rest| rest.trim_start_matches('\n').to_string());
    match rest {
        Some(rest) if rest.is_empty() => {
            modules.remove(0);
        }
        Some(rest) => modules[0] = rest,
        None => {}
    }

    let mut parts = vec![heading];
    if let Some(toc) = toc {
        parts.push(toc.to_string());
    }

    let separator = if module_separators { "\n\n---\n\n" } else { "\n\n" };
    if !modules.is_empty() {
        parts.push(modules.join(separator));
    }

    let faq = faq.trim_end();
    if !faq.is_empty() {
        parts.push(faq.to_string());
    }

    let mut out = parts.join("\n\n");
    out.push('\n');
    out
}

fn document_meta(doc: &ParsedDocument) -> DocumentMeta {
    DocumentMeta {
        file_name: doc.file_name.clone(),
        title: doc.title.clone(),
        sha256: doc.content_hash.clone(),
        section_count: doc.flat_sections().len(),
    }
}
