//! Markdown → [`ParsedDocument`] parser.
//!
//! Headings outside fenced code open sections; everything up to the next
//! heading is that section's content. Sections nest by heading level.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use docsmith_shared::{DetectedWorkflow, ParsedDocument, Section, content_hash};

use crate::classify::classify_title;
use crate::cleanup;
use crate::fences::{fenced_blocks, is_fence_line};

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `## Heading` with 1–6 hashes.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)(?:\s+#+)?\s*$").expect("heading regex"));

/// Matches a leading ordinal such as `1. ` or `2) ` in a heading.
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("ordinal regex"));

/// Matches a numbered list item.
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+\S").expect("numbered regex"));

/// Section titles whose whole content reads as a workflow.
static WORKFLOW_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:workflow|pipeline|process|steps)\b").expect("workflow title regex")
});

/// Minimum consecutive numbered lines treated as a workflow.
const MIN_WORKFLOW_STEPS: usize = 3;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse one markdown file. Never fails: text without headings yields a
/// document with no sections.
#[instrument(skip(text), fields(file = %file_name, len = text.len()))]
pub fn parse_document(file_name: &str, text: &str) -> ParsedDocument {
    let hash = content_hash(text);
    let md = cleanup::run_pipeline(text);

    let flat = split_sections(&md);
    let title = flat
        .iter()
        .find(|s| s.level == 1)
        .map(|s| s.title.clone())
        .unwrap_or_else(|| file_stem(file_name));

    let workflows = detect_workflows(&flat);
    let sections = nest(flat);

    debug!(
        sections = sections.len(),
        workflows = workflows.len(),
        "document parsed"
    );

    ParsedDocument {
        file_name: file_name.to_string(),
        title,
        sections,
        workflows,
        content_hash: hash,
    }
}

/// Split normalized markdown into a flat, document-ordered list of sections.
fn split_sections(md: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(String, u8, Vec<&str>)> = None;
    let mut in_fence = false;

    for line in md.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
        }

        let heading = if in_fence {
            None
        } else {
            HEADING_RE.captures(line)
        };

        match heading {
            Some(caps) => {
                if let Some((title, level, body)) = current.take() {
                    sections.push(build_section(title, level, &body));
                }
                let level = caps[1].len() as u8;
                let title = ORDINAL_RE.replace(&caps[2], "").trim().to_string();
                current = Some((title, level, Vec::new()));
            }
            None => {
                // Text before the first heading is not part of any section.
                if let Some((_, _, body)) = current.as_mut() {
                    body.push(line);
                }
            }
        }
    }

    if let Some((title, level, body)) = current.take() {
        sections.push(build_section(title, level, &body));
    }

    sections
        .into_iter()
        .filter(|s: &Section| !s.title.is_empty())
        .collect()
}

fn build_section(title: String, level: u8, body: &[&str]) -> Section {
    let start = body.iter().position(|l| !l.trim().is_empty());
    let end = body.iter().rposition(|l| !l.trim().is_empty());
    let content = match (start, end) {
        (Some(start), Some(end)) => body[start..=end].join("\n"),
        _ => String::new(),
    };

    let section_type = classify_title(&title);
    let code_blocks = fenced_blocks(&content);
    let tables = extract_tables(&content);

    Section {
        title,
        level,
        content,
        section_type,
        code_blocks,
        tables,
        subsections: Vec::new(),
    }
}

/// Runs of lines starting with `|`, outside fenced code.
fn extract_tables(content: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
        }
        if !in_fence && line.trim_start().starts_with('|') {
            current.push(line.trim());
            continue;
        }
        if !current.is_empty() {
            tables.push(current.join("\n"));
            current.clear();
        }
    }
    if !current.is_empty() {
        tables.push(current.join("\n"));
    }

    tables
}

/// Numbered-list runs and workflow-titled sections, in document order.
fn detect_workflows(sections: &[Section]) -> Vec<DetectedWorkflow> {
    let mut workflows: Vec<DetectedWorkflow> = Vec::new();

    for section in sections {
        if section.content.is_empty() {
            continue;
        }

        let found = if WORKFLOW_TITLE_RE.is_match(&section.title) {
            vec![section.content.clone()]
        } else {
            numbered_runs(&section.content)
        };

        for text in found {
            let workflow = DetectedWorkflow {
                source_section: section.title.clone(),
                text,
            };
            if !workflows.contains(&workflow) {
                workflows.push(workflow);
            }
        }
    }

    workflows
}

fn numbered_runs(content: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            flush(&mut current, &mut runs);
            continue;
        }
        if !in_fence && NUMBERED_RE.is_match(line) {
            current.push(line.trim());
        } else if !line.trim().is_empty() {
            flush(&mut current, &mut runs);
        }
    }
    flush(&mut current, &mut runs);

    runs
}

fn flush(current: &mut Vec<&str>, runs: &mut Vec<String>) {
    if current.len() >= MIN_WORKFLOW_STEPS {
        runs.push(current.join("\n"));
    }
    current.clear();
}

/// Attach each section to the nearest preceding section with a lower level.
fn nest(flat: Vec<Section>) -> Vec<Section> {
    fn close_top(stack: &mut Vec<Section>, roots: &mut Vec<Section>) {
        if let Some(done) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.subsections.push(done),
                None => roots.push(done),
            }
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<Section> = Vec::new();

    for section in flat {
        while stack.last().is_some_and(|top| top.level >= section.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(section);
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn file_stem(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
