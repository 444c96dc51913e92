//! Core domain types for docsmith: parsed sections, QA pairs, run manifests.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{DocsmithError, Result};

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// SectionType
// ---------------------------------------------------------------------------

/// Classification tag driving which enhancements apply to a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Installation,
    Usage,
    Api,
    Examples,
    Workflow,
    Configuration,
    Troubleshooting,
    Generic,
}

impl SectionType {
    /// Every section type, in declaration order.
    pub const ALL: [SectionType; 8] = [
        SectionType::Installation,
        SectionType::Usage,
        SectionType::Api,
        SectionType::Examples,
        SectionType::Workflow,
        SectionType::Configuration,
        SectionType::Troubleshooting,
        SectionType::Generic,
    ];

    /// The lowercase key used in config files and QA output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installation => "installation",
            Self::Usage => "usage",
            Self::Api => "api",
            Self::Examples => "examples",
            Self::Workflow => "workflow",
            Self::Configuration => "configuration",
            Self::Troubleshooting => "troubleshooting",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = DocsmithError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| DocsmithError::validation(format!("unknown section type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Section / CodeBlock
// ---------------------------------------------------------------------------

/// A fenced code block found inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Block body without the fence lines.
    pub content: String,
    /// Declared fence language, lowercased. `None` when the fence had no hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl CodeBlock {
    pub fn new(content: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            content: content.into(),
            language: language.map(str::to_string),
        }
    }
}

/// A titled, leveled block of document content.
///
/// Produced by the parser and treated as read-only by the enrichment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    /// Heading depth, 1..=6.
    pub level: u8,
    /// Text between this heading and the next heading of any level.
    pub content: String,
    /// Classification assigned by the parser, if any rule matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<SectionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_blocks: Vec<CodeBlock>,
    /// Raw markdown table blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
}

impl Section {
    /// Build a bare section with no classification, code, tables, or children.
    pub fn new(title: impl Into<String>, level: u8, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            level,
            content: content.into(),
            section_type: None,
            code_blocks: Vec::new(),
            tables: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub fn with_type(mut self, section_type: SectionType) -> Self {
        self.section_type = Some(section_type);
        self
    }

    pub fn with_code_block(mut self, block: CodeBlock) -> Self {
        self.code_blocks.push(block);
        self
    }

    /// Reject sections the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DocsmithError::validation("section title is empty"));
        }
        if !(1..=6).contains(&self.level) {
            return Err(DocsmithError::validation(format!(
                "section '{}' has heading level {} (expected 1..=6)",
                self.title, self.level
            )));
        }
        Ok(())
    }
}

/// Depth-first, document-order view of a section tree.
pub fn flatten_sections(sections: &[Section]) -> Vec<&Section> {
    fn walk<'a>(sections: &'a [Section], out: &mut Vec<&'a Section>) {
        for section in sections {
            out.push(section);
            walk(&section.subsections, out);
        }
    }

    let mut out = Vec::new();
    walk(sections, &mut out);
    out
}

// ---------------------------------------------------------------------------
// ParsedDocument
// ---------------------------------------------------------------------------

/// A numbered step list found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedWorkflow {
    /// Title of the section the steps were found in.
    pub source_section: String,
    pub text: String,
}

/// One markdown file after parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub file_name: String,
    pub title: String,
    /// Top-level sections; nested headings live in `subsections`.
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<DetectedWorkflow>,
    /// SHA-256 of the raw input text.
    pub content_hash: String,
}

impl ParsedDocument {
    pub fn flat_sections(&self) -> Vec<&Section> {
        flatten_sections(&self.sections)
    }
}

/// Hex-encoded SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// QA
// ---------------------------------------------------------------------------

/// Grouping tag for QA pairs in the rendered FAQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaCategory {
    Installation,
    Usage,
    Api,
    Examples,
    Workflow,
    Configuration,
    Troubleshooting,
    General,
    Code,
    Data,
}

impl QaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installation => "installation",
            Self::Usage => "usage",
            Self::Api => "api",
            Self::Examples => "examples",
            Self::Workflow => "workflow",
            Self::Configuration => "configuration",
            Self::Troubleshooting => "troubleshooting",
            Self::General => "general",
            Self::Code => "code",
            Self::Data => "data",
        }
    }

    /// Display label used in FAQ headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Installation => "Installation",
            Self::Usage => "Usage",
            Self::Api => "API",
            Self::Examples => "Examples",
            Self::Workflow => "Workflow",
            Self::Configuration => "Configuration",
            Self::Troubleshooting => "Troubleshooting",
            Self::General => "General",
            Self::Code => "Code",
            Self::Data => "Data",
        }
    }
}

impl From<SectionType> for QaCategory {
    fn from(section_type: SectionType) -> Self {
        match section_type {
            SectionType::Installation => Self::Installation,
            SectionType::Usage => Self::Usage,
            SectionType::Api => Self::Api,
            SectionType::Examples => Self::Examples,
            SectionType::Workflow => Self::Workflow,
            SectionType::Configuration => Self::Configuration,
            SectionType::Troubleshooting => Self::Troubleshooting,
            SectionType::Generic => Self::General,
        }
    }
}

impl fmt::Display for QaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mined question with its extracted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<SectionType>,
    pub source_section: String,
    pub category: QaCategory,
}

impl QaPair {
    /// Comparison key for deduplication: case-folded, trimmed question.
    pub fn normalized_question(&self) -> String {
        self.question.trim().to_lowercase()
    }
}

/// Input sources the QA pipeline can mine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaSource {
    Sections,
    CodeBlocks,
    Tables,
    Workflows,
}

// ---------------------------------------------------------------------------
// RunId / RunManifest
// ---------------------------------------------------------------------------

/// A UUID v7 identifier for one generation run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Per-input entry in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub file_name: String,
    pub title: String,
    pub sha256: String,
    pub section_count: usize,
}

/// Metadata for a single written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// The `manifest.json` written next to the generated files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub id: RunId,
    pub tool_version: String,
    pub created_at: DateTime<Utc>,
    pub qa_style: String,
    pub documents: Vec<DocumentMeta>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactMeta>,
    /// Pair count per QA category after capping.
    #[serde(default)]
    pub qa_counts: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// TocEntry
// ---------------------------------------------------------------------------

/// A heading in the generated document's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    /// GitHub-style fragment, without the leading `#`.
    pub anchor: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn section_type_parses_config_keys() {
        assert_eq!(
            "Installation".parse::<SectionType>().unwrap(),
            SectionType::Installation
        );
        assert_eq!(" api ".parse::<SectionType>().unwrap(), SectionType::Api);
        assert!("overview".parse::<SectionType>().is_err());
    }

    #[test]
    fn section_validation() {
        assert!(Section::new("Install", 2, "").validate().is_ok());
        assert!(Section::new("   ", 2, "text").validate().is_err());
        assert!(Section::new("Deep", 7, "text").validate().is_err());
        assert!(Section::new("Zero", 0, "text").validate().is_err());
    }

    #[test]
    fn flatten_is_depth_first() {
        let mut root = Section::new("Root", 1, "");
        let mut child = Section::new("Child", 2, "");
        child.subsections.push(Section::new("Grandchild", 3, ""));
        root.subsections.push(child);
        root.subsections.push(Section::new("Sibling", 2, ""));

        let roots = [root, Section::new("Second", 1, "")];
        let titles: Vec<&str> = flatten_sections(&roots)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(
            titles,
            ["Root", "Child", "Grandchild", "Sibling", "Second"]
        );
    }

    #[test]
    fn generic_maps_to_general_category() {
        assert_eq!(QaCategory::from(SectionType::Generic), QaCategory::General);
        assert_eq!(QaCategory::from(SectionType::Api).label(), "API");
    }

    #[test]
    fn normalized_question_folds_case() {
        let pair = QaPair {
            question: "  What is Docker?  ".into(),
            answer: "A container runtime.".into(),
            section_type: None,
            source_section: "Intro".into(),
            category: QaCategory::General,
        };
        assert_eq!(pair.normalized_question(), "what is docker?");
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let a = content_hash("# Title\n");
        assert_eq!(a.len(), 64);
        assert_eq!(a, content_hash("# Title\n"));
        assert_ne!(a, content_hash("# Other\n"));
    }

    #[test]
    fn manifest_serialization() {
        let manifest = RunManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: RunId::new(),
            tool_version: "0.1.0".into(),
            created_at: Utc::now(),
            qa_style: "collapsible".into(),
            documents: vec![DocumentMeta {
                file_name: "README.md".into(),
                title: "Demo".into(),
                sha256: content_hash("demo"),
                section_count: 4,
            }],
            artifacts: vec![],
            qa_counts: BTreeMap::from([("installation".to_string(), 3)]),
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        let parsed: RunManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.documents[0].section_count, 4);
        assert_eq!(parsed.qa_counts["installation"], 3);
    }
}
