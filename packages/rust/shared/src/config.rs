//! Application configuration for docsmith.
//!
//! User config lives at `~/.docsmith/docsmith.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults.
//!
//! Every engine component receives the structs it needs by reference; nothing
//! here is global.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DocsmithError, Result};
use crate::types::{QaSource, SectionType};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docsmith.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docsmith";

// ---------------------------------------------------------------------------
// Config structs (matching docsmith.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Output file and FAQ rendering settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// QA mining limits and sources.
    #[serde(default)]
    pub qa: QaConfig,

    /// Per-section-type enhancement toggles.
    #[serde(default)]
    pub enhancement: EnhancementConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory (or single file) to read markdown from.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Directory the generated files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum documents parsed or enhanced at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Emit a table of contents at the top of the generated document.
    #[serde(default = "default_true")]
    pub include_toc: bool,

    /// Separate documents with a horizontal rule.
    #[serde(default = "default_true")]
    pub module_separators: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            concurrency: default_concurrency(),
            include_toc: true,
            module_separators: true,
        }
    }
}

fn default_source_dir() -> String {
    ".".into()
}
fn default_output_dir() -> String {
    "docsmith-output".into()
}
fn default_concurrency() -> usize {
    4
}
fn default_true() -> bool {
    true
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// FAQ rendering style: `simple`, `collapsible`, or `numbered`.
    #[serde(default = "default_qa_style")]
    pub qa_style: String,

    /// File name of the enhanced document inside the output directory.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Also write the QA pairs as `qa_pairs.json`.
    #[serde(default = "default_true")]
    pub write_qa_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            qa_style: default_qa_style(),
            output_file: default_output_file(),
            write_qa_json: true,
        }
    }
}

fn default_qa_style() -> String {
    "collapsible".into()
}
fn default_output_file() -> String {
    "enhanced_readme.md".into()
}

// ---------------------------------------------------------------------------
// QaStyle
// ---------------------------------------------------------------------------

/// How the FAQ section is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaStyle {
    #[default]
    Simple,
    Collapsible,
    Numbered,
}

impl QaStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Collapsible => "collapsible",
            Self::Numbered => "numbered",
        }
    }

    /// Resolve a style key, falling back to [`QaStyle::Simple`] for anything unrecognized.
    pub fn from_key(key: &str) -> Self {
        key.parse().unwrap_or_default()
    }
}

impl fmt::Display for QaStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QaStyle {
    type Err = DocsmithError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "collapsible" => Ok(Self::Collapsible),
            "numbered" => Ok(Self::Numbered),
            other => Err(DocsmithError::config(format!(
                "unknown qa_style '{other}': expected simple, collapsible, or numbered"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// QaConfig
// ---------------------------------------------------------------------------

/// `[qa]` section: limits and sources for QA mining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaConfig {
    /// Advisory lower bound per category; reported, never padded.
    #[serde(default = "default_min_per_section")]
    pub min_per_section: usize,

    /// Hard cap per category, applied after deduplication.
    #[serde(default = "default_max_per_section")]
    pub max_per_section: usize,

    #[serde(default = "default_enabled_sources")]
    pub enabled_sources: Vec<QaSource>,

    /// Section types mined by the section and code-block sources.
    #[serde(default = "default_enabled_section_types")]
    pub enabled_section_types: Vec<SectionType>,

    /// Concepts turned into questions per section.
    #[serde(default = "default_max_terms")]
    pub max_concepts: usize,

    /// Actions turned into questions per section.
    #[serde(default = "default_max_terms")]
    pub max_actions: usize,

    /// Commands turned into questions per section.
    #[serde(default = "default_max_commands")]
    pub max_commands: usize,

    /// Tables mined per document.
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,

    /// Workflows mined per document.
    #[serde(default = "default_max_workflows")]
    pub max_workflows: usize,

    /// Project-specific acronyms recognized as concepts in addition to the built-in list.
    #[serde(default)]
    pub extra_acronyms: Vec<String>,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            min_per_section: default_min_per_section(),
            max_per_section: default_max_per_section(),
            enabled_sources: default_enabled_sources(),
            enabled_section_types: default_enabled_section_types(),
            max_concepts: default_max_terms(),
            max_actions: default_max_terms(),
            max_commands: default_max_commands(),
            max_tables: default_max_tables(),
            max_workflows: default_max_workflows(),
            extra_acronyms: Vec::new(),
        }
    }
}

impl QaConfig {
    pub fn is_enabled(&self, source: QaSource) -> bool {
        self.enabled_sources.contains(&source)
    }

    pub fn mines_section_type(&self, section_type: SectionType) -> bool {
        self.enabled_section_types.contains(&section_type)
    }
}

fn default_min_per_section() -> usize {
    3
}
fn default_max_per_section() -> usize {
    10
}
fn default_enabled_sources() -> Vec<QaSource> {
    vec![
        QaSource::Sections,
        QaSource::CodeBlocks,
        QaSource::Tables,
        QaSource::Workflows,
    ]
}
fn default_enabled_section_types() -> Vec<SectionType> {
    SectionType::ALL.to_vec()
}
fn default_max_terms() -> usize {
    5
}
fn default_max_commands() -> usize {
    3
}
fn default_max_tables() -> usize {
    3
}
fn default_max_workflows() -> usize {
    2
}

// ---------------------------------------------------------------------------
// EnhancementConfig
// ---------------------------------------------------------------------------

/// Named toggles for one section type.
///
/// Fields omitted from a TOML entry take the conservative value: composers
/// off, code-block annotation on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementToggles {
    // installation
    pub add_quick_start: bool,
    pub add_detailed_steps: bool,
    pub add_platform_specific: bool,
    pub add_verification: bool,
    pub add_common_issues: bool,
    // usage
    pub add_basic_example: bool,
    pub add_advanced_example: bool,
    pub add_use_cases: bool,
    pub add_best_practices: bool,
    // api
    pub add_request_examples: bool,
    pub add_response_examples: bool,
    pub add_error_handling: bool,
    // examples
    pub add_variations: bool,
    pub add_output_examples: bool,
    // workflow
    pub add_step_by_step: bool,
    pub add_edge_cases: bool,
    // configuration
    pub add_all_options: bool,
    // troubleshooting
    pub add_solutions: bool,
    pub add_debugging_steps: bool,

    /// Annotate code blocks with explanatory comments.
    pub enhance_code_blocks: bool,
    /// Append a synthesized workflow when one can be found.
    pub add_workflow: bool,
    /// Cap on steps derived from commands.
    pub max_workflow_steps: usize,
}

impl EnhancementToggles {
    /// Everything off except code-block annotation.
    pub fn conservative() -> Self {
        Self {
            add_quick_start: false,
            add_detailed_steps: false,
            add_platform_specific: false,
            add_verification: false,
            add_common_issues: false,
            add_basic_example: false,
            add_advanced_example: false,
            add_use_cases: false,
            add_best_practices: false,
            add_request_examples: false,
            add_response_examples: false,
            add_error_handling: false,
            add_variations: false,
            add_output_examples: false,
            add_step_by_step: false,
            add_edge_cases: false,
            add_all_options: false,
            add_solutions: false,
            add_debugging_steps: false,
            enhance_code_blocks: true,
            add_workflow: false,
            max_workflow_steps: 5,
        }
    }

    /// Composer toggles on for `section_type`, as shipped in the default config.
    pub fn full(section_type: SectionType) -> Self {
        let base = Self::conservative();
        match section_type {
            SectionType::Installation => Self {
                add_quick_start: true,
                add_detailed_steps: true,
                add_platform_specific: true,
                add_verification: true,
                add_common_issues: true,
                add_workflow: true,
                ..base
            },
            SectionType::Usage => Self {
                add_basic_example: true,
                add_advanced_example: true,
                add_use_cases: true,
                add_best_practices: true,
                add_workflow: true,
                ..base
            },
            SectionType::Api => Self {
                add_request_examples: true,
                add_response_examples: true,
                add_error_handling: true,
                ..base
            },
            SectionType::Examples => Self {
                add_variations: true,
                add_output_examples: true,
                ..base
            },
            SectionType::Workflow => Self {
                add_step_by_step: true,
                add_edge_cases: true,
                add_workflow: true,
                ..base
            },
            SectionType::Configuration => Self {
                add_all_options: true,
                ..base
            },
            SectionType::Troubleshooting => Self {
                add_solutions: true,
                add_debugging_steps: true,
                ..base
            },
            SectionType::Generic => base,
        }
    }
}

impl Default for EnhancementToggles {
    fn default() -> Self {
        Self::conservative()
    }
}

/// `[enhancement.<section_type>]` tables, keyed by section type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnhancementConfig {
    pub sections: BTreeMap<String, EnhancementToggles>,
}

impl EnhancementConfig {
    /// A config with no entries: every type resolves to the conservative toggles.
    pub fn empty() -> Self {
        Self {
            sections: BTreeMap::new(),
        }
    }

    /// Toggles for `section_type`, or the conservative set when it has no entry.
    pub fn toggles_for(&self, section_type: SectionType) -> EnhancementToggles {
        self.sections
            .get(section_type.as_str())
            .cloned()
            .unwrap_or_else(EnhancementToggles::conservative)
    }

    pub fn with_entry(mut self, section_type: SectionType, toggles: EnhancementToggles) -> Self {
        self.sections
            .insert(section_type.as_str().to_string(), toggles);
        self
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        SectionType::ALL
            .into_iter()
            .filter(|t| *t != SectionType::Generic)
            .fold(Self::empty(), |config, t| {
                config.with_entry(t, EnhancementToggles::full(t))
            })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Check the loaded values for combinations the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.qa.max_per_section == 0 {
            return Err(DocsmithError::config("qa.max_per_section must be at least 1"));
        }
        if self.qa.min_per_section > self.qa.max_per_section {
            return Err(DocsmithError::config(format!(
                "qa.min_per_section ({}) exceeds qa.max_per_section ({})",
                self.qa.min_per_section, self.qa.max_per_section
            )));
        }
        if self.defaults.concurrency == 0 {
            return Err(DocsmithError::config("defaults.concurrency must be at least 1"));
        }
        self.output.qa_style.parse::<QaStyle>()?;

        for (key, toggles) in &self.enhancement.sections {
            key.parse::<SectionType>()
                .map_err(|_| DocsmithError::config(format!("unknown enhancement section '{key}'")))?;
            if toggles.max_workflow_steps == 0 {
                return Err(DocsmithError::config(format!(
                    "enhancement.{key}.max_workflow_steps must be at least 1"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docsmith/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocsmithError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docsmith/docsmith.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocsmithError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocsmithError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocsmithError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocsmithError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocsmithError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
