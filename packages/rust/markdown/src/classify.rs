//! Ordered classification rules.
//!
//! Section types come from heading text, code languages from fence hints or,
//! when a fence has none, from the block body. Both are tables of
//! `(predicate, result)` evaluated top to bottom; the first match wins.

use std::sync::LazyLock;

use regex::Regex;

use docsmith_shared::{CodeBlock, SectionType};

// ---------------------------------------------------------------------------
// Section type from title
// ---------------------------------------------------------------------------

/// Keyword groups, most specific intent first.
const TITLE_RULES: &[(&[&str], SectionType)] = &[
    (
        &[
            "troubleshoot",
            "faq",
            "common issue",
            "known issue",
            "problem",
            "error",
            "debug",
            "getting help",
        ],
        SectionType::Troubleshooting,
    ),
    (
        &[
            "install",
            "setup",
            "set up",
            "prerequisite",
            "requirement",
            "quick start",
            "quickstart",
            "getting started",
        ],
        SectionType::Installation,
    ),
    (
        &["config", "setting", "environment variable", "option"],
        SectionType::Configuration,
    ),
    (
        &["api", "endpoint", "reference", "sdk"],
        SectionType::Api,
    ),
    (
        &["example", "sample", "demo", "tutorial"],
        SectionType::Examples,
    ),
    (
        &["usage", "how to use", "running", "run", "execution"],
        SectionType::Usage,
    ),
    (
        &["workflow", "pipeline", "process", "steps", "deployment", "development"],
        SectionType::Workflow,
    ),
];

static TITLE_MATCHERS: LazyLock<Vec<(Regex, SectionType)>> = LazyLock::new(|| {
    TITLE_RULES
        .iter()
        .map(|(keywords, section_type)| {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{alternation})")).expect("title rule regex");
            (re, *section_type)
        })
        .collect()
});

/// Classify a heading by keyword. `None` when no rule matches.
pub fn classify_title(title: &str) -> Option<SectionType> {
    TITLE_MATCHERS
        .iter()
        .find(|(re, _)| re.is_match(title))
        .map(|(_, section_type)| *section_type)
}

// ---------------------------------------------------------------------------
// Language families
// ---------------------------------------------------------------------------

/// Groups of languages that share annotation rules and comment syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    Script,
    Shell,
    /// Windows `cmd`/batch. Commands like `set` take the rest of the line,
    /// so there is no trailing comment syntax.
    Batch,
    StructuredData,
    /// Data formats with no comment syntax.
    Json,
    Unknown,
}

impl LanguageFamily {
    /// Family of a declared fence language.
    pub fn from_language(language: &str) -> Self {
        match language.to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Self::Script,
            "bash" | "sh" | "shell" | "zsh" | "console" | "shell-session" | "powershell"
            | "ps1" => Self::Shell,
            "cmd" | "bat" | "batch" => Self::Batch,
            "yaml" | "yml" | "toml" | "ini" | "env" | "dotenv" | "dockerfile" => {
                Self::StructuredData
            }
            "json" | "jsonc" => Self::Json,
            _ => Self::Unknown,
        }
    }

    /// Family of a block: its declared language, or a detected one when undeclared.
    pub fn of(block: &CodeBlock) -> Self {
        match block.language.as_deref() {
            Some(language) => Self::from_language(language),
            None => detect_language(&block.content)
                .map(Self::from_language)
                .unwrap_or(Self::Unknown),
        }
    }

    /// Line comment marker, if the family has one.
    pub fn comment_marker(self) -> Option<&'static str> {
        match self {
            Self::Script | Self::Shell | Self::StructuredData => Some("#"),
            Self::Batch | Self::Json | Self::Unknown => None,
        }
    }
}

/// Whether a block holds shell commands, declared or detected.
pub fn is_shell_block(block: &CodeBlock) -> bool {
    matches!(
        LanguageFamily::of(block),
        LanguageFamily::Shell | LanguageFamily::Batch
    )
}

/// The fence language to use when reproducing `block`.
pub fn effective_language(block: &CodeBlock) -> &str {
    block
        .language
        .as_deref()
        .or_else(|| detect_language(&block.content))
        .unwrap_or("text")
}

// ---------------------------------------------------------------------------
// Language detection for undeclared blocks
// ---------------------------------------------------------------------------

/// First tokens that mark a line as a shell command.
const SHELL_HEADS: &[&str] = &[
    "docker", "docker-compose", "pip", "pip3", "python", "python3", "npm", "npx", "yarn",
    "pnpm", "cargo", "git", "cd", "export", "curl", "wget", "kubectl", "helm", "make", "apt",
    "apt-get", "brew", "sudo", "source", "mkdir", "ls", "cp", "mv", "chmod", "bash", "sh",
    "go", "uv", "poetry", "conda",
];

static YAML_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.-]*:(\s|$)").expect("yaml regex"));

static PYTHON_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:import\s+\w|from\s+[\w.]+\s+import\s|def\s+\w+\(|class\s+\w+)")
        .expect("python regex")
});

fn is_prompt(line: &str) -> bool {
    line.starts_with("$ ")
}

fn has_shell_head(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|head| SHELL_HEADS.contains(&head))
}

fn is_python(line: &str) -> bool {
    PYTHON_LINE_RE.is_match(line)
}

fn is_json(line: &str) -> bool {
    line.starts_with('{') || line.starts_with('[')
}

fn is_yaml(line: &str) -> bool {
    YAML_LINE_RE.is_match(line)
}

const LANGUAGE_RULES: &[(fn(&str) -> bool, &str)] = &[
    (is_prompt, "bash"),
    (has_shell_head, "bash"),
    (is_python, "python"),
    (is_json, "json"),
    (is_yaml, "yaml"),
];

/// Guess the language of an undeclared block from its first meaningful line.
pub fn detect_language(content: &str) -> Option<&'static str> {
    let first = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))?;

    LANGUAGE_RULES
        .iter()
        .find(|(predicate, _)| predicate(first))
        .map(|(_, language)| *language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_rules_in_priority_order() {
        assert_eq!(classify_title("Installation"), Some(SectionType::Installation));
        assert_eq!(classify_title("2. Environment Setup"), Some(SectionType::Installation));
        assert_eq!(
            classify_title("Troubleshooting Installation"),
            Some(SectionType::Troubleshooting)
        );
        assert_eq!(classify_title("API Reference"), Some(SectionType::Api));
        assert_eq!(classify_title("Configuration"), Some(SectionType::Configuration));
        assert_eq!(classify_title("Usage Examples"), Some(SectionType::Examples));
        assert_eq!(classify_title("How to Use"), Some(SectionType::Usage));
        assert_eq!(classify_title("Development Workflow"), Some(SectionType::Workflow));
    }

    #[test]
    fn title_rules_match_word_starts() {
        assert_eq!(classify_title("Rapid prototyping"), None);
        assert_eq!(classify_title("Overview"), None);
    }

    #[test]
    fn language_families() {
        assert_eq!(LanguageFamily::from_language("Python"), LanguageFamily::Script);
        assert_eq!(LanguageFamily::from_language("cmd"), LanguageFamily::Batch);
        assert_eq!(LanguageFamily::from_language("ps1"), LanguageFamily::Shell);
        assert_eq!(LanguageFamily::Batch.comment_marker(), None);
        assert_eq!(LanguageFamily::from_language("yml"), LanguageFamily::StructuredData);
        assert_eq!(LanguageFamily::from_language("json"), LanguageFamily::Json);
        assert_eq!(LanguageFamily::from_language("rust"), LanguageFamily::Unknown);
        assert_eq!(LanguageFamily::Json.comment_marker(), None);
    }

    #[test]
    fn detects_undeclared_languages() {
        assert_eq!(detect_language("$ ls -la"), Some("bash"));
        assert_eq!(detect_language("# build\ndocker build ."), Some("bash"));
        assert_eq!(detect_language("import numpy as np"), Some("python"));
        assert_eq!(detect_language("{\"ok\": true}"), Some("json"));
        assert_eq!(detect_language("services:\n  web:"), Some("yaml"));
        assert_eq!(detect_language("SELECT * FROM t;"), None);
        assert_eq!(detect_language(""), None);
    }

    #[test]
    fn shell_block_detection() {
        assert!(is_shell_block(&CodeBlock::new("anything", Some("sh"))));
        assert!(is_shell_block(&CodeBlock::new("set PORT=8080", Some("cmd"))));
        assert!(is_shell_block(&CodeBlock::new("pip install requests", None)));
        assert!(!is_shell_block(&CodeBlock::new("pip install requests", Some("python"))));
    }
}
