//! Language-aware inline annotation of code blocks.
//!
//! Each language family has an ordered table of line rules. The first rule
//! matching a line appends `  # <comment>` to it. Lines that already carry a
//! comment, end in a continuation backslash, or have unbalanced quotes are left
//! alone, which keeps annotation idempotent.

use std::sync::LazyLock;

use regex::Regex;

use docsmith_markdown::{LanguageFamily, map_fenced_blocks};
use docsmith_shared::CodeBlock;

struct LineRule {
    pattern: Regex,
    /// Comment text; may reference capture groups (`$1`).
    comment: &'static str,
}

fn compile(rules: &[(&str, &'static str)]) -> Vec<LineRule> {
    rules
        .iter()
        .map(|&(pattern, comment)| LineRule {
            pattern: Regex::new(pattern).expect("valid regex"),
            comment,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

static SCRIPT_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    compile(&[
        (r"^\s*import\s+([\w.]+)", "Import the $1 module"),
        (
            r"^\s*from\s+([\w.]+)\s+import\s+(\w+(?:\s*,\s*\w+)*)",
            "Import $2 from $1",
        ),
        (r"^\s*def\s+(\w+)\s*\(", "Define the ${1} function"),
        (r"^\s*class\s+(\w+)", "Define the ${1} class"),
        (
            r#"os\.environ\[\s*["'](\w+)["']\s*\]\s*="#,
            "Set the $1 environment variable",
        ),
        (r"\.(?:train|fit)\(", "Train the model"),
        (r"\.predict\(", "Run a prediction with the trained model"),
        (r"\.simulate\(", "Run the simulation"),
        (r"^\s*\w+\s*=\s*([A-Z]\w*)\(", "Create a ${1} instance"),
    ])
});

static SHELL_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    compile(&[
        (
            r"^\s*(?:sudo\s+)?pip3?\s+install\s+(?:-r|--requirement)\s+(\S+)",
            "Install the dependencies listed in $1",
        ),
        (r"^\s*(?:sudo\s+)?pip3?\s+install\b", "Install Python packages"),
        (r"^\s*npm\s+(?:install|i|ci)\b", "Install Node.js dependencies"),
        (r"^\s*yarn(?:\s+(?:install|add)\b|\s*$)", "Install Node.js dependencies"),
        (r"^\s*cargo\s+install\b", "Install the Rust binary"),
        (r"^\s*sudo\s+apt(?:-get)?\s+install\b|^\s*apt(?:-get)?\s+install\b", "Install system packages"),
        (r"^\s*brew\s+install\b", "Install with Homebrew"),
        (
            r"^\s*python3?\s+-m\s+venv\s+(\S+)",
            "Create a virtual environment in $1",
        ),
        (
            r"^\s*(?:source|\.)\s+\S*bin/activate\b|\\Scripts\\activate",
            "Activate the virtual environment",
        ),
        (r"^\s*docker\s+build\b", "Build the Docker image"),
        (r"^\s*docker(?:-compose|\s+compose)\s+up\b", "Start the services"),
        (r"^\s*docker(?:-compose|\s+compose)\s+down\b", "Stop the services"),
        (r"^\s*docker(?:-compose|\s+compose)\s+logs\b", "Follow the service logs"),
        (r"^\s*docker\s+run\b", "Run the container"),
        (r"^\s*docker\s+exec\b", "Run a command inside a running container"),
        (r"^\s*(?:export|set)\s+(\w+)=", "Set the $1 environment variable"),
        (r"^\s*([A-Z_][A-Z0-9_]*)=\S", "Set the $1 environment variable"),
        (r"^\s*python3?\s+(\S+\.py)\b", "Run $1"),
        (r"^\s*python3?\s+-m\s+(\S+)", "Run the $1 module"),
        (r"^\s*git\s+clone\b", "Clone the repository"),
        (r"^\s*cd\s+(\S+)", "Change into $1"),
        (r"^\s*curl\b", "Send an HTTP request"),
        (r"^\s*kubectl\s+apply\b", "Apply the Kubernetes manifests"),
    ])
});

static STRUCTURED_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    compile(&[
        (r"^\s*image:", "Container image to run"),
        (r"^\s*ports:", "Published ports"),
        (r"^\s*volumes:", "Mounted volumes"),
        (r"^\s*environment:", "Environment variables for the service"),
        (r"^\s*-?\s*([A-Z_][A-Z0-9_]*)\s*[=:]", "Set $1"),
    ])
});

fn rules_for(family: LanguageFamily) -> &'static [LineRule] {
    match family {
        LanguageFamily::Script => SCRIPT_RULES.as_slice(),
        LanguageFamily::Shell | LanguageFamily::Batch => SHELL_RULES.as_slice(),
        LanguageFamily::StructuredData => STRUCTURED_RULES.as_slice(),
        LanguageFamily::Json | LanguageFamily::Unknown => &[],
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// The block's content with explanatory comments appended to recognized lines.
///
/// Line order and line text are preserved; only trailing comments are added.
/// Families without a trailing comment syntax (batch, JSON) pass through.
pub fn enhance_code_block(block: &CodeBlock) -> String {
    let family = LanguageFamily::of(block);
    let (Some(marker), rules) = (family.comment_marker(), rules_for(family)) else {
        return block.content.clone();
    };

    block
        .content
        .split('\n')
        .map(|line| match annotate_line(line, marker, rules) {
            Some(annotated) => annotated,
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Annotate the body of every fenced block in a markdown string.
pub fn annotate_fences(markdown: &str) -> String {
    map_fenced_blocks(markdown, enhance_code_block)
}

/// One sentence summarizing what the recognized lines of a block do, or `None`
/// when no rule matches.
pub fn describe_code_block(block: &CodeBlock) -> Option<String> {
    let rules = rules_for(LanguageFamily::of(block));

    let mut steps: Vec<String> = Vec::new();
    for line in block.content.lines() {
        if let Some(comment) = comment_for(line, rules) {
            let step = lowercase_first(&comment);
            if !steps.contains(&step) {
                steps.push(step);
            }
        }
    }

    match steps.as_slice() {
        [] => None,
        [only] => Some(format!("This code will {only}.")),
        [first, second] => Some(format!("This code will {first} and {second}.")),
        [init @ .., last] => Some(format!("This code will {}, and {last}.", init.join(", "))),
    }
}

fn annotate_line(line: &str, marker: &str, rules: &[LineRule]) -> Option<String> {
    if line.trim().is_empty() || line.trim_end().ends_with('\\') {
        return None;
    }
    if comment_state(line, marker) != Some(false) {
        return None;
    }
    let comment = comment_for(line, rules)?;
    Some(format!("{}  {marker} {comment}", line.trim_end()))
}

fn comment_for(line: &str, rules: &[LineRule]) -> Option<String> {
    rules.iter().find_map(|rule| {
        rule.pattern.captures(line).map(|caps| {
            let mut comment = String::new();
            caps.expand(rule.comment, &mut comment);
            comment
        })
    })
}

/// `Some(true)` if `line` has a comment outside quotes, `Some(false)` if it has
/// none and its quotes balance, `None` if a quote is left open.
///
/// A marker only counts at line start or after whitespace, so `${#var}` and
/// URL fragments are not comments.
fn comment_state(line: &str, marker: &str) -> Option<bool> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev_is_space = true;

    for (idx, c) in line.char_indices() {
        match quote {
            Some(open) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == open {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if prev_is_space && line[idx..].starts_with(marker) {
                    return Some(true);
                }
            }
        }
        prev_is_space = c.is_whitespace();
    }

    quote.is_none().then_some(false)
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
