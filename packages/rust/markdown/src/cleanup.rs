//! Pre-parse normalization pipeline for markdown input.
//!
//! Each pass is a function `&str -> String` applied in sequence.
//! Passes that touch whitespace skip fenced code so block bodies reach the
//! parser as written.

use std::sync::LazyLock;

use regex::Regex;

use crate::fences::is_fence_line;

/// Run the full normalization pipeline on raw markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = normalize_line_endings(md);

    result = normalize_whitespace(&result);
    result = fix_code_block_languages(&result);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

/// Convert CRLF and lone CR to LF.
fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Trailing whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on prose lines; fenced code is left alone.
fn normalize_whitespace(md: &str) -> String {
    let mut in_fence = false;

    md.split('\n')
        .map(|line| {
            if is_fence_line(line) {
                in_fence = !in_fence;
                return line.trim_end();
            }
            if in_fence { line } else { line.trim_end() }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Fence language hints
// ---------------------------------------------------------------------------

/// Strip class-like prefixes (`language-`, `lang-`, `highlight-`) from fence
/// hints and lowercase them, so `Bash` and `language-bash` both become `bash`.
fn fix_code_block_languages(md: &str) -> String {
    static FENCE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^(\s*(?:```|~~~))(?:language-|lang-|highlight-)?([A-Za-z0-9_+#.-]+)")
            .expect("valid regex")
    });

    FENCE_HINT_RE
        .replace_all(md, |caps: &regex::Captures| {
            format!("{}{}", &caps[1], caps[2].to_ascii_lowercase())
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ blank prose lines into exactly 2.
fn clean_blank_lines(md: &str) -> String {
    let mut in_fence = false;
    let mut blank_run = 0;

    md.split('\n')
        .filter(|line| {
            if is_fence_line(line) {
                in_fence = !in_fence;
            }
            if in_fence || !line.is_empty() {
                blank_run = 0;
                return true;
            }
            blank_run += 1;
            blank_run <= 2
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Trailing newline
// ---------------------------------------------------------------------------

/// Ensure the text ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
