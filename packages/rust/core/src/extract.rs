//! Lexical extractors: concepts, actions, and commands.
//!
//! All three are pure, never fail, and return ordered sets: each term appears
//! once, in first-seen order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use docsmith_markdown::{fenced_blocks, is_shell_block, strip_fenced_blocks};
use docsmith_shared::CodeBlock;

/// Acronyms recognized as concepts wherever they appear as whole words.
pub const DEFAULT_ACRONYMS: &[&str] = &[
    "AI", "API", "CD", "CI", "CLI", "CPU", "CSV", "DNS", "GPU", "GRPC", "HTTP", "HTTPS", "JSON",
    "JWT", "LLM", "ML", "RADP", "RAG", "REST", "RF", "SDK", "SQL", "SSH", "TLS", "TOML", "UE",
    "UI", "URL", "UUID", "YAML",
];

/// Words never returned as concepts on their own.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "for", "from", "if", "in", "is",
    "it", "no", "none", "not", "null", "of", "on", "or", "the", "this", "that", "to", "true",
    "false", "use", "using", "will", "with", "yes", "you", "your",
];

/// Sentence-initial verbs that mark an instruction.
const ACTION_VERBS: &[&str] = &[
    "activate", "add", "build", "call", "check", "clone", "configure", "create", "deploy",
    "disable", "download", "edit", "enable", "execute", "export", "initialize", "install",
    "launch", "navigate", "open", "pull", "push", "remove", "run", "send", "set", "start",
    "stop", "test", "train", "update", "upgrade", "use", "verify",
];

/// Words that end an action phrase once it has a verb and an object.
const PHRASE_BREAKS: &[&str] = &[
    "with", "using", "once", "before", "after", "when", "if", "by", "from", "so", "because",
    "which", "that", "is", "are", "was", "will", "can", "should", "then", "and", "or", "via",
];

const MAX_ACTION_WORDS: usize = 5;
const MAX_CONCEPT_LEN: usize = 60;

static BACKTICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]+)""#).expect("valid regex"));

static CAPITALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+\b").expect("valid regex")
});

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z][A-Za-z0-9]*\b").expect("valid regex"));

static HOW_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhow\s+to\s+([a-z][^.,;:!?()\n]*)").expect("valid regex")
});

static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Sentences
// ---------------------------------------------------------------------------

/// Split prose into sentences on `.`, `!`, `?` followed by whitespace or end.
///
/// Fenced code, headings, and tables are skipped. List items and blank-line
/// separated paragraphs never share a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for paragraph in paragraphs(&strip_fenced_blocks(text)) {
        let chars: Vec<char> = paragraph.chars().collect();
        let mut current = String::new();

        for (i, c) in chars.iter().enumerate() {
            current.push(*c);
            let at_boundary = chars.get(i + 1).is_none_or(|next| next.is_whitespace());
            if matches!(c, '.' | '!' | '?') && at_boundary {
                push_sentence(&mut sentences, &mut current);
            }
        }
        push_sentence(&mut sentences, &mut current);
    }

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
    current.clear();
}

fn paragraphs(prose: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in prose.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('|') {
            flush(&mut current, &mut out);
            continue;
        }
        if let Some(marker) = LIST_MARKER_RE.find(line) {
            flush(&mut current, &mut out);
            current.push(line[marker.end()..].trim());
            continue;
        }
        current.push(trimmed.trim_start_matches('>').trim());
    }
    flush(&mut current, &mut out);

    out
}

fn flush(current: &mut Vec<&str>, out: &mut Vec<String>) {
    if !current.is_empty() {
        out.push(current.join(" "));
        current.clear();
    }
}

// ---------------------------------------------------------------------------
// Concepts
// ---------------------------------------------------------------------------

/// Concepts in `text` using the built-in acronym list.
pub fn extract_concepts(text: &str) -> Vec<String> {
    extract_concepts_with(text, &[])
}

/// Concepts in `text`: capitalized multi-word spans, backticked spans, quoted
/// spans, and known acronyms (built-in plus `extra_acronyms`).
pub fn extract_concepts_with(text: &str, extra_acronyms: &[String]) -> Vec<String> {
    let prose = strip_fenced_blocks(text);
    let mut found: Vec<(usize, String)> = Vec::new();

    for re in [&*BACKTICK_RE, &*QUOTED_RE] {
        for caps in re.captures_iter(&prose) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), clean_span(m.as_str())));
            }
        }
    }

    for m in CAPITALIZED_RE.find_iter(&prose) {
        if let Some(span) = drop_leading_article(m.as_str()) {
            found.push((m.start(), span));
        }
    }

    for m in WORD_RE.find_iter(&prose) {
        let word = m.as_str();
        if DEFAULT_ACRONYMS.contains(&word) || extra_acronyms.iter().any(|a| a == word) {
            found.push((m.start(), word.to_string()));
        }
    }

    // stable: spans starting at the same offset keep source priority
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, term)| term)
        .filter(|term| is_concept(term))
        .filter(|term| seen.insert(term.to_lowercase()))
        .collect()
}

fn clean_span(span: &str) -> String {
    span.trim()
        .trim_end_matches(['.', ',', ':', ';'])
        .trim()
        .to_string()
}

/// `"The Digital Twin"` → `"Digital Twin"`; spans left with one word are dropped.
fn drop_leading_article(span: &str) -> Option<String> {
    let words: Vec<&str> = span.split_whitespace().collect();
    let skip = match words.first() {
        Some(first) if ["The", "A", "An", "This", "That"].contains(first) => 1,
        _ => 0,
    };
    let rest = &words[skip..];
    (rest.len() >= 2).then(|| rest.join(" "))
}

fn is_concept(term: &str) -> bool {
    let len = term.chars().count();
    if !(2..=MAX_CONCEPT_LEN).contains(&len) {
        return false;
    }
    if !term.chars().any(char::is_alphabetic) {
        return false;
    }
    !STOP_WORDS.contains(&term.to_lowercase().as_str())
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Instruction phrases in `text`, lowercased: sentences opening with a known
/// verb, and `how to X` phrases.
pub fn extract_actions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut actions = Vec::new();

    for sentence in split_sentences(text) {
        let mut candidates = Vec::new();

        let first = sentence
            .split_whitespace()
            .next()
            .map(|w| bare_word(w).to_lowercase());
        if first.is_some_and(|w| ACTION_VERBS.contains(&w.as_str())) {
            candidates.push(action_phrase(&sentence));
        }
        for caps in HOW_TO_RE.captures_iter(&sentence) {
            if let Some(m) = caps.get(1) {
                candidates.push(action_phrase(m.as_str()));
            }
        }

        for phrase in candidates {
            if phrase.len() > 2 && seen.insert(phrase.clone()) {
                actions.push(phrase);
            }
        }
    }

    actions
}

/// Verb plus object, cut at punctuation, a clause word, or the word limit.
fn action_phrase(text: &str) -> String {
    let mut words = Vec::new();

    for raw in text.split_whitespace() {
        let word = bare_word(raw).to_lowercase();
        if word.is_empty() {
            break;
        }
        if words.len() >= 2 && PHRASE_BREAKS.contains(&word.as_str()) {
            break;
        }
        words.push(word);
        let ends_clause = raw
            .trim_end_matches(['*', '_', '`'])
            .ends_with(['.', ',', ';', ':', '!', '?', ')']);
        if ends_clause || words.len() == MAX_ACTION_WORDS {
            break;
        }
    }

    words.join(" ")
}

/// Strip markdown emphasis and surrounding punctuation from a word.
fn bare_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '-' && c != '.')
        .trim_end_matches('.')
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A command line together with the fence language it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub line: String,
    pub language: Option<String>,
}

impl Command {
    /// First whitespace-delimited token, skipping `sudo`.
    pub fn head(&self) -> &str {
        command_head(&self.line)
    }
}

/// First whitespace-delimited token of `command`, skipping `sudo`.
pub fn command_head(command: &str) -> &str {
    let mut tokens = command.split_whitespace();
    match tokens.next() {
        Some("sudo") => tokens.next().unwrap_or("sudo"),
        Some(head) => head,
        None => "",
    }
}

/// Shell command lines from fenced blocks in `text` and from `code_blocks`.
pub fn extract_commands(text: &str, code_blocks: &[CodeBlock]) -> Vec<String> {
    extract_command_lines(text, code_blocks)
        .into_iter()
        .map(|c| c.line)
        .collect()
}

/// Like [`extract_commands`], keeping each command's fence language.
pub fn extract_command_lines(text: &str, code_blocks: &[CodeBlock]) -> Vec<Command> {
    let mut blocks = fenced_blocks(text);
    for block in code_blocks {
        if !blocks.contains(block) {
            blocks.push(block.clone());
        }
    }

    let mut seen = HashSet::new();
    let mut commands = Vec::new();

    for block in blocks.iter().filter(|b| is_shell_block(b)) {
        for line in block.content.lines() {
            let line = line.trim();
            let line = line.strip_prefix("$ ").unwrap_or(line).trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if seen.insert(line.to_string()) {
                commands.push(Command {
                    line: line.to_string(),
                    language: block.language.clone(),
                });
            }
        }
    }

    commands
}
