//! Fenced code block scanning over raw markdown text.
//!
//! Used by the parser to attach [`CodeBlock`]s to sections and by the
//! enrichment engine to rewrite block bodies in place.

use std::sync::LazyLock;

use regex::Regex;

use docsmith_shared::CodeBlock;

/// Matches an opening fence and its optional language hint.
static FENCE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:```|~~~)\s*([A-Za-z0-9_+#.-]*)").expect("fence regex")
});

/// Whether `line` opens or closes a fenced block.
pub fn is_fence_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// A piece of markdown text: either a prose line or a whole fenced block.
#[derive(Debug)]
enum Segment<'a> {
    Prose(&'a str),
    Fence {
        open: &'a str,
        language: Option<String>,
        body: Vec<&'a str>,
        close: Option<&'a str>,
    },
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut lines = text.split('\n');

    while let Some(line) = lines.next() {
        if !is_fence_line(line) {
            out.push(Segment::Prose(line));
            continue;
        }

        let language = FENCE_OPEN_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
            .filter(|lang| !lang.is_empty());

        let mut body = Vec::new();
        let mut close = None;
        for inner in lines.by_ref() {
            if is_fence_line(inner) {
                close = Some(inner);
                break;
            }
            body.push(inner);
        }

        out.push(Segment::Fence {
            open: line,
            language,
            body,
            close,
        });
    }

    out
}

/// All non-empty fenced blocks in `text`, in document order.
pub fn fenced_blocks(text: &str) -> Vec<CodeBlock> {
    segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Fence { language, body, .. } if !body.is_empty() => Some(CodeBlock {
                content: body.join("\n"),
                language,
            }),
            _ => None,
        })
        .filter(|block| !block.content.trim().is_empty())
        .collect()
}

/// Rewrite the body of every non-empty fenced block with `f`, leaving fence
/// lines and prose untouched.
pub fn map_fenced_blocks(text: &str, mut f: impl FnMut(&CodeBlock) -> String) -> String {
    let mut lines: Vec<String> = Vec::new();

    for segment in segments(text) {
        match segment {
            Segment::Prose(line) => lines.push(line.to_string()),
            Segment::Fence {
                open,
                language,
                body,
                close,
            } => {
                lines.push(open.to_string());
                if !body.is_empty() {
                    let block = CodeBlock {
                        content: body.join("\n"),
                        language,
                    };
                    if block.content.trim().is_empty() {
                        lines.push(block.content);
                    } else {
                        lines.push(f(&block));
                    }
                }
                if let Some(close) = close {
                    lines.push(close.to_string());
                }
            }
        }
    }

    lines.join("\n")
}

/// The prose of `text` with every fenced block removed.
pub fn strip_fenced_blocks(text: &str) -> String {
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Prose(line) => line,
            Segment::Fence { .. } => "",
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Intro text.\n\n```bash\ndocker build -t radp radp\n```\n\nMore.\n\n```\nplain\n```\n";

    #[test]
    fn finds_blocks_in_order() {
        let blocks = fenced_blocks(SAMPLE);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language.as_deref(), Some("bash"));
        assert_eq!(blocks[0].content, "docker build -t radp radp");
        assert_eq!(blocks[1].language, None);
    }

    #[test]
    fn empty_blocks_are_skipped() {
        assert!(fenced_blocks("```bash\n```\n").is_empty());
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let blocks = fenced_blocks("```python\nimport os\nprint(1)");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "import os\nprint(1)");
    }

    #[test]
    fn identity_map_preserves_text() {
        let out = map_fenced_blocks(SAMPLE, |block| block.content.clone());
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn map_rewrites_bodies_only() {
        let out = map_fenced_blocks(SAMPLE, |block| block.content.to_uppercase());
        assert!(out.contains("```bash\nDOCKER BUILD -T RADP RADP\n```"));
        assert!(out.contains("Intro text."));
        assert!(out.contains("PLAIN"));
    }

    #[test]
    fn strip_removes_code() {
        let prose = strip_fenced_blocks(SAMPLE);
        assert!(prose.contains("Intro text."));
        assert!(prose.contains("More."));
        assert!(!prose.contains("docker"));
        assert!(!prose.contains("```"));
    }
}
