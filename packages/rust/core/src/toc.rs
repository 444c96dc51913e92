//! Table of contents for the generated document.
//!
//! Mirrors the section trees of the input documents, one entry per heading,
//! with GitHub-style anchors. Anchors are allocated in the order headings
//! appear in the output so repeated titles get the same `-1`, `-2` suffixes
//! GitHub assigns.

use std::collections::HashMap;

use tracing::{debug, instrument};

use docsmith_shared::{ParsedDocument, Section, TocEntry};

use crate::format::FAQ_HEADING;

pub const TOC_HEADING: &str = "Table of Contents";

/// Hands out unique anchors for a sequence of headings.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    seen: HashMap<String, usize>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor for the next heading titled `title`.
    pub fn anchor(&mut self, title: &str) -> String {
        let slug = slugify_heading(title);
        let count = self.seen.entry(slug.clone()).or_insert(0);
        let anchor = if *count == 0 {
            slug
        } else {
            format!("{slug}-{count}")
        };
        *count += 1;
        anchor
    }
}

/// Build the TOC for a document titled `title` made of `documents`.
///
/// The title and the TOC heading itself are registered first because they
/// precede every section in the output. A first section that is the title's
/// own H1 stands in for the title heading.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn build_toc(title: &str, documents: &[ParsedDocument], include_faq: bool) -> Vec<TocEntry> {
    let mut anchors = AnchorRegistry::new();
    let leads_with_title = documents
        .iter()
        .find_map(|doc| doc.sections.first())
        .is_some_and(|first| first.level == 1 && first.title == title);
    if !leads_with_title {
        anchors.anchor(title);
    }
    anchors.anchor(TOC_HEADING);

    let mut entries: Vec<TocEntry> = documents
        .iter()
        .flat_map(|doc| doc.sections.iter())
        .map(|section| entry_for(section, &mut anchors))
        .collect();

    if include_faq {
        entries.push(TocEntry {
            title: FAQ_HEADING.to_string(),
            anchor: anchors.anchor(FAQ_HEADING),
            children: vec![],
        });
    }

    debug!(entries = count_entries(&entries), "TOC built");
    entries
}

/// Nested markdown link list under a `## Table of Contents` heading.
pub fn render_toc(entries: &[TocEntry]) -> String {
    fn walk(entries: &[TocEntry], depth: usize, out: &mut String) {
        for entry in entries {
            out.push_str(&format!(
                "{}- [{}](#{})\n",
                "  ".repeat(depth),
                entry.title,
                entry.anchor
            ));
            walk(&entry.children, depth + 1, out);
        }
    }

    let mut out = format!("## {TOC_HEADING}\n\n");
    walk(entries, 0, &mut out);
    out.trim_end().to_string()
}

/// GitHub heading slug: lowercase, punctuation dropped, spaces to dashes.
pub fn slugify_heading(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry_for(section: &Section, anchors: &mut AnchorRegistry) -> TocEntry {
    let anchor = anchors.anchor(&section.title);
    TocEntry {
        title: section.title.clone(),
        anchor,
        children: section
            .subsections
            .iter()
            .map(|child| entry_for(child, anchors))
            .collect(),
    }
}

fn count_entries(entries: &[TocEntry]) -> usize {
    entries
        .iter()
        .map(|e| 1 + count_entries(&e.children))
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_markdown::parse_document;

    #[test]
    fn slugs_follow_github_rules() {
        assert_eq!(slugify_heading("Getting Started"), "getting-started");
        assert_eq!(slugify_heading("API Reference (v2)"), "api-reference-v2");
        assert_eq!(slugify_heading("Node.js & npm"), "nodejs--npm");
        assert_eq!(slugify_heading("snake_case_title"), "snake_case_title");
    }

    #[test]
    fn duplicate_titles_get_suffixes() {
        let mut anchors = AnchorRegistry::new();
        assert_eq!(anchors.anchor("Usage"), "usage");
        assert_eq!(anchors.anchor("Usage"), "usage-1");
        assert_eq!(anchors.anchor("usage"), "usage-2");
        assert_eq!(anchors.anchor("Install"), "install");
    }

    #[test]
    fn toc_mirrors_section_tree() {
        let doc = parse_document(
            "guide.md",
            "# Guide\n\nIntro.\n\n## Install\n\nText.\n\n## Usage\n\nText.\n\n### Install\n\nMore.\n",
        );
        let toc = build_toc("Project Documentation", &[doc], true);

        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].anchor, "guide");
        let children: Vec<&str> = toc[0].children.iter().map(|c| c.anchor.as_str()).collect();
        assert_eq!(children, ["install", "usage"]);
        assert_eq!(toc[0].children[1].children[0].anchor, "install-1");
        assert_eq!(toc[1].title, "Frequently Asked Questions");
        assert_eq!(toc[1].anchor, "frequently-asked-questions");
    }

    #[test]
    fn title_heading_is_counted_once() {
        let doc = parse_document("guide.md", "# Guide\n\n## Guide\n\ntext\n");
        let toc = build_toc("Guide", std::slice::from_ref(&doc), false);
        assert_eq!(toc[0].anchor, "guide");
        assert_eq!(toc[0].children[0].anchor, "guide-1");

        // a wrapper title that differs from the H1 takes its own anchor
        let toc = build_toc("Other", &[doc], false);
        assert_eq!(toc[0].anchor, "guide");
        let toc = build_toc(
            "Guide",
            &[parse_document("notes.md", "Preamble.\n\n## Guide\n\ntext\n")],
            false,
        );
        assert_eq!(toc[0].anchor, "guide-1");
    }

    #[test]
    fn renders_nested_links() {
        let doc = parse_document("a.md", "# A\n\n## B\n\ntext\n");
        let out = render_toc(&build_toc("Project Documentation", &[doc], false));
        assert_eq!(out, "## Table of Contents\n\n- [A](#a)\n  - [B](#b)");
    }
}
