//! QA mining over parsed documents.
//!
//! Collection runs in four global phases (sections, code blocks, tables,
//! workflows), each walking the documents in input order. The resulting list
//! is deduplicated on the normalized question, then capped per category. The
//! collection order is the only tie-break, so identical input always yields
//! identical output.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use docsmith_markdown::classify::effective_language;
use docsmith_markdown::{fenced_blocks, is_shell_block};
use docsmith_shared::{
    CodeBlock, ParsedDocument, QaCategory, QaConfig, QaPair, QaSource, Result, Section,
};

use crate::answers::{answer_for, answer_for_command, fence};
use crate::code_enhancer::describe_code_block;
use crate::composers::table_cells;
use crate::enhancer::resolve_section_type;
use crate::extract::{extract_actions, extract_command_lines, extract_concepts_with};
use crate::questions::{SourceKind, question_for};

static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*+])\s+(.*\S)\s*$").expect("valid regex"));

/// Mines QA pairs according to a [`QaConfig`].
#[derive(Debug, Clone)]
pub struct QaGenerator<'a> {
    config: &'a QaConfig,
}

/// Convenience wrapper around [`QaGenerator::generate`].
pub fn generate_qa_pairs(documents: &[ParsedDocument], config: &QaConfig) -> Result<Vec<QaPair>> {
    QaGenerator::new(config).generate(documents)
}

impl<'a> QaGenerator<'a> {
    pub fn new(config: &'a QaConfig) -> Self {
        Self { config }
    }

    /// Collect, deduplicate, and cap.
    ///
    /// Rejects documents containing a malformed section before mining anything.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn generate(&self, documents: &[ParsedDocument]) -> Result<Vec<QaPair>> {
        for doc in documents {
            for section in doc.flat_sections() {
                section.validate()?;
            }
        }

        let collected = self.collect(documents);
        let collected_count = collected.len();
        let unique = deduplicate(collected);
        let unique_count = unique.len();
        let capped = cap_per_category(unique, self.config.max_per_section);

        for (category, count) in category_counts(&capped) {
            if count < self.config.min_per_section {
                debug!(
                    %category,
                    count,
                    min = self.config.min_per_section,
                    "category below advisory minimum"
                );
            }
        }

        info!(
            collected = collected_count,
            unique = unique_count,
            kept = capped.len(),
            "qa pairs generated"
        );
        Ok(capped)
    }

    /// All candidate pairs in collection order, duplicates included.
    pub fn collect(&self, documents: &[ParsedDocument]) -> Vec<QaPair> {
        let mut pairs = Vec::new();

        if self.config.is_enabled(QaSource::Sections) {
            for section in self.mined_sections(documents) {
                pairs.extend(self.section_pairs(section));
            }
        }
        if self.config.is_enabled(QaSource::CodeBlocks) {
            for section in self.mined_sections(documents) {
                pairs.extend(code_block_pairs(section));
            }
        }
        if self.config.is_enabled(QaSource::Tables) {
            for doc in documents {
                pairs.extend(self.table_pairs(doc));
            }
        }
        if self.config.is_enabled(QaSource::Workflows) {
            for doc in documents {
                pairs.extend(self.workflow_pairs(doc));
            }
        }

        pairs.retain(|p| !p.question.trim().is_empty() && !p.answer.trim().is_empty());
        debug!(count = pairs.len(), "qa candidates collected");
        pairs
    }

    /// Flattened sections whose type is enabled for mining, in document order.
    fn mined_sections<'d>(&self, documents: &'d [ParsedDocument]) -> Vec<&'d Section> {
        documents
            .iter()
            .flat_map(ParsedDocument::flat_sections)
            .filter(|section| {
                let section_type = resolve_section_type(section, None);
                let mined = self.config.mines_section_type(section_type);
                if !mined {
                    debug!(section = %section.title, %section_type, "section type not mined");
                }
                mined
            })
            .collect()
    }

    /// Concept, action, and command questions for one section.
    fn section_pairs(&self, section: &Section) -> Vec<QaPair> {
        let section_type = resolve_section_type(section, None);
        let content = section.content.as_str();
        let pair = |question: String, answer: String| QaPair {
            question,
            answer,
            section_type: Some(section_type),
            source_section: section.title.clone(),
            category: QaCategory::from(section_type),
        };

        let mut pairs = Vec::new();

        let concepts = extract_concepts_with(content, &self.config.extra_acronyms);
        for concept in concepts.iter().take(self.config.max_concepts) {
            pairs.push(pair(
                question_for(concept, section_type, SourceKind::Concept),
                answer_for(concept, content, section_type, &section.code_blocks),
            ));
        }

        for action in extract_actions(content).iter().take(self.config.max_actions) {
            pairs.push(pair(
                question_for(action, section_type, SourceKind::Action),
                answer_for(action, content, section_type, &section.code_blocks),
            ));
        }

        let commands = extract_command_lines(content, &section.code_blocks);
        for command in commands.iter().take(self.config.max_commands) {
            pairs.push(pair(
                question_for(&command.line, section_type, SourceKind::Command),
                answer_for_command(command, content),
            ));
        }

        pairs
    }

    fn table_pairs(&self, doc: &ParsedDocument) -> Vec<QaPair> {
        doc.flat_sections()
            .into_iter()
            .flat_map(|section| section.tables.iter().map(move |table| (section, table)))
            .take(self.config.max_tables)
            .map(|(section, table)| {
                let header = table.lines().next().map(table_cells).unwrap_or_default();
                let columns: Vec<&str> = header
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !c.is_empty())
                    .collect();
                let question = match columns.first() {
                    Some(first) => format!(
                        "What does the {first} table in \"{}\" describe?",
                        section.title
                    ),
                    None => format!("What does the table in \"{}\" describe?", section.title),
                };
                let answer = if columns.is_empty() {
                    table.clone()
                } else {
                    format!("Columns: {}.\n\n{table}", columns.join(", "))
                };
                QaPair {
                    question,
                    answer,
                    section_type: Some(resolve_section_type(section, None)),
                    source_section: section.title.clone(),
                    category: QaCategory::Data,
                }
            })
            .collect()
    }

    fn workflow_pairs(&self, doc: &ParsedDocument) -> Vec<QaPair> {
        doc.workflows
            .iter()
            .take(self.config.max_workflows)
            .map(|workflow| {
                let steps: Vec<String> = workflow
                    .text
                    .lines()
                    .filter_map(|line| STEP_RE.captures(line))
                    .enumerate()
                    .map(|(i, caps)| format!("{}. {}", i + 1, &caps[1]))
                    .collect();
                let answer = if steps.is_empty() {
                    workflow.text.trim().to_string()
                } else {
                    steps.join("\n")
                };
                QaPair {
                    question: format!(
                        "What are the steps in the {} workflow?",
                        workflow.source_section
                    ),
                    answer,
                    section_type: None,
                    source_section: workflow.source_section.clone(),
                    category: QaCategory::Workflow,
                }
            })
            .collect()
    }
}

/// Questions about each code block of a section.
fn code_block_pairs(section: &Section) -> Vec<QaPair> {
    let section_type = resolve_section_type(section, None);
    let blocks: Vec<CodeBlock> = if section.code_blocks.is_empty() {
        fenced_blocks(&section.content)
    } else {
        section.code_blocks.clone()
    };
    let pair = |question: String, answer: String| QaPair {
        question,
        answer,
        section_type: Some(section_type),
        source_section: section.title.clone(),
        category: QaCategory::Code,
    };

    let mut pairs = Vec::new();
    for block in &blocks {
        let language = effective_language(block);
        let code = fence(language, &block.content);
        let answer = match describe_code_block(block) {
            Some(description) => format!("{description}\n\n{code}"),
            None => code,
        };
        pairs.push(pair(
            format!("What does the {language} code in \"{}\" do?", section.title),
            answer,
        ));

        if is_shell_block(block) {
            let lines: Vec<String> = extract_command_lines("", std::slice::from_ref(block))
                .into_iter()
                .map(|c| c.line)
                .collect();
            if !lines.is_empty() {
                pairs.push(pair(
                    format!("How do I run the commands in \"{}\"?", section.title),
                    fence(language, &lines.join("\n")),
                ));
            }
        }
    }
    pairs
}

/// Keep the first pair for each normalized question.
pub fn deduplicate(pairs: Vec<QaPair>) -> Vec<QaPair> {
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter(|pair| seen.insert(pair.normalized_question()))
        .collect()
}

/// Keep the first `max` pairs of each category, preserving overall order.
pub fn cap_per_category(pairs: Vec<QaPair>, max: usize) -> Vec<QaPair> {
    let mut counts: BTreeMap<QaCategory, usize> = BTreeMap::new();
    pairs
        .into_iter()
        .filter(|pair| {
            let count = counts.entry(pair.category).or_default();
            *count += 1;
            *count <= max
        })
        .collect()
}

/// Pairs per category.
pub fn category_counts(pairs: &[QaPair]) -> BTreeMap<QaCategory, usize> {
    let mut counts = BTreeMap::new();
    for pair in pairs {
        *counts.entry(pair.category).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_markdown::parse_document;
    use docsmith_shared::SectionType;

    const GUIDE: &str = "\
# Guide

## Installation

Install the `radp` package.

```bash
pip install radp
```

| Option | Default |
|--------|---------|
| PORT   | 8080    |

1. Clone
2. Install
3. Run
";

    fn pair(question: &str, category: QaCategory) -> QaPair {
        QaPair {
            question: question.to_string(),
            answer: "answer".to_string(),
            section_type: None,
            source_section: "S".to_string(),
            category,
        }
    }

    fn fixture() -> ParsedDocument {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/markdown/radp_readme.md");
        docsmith_markdown::read_document(&path).expect("fixture")
    }

    #[test]
    fn phases_run_in_source_order() {
        let doc = parse_document("guide.md", GUIDE);
        let pairs = generate_qa_pairs(&[doc], &QaConfig::default()).unwrap();

        let mut phases: Vec<QaCategory> = Vec::new();
        for p in &pairs {
            if phases.last() != Some(&p.category) {
                phases.push(p.category);
            }
        }
        assert_eq!(
            phases,
            [
                QaCategory::Installation,
                QaCategory::Code,
                QaCategory::Data,
                QaCategory::Workflow
            ]
        );

        assert_eq!(pairs[0].question, "What is radp and how do I install it?");
        assert_eq!(pairs[0].answer, "Install the `radp` package.");
        assert!(pairs.iter().any(|p| p.question == "How do I run pip during installation?"
            && p.answer == "```bash\npip install radp\n```"));
        assert!(pairs.iter().any(|p| p.question == "What does the bash code in \"Installation\" do?"
            && p.answer.starts_with("This code will install Python packages.")));
        assert!(pairs
            .iter()
            .any(|p| p.question == "What does the Option table in \"Installation\" describe?"
                && p.answer.starts_with("Columns: Option, Default.")));
        let workflow = pairs.last().unwrap();
        assert_eq!(workflow.question, "What are the steps in the Installation workflow?");
        assert_eq!(workflow.answer, "1. Clone\n2. Install\n3. Run");
    }

    #[test]
    fn generation_is_deterministic() {
        let config = QaConfig::default();
        let first = generate_qa_pairs(&[fixture()], &config).unwrap();
        let second = generate_qa_pairs(&[fixture()], &config).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert!(first.iter().all(|p| !p.question.is_empty() && !p.answer.is_empty()));
    }

    #[test]
    fn disabled_sources_are_skipped() {
        let config = QaConfig {
            enabled_sources: vec![QaSource::Sections],
            ..QaConfig::default()
        };
        let pairs = generate_qa_pairs(&[fixture()], &config).unwrap();
        assert!(!pairs.is_empty());
        assert!(pairs
            .iter()
            .all(|p| !matches!(p.category, QaCategory::Code | QaCategory::Data)));
        assert!(!pairs.iter().any(|p| p.question.starts_with("What are the steps in")));
    }

    #[test]
    fn disabled_section_types_are_not_mined() {
        let doc = parse_document("guide.md", GUIDE);
        let config = QaConfig {
            enabled_section_types: vec![SectionType::Usage],
            ..QaConfig::default()
        };
        let pairs = generate_qa_pairs(&[doc], &config).unwrap();

        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|p| !matches!(
            p.category,
            QaCategory::Installation | QaCategory::Code
        )));
        // tables and workflows are mined regardless of type
        assert!(pairs.iter().any(|p| p.category == QaCategory::Data));
        assert!(pairs.iter().any(|p| p.category == QaCategory::Workflow));
    }

    #[test]
    fn dedup_keeps_first_and_is_idempotent() {
        let pairs = vec![
            pair("What is RADP?", QaCategory::General),
            pair("  what is radp? ", QaCategory::Usage),
            pair("How do I run docker?", QaCategory::Usage),
        ];
        let once = deduplicate(pairs);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].category, QaCategory::General);
        assert_eq!(deduplicate(once.clone()), once);

        let keys: HashSet<String> = once.iter().map(QaPair::normalized_question).collect();
        assert_eq!(keys.len(), once.len());
    }

    #[test]
    fn cap_keeps_first_pairs_per_category() {
        let pairs: Vec<QaPair> = (0..5)
            .flat_map(|i| {
                [
                    pair(&format!("usage {i}"), QaCategory::Usage),
                    pair(&format!("code {i}"), QaCategory::Code),
                ]
            })
            .collect();
        let capped = cap_per_category(pairs, 2);
        let questions: Vec<&str> = capped.iter().map(|p| p.question.as_str()).collect();
        assert_eq!(questions, ["usage 0", "code 0", "usage 1", "code 1"]);
        assert!(category_counts(&capped).values().all(|&n| n <= 2));
    }

    #[test]
    fn small_categories_are_not_padded() {
        let config = QaConfig {
            min_per_section: 50,
            ..QaConfig::default()
        };
        let doc = parse_document("guide.md", GUIDE);
        let with_min = generate_qa_pairs(std::slice::from_ref(&doc), &config).unwrap();
        let without = generate_qa_pairs(&[doc], &QaConfig::default()).unwrap();
        assert_eq!(with_min, without);
    }

    #[test]
    fn malformed_section_is_rejected() {
        let mut doc = parse_document("guide.md", GUIDE);
        doc.sections.push(Section::new("", 2, "orphan"));
        assert!(generate_qa_pairs(&[doc], &QaConfig::default()).is_err());
    }

    #[test]
    fn unclassified_sections_fall_back_to_general() {
        let doc = parse_document("notes.md", "# Notes\n\nThe Signal Planner runs nightly.\n");
        let pairs = generate_qa_pairs(&[doc], &QaConfig::default()).unwrap();
        assert_eq!(pairs[0].question, "What is Signal Planner?");
        assert_eq!(pairs[0].category, QaCategory::General);
        assert_eq!(pairs[0].section_type, Some(SectionType::Generic));
    }
}
