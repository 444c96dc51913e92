//! Per-section enhancement: original content plus appended subsections.

use tracing::{debug, instrument};

use docsmith_markdown::classify::effective_language;
use docsmith_markdown::classify_title;
use docsmith_shared::{EnhancementConfig, ParsedDocument, Result, Section, SectionType};

use crate::answers::fence;
use crate::code_enhancer::{annotate_fences, enhance_code_block};
use crate::composers::{SectionContext, composer_for};
use crate::workflow::synthesize_workflow;

/// Heading for annotated copies of a section's original code blocks.
pub const ANNOTATED_CODE_HEADING: &str = "Annotated Code";

/// Effective type of a section: the override, else its own classification,
/// else a title keyword match, else [`SectionType::Generic`].
pub fn resolve_section_type(section: &Section, override_type: Option<SectionType>) -> SectionType {
    override_type
        .or(section.section_type)
        .or_else(|| classify_title(&section.title))
        .unwrap_or(SectionType::Generic)
}

/// Applies an [`EnhancementConfig`] to sections.
#[derive(Debug, Clone, Default)]
pub struct SectionEnhancer {
    config: EnhancementConfig,
}

impl SectionEnhancer {
    pub fn new(config: EnhancementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancementConfig {
        &self.config
    }

    /// Render one section with its enhancements appended.
    ///
    /// The output starts with the section heading followed by the original
    /// content, byte for byte. Generated subsections come after it, one
    /// heading level deeper, in a fixed order. Fails only for a section with
    /// an empty title or an out-of-range level.
    #[instrument(skip_all, fields(section = %section.title))]
    pub fn enhance(&self, section: &Section, override_type: Option<SectionType>) -> Result<String> {
        section.validate()?;

        let section_type = resolve_section_type(section, override_type);
        let toggles = self.config.toggles_for(section_type);
        let ctx = SectionContext::new(section);
        let sub_heading = "#".repeat(usize::from(section.level.saturating_add(1).min(6)));

        let mut parts = vec![format!(
            "{} {}",
            "#".repeat(usize::from(section.level)),
            section.title
        )];
        if !section.content.is_empty() {
            parts.push(section.content.clone());
        }

        let mut appended = Vec::new();
        for subsection in composer_for(section_type) {
            if !subsection.enabled(&toggles) {
                continue;
            }
            let Some(body) = subsection.compose(&ctx) else {
                continue;
            };
            let body = if toggles.enhance_code_blocks {
                annotate_fences(&body)
            } else {
                body
            };
            parts.push(format!("{sub_heading} {}\n\n{body}", subsection.title()));
            appended.push(subsection.title());
        }

        if toggles.enhance_code_blocks {
            let annotated: Vec<String> = ctx
                .blocks
                .iter()
                .filter_map(|block| {
                    let enhanced = enhance_code_block(block);
                    (enhanced != block.content).then(|| fence(effective_language(block), &enhanced))
                })
                .collect();
            if !annotated.is_empty() {
                parts.push(format!(
                    "{sub_heading} {ANNOTATED_CODE_HEADING}\n\n{}",
                    annotated.join("\n\n")
                ));
                appended.push(ANNOTATED_CODE_HEADING);
            }
        }

        if toggles.add_workflow {
            if let Some(workflow) = synthesize_workflow(
                &section.title,
                &section.content,
                section_type,
                toggles.max_workflow_steps,
            ) {
                parts.push(workflow.render(section.level));
                appended.push(crate::workflow::WORKFLOW_HEADING);
            }
        }

        debug!(%section_type, ?appended, "section enhanced");
        Ok(parts.join("\n\n"))
    }

    /// Enhance every section of `doc` in document order, stopping at the
    /// first malformed one.
    pub fn enhance_document(&self, doc: &ParsedDocument) -> Result<Vec<String>> {
        doc.flat_sections()
            .into_iter()
            .map(|section| self.enhance(section, None))
            .collect()
    }
}
