//! Question templates keyed by section type and term source.

use docsmith_shared::SectionType;

use crate::extract::command_head;

/// Where a question's term was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Concept,
    Action,
    Command,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Concept, SourceKind::Action, SourceKind::Command];

    /// Template used when no `(section_type, kind)` entry exists.
    fn fallback(self) -> &'static str {
        match self {
            Self::Concept => "What is {term}?",
            Self::Action => "How do I {term}?",
            Self::Command => "How do I run {term}?",
        }
    }
}

/// Section-specific phrasing. Pairs not listed use [`SourceKind::fallback`].
const TEMPLATES: &[(SectionType, SourceKind, &str)] = &[
    (SectionType::Installation, SourceKind::Concept, "What is {term} and how do I install it?"),
    (SectionType::Installation, SourceKind::Command, "How do I run {term} during installation?"),
    (SectionType::Usage, SourceKind::Concept, "How do I use {term}?"),
    (SectionType::Api, SourceKind::Concept, "What is the {term} API?"),
    (SectionType::Api, SourceKind::Action, "How do I {term} through the API?"),
    (SectionType::Examples, SourceKind::Concept, "Is there an example of {term}?"),
    (SectionType::Workflow, SourceKind::Concept, "What role does {term} play in the workflow?"),
    (SectionType::Workflow, SourceKind::Action, "What are the steps to {term}?"),
    (SectionType::Configuration, SourceKind::Concept, "How do I configure {term}?"),
    (SectionType::Configuration, SourceKind::Command, "How do I use {term} to configure the project?"),
    (SectionType::Troubleshooting, SourceKind::Concept, "How do I troubleshoot {term}?"),
    (SectionType::Troubleshooting, SourceKind::Action, "What should I check if I cannot {term}?"),
    (SectionType::Troubleshooting, SourceKind::Command, "How do I use {term} to diagnose problems?"),
];

const MAX_TERM_CHARS: usize = 60;

/// The template for a `(section_type, kind)` pair.
pub fn template_for(section_type: SectionType, kind: SourceKind) -> &'static str {
    TEMPLATES
        .iter()
        .find(|(t, k, _)| *t == section_type && *k == kind)
        .map(|(_, _, template)| *template)
        .unwrap_or_else(|| kind.fallback())
}

/// Build the question for one extracted term. Total: every input yields a
/// non-empty question.
///
/// Commands are asked about by their head token (`docker build .` → `docker`).
pub fn question_for(term: &str, section_type: SectionType, kind: SourceKind) -> String {
    let term = match kind {
        SourceKind::Command => command_head(term),
        SourceKind::Concept | SourceKind::Action => term.trim(),
    };
    let term = shorten(term);

    let mut template = template_for(section_type, kind);
    // "What is the REST API API?"
    if template.contains("{term} API") && term.to_ascii_uppercase().ends_with("API") {
        template = "What is the {term}?";
    }

    template.replace("{term}", &term)
}

fn shorten(term: &str) -> String {
    if term.chars().count() <= MAX_TERM_CHARS {
        return term.to_string();
    }
    let cut: String = term.chars().take(MAX_TERM_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_yields_a_question_with_the_term() {
        for section_type in SectionType::ALL {
            for kind in SourceKind::ALL {
                let q = question_for("widget", section_type, kind);
                assert!(q.contains("widget"), "{section_type:?}/{kind:?}: {q}");
                assert!(q.ends_with('?'));
            }
        }
    }

    #[test]
    fn fallback_templates() {
        assert_eq!(question_for("RADP", SectionType::Generic, SourceKind::Concept), "What is RADP?");
        assert_eq!(
            question_for("start services", SectionType::Usage, SourceKind::Action),
            "How do I start services?"
        );
        assert_eq!(
            question_for("docker build -t radp radp", SectionType::Generic, SourceKind::Command),
            "How do I run docker?"
        );
    }

    #[test]
    fn section_specific_templates() {
        assert_eq!(
            question_for("Digital Twin", SectionType::Api, SourceKind::Concept),
            "What is the Digital Twin API?"
        );
        assert_eq!(
            question_for("REST API", SectionType::Api, SourceKind::Concept),
            "What is the REST API?"
        );
        assert_eq!(
            question_for("sudo apt-get install curl", SectionType::Installation, SourceKind::Command),
            "How do I run apt-get during installation?"
        );
    }

    #[test]
    fn long_terms_are_shortened() {
        let long = "x".repeat(100);
        let q = question_for(&long, SectionType::Generic, SourceKind::Concept);
        assert!(q.contains("..."));
        assert!(q.len() < 80);
    }

    #[test]
    fn empty_term_still_yields_a_question() {
        assert!(!question_for("", SectionType::Usage, SourceKind::Command).is_empty());
    }
}
