//! Answer extraction: the sentences or code that best cover a term.
//!
//! Answers are always lifted from the source text. The only templated answer
//! is the last-resort pointer back to the section.

use docsmith_markdown::classify::effective_language;
use docsmith_markdown::fenced_blocks;
use docsmith_shared::{CodeBlock, SectionType};

use crate::extract::{Command, split_sentences};

/// Most sentences joined into one answer.
const MAX_ANSWER_SENTENCES: usize = 3;

/// Answer for `term` from a section's content.
///
/// Tiers, first non-empty wins:
/// 1. Up to three sentences mentioning the term (those starting with it rank
///    first), rejoined in source order.
/// 2. The section's code block that mentions the term, else its first block.
///    `code_blocks` may be empty, in which case fences in `content` are used.
/// 3. `"Refer to the {section_type} section for details on {term}."`
pub fn answer_for(
    term: &str,
    content: &str,
    section_type: SectionType,
    code_blocks: &[CodeBlock],
) -> String {
    let term = term.trim();

    if !term.is_empty() {
        let sentences = matching_sentences(term, content, MAX_ANSWER_SENTENCES);
        if !sentences.is_empty() {
            return sentences.join(" ");
        }
    }

    let parsed;
    let blocks = if code_blocks.is_empty() {
        parsed = fenced_blocks(content);
        &parsed
    } else {
        code_blocks
    };

    let needle = term.to_lowercase();
    let nearest = blocks
        .iter()
        .find(|b| !needle.is_empty() && b.content.to_lowercase().contains(&needle))
        .or_else(|| blocks.first());
    if let Some(block) = nearest {
        return fence(effective_language(block), &block.content);
    }

    format!("Refer to the {section_type} section for details on {term}.")
}

/// Answer for a command question: the command in a fence, preceded by any
/// sentences that mention its head.
pub fn answer_for_command(command: &Command, content: &str) -> String {
    let language = command.language.as_deref().unwrap_or("bash");
    let code = fence(language, &command.line);

    let context = matching_sentences(command.head(), content, 2);
    if context.is_empty() {
        code
    } else {
        format!("{}\n\n{code}", context.join(" "))
    }
}

/// Sentences containing `term`, best `limit` by rank, in source order.
pub(crate) fn matching_sentences(term: &str, content: &str, limit: usize) -> Vec<String> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(u8, usize, String)> = split_sentences(content)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, sentence)| {
            let lower = sentence.to_lowercase();
            if !lower.contains(&needle) {
                return None;
            }
            let tier = if lower.starts_with(&needle) { 0 } else { 1 };
            Some((tier, idx, sentence))
        })
        .collect();

    ranked.sort_by_key(|(tier, idx, _)| (*tier, *idx));
    ranked.truncate(limit);
    ranked.sort_by_key(|(_, idx, _)| *idx);

    ranked.into_iter().map(|(_, _, sentence)| sentence).collect()
}

pub(crate) fn fence(language: &str, code: &str) -> String {
    format!("```{language}\n{}\n```", code.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "The platform is modular. Docker runs every service. \
        You can also run Docker locally. Nothing else here. Docker images are cached. \
        Rebuild Docker images after upgrades.";

    #[test]
    fn sentences_prefer_those_starting_with_term() {
        let answer = answer_for("docker", CONTENT, SectionType::Usage, &[]);
        // both starters win; the last mid-sentence mention is dropped
        assert_eq!(
            answer,
            "Docker runs every service. You can also run Docker locally. Docker images are cached."
        );
    }

    #[test]
    fn ranked_sentences_rejoin_in_source_order() {
        let content = "Use the CLI often. Nothing here. CLI flags are documented.";
        assert_eq!(
            answer_for("cli", content, SectionType::Usage, &[]),
            "Use the CLI often. CLI flags are documented."
        );
    }

    #[test]
    fn falls_back_to_code_block_mentioning_term() {
        let blocks = vec![
            CodeBlock::new("pip install -r requirements.txt", Some("bash")),
            CodeBlock::new("docker compose up", Some("bash")),
        ];
        let answer = answer_for("compose", "No prose mentions it.", SectionType::Usage, &blocks);
        assert_eq!(answer, "```bash\ndocker compose up\n```");
    }

    #[test]
    fn falls_back_to_fences_in_content() {
        let content = "Setup below.\n\n```\npip install radp\n```";
        let answer = answer_for("virtualenv", content, SectionType::Installation, &[]);
        assert_eq!(answer, "```bash\npip install radp\n```");
    }

    #[test]
    fn generic_sentence_as_last_resort() {
        let answer = answer_for("GPU", "Nothing relevant.", SectionType::Troubleshooting, &[]);
        assert_eq!(answer, "Refer to the troubleshooting section for details on GPU.");
    }

    #[test]
    fn command_answer_includes_context() {
        let command = Command {
            line: "docker build -t radp radp".into(),
            language: Some("bash".into()),
        };
        let content = "Build the image with docker first.\n\n```bash\ndocker build -t radp radp\n```";
        assert_eq!(
            answer_for_command(&command, content),
            "Build the image with docker first.\n\n```bash\ndocker build -t radp radp\n```"
        );
        assert_eq!(
            answer_for_command(&command, ""),
            "```bash\ndocker build -t radp radp\n```"
        );
    }
}
