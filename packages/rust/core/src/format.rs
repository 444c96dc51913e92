//! FAQ rendering of QA pairs.

use docsmith_shared::{QaCategory, QaPair, QaStyle};

/// Top-level FAQ heading; also the target of the TOC's FAQ entry.
pub const FAQ_HEADING: &str = "Frequently Asked Questions";

/// Render `pairs` as a markdown FAQ. `style` is a config key; unknown keys
/// render as [`QaStyle::Simple`].
pub fn format_qa_section(pairs: &[QaPair], style: &str) -> String {
    format_qa(pairs, QaStyle::from_key(style))
}

/// Render `pairs` grouped by category, categories in order of first
/// appearance. Empty input renders as an empty string.
pub fn format_qa(pairs: &[QaPair], style: QaStyle) -> String {
    if pairs.is_empty() {
        return String::new();
    }

    let mut out = format!("## {FAQ_HEADING}\n\n");
    for (category, group) in group_by_category(pairs) {
        out.push_str(&format!("### {} Questions\n\n", category.label()));
        for (i, pair) in group.iter().enumerate() {
            out.push_str(&render_pair(pair, style, i + 1));
        }
    }
    out
}

fn render_pair(pair: &QaPair, style: QaStyle, n: usize) -> String {
    let question = pair.question.trim();
    let answer = pair.answer.trim();
    match style {
        QaStyle::Simple => format!("**Q: {question}**\n\nA: {answer}\n\n---\n\n"),
        QaStyle::Collapsible => format!(
            "<details>\n<summary><b>{question}</b></summary>\n\n{answer}\n\n</details>\n\n"
        ),
        QaStyle::Numbered => format!("{n}. **{question}**\n\n{}\n\n", indent(answer, "   ")),
    }
}

/// Keep multi-line answers (fences included) inside the list item.
fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn group_by_category(pairs: &[QaPair]) -> Vec<(QaCategory, Vec<&QaPair>)> {
    let mut groups: Vec<(QaCategory, Vec<&QaPair>)> = Vec::new();
    for pair in pairs {
        match groups.iter_mut().find(|(c, _)| *c == pair.category) {
            Some((_, group)) => group.push(pair),
            None => groups.push((pair.category, vec![pair])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(q: &str, a: &str, category: QaCategory) -> QaPair {
        QaPair {
            question: q.into(),
            answer: a.into(),
            section_type: None,
            source_section: "Test".into(),
            category,
        }
    }

    #[test]
    fn numbered_contains_number_question_and_answer() {
        let out = format_qa_section(&[pair("Q1", "A1", QaCategory::Installation)], "numbered");
        assert!(out.contains("1."));
        assert!(out.contains("Q1"));
        assert!(out.contains("A1"));
        assert_eq!(
            out,
            "## Frequently Asked Questions\n\n### Installation Questions\n\n1. **Q1**\n\n   A1\n\n"
        );
    }

    #[test]
    fn empty_input_renders_nothing() {
        for style in ["simple", "collapsible", "numbered"] {
            assert_eq!(format_qa_section(&[], style), "");
        }
    }

    #[test]
    fn unknown_style_falls_back_to_simple() {
        let pairs = [pair("How?", "Like this.", QaCategory::Usage)];
        assert_eq!(
            format_qa_section(&pairs, "fancy"),
            format_qa_section(&pairs, "simple")
        );
        assert!(format_qa_section(&pairs, "fancy").contains("**Q: How?**\n\nA: Like this.\n\n---\n\n"));
    }

    #[test]
    fn collapsible_wraps_each_pair() {
        let out = format_qa(&[pair("Why?", "Because.", QaCategory::General)], QaStyle::Collapsible);
        assert!(out.contains(
            "<details>\n<summary><b>Why?</b></summary>\n\nBecause.\n\n</details>\n\n"
        ));
    }

    #[test]
    fn categories_in_first_appearance_order_with_restarting_numbers() {
        let pairs = [
            pair("u1", "a", QaCategory::Usage),
            pair("i1", "a", QaCategory::Installation),
            pair("u2", "a", QaCategory::Usage),
        ];
        let out = format_qa(&pairs, QaStyle::Numbered);

        let usage = out.find("### Usage Questions").unwrap();
        let install = out.find("### Installation Questions").unwrap();
        assert!(usage < install);
        assert!(out.contains("1. **u1**"));
        assert!(out.contains("2. **u2**"));
        assert!(out.contains("1. **i1**"));
    }

    #[test]
    fn numbered_answers_stay_indented() {
        let out = format_qa(
            &[pair("Run?", "Use:\n\n```bash\nmake\n```", QaCategory::Code)],
            QaStyle::Numbered,
        );
        assert!(out.contains("   Use:\n\n   ```bash\n   make\n   ```"));
    }
}
