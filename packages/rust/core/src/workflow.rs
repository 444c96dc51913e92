//! Workflow synthesis: reuse a numbered list already in the section, or derive
//! steps from its commands.
//!
//! The rules form a priority chain, evaluated in order:
//! 1. an existing numbered list of two or more items,
//! 2. one step per extracted command (capped),
//! 3. for installation sections, those commands sorted into setup slots,
//! 4. nothing.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use docsmith_markdown::fences::is_fence_line;
use docsmith_shared::SectionType;

use crate::extract::{Command, extract_command_lines};

/// Heading every synthesized workflow is rendered under.
pub const WORKFLOW_HEADING: &str = "Complete Workflow";

/// Default cap on command-derived steps.
pub const DEFAULT_MAX_STEPS: usize = 5;

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*\S)\s*$").expect("valid regex"));

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Prose step, reproduced as-is.
    Text(String),
    /// A command rendered in a fence under a short label.
    Command {
        label: String,
        command: String,
        language: String,
    },
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    /// Render under a [`WORKFLOW_HEADING`] one level below `section_level`.
    pub fn render(&self, section_level: u8) -> String {
        let hashes = "#".repeat(usize::from(section_level.saturating_add(1).clamp(1, 6)));
        let mut out = format!("{hashes} {WORKFLOW_HEADING}\n\n");

        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            match step {
                WorkflowStep::Text(text) => out.push_str(&format!("{n}. {text}\n")),
                WorkflowStep::Command {
                    label,
                    command,
                    language,
                } => out.push_str(&format!(
                    "{n}. **{label}:**\n\n   ```{language}\n   {command}\n   ```\n\n"
                )),
            }
        }

        out.trim_end().to_string()
    }

    /// Step texts in order; commands contribute their command line.
    pub fn step_texts(&self) -> Vec<&str> {
        self.steps
            .iter()
            .map(|step| match step {
                WorkflowStep::Text(text) => text.as_str(),
                WorkflowStep::Command { command, .. } => command.as_str(),
            })
            .collect()
    }
}

/// Detect or derive a workflow for a section. `None` when the content has
/// neither a numbered list nor any shell command.
pub fn synthesize_workflow(
    section_title: &str,
    content: &str,
    section_type: SectionType,
    max_steps: usize,
) -> Option<Workflow> {
    let listed = numbered_items(content);
    if listed.len() >= 2 {
        debug!(section = section_title, steps = listed.len(), "reusing numbered list");
        return Some(Workflow {
            steps: listed.into_iter().map(WorkflowStep::Text).collect(),
        });
    }

    let mut commands = extract_command_lines(content, &[]);
    commands.truncate(max_steps);
    if commands.is_empty() {
        debug!(section = section_title, "no workflow");
        return None;
    }

    let steps = if section_type == SectionType::Installation {
        installation_steps(commands)
    } else {
        commands
            .into_iter()
            .map(|c| command_step("Run command", c))
            .collect()
    };

    debug!(section = section_title, steps = steps.len(), "derived workflow");
    Some(Workflow { steps })
}

/// Numbered list items outside fenced code, in order.
fn numbered_items(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = LIST_ITEM_RE.captures(line.trim_start()) {
            items.push(caps[1].to_string());
        }
    }

    items
}

fn command_step(label: &str, command: Command) -> WorkflowStep {
    WorkflowStep::Command {
        label: label.to_string(),
        language: command.language.unwrap_or_else(|| "bash".to_string()),
        command: command.line,
    }
}

// ---------------------------------------------------------------------------
// Installation slots
// ---------------------------------------------------------------------------

/// Phases of a typical installation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstallSlot {
    Prerequisites,
    Environment,
    Dependencies,
    Verification,
}

impl InstallSlot {
    pub(crate) const ALL: [InstallSlot; 4] = [
        InstallSlot::Prerequisites,
        InstallSlot::Environment,
        InstallSlot::Dependencies,
        InstallSlot::Verification,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Prerequisites => "Install prerequisites",
            Self::Environment => "Set up the environment",
            Self::Dependencies => "Install dependencies",
            Self::Verification => "Verify the installation",
        }
    }

    /// Used when no command fills the slot.
    pub(crate) fn generic_step(self) -> &'static str {
        match self {
            Self::Prerequisites => "Make sure the required tools are installed.",
            Self::Environment => "Set up an isolated environment for the project.",
            Self::Dependencies => "Install the project dependencies.",
            Self::Verification => "Verify that the installation works.",
        }
    }
}

/// Slot rules, checked in this order so `python --version` counts as
/// verification and `python -m venv` as environment setup.
static SLOT_RULES: LazyLock<Vec<(Regex, InstallSlot)>> = LazyLock::new(|| {
    [
        (
            r"--version\b|\bversion\b|\b(?:pytest|npm\s+test|cargo\s+test|make\s+test|docker\s+ps)\b|/health",
            InstallSlot::Verification,
        ),
        (
            r"-m\s+venv\b|\bvirtualenv\b|bin/activate\b|\\Scripts\\activate|\bconda\s+(?:create|activate)\b|^(?:export|set)\s+\w+=",
            InstallSlot::Environment,
        ),
        (
            r"^(?:sudo\s+)?(?:pip3?\s+install|npm\s+(?:install|i|ci)\b|yarn\b|cargo\s+(?:build|install)|poetry\s+install|uv\s+(?:sync|pip)|docker\s+(?:build|pull)|docker(?:-compose|\s+compose)\s+(?:build|pull|up)|make\b)",
            InstallSlot::Dependencies,
        ),
        (
            r"^(?:sudo\s+)?(?:git\s+clone|cd\s|apt(?:-get)?\s+install|brew\s+install|mkdir\s)",
            InstallSlot::Prerequisites,
        ),
    ]
    .into_iter()
    .map(|(pattern, slot)| (Regex::new(pattern).expect("valid regex"), slot))
    .collect()
});

pub(crate) fn slot_of(command: &str) -> Option<InstallSlot> {
    SLOT_RULES
        .iter()
        .find(|(re, _)| re.is_match(command))
        .map(|(_, slot)| *slot)
}

/// Commands grouped by slot; commands matching no slot join the dependency
/// steps in their original order.
fn installation_steps(commands: Vec<Command>) -> Vec<WorkflowStep> {
    let mut slotted: Vec<(InstallSlot, Command)> = commands
        .into_iter()
        .map(|c| (slot_of(&c.line).unwrap_or(InstallSlot::Dependencies), c))
        .collect();

    let mut steps = Vec::new();
    for slot in InstallSlot::ALL {
        let mut filled = false;
        let mut rest = Vec::new();
        for (s, command) in slotted {
            if s == slot {
                steps.push(command_step(slot.label(), command));
                filled = true;
            } else {
                rest.push((s, command));
            }
        }
        slotted = rest;
        if !filled {
            steps.push(WorkflowStep::Text(slot.generic_step().to_string()));
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_without_steps_or_commands_yields_none() {
        let content = "RADP is a platform for RF simulation.";
        for section_type in SectionType::ALL {
            assert_eq!(
                synthesize_workflow("Overview", content, section_type, DEFAULT_MAX_STEPS),
                None
            );
        }
    }

    #[test]
    fn existing_list_is_reused_verbatim() {
        let workflow = synthesize_workflow(
            "Deploy",
            "1. Build image\n2. Start services",
            SectionType::Workflow,
            DEFAULT_MAX_STEPS,
        )
        .expect("workflow");
        assert_eq!(workflow.step_texts(), ["Build image", "Start services"]);

        let rendered = workflow.render(2);
        assert!(rendered.starts_with("### Complete Workflow\n\n"));
        assert!(rendered.ends_with("1. Build image\n2. Start services"));
    }

    #[test]
    fn single_command_becomes_single_step() {
        let content = "```bash\ndocker build -t radp radp\n```";
        let workflow =
            synthesize_workflow("Run", content, SectionType::Usage, DEFAULT_MAX_STEPS).expect("workflow");
        assert_eq!(
            workflow.steps,
            [WorkflowStep::Command {
                label: "Run command".into(),
                command: "docker build -t radp radp".into(),
                language: "bash".into(),
            }]
        );
        assert!(workflow
            .render(2)
            .contains("1. **Run command:**\n\n   ```bash\n   docker build -t radp radp\n   ```"));
    }

    #[test]
    fn list_inside_code_is_not_a_workflow() {
        let content = "```text\n1. one\n2. two\n```";
        assert_eq!(
            synthesize_workflow("Notes", content, SectionType::Usage, DEFAULT_MAX_STEPS),
            None
        );
    }

    #[test]
    fn commands_are_capped() {
        let content = "```sh\nmake a\nmake b\nmake c\n```";
        let workflow = synthesize_workflow("Build", content, SectionType::Usage, 2).expect("workflow");
        assert_eq!(workflow.step_texts(), ["make a", "make b"]);
        assert!(matches!(&workflow.steps[0], WorkflowStep::Command { language, .. } if language == "sh"));
    }

    #[test]
    fn installation_commands_fill_slots() {
        let content = "```bash\npip install -r requirements.txt\ngit clone https://example.com/radp.git\npython3 -m venv venv\n```";
        let workflow =
            synthesize_workflow("Installation", content, SectionType::Installation, DEFAULT_MAX_STEPS)
                .expect("workflow");
        assert_eq!(
            workflow.step_texts(),
            [
                "git clone https://example.com/radp.git",
                "python3 -m venv venv",
                "pip install -r requirements.txt",
                "Verify that the installation works.",
            ]
        );
    }

    #[test]
    fn unmatched_installation_commands_count_as_dependencies() {
        let content = "```bash\n./configure\npython --version\n```";
        let workflow =
            synthesize_workflow("Setup", content, SectionType::Installation, DEFAULT_MAX_STEPS)
                .expect("workflow");
        assert_eq!(
            workflow.step_texts(),
            [
                "Make sure the required tools are installed.",
                "Set up an isolated environment for the project.",
                "./configure",
                "python --version",
            ]
        );
    }
}
