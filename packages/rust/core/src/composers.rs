//! Subsection composers appended by the section enhancer.
//!
//! Every composer is a pure function of a [`SectionContext`] and returns the
//! body of one subsection, or `None` when the section gives it nothing to say.
//! Which composers run is decided per section type by [`composer_for`] and the
//! matching [`EnhancementToggles`] flag.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use docsmith_markdown::classify::effective_language;
use docsmith_markdown::fences::is_fence_line;
use docsmith_markdown::{LanguageFamily, detect_language, fenced_blocks};
use docsmith_shared::{CodeBlock, EnhancementToggles, Section, SectionType};

use crate::answers::fence;
use crate::extract::{Command, extract_actions, extract_command_lines};
use crate::workflow::{InstallSlot, slot_of};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What the composers know about one section.
pub(crate) struct SectionContext<'a> {
    pub section: &'a Section,
    pub blocks: Vec<CodeBlock>,
    pub commands: Vec<Command>,
    /// Lowercased title and content, for keyword triggers.
    haystack: String,
}

impl<'a> SectionContext<'a> {
    pub fn new(section: &'a Section) -> Self {
        let blocks = if section.code_blocks.is_empty() {
            fenced_blocks(&section.content)
        } else {
            section.code_blocks.clone()
        };
        let commands = extract_command_lines(&section.content, &section.code_blocks);
        let haystack = format!("{}\n{}", section.title, section.content).to_lowercase();

        Self {
            section,
            blocks,
            commands,
            haystack,
        }
    }

    fn mentions(&self, re: &Regex) -> bool {
        re.is_match(&self.haystack)
    }

    fn commands_in(&self, slot: InstallSlot) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(move |c| slot_of(&c.line) == Some(slot))
    }
}

// ---------------------------------------------------------------------------
// Subsections
// ---------------------------------------------------------------------------

/// Generated subsections, declared in the order they are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Subsection {
    QuickStart,
    DetailedSteps,
    PlatformSpecific,
    VerifyInstallation,
    CommonIssues,
    BasicExample,
    AdvancedExample,
    UseCases,
    BestPractices,
    RequestExamples,
    ResponseExamples,
    ErrorHandling,
    CodeVariations,
    ExpectedOutput,
    StepByStep,
    EdgeCases,
    ConfigurationOptions,
    Solutions,
    DebuggingSteps,
}

impl Subsection {
    pub fn title(self) -> &'static str {
        match self {
            Self::QuickStart => "Quick Start",
            Self::DetailedSteps => "Detailed Steps",
            Self::PlatformSpecific => "Platform-Specific Instructions",
            Self::VerifyInstallation => "Verify Installation",
            Self::CommonIssues => "Common Issues",
            Self::BasicExample => "Basic Example",
            Self::AdvancedExample => "Advanced Example",
            Self::UseCases => "Use Cases",
            Self::BestPractices => "Best Practices",
            Self::RequestExamples => "Request Examples",
            Self::ResponseExamples => "Response Examples",
            Self::ErrorHandling => "Error Handling",
            Self::CodeVariations => "Code Variations",
            Self::ExpectedOutput => "Expected Output",
            Self::StepByStep => "Step-by-Step Guide",
            Self::EdgeCases => "Edge Cases and Considerations",
            Self::ConfigurationOptions => "Configuration Options",
            Self::Solutions => "Solutions",
            Self::DebuggingSteps => "Debugging Steps",
        }
    }

    pub fn enabled(self, toggles: &EnhancementToggles) -> bool {
        match self {
            Self::QuickStart => toggles.add_quick_start,
            Self::DetailedSteps => toggles.add_detailed_steps,
            Self::PlatformSpecific => toggles.add_platform_specific,
            Self::VerifyInstallation => toggles.add_verification,
            Self::CommonIssues => toggles.add_common_issues,
            Self::BasicExample => toggles.add_basic_example,
            Self::AdvancedExample => toggles.add_advanced_example,
            Self::UseCases => toggles.add_use_cases,
            Self::BestPractices => toggles.add_best_practices,
            Self::RequestExamples => toggles.add_request_examples,
            Self::ResponseExamples => toggles.add_response_examples,
            Self::ErrorHandling => toggles.add_error_handling,
            Self::CodeVariations => toggles.add_variations,
            Self::ExpectedOutput => toggles.add_output_examples,
            Self::StepByStep => toggles.add_step_by_step,
            Self::EdgeCases => toggles.add_edge_cases,
            Self::ConfigurationOptions => toggles.add_all_options,
            Self::Solutions => toggles.add_solutions,
            Self::DebuggingSteps => toggles.add_debugging_steps,
        }
    }

    pub fn compose(self, ctx: &SectionContext<'_>) -> Option<String> {
        match self {
            Self::QuickStart => quick_start(ctx),
            Self::DetailedSteps => detailed_steps(ctx),
            Self::PlatformSpecific => platform_specific(ctx),
            Self::VerifyInstallation => verify_installation(ctx),
            Self::CommonIssues | Self::Solutions => common_issues(ctx),
            Self::BasicExample => basic_example(ctx),
            Self::AdvancedExample => advanced_example(ctx),
            Self::UseCases => use_cases(ctx),
            Self::BestPractices => best_practices(ctx),
            Self::RequestExamples => request_examples(ctx),
            Self::ResponseExamples => response_examples(ctx),
            Self::ErrorHandling => error_handling(ctx),
            Self::CodeVariations => code_variations(ctx),
            Self::ExpectedOutput => expected_output(ctx),
            Self::StepByStep => step_by_step(ctx),
            Self::EdgeCases => edge_cases(ctx),
            Self::ConfigurationOptions => configuration_options(ctx),
            Self::DebuggingSteps => debugging_steps(ctx),
        }
    }
}

/// Subsections a section type can receive, in append order.
pub(crate) fn composer_for(section_type: SectionType) -> &'static [Subsection] {
    use Subsection::*;

    match section_type {
        SectionType::Installation => &[
            QuickStart,
            DetailedSteps,
            PlatformSpecific,
            VerifyInstallation,
            CommonIssues,
        ],
        SectionType::Usage => &[BasicExample, AdvancedExample, UseCases, BestPractices],
        SectionType::Api => &[RequestExamples, ResponseExamples, ErrorHandling],
        SectionType::Examples => &[CodeVariations, ExpectedOutput],
        SectionType::Workflow => &[StepByStep, EdgeCases],
        SectionType::Configuration => &[ConfigurationOptions],
        SectionType::Troubleshooting => &[Solutions, DebuggingSteps],
        SectionType::Generic => &[],
    }
}

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

struct Tool {
    name: &'static str,
    pattern: &'static str,
    version: &'static str,
    diagnostics: &'static [&'static str],
}

const TOOLS: &[Tool] = &[
    Tool {
        name: "Python",
        pattern: r"\bpython3?\b|\bpip3?\b",
        version: "python --version",
        diagnostics: &["python --version", "pip list"],
    },
    Tool {
        name: "Docker",
        pattern: r"\bdocker(?:-compose)?\b",
        version: "docker --version",
        diagnostics: &["docker ps -a", "docker logs <container>"],
    },
    Tool {
        name: "Node.js",
        pattern: r"\b(?:node|npm|npx|yarn)\b",
        version: "node --version",
        diagnostics: &["npm ls --depth=0"],
    },
    Tool {
        name: "Git",
        pattern: r"\bgit\b",
        version: "git --version",
        diagnostics: &["git status"],
    },
    Tool {
        name: "Rust",
        pattern: r"\bcargo\b|\brustc\b",
        version: "cargo --version",
        diagnostics: &["cargo check"],
    },
    Tool {
        name: "kubectl",
        pattern: r"\bkubectl\b",
        version: "kubectl version --client",
        diagnostics: &["kubectl get pods", "kubectl describe pod <pod>"],
    },
];

static TOOL_MATCHERS: LazyLock<Vec<(Regex, &'static Tool)>> = LazyLock::new(|| {
    TOOLS
        .iter()
        .map(|tool| (Regex::new(tool.pattern).expect("valid regex"), tool))
        .collect()
});

fn detected_tools(ctx: &SectionContext<'_>) -> Vec<&'static Tool> {
    TOOL_MATCHERS
        .iter()
        .filter(|(re, _)| ctx.mentions(re))
        .map(|(_, tool)| *tool)
        .collect()
}

/// `(trigger, issue, solution)`.
const ISSUES: &[(&str, &str, &str)] = &[
    (
        r"\bpython3?\b",
        "Wrong Python version",
        "Check `python --version` and install the version the project requires.",
    ),
    (
        r"\bpip3?\b",
        "`pip install` fails",
        "Upgrade pip with `pip install --upgrade pip` and retry inside the virtual environment.",
    ),
    (
        r"\bdocker\b",
        "Docker daemon is not running",
        "Start Docker Desktop, or run `sudo systemctl start docker` on Linux.",
    ),
    (
        r"\bports?\b",
        "Port already in use",
        "Stop the process holding the port or configure a different one.",
    ),
    (
        r"\bpermission|\bsudo\b",
        "Permission denied",
        "Check file ownership and permissions, or rerun with the required privileges.",
    ),
    (
        r"\b(?:node|npm|yarn)\b",
        "Node modules fail to install",
        "Delete `node_modules` and the lock file, then run `npm install` again.",
    ),
    (
        r"\bgit\b",
        "Repository clone fails",
        "Check network access and the repository URL, or set up SSH keys.",
    ),
];

/// `(trigger, practice)`.
const PRACTICES: &[(&str, &str)] = &[
    (
        r"\bpython3?\b|\bvenv\b|\bvirtual environment\b",
        "Run the project inside a virtual environment to isolate its dependencies.",
    ),
    (
        r"\bdocker\b",
        "Pin image tags instead of relying on `latest`.",
    ),
    (
        r"\b(?:token|secret|password|api key|credentials?)\b",
        "Keep credentials out of source control and load them from environment variables.",
    ),
    (
        r"\b(?:train|model|simulat)",
        "Version trained models together with the data and settings used to produce them.",
    ),
    (
        r"\bconfig|\.env\b|\benvironment variables?\b",
        "Keep configuration in one place and document every option.",
    ),
    (
        r"\b(?:log|logs|logging)\b",
        "Check the logs first when a run behaves unexpectedly.",
    ),
];

/// `(trigger, label, consideration)`.
const EDGE_CASES: &[(&str, &str, &str)] = &[
    (
        r"\b(?:large|scale|performance|dataset)",
        "Large inputs",
        "check memory and runtime limits before running on full datasets.",
    ),
    (
        r"\b(?:network|http|api|remote|download)",
        "Network failures",
        "retry transient errors and set timeouts on remote calls.",
    ),
    (
        r"\b(?:parallel|concurren|multiple|simultaneous)",
        "Concurrent runs",
        "make sure parallel steps do not write to the same files.",
    ),
    (
        r"\b(?:fail|error|retry|rollback)",
        "Partial failures",
        "make each step safe to re-run after an interruption.",
    ),
    (
        r"\b(?:config|environment|env)\b",
        "Environment differences",
        "verify configuration values in every environment the workflow runs in.",
    ),
];

/// Compiled `(trigger, payload)` pairs.
fn triggers<T: Copy>(table: &[(&str, T)]) -> Vec<(Regex, T)> {
    table
        .iter()
        .map(|&(pattern, payload)| (Regex::new(pattern).expect("valid regex"), payload))
        .collect()
}

static ISSUE_MATCHERS: LazyLock<Vec<(Regex, (&str, &str))>> = LazyLock::new(|| {
    let table: Vec<(&str, (&str, &str))> = ISSUES.iter().map(|&(p, i, s)| (p, (i, s))).collect();
    triggers(&table)
});

static PRACTICE_MATCHERS: LazyLock<Vec<(Regex, &str)>> = LazyLock::new(|| triggers(PRACTICES));

static EDGE_MATCHERS: LazyLock<Vec<(Regex, (&str, &str))>> = LazyLock::new(|| {
    let table: Vec<(&str, (&str, &str))> =
        EDGE_CASES.iter().map(|&(p, l, c)| (p, (l, c))).collect();
    triggers(&table)
});

static PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bports?\b").expect("valid regex"));

static METHOD_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w\.\w+\(").expect("valid regex"));

static ENDPOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(GET|POST|PUT|PATCH|DELETE)\s+(/[\w/{}.:-]*)").expect("valid regex")
});

static BASE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[A-Za-z0-9.-]+(?::\d+)?").expect("valid regex"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*\S)\s*$").expect("valid regex"));

static SOURCE_ACTIVATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:source|\.)\s+(?:(\S+)/)?bin/activate\s*$").expect("valid regex")
});

static SCRIPTS_ACTIVATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\S+)\\)?Scripts\\activate(?:\.bat)?\s*$").expect("valid regex")
});

static EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s+(\w+)=(.*)$").expect("valid regex"));

static SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^set\s+(\w+)=(.*)$").expect("valid regex"));

static PYTHON3_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(python|pip)3\b").expect("valid regex"));

/// `(pattern, equivalent)` rewrites of common commands.
const VARIATIONS: &[(&str, &str)] = &[
    (r"^docker-compose\s+(.+)$", "docker compose $1"),
    (r"^docker\s+compose\s+(.+)$", "docker-compose $1"),
    (r"^npm\s+(?:install|i)\s+(\S.*)$", "yarn add $1"),
    (r"^npm\s+(?:install|i|ci)\s*$", "yarn install"),
    (r"^npm\s+run\s+(.+)$", "yarn $1"),
    (r"^yarn\s+add\s+(.+)$", "npm install $1"),
    (r"^pip3?\s+install\s+(.+)$", "python -m pip install $1"),
    (r"^python3?\s+-m\s+pip\s+install\s+(.+)$", "pip install $1"),
    (r"^wget\s+(\S+)$", "curl -LO $1"),
    (r"^curl\s+-LO\s+(\S+)$", "wget $1"),
];

static VARIATION_RULES: LazyLock<Vec<(Regex, &str)>> = LazyLock::new(|| triggers(VARIATIONS));

static DATA_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-?\s*([A-Za-z_][\w.-]*)\s*[=:]\s*(.*?)\s*$").expect("valid regex")
});

static SHELL_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+|set\s+)?([A-Z_][A-Z0-9_]*)=(\S*)").expect("valid regex")
});

/// Fence languages that hold program output rather than code.
const OUTPUT_LANGUAGES: &[&str] = &["output", "text", "txt", "plaintext", "console-output", "log"];

// ---------------------------------------------------------------------------
// Installation
// ---------------------------------------------------------------------------

fn quick_start(ctx: &SectionContext<'_>) -> Option<String> {
    let first = ctx.commands.first()?;
    Some(format!(
        "This is the fastest way to get started.\n\n{}",
        fence(command_language(first), &first.line)
    ))
}

fn detailed_steps(ctx: &SectionContext<'_>) -> Option<String> {
    let tools = detected_tools(ctx);
    if tools.is_empty() && ctx.commands.is_empty() {
        return None;
    }

    let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
    let first_in = |slot| ctx.commands_in(slot).next().map(|c| format!("Run `{}`.", c.line));

    let prerequisites = first_in(InstallSlot::Prerequisites).unwrap_or_else(|| {
        if names.is_empty() {
            InstallSlot::Prerequisites.generic_step().to_string()
        } else {
            format!("Install {}.", join_names(&names))
        }
    });
    let environment = first_in(InstallSlot::Environment)
        .unwrap_or_else(|| InstallSlot::Environment.generic_step().to_string());
    let dependencies = first_in(InstallSlot::Dependencies)
        .unwrap_or_else(|| InstallSlot::Dependencies.generic_step().to_string());
    let verification = first_in(InstallSlot::Verification)
        .or_else(|| tools.first().map(|t| format!("Run `{}`.", t.version)))
        .unwrap_or_else(|| InstallSlot::Verification.generic_step().to_string());

    Some(format!(
        "1. **Prerequisites**: {prerequisites}\n\
         2. **Environment setup**: {environment}\n\
         3. **Dependency installation**: {dependencies}\n\
         4. **Verification**: {verification}"
    ))
}

fn platform_specific(ctx: &SectionContext<'_>) -> Option<String> {
    let mut unix = Vec::new();
    let mut windows = Vec::new();

    for command in &ctx.commands {
        let line = command.line.as_str();
        let (u, w) = if is_windows_command(line) {
            (to_unix(line), line.to_string())
        } else {
            (line.to_string(), to_windows(line))
        };
        if u != w && !unix.contains(&u) {
            unix.push(u);
            windows.push(w);
        }
    }

    if unix.is_empty() {
        return None;
    }

    Some(format!(
        "**macOS / Linux:**\n\n{}\n\n**Windows:**\n\n{}",
        fence("bash", &unix.join("\n")),
        fence("cmd", &windows.join("\n"))
    ))
}

fn is_windows_command(line: &str) -> bool {
    SCRIPTS_ACTIVATE_RE.is_match(line) || SET_RE.is_match(line)
}

fn to_windows(line: &str) -> String {
    if let Some(caps) = SOURCE_ACTIVATE_RE.captures(line) {
        return match caps.get(1) {
            Some(dir) => format!("{}\\Scripts\\activate", dir.as_str().replace('/', "\\")),
            None => "Scripts\\activate".to_string(),
        };
    }
    if let Some(caps) = EXPORT_RE.captures(line) {
        return format!("set {}={}", &caps[1], &caps[2]);
    }
    PYTHON3_RE.replace_all(line, "$1").into_owned()
}

fn to_unix(line: &str) -> String {
    if let Some(caps) = SCRIPTS_ACTIVATE_RE.captures(line) {
        return match caps.get(1) {
            Some(dir) => format!("source {}/bin/activate", dir.as_str().replace('\\', "/")),
            None => "source bin/activate".to_string(),
        };
    }
    if let Some(caps) = SET_RE.captures(line) {
        return format!("export {}={}", &caps[1], &caps[2]);
    }
    line.to_string()
}

fn verify_installation(ctx: &SectionContext<'_>) -> Option<String> {
    let mut checks: Vec<String> = ctx
        .commands_in(InstallSlot::Verification)
        .map(|c| c.line.clone())
        .collect();
    if checks.is_empty() {
        checks = detected_tools(ctx)
            .iter()
            .map(|t| t.version.to_string())
            .collect();
    }
    if checks.is_empty() {
        return None;
    }

    Some(format!(
        "Confirm the installation with:\n\n{}",
        fence("bash", &checks.join("\n"))
    ))
}

fn common_issues(ctx: &SectionContext<'_>) -> Option<String> {
    let rows: Vec<String> = ISSUE_MATCHERS
        .iter()
        .filter(|(re, _)| ctx.mentions(re))
        .map(|(_, (issue, solution))| format!("| {issue} | {solution} |"))
        .collect();
    if rows.is_empty() {
        return None;
    }

    Some(format!(
        "| Issue | Solution |\n|-------|----------|\n{}",
        rows.join("\n")
    ))
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

fn basic_example(ctx: &SectionContext<'_>) -> Option<String> {
    let block = ctx.blocks.first()?;
    Some(format!(
        "A minimal example:\n\n{}",
        fence(effective_language(block), &block.content)
    ))
}

fn advanced_example(ctx: &SectionContext<'_>) -> Option<String> {
    let (first, rest) = ctx.blocks.split_first()?;
    let language = effective_language(first);
    let second = rest.iter().find(|b| effective_language(b) == language)?;
    let marker = LanguageFamily::of(first).comment_marker()?;

    let combined = format!(
        "{marker} Step 1\n{}\n\n{marker} Step 2\n{}",
        first.content.trim_end(),
        second.content.trim_end()
    );
    Some(format!(
        "Combining the examples above:\n\n{}",
        fence(language, &combined)
    ))
}

fn use_cases(ctx: &SectionContext<'_>) -> Option<String> {
    let actions = extract_actions(&ctx.section.content);
    if actions.is_empty() {
        return None;
    }
    let items: Vec<String> = actions
        .iter()
        .take(5)
        .map(|a| format!("- {}", capitalize(a)))
        .collect();
    Some(items.join("\n"))
}

fn best_practices(ctx: &SectionContext<'_>) -> Option<String> {
    bullet_list(
        PRACTICE_MATCHERS
            .iter()
            .filter(|(re, _)| ctx.mentions(re))
            .map(|(_, practice)| practice.to_string()),
    )
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

fn request_examples(ctx: &SectionContext<'_>) -> Option<String> {
    let mut parts: Vec<String> = ctx
        .blocks
        .iter()
        .filter(|b| invokes_something(b))
        .map(|b| fence(effective_language(b), &b.content))
        .collect();

    let base = BASE_URL_RE
        .find(&ctx.section.content)
        .map(|m| m.as_str())
        .unwrap_or("http://localhost:8000");

    let mut seen = HashSet::new();
    let requests: Vec<String> = ENDPOINT_RE
        .captures_iter(&ctx.section.content)
        .filter(|caps| seen.insert((caps[1].to_string(), caps[2].to_string())))
        .map(|caps| match &caps[1] {
            "GET" | "DELETE" => format!("curl -X {} {base}{}", &caps[1], &caps[2]),
            method => format!(
                "curl -X {method} {base}{} -H \"Content-Type: application/json\" -d @request.json",
                &caps[2]
            ),
        })
        .collect();
    if !requests.is_empty() {
        parts.push(format!(
            "Calling the endpoints with `curl`:\n\n{}",
            fence("bash", &requests.join("\n"))
        ));
    }

    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn invokes_something(block: &CodeBlock) -> bool {
    match LanguageFamily::of(block) {
        LanguageFamily::Script => METHOD_CALL_RE.is_match(&block.content),
        LanguageFamily::Shell | LanguageFamily::Batch => {
            block.content.lines().any(|l| l.trim_start().starts_with("curl"))
        }
        _ => false,
    }
}

fn response_examples(ctx: &SectionContext<'_>) -> Option<String> {
    let responses: Vec<String> = ctx
        .blocks
        .iter()
        .filter(|b| LanguageFamily::of(b) == LanguageFamily::Json)
        .map(|b| fence("json", &b.content))
        .collect();
    if responses.is_empty() {
        return None;
    }
    Some(format!("Example response:\n\n{}", responses.join("\n\n")))
}

fn error_handling(ctx: &SectionContext<'_>) -> Option<String> {
    let script_call = ctx
        .blocks
        .iter()
        .filter(|b| LanguageFamily::of(b) == LanguageFamily::Script)
        .flat_map(|b| b.content.lines())
        .map(str::trim)
        .find(|line| {
            !line.starts_with('#')
                && !line.starts_with("def ")
                && !line.starts_with("import ")
                && !line.starts_with("from ")
                && METHOD_CALL_RE.is_match(line)
        });

    if let Some(call) = script_call {
        let code = format!(
            "try:\n    {call}\nexcept Exception as exc:\n    print(f\"Request failed: {{exc}}\")\n    raise"
        );
        return Some(format!("Wrap calls so failures are reported:\n\n{}", fence("python", &code)));
    }

    let curl = ctx.commands.iter().find(|c| c.head() == "curl")?;
    let code = format!(
        "if ! {} --fail --silent --show-error; then\n    echo \"Request failed\" >&2\n    exit 1\nfi",
        curl.line
    );
    Some(format!("Fail loudly on HTTP errors:\n\n{}", fence("bash", &code)))
}

// ---------------------------------------------------------------------------
// Examples / workflow
// ---------------------------------------------------------------------------

fn code_variations(ctx: &SectionContext<'_>) -> Option<String> {
    let mut rows: Vec<(String, String)> = Vec::new();
    for command in &ctx.commands {
        let line = command.line.trim();
        let Some((re, template)) = VARIATION_RULES.iter().find(|(re, _)| re.is_match(line)) else {
            continue;
        };
        let variant = re.replace(line, *template).into_owned();
        if !rows.iter().any(|(original, _)| original == line) {
            rows.push((line.to_string(), variant));
        }
    }
    if rows.is_empty() {
        return None;
    }

    let table: Vec<String> = rows
        .iter()
        .take(5)
        .map(|(original, variant)| format!("| `{original}` | `{variant}` |"))
        .collect();
    Some(format!(
        "| Command | Equivalent |\n|---------|------------|\n{}",
        table.join("\n")
    ))
}

fn expected_output(ctx: &SectionContext<'_>) -> Option<String> {
    let outputs: Vec<String> = ctx
        .blocks
        .iter()
        .filter(|b| match b.language.as_deref() {
            Some(language) => OUTPUT_LANGUAGES.contains(&language),
            None => detect_language(&b.content).is_none(),
        })
        .map(|b| fence("text", &b.content))
        .collect();
    if outputs.is_empty() {
        return None;
    }
    Some(format!("Running the example prints:\n\n{}", outputs.join("\n\n")))
}

fn step_by_step(ctx: &SectionContext<'_>) -> Option<String> {
    let mut items = Vec::new();
    let mut in_fence = false;
    for line in ctx.section.content.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = BULLET_RE.captures(line) {
            items.push(caps[1].to_string());
        }
    }
    if items.len() < 2 {
        return None;
    }

    let steps: Vec<String> = items
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect();
    Some(steps.join("\n"))
}

fn edge_cases(ctx: &SectionContext<'_>) -> Option<String> {
    bullet_list(
        EDGE_MATCHERS
            .iter()
            .filter(|(re, _)| ctx.mentions(re))
            .map(|(_, (label, note))| format!("**{label}**: {note}")),
    )
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn configuration_options(ctx: &SectionContext<'_>) -> Option<String> {
    let mut options: Vec<(String, String)> = Vec::new();
    let mut push = |key: &str, value: &str| {
        let key = key.trim().trim_matches('`').to_string();
        if !key.is_empty() && !options.iter().any(|(k, _)| *k == key) {
            let value = value.trim().trim_matches('`').trim_matches('"').to_string();
            options.push((key, value));
        }
    };

    for table in &ctx.section.tables {
        let mut rows = table.lines().map(table_cells).filter(|cells| !is_separator(cells));
        let Some(header) = rows.next() else { continue };
        let default_col = header
            .iter()
            .position(|h| h.to_lowercase().contains("default"))
            .unwrap_or(1);
        for row in rows {
            if let Some(key) = row.first() {
                push(key.as_str(), row.get(default_col).map(String::as_str).unwrap_or(""));
            }
        }
    }

    for block in &ctx.blocks {
        match LanguageFamily::of(block) {
            LanguageFamily::StructuredData => {
                for caps in block.content.lines().filter_map(|l| DATA_KEY_RE.captures(l)) {
                    if !caps[2].is_empty() {
                        push(&caps[1], &caps[2]);
                    }
                }
            }
            LanguageFamily::Shell | LanguageFamily::Batch => {
                for caps in block.content.lines().filter_map(|l| SHELL_KEY_RE.captures(l)) {
                    push(&caps[1], &caps[2]);
                }
            }
            _ => {}
        }
    }

    if options.is_empty() {
        return None;
    }

    let rows: Vec<String> = options
        .iter()
        .map(|(key, value)| {
            let value = if value.is_empty() {
                "-".to_string()
            } else {
                format!("`{value}`")
            };
            format!("| `{key}` | {value} |")
        })
        .collect();
    Some(format!(
        "| Option | Default |\n|--------|---------|\n{}",
        rows.join("\n")
    ))
}

pub(crate) fn table_cells(row: &str) -> Vec<String> {
    row.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

// ---------------------------------------------------------------------------
// Troubleshooting
// ---------------------------------------------------------------------------

fn debugging_steps(ctx: &SectionContext<'_>) -> Option<String> {
    let mut commands: Vec<&str> = detected_tools(ctx)
        .iter()
        .flat_map(|t| t.diagnostics.iter().copied())
        .collect();
    if ctx.mentions(&PORT_RE) {
        commands.push("lsof -i :<port>");
    }
    if commands.is_empty() {
        return None;
    }
    Some(format!(
        "Collect diagnostics with:\n\n{}",
        fence("bash", &commands.join("\n"))
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn command_language(command: &Command) -> &str {
    command.language.as_deref().unwrap_or("bash")
}

fn bullet_list(items: impl Iterator<Item = String>) -> Option<String> {
    let lines: Vec<String> = items.map(|item| format!("- {item}")).collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `["A", "B", "C"]` → `"A, B and C"`.
fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_for(section: &Section) -> SectionContext<'_> {
        SectionContext::new(section)
    }

    fn install_section() -> Section {
        Section::new(
            "Installation",
            2,
            "Clone and install:\n\n```bash\ngit clone https://github.com/acme/radp.git\ncd radp\npython3 -m venv venv\nsource venv/bin/activate\npip install -r requirements.txt\n```",
        )
    }

    #[test]
    fn every_type_lists_subsections_in_append_order() {
        let order = [
            Subsection::QuickStart,
            Subsection::DetailedSteps,
            Subsection::PlatformSpecific,
            Subsection::VerifyInstallation,
            Subsection::CommonIssues,
            Subsection::BasicExample,
            Subsection::AdvancedExample,
            Subsection::UseCases,
            Subsection::BestPractices,
            Subsection::RequestExamples,
            Subsection::ResponseExamples,
            Subsection::ErrorHandling,
            Subsection::CodeVariations,
            Subsection::ExpectedOutput,
            Subsection::StepByStep,
            Subsection::EdgeCases,
            Subsection::ConfigurationOptions,
            Subsection::Solutions,
            Subsection::DebuggingSteps,
        ];
        for section_type in SectionType::ALL {
            let positions: Vec<usize> = composer_for(section_type)
                .iter()
                .map(|s| order.iter().position(|o| o == s).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{section_type}");
        }
        assert!(composer_for(SectionType::Generic).is_empty());
    }

    #[test]
    fn quick_start_uses_first_command() {
        let section = install_section();
        let body = quick_start(&ctx_for(&section)).unwrap();
        assert_eq!(
            body,
            "This is the fastest way to get started.\n\n```bash\ngit clone https://github.com/acme/radp.git\n```"
        );
    }

    #[test]
    fn detailed_steps_name_commands_and_tools() {
        let section = install_section();
        let body = detailed_steps(&ctx_for(&section)).unwrap();
        assert!(body.contains("1. **Prerequisites**: Run `git clone https://github.com/acme/radp.git`."));
        assert!(body.contains("2. **Environment setup**: Run `python3 -m venv venv`."));
        assert!(body.contains("3. **Dependency installation**: Run `pip install -r requirements.txt`."));
        assert!(body.contains("4. **Verification**: Run `python --version`."));
    }

    #[test]
    fn platform_variants_for_environment_commands() {
        let section = install_section();
        let body = platform_specific(&ctx_for(&section)).unwrap();
        assert_eq!(
            body,
            "**macOS / Linux:**\n\n```bash\npython3 -m venv venv\nsource venv/bin/activate\n```\n\n\
             **Windows:**\n\n```cmd\npython -m venv venv\nvenv\\Scripts\\activate\n```"
        );
    }

    #[test]
    fn windows_commands_get_unix_variants() {
        assert_eq!(to_unix(".venv\\Scripts\\activate"), "source .venv/bin/activate");
        assert_eq!(to_unix("set RADP_PORT=8080"), "export RADP_PORT=8080");
        assert_eq!(to_windows("export RADP_PORT=8080"), "set RADP_PORT=8080");
    }

    #[test]
    fn verification_falls_back_to_tool_versions() {
        let section = install_section();
        let body = verify_installation(&ctx_for(&section)).unwrap();
        assert!(body.ends_with("```bash\npython --version\ngit --version\n```"));

        let explicit = Section::new("Setup", 2, "```bash\ndocker --version\n```");
        let body = verify_installation(&ctx_for(&explicit)).unwrap();
        assert!(body.ends_with("```bash\ndocker --version\n```"));
    }

    #[test]
    fn common_issues_are_keyword_triggered() {
        let section = install_section();
        let body = common_issues(&ctx_for(&section)).unwrap();
        assert!(body.starts_with("| Issue | Solution |"));
        assert!(body.contains("Wrong Python version"));
        assert!(body.contains("Repository clone fails"));
        assert!(!body.contains("Docker"));

        let plain = Section::new("Setup", 2, "Nothing to see.");
        assert_eq!(common_issues(&ctx_for(&plain)), None);
    }

    #[test]
    fn usage_examples() {
        let section = Section::new(
            "Usage",
            2,
            "Train a model first.\n\n```python\nclient.train(\"a\")\n```\n\nThen simulate:\n\n```python\nclient.simulate(\"b\")\n```",
        );
        let ctx = ctx_for(&section);
        assert_eq!(
            basic_example(&ctx).unwrap(),
            "A minimal example:\n\n```python\nclient.train(\"a\")\n```"
        );
        assert_eq!(
            advanced_example(&ctx).unwrap(),
            "Combining the examples above:\n\n```python\n# Step 1\nclient.train(\"a\")\n\n# Step 2\nclient.simulate(\"b\")\n```"
        );
        assert_eq!(use_cases(&ctx).unwrap(), "- Train a model first");
        assert!(best_practices(&ctx).unwrap().contains("Version trained models"));
    }

    #[test]
    fn advanced_example_needs_two_blocks_of_one_language() {
        let section = Section::new("Usage", 2, "```python\na.b()\n```\n\n```bash\nls\n```");
        assert_eq!(advanced_example(&ctx_for(&section)), None);
    }

    #[test]
    fn api_requests_responses_and_errors() {
        let section = Section::new(
            "API Reference",
            2,
            "The server listens on http://localhost:8080.\n\n`POST /simulation` starts a run. `GET /simulation/{id}` polls it.\n\n```python\nresult = client.simulate(config)\n```\n\n```json\n{\"id\": \"42\"}\n```",
        );
        let ctx = ctx_for(&section);

        let requests = request_examples(&ctx).unwrap();
        assert!(requests.contains("```python\nresult = client.simulate(config)\n```"));
        assert!(requests.contains(
            "curl -X POST http://localhost:8080/simulation -H \"Content-Type: application/json\" -d @request.json"
        ));
        assert!(requests.contains("curl -X GET http://localhost:8080/simulation/{id}"));

        assert_eq!(
            response_examples(&ctx).unwrap(),
            "Example response:\n\n```json\n{\"id\": \"42\"}\n```"
        );

        let errors = error_handling(&ctx).unwrap();
        assert!(errors.contains("try:\n    result = client.simulate(config)\nexcept Exception as exc:"));
    }

    #[test]
    fn curl_error_handling_without_script_calls() {
        let section = Section::new("API", 2, "```bash\ncurl http://localhost:8080/health\n```");
        let errors = error_handling(&ctx_for(&section)).unwrap();
        assert!(errors.contains("if ! curl http://localhost:8080/health --fail"));
    }

    #[test]
    fn expected_output_from_text_blocks() {
        let section = Section::new(
            "Examples",
            2,
            "```bash\ndocker exec radp ls\n```\n\n```text\nmodel.pkl\n```",
        );
        assert_eq!(
            expected_output(&ctx_for(&section)).unwrap(),
            "Running the example prints:\n\n```text\nmodel.pkl\n```"
        );
    }

    #[test]
    fn variations_rewrite_known_commands() {
        let section = Section::new(
            "Examples",
            2,
            "```bash\ndocker-compose up -d\nnpm install radp-client\npip install radp\nls -la\ndocker-compose up -d\n```",
        );
        assert_eq!(
            code_variations(&ctx_for(&section)).unwrap(),
            "| Command | Equivalent |\n|---------|------------|\n\
             | `docker-compose up -d` | `docker compose up -d` |\n\
             | `npm install radp-client` | `yarn add radp-client` |\n\
             | `pip install radp` | `python -m pip install radp` |"
        );

        let plain = Section::new("Examples", 2, "```bash\nls -la\n```");
        assert_eq!(code_variations(&ctx_for(&plain)), None);
    }

    #[test]
    fn workflow_bullets_become_steps() {
        let section = Section::new(
            "Development Workflow",
            2,
            "- Fork the repository\n- Create a branch\n* Open a pull request\n\n```\n- not a step\n```",
        );
        let ctx = ctx_for(&section);
        assert_eq!(
            step_by_step(&ctx).unwrap(),
            "1. Fork the repository\n2. Create a branch\n3. Open a pull request"
        );
        assert_eq!(edge_cases(&ctx), None);
    }

    #[test]
    fn edge_cases_are_keyword_triggered() {
        let section = Section::new("Pipeline", 2, "Runs on large datasets; retry on error.");
        let body = edge_cases(&ctx_for(&section)).unwrap();
        assert_eq!(
            body,
            "- **Large inputs**: check memory and runtime limits before running on full datasets.\n\
             - **Partial failures**: make each step safe to re-run after an interruption."
        );
    }

    #[test]
    fn configuration_options_from_tables_and_code() {
        let mut section = Section::new(
            "Configuration",
            2,
            "```bash\nexport RADP_PORT=8080\n```\n\n```yaml\nservices:\n  web:\n    image: radp:latest\n```",
        );
        section.tables = vec![
            "| Name | Description | Default |\n|------|-------------|---------|\n| `RADP_HOME` | Data dir | `~/.radp` |\n| RADP_PORT | Port | 9000 |"
                .to_string(),
        ];
        let body = configuration_options(&ctx_for(&section)).unwrap();
        assert_eq!(
            body,
            "| Option | Default |\n|--------|---------|\n\
             | `RADP_HOME` | `~/.radp` |\n\
             | `RADP_PORT` | `9000` |\n\
             | `image` | `radp:latest` |"
        );
    }

    #[test]
    fn debugging_steps_follow_detected_tools() {
        let section = Section::new("Troubleshooting", 2, "If docker fails, check the port.");
        assert_eq!(
            debugging_steps(&ctx_for(&section)).unwrap(),
            "Collect diagnostics with:\n\n```bash\ndocker ps -a\ndocker logs <container>\nlsof -i :<port>\n```"
        );
        let quiet = Section::new("Troubleshooting", 2, "Ask for help.");
        assert_eq!(debugging_steps(&ctx_for(&quiet)), None);
    }

    #[test]
    fn names_are_joined() {
        assert_eq!(join_names(&["Python"]), "Python");
        assert_eq!(join_names(&["Python", "Docker", "Git"]), "Python, Docker and Git");
    }
}
