//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docsmith_core::pipeline::{
    ProgressReporter, RunConfig, RunResult, SilentProgress, parse_documents,
};
use docsmith_core::{SectionEnhancer, format_qa_section, generate_qa_pairs};
use docsmith_markdown::{discover_documents, read_document};
use docsmith_shared::{
    AppConfig, QaStyle, SectionType, config_file_path, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsmith: enhance markdown documentation and mine it for Q&A.
#[derive(Parser)]
#[command(
    name = "docsmith",
    version,
    about = "Enhance markdown documentation and mine it for Q&A pairs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docsmith/docsmith.toml.
    #[arg(long, env = "DOCSMITH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enhance every markdown file in a source and write the output directory.
    Generate {
        /// Markdown file or directory (defaults to the configured source_dir).
        #[arg(short, long, env = "DOCSMITH_SOURCE_DIR")]
        source: Option<PathBuf>,

        /// Output directory (defaults to the configured output_dir).
        #[arg(short, long, env = "DOCSMITH_OUTPUT_DIR")]
        out: Option<PathBuf>,

        /// FAQ style: simple, collapsible, or numbered.
        #[arg(long, env = "DOCSMITH_QA_STYLE")]
        style: Option<String>,

        /// Omit the table of contents.
        #[arg(long)]
        no_toc: bool,
    },

    /// Print the enhanced sections of one markdown file.
    Enhance {
        /// Markdown file to enhance.
        file: PathBuf,

        /// Treat every section as this type instead of classifying it.
        #[arg(long)]
        section_type: Option<SectionType>,
    },

    /// Print the FAQ mined from markdown files or directories.
    Qa {
        /// Files or directories to read.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// FAQ style: simple, collapsible, or numbered.
        #[arg(long, env = "DOCSMITH_QA_STYLE")]
        style: Option<String>,

        /// Print the pairs as JSON instead of markdown.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
    /// Check the config file for invalid values.
    Validate,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. `DOCSMITH_LOG` overrides `-v`.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsmith=info",
        1 => "docsmith=debug",
        _ => "docsmith=trace",
    };

    let env_filter =
        EnvFilter::try_from_env("DOCSMITH_LOG").unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `enhance` and `qa` output can be piped.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Generate {
            source,
            out,
            style,
            no_toc,
        } => {
            let config = resolve_valid_config(config_path.as_deref())?;
            cmd_generate(&config, source, out, style, no_toc).await
        }
        Command::Enhance { file, section_type } => {
            let config = resolve_valid_config(config_path.as_deref())?;
            cmd_enhance(&config, &file, section_type).await
        }
        Command::Qa { paths, style, json } => {
            let config = resolve_valid_config(config_path.as_deref())?;
            cmd_qa(&config, &paths, style, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
            ConfigAction::Validate => cmd_config_validate(config_path.as_deref()).await,
        },
    }
}

/// Load from `--config` when given, else the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// [`resolve_config`], rejecting values the pipeline cannot run with.
fn resolve_valid_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = resolve_config(path)?;
    config.validate()?;
    Ok(config)
}

fn resolve_style(config: &AppConfig, style: Option<String>) -> String {
    let style = style.unwrap_or_else(|| config.output.qa_style.clone());
    if style.parse::<QaStyle>().is_err() {
        warn!(style = %style, "unknown FAQ style, using simple");
    }
    style
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(
    config: &AppConfig,
    source: Option<PathBuf>,
    out: Option<PathBuf>,
    style: Option<String>,
    no_toc: bool,
) -> Result<()> {
    let mut run_config = RunConfig::from_app_config(config, env!("CARGO_PKG_VERSION"));
    if let Some(source) = source {
        run_config.source = source;
    }
    if let Some(out) = out {
        run_config.output_dir = out;
    }
    run_config.qa_style = resolve_style(config, style);
    run_config.include_toc = run_config.include_toc && !no_toc;

    if !run_config.source.exists() {
        return Err(eyre!(
            "source '{}' does not exist",
            run_config.source.display()
        ));
    }

    info!(
        source = %run_config.source.display(),
        out = %run_config.output_dir.display(),
        style = %run_config.qa_style,
        "generating documentation"
    );

    let reporter = CliProgress::new();
    let result = docsmith_core::run(&run_config, &reporter).await?;

    // Print summary
    println!();
    println!("  Documentation generated!");
    println!("  Documents: {}", result.document_count);
    println!("  Sections:  {}", result.section_count);
    println!("  Q&A pairs: {}", result.qa_pair_count);
    println!("  Output:    {}", result.document_path.display());
    println!("  Run ID:    {}", result.manifest.id);
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_enhance(
    config: &AppConfig,
    file: &Path,
    section_type: Option<SectionType>,
) -> Result<()> {
    let doc = read_document(file)?;
    let enhancer = SectionEnhancer::new(config.enhancement.clone());

    let sections = doc
        .flat_sections()
        .into_iter()
        .map(|section| enhancer.enhance(section, section_type))
        .collect::<docsmith_shared::Result<Vec<_>>>()?;

    info!(file = %file.display(), sections = sections.len(), "enhanced document");
    println!("{}", sections.join("\n\n"));
    Ok(())
}

async fn cmd_qa(config: &AppConfig, inputs: &[PathBuf], style: Option<String>, json: bool) -> Result<()> {
    let mut paths = Vec::new();
    for input in inputs {
        paths.extend(discover_documents(input)?);
    }
    if paths.is_empty() {
        return Err(eyre!("no markdown files found"));
    }

    let docs = parse_documents(&paths, config.defaults.concurrency, &SilentProgress).await?;
    let pairs = generate_qa_pairs(&docs, &config.qa)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pairs)?);
    } else {
        let style = resolve_style(config, style);
        print!("{}", format_qa_section(&pairs, &style));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

async fn cmd_config_validate(path: Option<&Path>) -> Result<()> {
    let shown = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    resolve_valid_config(path)?;
    println!("Config OK: {}", shown.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_parsed(&self, file_name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Parsed [{current}/{total}] {file_name}"));
    }

    fn section_enhanced(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Enhanced [{current}/{total}] {title}"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_enhance_with_section_type() {
        let cli = Cli::try_parse_from(["docsmith", "enhance", "README.md", "--section-type", "usage"])
            .unwrap();
        match cli.command {
            Command::Enhance { file, section_type } => {
                assert_eq!(file, PathBuf::from("README.md"));
                assert_eq!(section_type, Some(SectionType::Usage));
            }
            _ => panic!("expected enhance"),
        }
    }

    #[test]
    fn rejects_unknown_section_type() {
        assert!(
            Cli::try_parse_from(["docsmith", "enhance", "README.md", "--section-type", "intro"])
                .is_err()
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let path = std::env::temp_dir().join(format!(
            "docsmith-cli-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[qa]\nmax_per_section = 0\n").unwrap();

        assert!(resolve_config(Some(&path)).is_ok());
        assert!(resolve_valid_config(Some(&path)).is_err());

        std::fs::write(&path, "[qa]\nmax_per_section = 4\nmin_per_section = 2\n").unwrap();
        let config = resolve_valid_config(Some(&path)).unwrap();
        assert_eq!(config.qa.max_per_section, 4);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn qa_requires_a_path() {
        assert!(Cli::try_parse_from(["docsmith", "qa"]).is_err());
        let cli = Cli::try_parse_from(["docsmith", "-vv", "qa", "docs", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Qa { json: true, .. }));
    }
}
