//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use syncreport_controller::Source;
use syncreport_core::{
    EnvironmentTitle, Outcome, ProgressReporter, RunConfig, RunSummary, aggregate, render,
};
use syncreport_shared::{
    AppConfig, ControllerOverrides, ControllerSettings, IdentifierPolicy, SourceKind, WriteMode,
    init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// syncreport: GitOps application versions as a living Markdown report.
#[derive(Parser)]
#[command(
    name = "syncreport",
    version,
    about = "Group GitOps controller applications by environment and keep a Markdown report section up to date.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.syncreport/syncreport.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format for `render`.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum ReportFormat {
    Markdown,
    Json,
}

/// Where application records come from.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct SourceArgs {
    /// Record source: api, cli, or file (defaults to the config file value).
    #[arg(long)]
    pub source: Option<SourceKind>,

    /// Controller address (overrides INPUT_ARGOCD_SERVER / ARGOCD_SERVER).
    #[arg(long)]
    pub server: Option<String>,

    /// Controller token (overrides INPUT_ARGOCD_TOKEN / the configured token env var).
    #[arg(long)]
    pub token: Option<String>,

    /// Saved JSON listing to read instead of contacting the controller.
    #[arg(long)]
    pub from_file: Option<PathBuf>,

    /// Skip application names that cannot be classified instead of failing.
    #[arg(long)]
    pub lenient: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch applications and update the report section of the target document.
    Update {
        #[command(flatten)]
        source: SourceArgs,

        /// Target document (defaults to README.md).
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Marker heading of the generated section (defaults to "## Example Output").
        #[arg(short, long)]
        marker: Option<String>,

        /// merge (replace the marked section) or overwrite (replace the whole document).
        #[arg(long)]
        mode: Option<WriteMode>,

        /// Do not write; exit non-zero if the document is out of date.
        #[arg(long)]
        check: bool,
    },

    /// Fetch applications and print the report to stdout.
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format.
        #[arg(long, default_value = "markdown")]
        format: ReportFormat,

        /// Marker heading the report will live under (sets the heading level).
        #[arg(short, long)]
        marker: Option<String>,
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
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "syncreport=info",
        1 => "syncreport=debug",
        _ => "syncreport=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Update {
            source,
            document,
            marker,
            mode,
            check,
        } => cmd_update(config_path, &source, document, marker, mode, check).await,
        Command::Render {
            source,
            format,
            marker,
        } => cmd_render(config_path, &source, format, marker).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file named on the command line, or the default one.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

/// Build the record source from config, environment, and flags.
fn build_source(config: &AppConfig, args: &SourceArgs) -> Result<Source> {
    // A saved listing implies the file source unless one was named explicitly.
    let source = args
        .source
        .or_else(|| args.from_file.as_ref().map(|_| SourceKind::File));

    let overrides = ControllerOverrides {
        source,
        server: args.server.clone(),
        token: args.token.clone(),
        input_file: args.from_file.clone(),
    };

    let settings =
        ControllerSettings::resolve(&config.controller, &overrides, |key| std::env::var(key).ok())?;
    Ok(Source::from_settings(&settings)?)
}

fn identifier_policy(config: &AppConfig, args: &SourceArgs) -> IdentifierPolicy {
    if args.lenient {
        IdentifierPolicy::Lenient
    } else {
        config.report.identifiers
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_update(
    config_path: Option<&Path>,
    args: &SourceArgs,
    document: Option<PathBuf>,
    marker: Option<String>,
    mode: Option<WriteMode>,
    check: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let source = build_source(&config, args)?;

    let run_config = RunConfig {
        document: document.unwrap_or_else(|| PathBuf::from(&config.report.document)),
        marker: marker.unwrap_or_else(|| config.report.marker.clone()),
        identifiers: identifier_policy(&config, args),
        mode: mode.unwrap_or(config.report.mode),
        check,
    };

    info!(
        source = %source.describe(),
        document = %run_config.document.display(),
        marker = %run_config.marker,
        "updating report"
    );

    let reporter = CliProgress::new();
    let summary = syncreport_core::run(&run_config, &source, &reporter).await?;

    println!();
    match summary.outcome {
        Outcome::Written => println!("  Report updated!"),
        Outcome::Unchanged => println!("  Report already up to date."),
        Outcome::WouldChange => println!("  Report is out of date."),
        Outcome::WouldKeep => println!("  Report is current."),
    }
    println!("  Document:     {}", summary.document.display());
    println!("  Records:      {}", summary.records);
    if summary.skipped > 0 {
        println!("  Skipped:      {}", summary.skipped);
    }
    println!("  Environments: {}", summary.environments);
    println!("  Rows:         {}", summary.rows);
    if summary.drift > 0 {
        println!("  Drift:        {}", summary.drift);
    }
    println!("  Run:          {}", summary.run_id);
    println!("  Time:         {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    if summary.outcome == Outcome::WouldChange {
        return Err(eyre!(
            "'{}' does not match the controller state; run `syncreport update` to refresh it",
            summary.document.display()
        ));
    }

    Ok(())
}

async fn cmd_render(
    config_path: Option<&Path>,
    args: &SourceArgs,
    format: ReportFormat,
    marker: Option<String>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let source = build_source(&config, args)?;

    info!(source = %source.describe(), "rendering report");

    let records = source.fetch().await?;
    let aggregation = aggregate(&records, identifier_policy(&config, args))?;
    let report = render(&aggregation.grouping);

    match format {
        ReportFormat::Markdown => {
            let marker = marker.unwrap_or_else(|| config.report.marker.clone());
            print!("{}", report.to_markdown(EnvironmentTitle::nested_under(&marker)));
        }
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
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

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clears the spinner when the pipeline aborts before `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
