//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use runoff_core::pipeline::{
    ProgressReporter, ScenarioOutcome, ScenarioPipeline, ScenarioRequest,
};
use runoff_shared::{config_file_path, init_config, load_config, resolve_project};
use runoff_toolkit::GrassToolkit;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Runoff — overland flow scenarios on GRASS.
#[derive(Parser)]
#[command(
    name = "runoff",
    version,
    about = "Simulate overland water flow scenarios by orchestrating GRASS tools.",
    long_about = None,
)]
pub(crate) struct Cli {
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run an overland flow scenario.
    Run {
        /// Input elevation raster.
        elevation: String,

        /// Name for the output depth raster [m].
        output: String,

        /// Rainfall rate (mm/hr). Defaults from config.
        #[arg(short, long)]
        rainfall_rate: Option<f64>,

        /// Simulation worker count. Defaults from config.
        #[arg(short, long)]
        nprocs: Option<u32>,

        /// Random seed for a reproducible run.
        #[arg(short, long)]
        seed: Option<i64>,

        /// Limit the output to depths at or above the minimum depth.
        #[arg(short = 'd', long)]
        filter_depths: bool,

        /// Minimum depth to retain (m) when filtering. Defaults from config.
        #[arg(short, long)]
        min_depth: Option<f64>,

        /// GRASS project (location) directory. Defaults from config.
        #[arg(short, long)]
        project: Option<String>,

        /// GRASS launcher binary. Defaults from config.
        #[arg(long)]
        grass_bin: Option<String>,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "runoff=info",
        1 => "runoff=debug",
        _ => "runoff=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            elevation,
            output,
            rainfall_rate,
            nprocs,
            seed,
            filter_depths,
            min_depth,
            project,
            grass_bin,
        } => cmd_run(RunArgs {
            elevation,
            output,
            rainfall_rate,
            nprocs,
            seed,
            filter_depths,
            min_depth,
            project,
            grass_bin,
        }),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Collected `run` subcommand flags.
struct RunArgs {
    elevation: String,
    output: String,
    rainfall_rate: Option<f64>,
    nprocs: Option<u32>,
    seed: Option<i64>,
    filter_depths: bool,
    min_depth: Option<f64>,
    project: Option<String>,
    grass_bin: Option<String>,
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config()?;

    let project = resolve_project(args.project.as_deref(), &config)?;
    let grass_bin = args
        .grass_bin
        .unwrap_or_else(|| config.toolkit.grass_bin.clone());

    let request = ScenarioRequest {
        elevation: args.elevation,
        output: args.output,
        rainfall_rate: args.rainfall_rate.unwrap_or(config.defaults.rainfall_rate),
        nprocs: args.nprocs.unwrap_or(config.defaults.nprocs),
        seed: args.seed,
        filter_depths: args.filter_depths,
        min_depth: args.min_depth.unwrap_or(config.defaults.min_depth),
    };

    info!(
        elevation = %request.elevation,
        output = %request.output,
        rainfall_rate = request.rainfall_rate,
        project = %project.display(),
        "running scenario"
    );

    let tools = Arc::new(GrassToolkit::new(grass_bin, project));
    let pipeline = ScenarioPipeline::new(tools, env!("CARGO_PKG_VERSION").to_string());

    let reporter = CliProgress::new();
    let outcome = pipeline.run(&request, &reporter);

    // Warnings go to the diagnostic channel, not the summary.
    for warning in &outcome.warnings {
        eprintln!("  warning: {warning}");
    }

    if !outcome.is_success() {
        let reason = outcome
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown failure".into());
        return Err(eyre!("scenario failed: {reason}"));
    }

    let output = outcome.output.expect("successful run has an output");

    println!();
    println!("  Scenario complete!");
    println!("  Run:      {}", outcome.run_id);
    println!("  Output:   {output}");
    println!("  Warnings: {}", outcome.warnings.len());
    println!("  Time:     {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &ScenarioOutcome) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
