//! # TMC Autotune Binary
//!
//! Loads an autotuning config, tunes every configured stepper against
//! register-shadow drivers and prints the resulting register plans.
//!
//! # Usage
//!
//! ```bash
//! # Tune every stepper once
//! autotune_tmc --config printer.toml
//!
//! # Re-tune with changed knobs
//! autotune_tmc -c printer.toml --command "AUTOTUNE_TMC STEPPER=stepper_z STEALTH=0"
//!
//! # Commands from stdin, JSON output
//! autotune_tmc -c printer.toml --stdin --format json < commands.txt
//! ```

use autotune_common::config::{AutotuneConfig, load_config};
use autotune_tmc::command::COMMAND_HELP;
use autotune_tmc::{AutotuneHost, DriverRegistry, RegisterPlan};
use clap::{Parser, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Plan output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `field=value` lines per stepper
    Text,
    /// One JSON document with every plan
    Json,
}

/// TMC Autotune - derive stepper driver registers from motor constants
#[derive(Parser, Debug)]
#[command(name = "autotune_tmc")]
#[command(version)]
#[command(about = "Derive Trinamic driver register values from motor constants")]
#[command(long_about = None)]
struct Args {
    /// Path to the autotuning configuration file
    #[arg(short, long, default_value = "autotune_tmc.toml")]
    config: PathBuf,

    /// AUTOTUNE_TMC command to run after activation (can be repeated)
    #[arg(long = "command", action = clap::ArgAction::Append)]
    commands: Vec<String>,

    /// Read further commands from stdin, one per line
    #[arg(long)]
    stdin: bool,

    /// Plan output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);

    let level = match (&config, args.verbose) {
        (_, true) => Level::DEBUG,
        (Ok(config), false) => config.shared.log_level.into(),
        (Err(_), false) => Level::INFO,
    };
    setup_tracing(&args, level);

    let result = match config {
        Ok(config) => run(&args, &config),
        Err(e) => Err(format!("{}: {}", args.config.display(), e).into()),
    };
    if let Err(e) = result {
        error!("autotune_tmc failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: &AutotuneConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("TMC Autotune v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut host = AutotuneHost::new(config)?;
    if host.is_empty() {
        warn!("No [autotune_tmc.<stepper>] sections in {}", args.config.display());
    }
    let registry = DriverRegistry::with_builtin_drivers();
    host.connect(&registry)?;

    let mut output = PlanOutput::new(args.format);
    for plan in host.ready()? {
        output.emit(plan);
    }

    let mut lines = args.commands.clone();
    if args.stdin {
        for line in std::io::stdin().lock().lines() {
            lines.push(line?);
        }
    }

    let mut failures = 0;
    for line in lines.iter().map(|line| line.trim()) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match host.dispatch(line) {
            Ok(plan) => output.emit(plan),
            Err(e) => {
                error!("'{}' failed: {} ({})", line, e, COMMAND_HELP);
                failures += 1;
            }
        }
    }
    output.finish()?;

    if failures > 0 {
        return Err(format!("{failures} command(s) failed").into());
    }
    info!(
        "TMC Autotune finished for {} steppers: {}",
        host.len(),
        host.steppers().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

/// Prints plans as they are produced (text) or all at once (JSON).
struct PlanOutput {
    format: OutputFormat,
    pending: Vec<RegisterPlan>,
}

impl PlanOutput {
    fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pending: Vec::new(),
        }
    }

    fn emit(&mut self, plan: RegisterPlan) {
        match self.format {
            OutputFormat::Text => println!("{plan}"),
            OutputFormat::Json => self.pending.push(plan),
        }
    }

    fn finish(self) -> Result<(), serde_json::Error> {
        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&self.pending)?);
        }
        Ok(())
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
