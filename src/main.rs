//! mcu-scaffold CLI
//!
//! Entry point for the `mcu-scaffold` command-line tool.

use clap::{Parser, Subcommand};
use mcu_scaffold::config::{BaseConfig, ConfigStore};
use mcu_scaffold::generate::Platform;
use mcu_scaffold::pipeline::{BuildOptions, BuildReport, NoPrompt, Pipeline, RescanPrompt, StdinPrompt};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mcu-scaffold")]
#[command(about = "Generate build and IDE files for STM32 firmware projects", version)]
struct Cli {
    /// Chip part number (e.g., STM32F407VGT6); first run and rescan only
    #[arg(long, global = true)]
    chip: Option<String>,

    /// Board name; first run and rescan only
    #[arg(long, global = true)]
    board: Option<String>,

    /// Overwrite create-only files such as .gitignore
    #[arg(long)]
    force: bool,

    /// Project root (default: current directory)
    #[arg(long, short = 'd', global = true, default_value = ".")]
    dir: PathBuf,

    /// Never prompt for a rescan
    #[arg(long, short = 'n')]
    no_interactive: bool,

    /// Rescan the project tree even when a configuration exists
    #[arg(long)]
    rescan: bool,

    /// Operator defaults file (default: ~/.config/mcu-scaffold/defaults.toml)
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the project configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print a value by dotted path (e.g., build.optimization)
    Get { key: String },

    /// Set a value by dotted path and save. The value is parsed as JSON,
    /// falling back to a plain string.
    Set { key: String, value: String },

    /// Print the resolved configuration
    Show,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        None => run_scaffold(&cli),
        Some(Commands::Config { action }) => {
            let store = open_store(&cli.dir, cli.defaults.as_deref());
            match action {
                ConfigCommands::Get { key } => run_config_get(&store, key),
                ConfigCommands::Set { key, value } => run_config_set(store, key, value),
                ConfigCommands::Show => run_config_show(&store),
            }
        }
    }
}

/// `RUST_LOG` wins; otherwise the verbosity flags pick the level
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => {
            let level = match (quiet, verbose) {
                (true, _) => "warn",
                (false, 0) => "info",
                (false, 1) => "debug",
                (false, _) => "trace",
            };
            EnvFilter::new(level)
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run_scaffold(cli: &Cli) {
    let options = BuildOptions {
        project_root: cli.dir.clone(),
        chip: cli.chip.clone(),
        board: cli.board.clone(),
        force: cli.force,
        interactive: !cli.no_interactive,
        rescan: cli.rescan,
        defaults_path: cli.defaults.clone(),
        platform: Platform::current(),
    };

    let mut prompt: Box<dyn RescanPrompt> = if cli.no_interactive {
        Box::new(NoPrompt)
    } else {
        Box::new(StdinPrompt)
    };

    let mut pipeline = Pipeline::new(options);
    let report = match pipeline.run(prompt.as_mut()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    print_report(&report);
    process::exit(report.exit_code());
}

fn print_report(report: &BuildReport) {
    println!("{} ({}): {} [{}]", report.project_name, report.state, report.chip, report.architecture);
    for path in &report.written {
        println!("  generated {}", path.display());
    }
    for path in &report.skipped {
        println!("  kept      {}", path.display());
    }
    if report.saved {
        println!("  saved     {}", mcu_scaffold::config::CONFIG_FILE);
    }

    for diagnostic in &report.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    for failure in &report.write_failures {
        eprintln!("error: {}", failure);
    }
    if let Some(script) = &report.guessed_linker_script {
        eprintln!("warning: no linker script found, assuming {}", script);
    }
    if let Some(e) = &report.save_error {
        eprintln!("error: configuration not saved: {}", e);
    }
}

fn open_store(dir: &Path, defaults: Option<&Path>) -> ConfigStore {
    let base = BaseConfig::builtin();
    let base = match defaults.map(Path::to_path_buf).or_else(BaseConfig::default_operator_path) {
        Some(path) => base.with_operator_defaults(&path),
        None => base,
    };
    let store = ConfigStore::open_with_base(dir, &base);
    for source in store.sources() {
        debug!(origin = ?source.origin, path = ?source.path, "configuration layer");
    }
    for diagnostic in store.diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }
    store
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_config_get(store: &ConfigStore, key: &str) {
    match store.get(key) {
        Some(value) => print_json(&value),
        None => {
            eprintln!("No configuration value at '{}'", key);
            process::exit(1);
        }
    }
}

fn run_config_set(mut store: ConfigStore, key: &str, raw: &str) {
    if let Err(e) = store.set_from_str(key, raw) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    if let Err(e) = store.save() {
        eprintln!("Error saving {}: {}", store.path().display(), e);
        process::exit(1);
    }
    println!("{} updated", key);
}

fn run_config_show(store: &ConfigStore) {
    print_json(&store.config().to_value());
}
