use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use conflang_core::config::LogConfig;
use conflang_core::{AppConfig, Command, LineError, StartpageSettings, Tokenizer};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "conflang",
    about = "Run line-oriented start page scripts",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting CONFLANG_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Use this config file instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script and print the resulting settings.
    Run {
        /// Script file, `-` for stdin. Defaults to the configured script path.
        file: Option<String>,
    },

    /// Parse a script without executing it and report unknown commands.
    Check {
        file: Option<String>,
    },

    /// Show the resolved config file path and effective config.
    Config,
}

/// Process exit codes.
#[repr(i32)]
enum ExitCode {
    ScriptError = 2,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("CONFLANG_JSON").as_deref() == Ok("1");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    init_logging(&config.log, cli.log_json);
    tracing::debug!(path = %config_path.display(), "config loaded");

    match cli.command {
        Commands::Run { file } => {
            let path = script_path(file, &config);
            let source = open_source(&path)?;

            match StartpageSettings::from_script(source) {
                Ok(settings) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": settings,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        print_settings(&settings);
                    }
                }
                Err(err) => script_failed(&path, &err, json_output)?,
            }
        }

        Commands::Check { file } => {
            let path = script_path(file, &config);
            let source = open_source(&path)?;
            let registry = conflang_core::directive_registry(Arc::new(Mutex::new(
                StartpageSettings::default(),
            )));

            let mut commands: Vec<Command> = Vec::new();
            for command in conflang_core::Parser::new(Tokenizer::new(source)) {
                match command {
                    Ok(command) => commands.push(command),
                    Err(err) => script_failed(&path, &err, json_output)?,
                }
            }

            let unknown: Vec<&Command> = commands
                .iter()
                .filter(|c| !registry.contains(&c.name))
                .collect();

            if json_output {
                print_json(&serde_json::json!({
                    "status": if unknown.is_empty() { "ok" } else { "error" },
                    "data": { "commands": &commands, "unknown": &unknown },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                for c in &commands {
                    let marker = if registry.contains(&c.name) { ' ' } else { '?' };
                    println!("{marker}{:>4}: {} {}", c.line, c.name, c.params.join(" "));
                }
                for c in &unknown {
                    eprintln!(
                        "{}: command \"{}\" not found (at line {})",
                        path.display(),
                        c.name,
                        c.line
                    );
                }
            }

            if !unknown.is_empty() {
                std::process::exit(ExitCode::ScriptError as i32);
            }
        }

        Commands::Config => {
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "path": config_path.display().to_string(), "config": config },
                }))?;
            } else {
                println!("# {}", config_path.display());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn init_logging(log: &LogConfig, force_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    if log.json || force_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn script_path(file: Option<String>, config: &AppConfig) -> PathBuf {
    file.map(PathBuf::from).unwrap_or_else(|| config.script_path())
}

fn open_source(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(std::io::stdin().lock()));
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("opening script {}", path.display()))?;
    Ok(Box::new(file))
}

fn script_failed(path: &Path, err: &LineError, json_output: bool) -> Result<()> {
    if json_output {
        print_json(&serde_json::json!({
            "status": "error",
            "error": err.cause.to_string(),
            "line": err.line,
            "file": path.display().to_string(),
        }))?;
    } else {
        eprintln!("{}: error: {err}", path.display());
    }
    std::process::exit(ExitCode::ScriptError as i32);
}

fn print_settings(settings: &StartpageSettings) {
    match &settings.weather_coords {
        Some(coords) => println!("weather:      {}, {}", coords.lat, coords.lon),
        None => println!("weather:      (disabled)"),
    }
    println!("subreddit:    {}", settings.image_subreddit());
    println!("max dimension: {}", settings.background_maxdim());
    match &settings.background_savepath {
        Some(path) if settings.can_save_background() => println!("save path:    {path}"),
        _ => println!("save path:    (saving disabled)"),
    }

    if settings.links.is_empty() {
        println!("links:        (none)");
    } else {
        println!("links:");
        for link in &settings.links {
            println!("  {:<24}  {}", link.title, link.url);
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
