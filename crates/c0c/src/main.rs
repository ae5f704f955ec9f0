//! miniplc0 compiler entry point.
//!
//! Reads one source file and either dumps its tokens or writes the binary
//! module for the navm virtual machine.

mod output;

use anyhow::{Context, Result};
use c0_common::{CompileError, CompilerConfig, TokenFormat};
use c0_compiler::Compiler;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::output::STDIO;

/// Compiler command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "c0c",
    about = "miniplc0 compiler for the navm stack virtual machine",
    version,
    long_about = None
)]
struct Args {
    /// Source file, or `-` for standard input.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file, or `-` for standard output.
    #[arg(long, short = 'o', value_name = "FILE")]
    output: PathBuf,

    /// Write the token stream.
    #[arg(long, short = 't')]
    tokenize: bool,

    /// Compile to a binary module.
    #[arg(long, short = 'l')]
    analyse: bool,

    /// Path to a compiler configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Token dump format (overrides config file).
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Token dump format as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for TokenFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => TokenFormat::Text,
            Format::Json => TokenFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tokenize,
    Analyse,
}

impl Args {
    fn mode(&self) -> Result<Mode, Failure> {
        match (self.tokenize, self.analyse) {
            (true, false) => Ok(Mode::Tokenize),
            (false, true) => Ok(Mode::Analyse),
            _ => Err(Failure::Mode),
        }
    }
}

/// Reasons a run fails, each with its own exit status.
#[derive(Debug, Error)]
enum Failure {
    #[error("select exactly one of --tokenize or --analyse")]
    Mode,

    #[error("cannot read input {path:?}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] anyhow::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("cannot write output {path:?}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Compile(_) => 1,
            Failure::Input { .. } | Failure::Config(_) | Failure::Output { .. } => 2,
            Failure::Mode => 3,
        }
    }

    /// Message with every underlying cause appended.
    fn report(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    debug!(version = env!("CARGO_PKG_VERSION"), "Starting c0c");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {}", failure.report());
            ExitCode::from(failure.exit_code())
        }
    }
}

/// Initialize logging on stderr with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("c0c={level},c0_compiler={level},c0_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Failure> {
    let mode = args.mode()?;

    // Load configuration
    let mut config = load_config(args.config.as_deref())?;

    // Override with command-line arguments
    if let Some(format) = args.format {
        config.tokens.format = format.into();
    }

    let source = read_input(&args.input)?;
    let compiler = Compiler::with_config(config);

    // The output is only opened after compilation succeeds
    let bytes = match mode {
        Mode::Tokenize => {
            let tokens = compiler.tokenize(&source)?;
            info!(tokens = tokens.len(), "Tokenized");
            output::render_tokens(&tokens, compiler.config.tokens.format)
                .map_err(|e| Failure::Output {
                    path: args.output.clone(),
                    source: e.into(),
                })?
        }
        Mode::Analyse => {
            let module = compiler.analyse(&source)?;
            info!(
                functions = module.functions.len(),
                globals = module.globals.len(),
                instructions = module.instruction_count(),
                "Analysed"
            );
            compiler.emit(&module)
        }
    };

    output::write(&args.output, &bytes).map_err(|source| Failure::Output {
        path: args.output.clone(),
        source,
    })?;
    info!(output = ?args.output, bytes = bytes.len(), "Output written");
    Ok(())
}

fn read_input(path: &Path) -> Result<String, Failure> {
    let failed = |source| Failure::Input {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new(STDIO) {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(failed)?;
        return Ok(source);
    }
    std::fs::read_to_string(path).map_err(failed)
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `C0_CONFIG_PATH` environment variable
/// 3. `c0.toml` in the working directory
/// 4. Built-in defaults
fn load_config(explicit: Option<&Path>) -> Result<CompilerConfig> {
    // 1. Command-line argument (highest priority)
    if let Some(config_path) = explicit {
        info!(?config_path, "Loading config from command-line argument");
        return CompilerConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    // 2. Environment variable
    if let Ok(env_path) = std::env::var("C0_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from C0_CONFIG_PATH");
            return CompilerConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from C0_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "C0_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    // 3. Working directory
    let local_path = PathBuf::from("c0.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from working directory");
        return CompilerConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {local_path:?}"));
    }

    // 4. Built-in defaults
    debug!("No config file found, using built-in defaults");
    Ok(CompilerConfig::default())
}
