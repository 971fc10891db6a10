//! CLI tool to run BrightScript source files.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use brightscript_rs::config::parse_const;
use brightscript_rs::{Error, ExecutionOptions, Interpreter, Manifest, Statement, parse_source};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run BrightScript files as one program: every file shares a module
/// scope, then `main` (or `RunUserInterface`) is called if defined.
#[derive(Parser, Debug)]
#[command(name = "brs", version, about, long_about = None)]
struct Args {
    /// Channel manifest to read `bs_const` from.
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Preprocessor constant, overriding the manifest. Repeatable.
    #[arg(long = "const", value_name = "NAME=BOOL", value_parser = parse_const)]
    constants: Vec<(String, bool)>,

    /// Source files, in load order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

const ENTRY_POINTS: [&str; 2] = ["main", "runuserinterface"];

fn main() -> ExitCode {
    install_tracing();
    let args = Args::parse();

    let bs_const = match constants(&args) {
        Ok(constants) => constants,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let mut statements = Vec::new();
    let mut had_error = false;

    for path in &args.files {
        let name = path.display().to_string();
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{name}: {e}");
                return ExitCode::from(2);
            }
        };

        match parse_source(&content, &name, &bs_const) {
            Ok(parsed) => {
                tracing::debug!(file = %name, statements = parsed.len(), "loaded");
                statements.extend(parsed);
            }
            Err(e) => {
                report(&e);
                had_error = true;
            }
        }
    }

    if had_error {
        return ExitCode::FAILURE;
    }

    let options = ExecutionOptions {
        file: args
            .files
            .first()
            .map_or_else(|| "main.brs".to_string(), |p| p.display().to_string()),
        bs_const,
        ..ExecutionOptions::default()
    };
    if run(options, &statements) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Manifest constants first, then `--const` flags on top.
fn constants(args: &Args) -> Result<HashMap<String, bool>, String> {
    let mut constants = HashMap::new();
    if let Some(path) = &args.manifest {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let manifest = Manifest::parse(&text).map_err(|e| format!("{}: {e}", path.display()))?;
        constants = manifest
            .bs_const()
            .map_err(|e| format!("{}: {e}", path.display()))?;
    }
    constants.extend(args.constants.iter().cloned());
    Ok(constants)
}

/// Uncaught runtime errors are already written by the interpreter.
fn run(options: ExecutionOptions, statements: &[Statement]) -> bool {
    let mut interpreter = Interpreter::new(options);
    if interpreter.exec(statements).is_err() {
        return false;
    }

    let entry = ENTRY_POINTS
        .iter()
        .find(|name| interpreter.environment().has(name));
    match entry {
        Some(name) => interpreter.call_function(name, Vec::new()).is_ok(),
        None => true,
    }
}

fn report(error: &Error) {
    match error {
        Error::Lex(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
        Error::Preprocess(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
        Error::Parse(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
        Error::Runtime(e) => eprintln!("{e}"),
    }
}
