//! Execution tracer CLI.
//!
//! Provides the `steptrace` binary: reads a student script, traces it with
//! the engine, and prints the step trace as JSON to stdout. The trace is
//! printed on every outcome, including failures, so the visualizer can
//! always show how far the program got; diagnostics go to stderr.
//!
//! Exit codes: 0 = success, 1 = runtime failure or resource limit,
//! 2 = syntax error or unreadable script.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use steptrace_engine::{run, Limits, RunOutcome, RunRequest, DEFAULT_SEED};

/// Trace a student program line by line.
#[derive(Parser)]
#[command(name = "steptrace", about = "Trace a student program line by line")]
struct Cli {
    /// Path to the script to trace.
    script: PathBuf,

    /// Read the source from standard input; the script path is still used
    /// to attribute frames.
    #[arg(long)]
    stdin: bool,

    /// Canned input text; the two-character escape \n separates lines.
    /// Without it, every read simulates a bare Enter press.
    #[arg(short, long)]
    input: Option<String>,

    /// Library scripts loaded (untraced) before the main script.
    #[arg(short, long)]
    lib: Vec<PathBuf>,

    /// Maximum number of traced events before the run is stopped.
    #[arg(long, default_value_t = Limits::default().max_events)]
    max_steps: u64,

    /// Maximum run duration in milliseconds.
    #[arg(long, default_value_t = 5000)]
    max_ms: u64,

    /// Seed for the random-number builtins.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    process::exit(run_trace(&cli));
}

fn run_trace(cli: &Cli) -> i32 {
    let source = if cli.stdin {
        let mut text = String::new();
        if let Err(e) = std::io::Read::read_to_string(&mut std::io::stdin(), &mut text) {
            eprintln!("Error: failed to read standard input: {}", e);
            return 2;
        }
        text
    } else {
        match std::fs::read_to_string(&cli.script) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error: failed to read '{}': {}", cli.script.display(), e);
                return 2;
            }
        }
    };

    let mut libraries = Vec::with_capacity(cli.lib.len());
    for path in &cli.lib {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error: failed to read library '{}': {}", path.display(), e);
                return 2;
            }
        };
        match steptrace_engine::compile_library(&text, path) {
            Ok(unit) => libraries.push(unit),
            Err(e) => {
                eprintln!("Error: library '{}': {}", path.display(), e);
                return 2;
            }
        }
    }

    let report = run(&RunRequest {
        input: cli.input.as_deref(),
        libraries: &libraries,
        limits: Limits {
            max_events: cli.max_steps,
            max_duration: Duration::from_millis(cli.max_ms),
        },
        seed: cli.seed,
        ..RunRequest::new(&source, &cli.script)
    });

    // The trace goes to stdout even on failure; partial traces are the
    // point of the tool.
    let json = serde_json::to_string_pretty(&report.trace)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize trace: {}\"}}", e));
    println!("{}", json);

    match report.outcome {
        RunOutcome::Success => 0,
        RunOutcome::RuntimeFailure(msg) | RunOutcome::ResourceExceeded(msg) => {
            eprintln!("Error: {}", msg);
            1
        }
        RunOutcome::SyntaxFailure(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    }
}
