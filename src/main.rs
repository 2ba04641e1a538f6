//! logrelay - Stream and annotate the log of an external batch process
//!
//! This is the binary entry point. All logic lives in the library crates.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logrelay::{parse_log, render_run_report, run_exit_code, OutputFormat};
use logrelay_app::config::{init_config_dir, load_settings};
use logrelay_app::{run_external, spawn_signal_handler, RunOptions};
use logrelay_core::prelude::*;
use logrelay_core::{logging, Locality};
use logrelay_tail::CancellationToken;

/// logrelay - Stream and annotate the log of an external batch process
#[derive(Parser, Debug)]
#[command(name = "logrelay", version)]
#[command(about = "Stream and annotate the log of an external batch process", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program and relay its log file to stdout until it exits
    Run(RunArgs),

    /// Segment a saved log file and print its blocks and classified lines
    Parse(ParseArgs),

    /// Write a default .logrelay/config.toml
    Init {
        /// Directory to create the config in (defaults to the current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Log file to follow (overrides -logFile and the config file)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Route relayed bytes through a forwarding link
    #[arg(long)]
    remote: bool,

    /// Do not classify lines or print a severity summary
    #[arg(long)]
    no_annotate: bool,

    /// Keep tailing this long after the program exits
    #[arg(long, value_name = "MS")]
    grace_ms: Option<u64>,

    /// Program to run, followed by its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Log file to segment
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print NDJSON events instead of indented text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    color_eyre::install().map_err(|e| std::io::Error::other(e.to_string()))?;
    logging::init()?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    match cli.command {
        Command::Run(args) => {
            let code = run(args, cwd).await?;
            std::process::exit(code);
        }
        Command::Parse(args) => parse(args),
        Command::Init { path } => {
            let path = init_config_dir(&path.unwrap_or(cwd))?;
            eprintln!("Config written to {}", path.display());
            Ok(())
        }
    }
}

async fn run(args: RunArgs, cwd: PathBuf) -> Result<i32> {
    let settings = load_settings(&cwd);

    let mut command = args.command.into_iter();
    let program = command.next().ok_or_else(|| Error::process("no program given"))?;
    let options = RunOptions {
        program,
        args: command.collect(),
        cwd,
        log_file: args.log_file,
        locality: args.remote.then_some(Locality::Remote),
        annotate: args.no_annotate.then_some(false),
        grace_period_ms: args.grace_ms,
    };

    let shutdown = CancellationToken::new();
    let signals = spawn_signal_handler(shutdown.clone());

    let result = run_external(options, &settings, tokio::io::stdout(), shutdown.clone()).await;
    shutdown.cancel();
    let _ = signals.await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Error::ProgramNotFound { program } = &e {
                eprintln!("Program not found: {}", program);
                eprintln!("Check the command after `--` and your PATH.");
                return Ok(127);
            }
            return Err(e);
        }
    };

    for line in render_run_report(&outcome) {
        eprintln!("{}", line);
    }
    Ok(run_exit_code(&outcome))
}

fn parse(args: ParseArgs) -> Result<()> {
    let file = std::fs::File::open(&args.file).map_err(|e| {
        std::io::Error::new(e.kind(), format!("{}: {}", args.file.display(), e))
    })?;
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = parse_log(std::io::BufReader::new(file), &mut out, format)?;
    out.flush()?;

    if !args.json {
        eprintln!("{} lines, {}", summary.lines, summary.tally.summary());
        if !summary.open_blocks.is_empty() {
            eprintln!("Unclosed blocks: {}", summary.open_blocks.join(", "));
        }
    }
    Ok(())
}
