//! CLI for beaconradar, a live terminal radar for BLE beacon sightings.

mod commands;
mod display;
mod feed;
mod tui;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use commands::RadarArgs;

#[derive(Parser)]
#[command(name = "beaconradar")]
#[command(about = "beaconradar — live terminal radar for BLE beacon sightings")]
#[command(version = beaconradar_core::VERSION)]
struct Cli {
    /// Write diagnostics to this file instead of stderr (level from RUST_LOG, default warn)
    #[arg(long, global = true, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live radar over stdin and/or supervised scanner commands
    Watch {
        #[command(flatten)]
        radar: RadarArgs,

        /// Run a scanner under `sh -c` and tag its lines, e.g. A="btmon" (repeatable)
        #[arg(long, value_name = "LABEL=CMD")]
        exec: Vec<String>,

        /// Do not read lines from stdin
        #[arg(long)]
        no_stdin: bool,

        /// Tag untagged stdin lines with this label
        #[arg(long)]
        label: Option<String>,

        /// Sighting log (CSV, appended)
        #[arg(long, default_value = "sightings.csv")]
        log: PathBuf,

        /// Do not write a sighting log
        #[arg(long)]
        no_log: bool,

        /// Display: ansi (plain frame writer) or tui (interactive dashboard)
        #[arg(long, default_value = "ansi", value_parser = ["ansi", "tui"])]
        display: String,

        /// Stop once every input has ended; commands are not restarted
        #[arg(long)]
        exit_on_eof: bool,
    },

    /// Replay a captured trace on a fixed clock (deterministic)
    Replay {
        /// Trace file, or - for stdin
        input: String,

        #[command(flatten)]
        radar: RadarArgs,

        /// Clock start, seconds since the Unix epoch
        #[arg(long, default_value = "0")]
        start: u64,

        /// Clock advance per input line, in milliseconds
        #[arg(long, default_value = "100")]
        step_ms: u64,

        /// Sighting log (CSV, appended)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Print the final frame
        #[arg(long)]
        frame: bool,
    },

    /// Print the classified event of every line as JSON
    Classify {
        /// Trace file, or - for stdin
        #[arg(default_value = "-")]
        input: String,

        /// Label identifying source A
        #[arg(long, default_value = "A")]
        label_a: String,

        /// Label identifying source B
        #[arg(long, default_value = "B")]
        label_b: String,

        /// Omit lines that classify as ignored
        #[arg(long)]
        skip_ignored: bool,
    },
}

fn init_logging(debug_log: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = debug_log {
        match std::fs::File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Error: cannot open debug log {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug_log.as_deref());

    match cli.command {
        Commands::Watch {
            radar,
            exec,
            no_stdin,
            label,
            log,
            no_log,
            display,
            exit_on_eof,
        } => commands::watch::run(commands::watch::WatchCommandConfig {
            radar: &radar,
            exec: &exec,
            read_stdin: !no_stdin,
            label: label.as_deref(),
            log_path: (!no_log).then_some(log.as_path()),
            display: &display,
            exit_on_eof,
        }),
        Commands::Replay {
            input,
            radar,
            start,
            step_ms,
            log,
            frame,
        } => commands::replay::run(commands::replay::ReplayCommandConfig {
            input: &input,
            radar: &radar,
            start_secs: start,
            step_ms,
            log_path: log.as_deref(),
            print_frame: frame,
        }),
        Commands::Classify {
            input,
            label_a,
            label_b,
            skip_ignored,
        } => commands::classify::run(&input, &label_a, &label_b, skip_ignored),
    }
}
