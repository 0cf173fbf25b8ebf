//! Command-line launcher for supyrdupyr game folders.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sd",
    about = "supyrdupyr: run game folders headless and inspect their levels",
    version,
    propagate_version = true
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a level and run it for a number of frames
    Run {
        /// Game folder containing config/<name>.cfg
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Config name to look for
        #[arg(short, long, default_value = "game")]
        config: String,

        /// Number of frames to run
        #[arg(short = 'n', long, default_value = "60")]
        frames: u64,

        /// Seconds per frame
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,

        /// Events to send before the first frame, as `name` or
        /// `name=[json, args]` (repeatable)
        #[arg(short, long)]
        send: Vec<String>,

        /// Print every recorded event
        #[arg(short, long)]
        events: bool,

        /// Write a save game after the run
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Show the level's cells and their neighbours
    Cells {
        /// Game folder containing config/<name>.cfg
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Config name to look for
        #[arg(short, long, default_value = "game")]
        config: String,
    },

    /// Show the collision tag bits the level's entities use
    Tags {
        /// Game folder containing config/<name>.cfg
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Config name to look for
        #[arg(short, long, default_value = "game")]
        config: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            dir,
            config,
            frames,
            dt,
            send,
            events,
            save,
        } => commands::run::run(&dir, &config, frames, dt, &send, events, save.as_deref()),
        Commands::Cells { dir, config } => commands::cells::run(&dir, &config),
        Commands::Tags { dir, config } => commands::tags::run(&dir, &config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
