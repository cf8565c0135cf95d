//! Starship Arena - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arena-tools")]
#[command(about = "Development tools for Starship Arena")]
struct Cli {
    /// Ship catalog (RON). Defaults to the built-in catalog.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a command file before submitting it
    Validate {
        /// Roster the ship is on
        #[arg(long)]
        roster: PathBuf,
        /// Ship the commands are for
        #[arg(long)]
        ship: String,
        /// Command file
        commands: PathBuf,
    },
    /// Play rounds locally from a directory of command files
    Play {
        /// Roster to set the game up from
        #[arg(long)]
        roster: PathBuf,
        /// Directory holding `<ship>-commands-<round>.txt` files
        #[arg(long)]
        commands: PathBuf,
        /// Number of rounds to play
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        /// Print the ship histories as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn run(cli: Cli) -> arena_tools::Result<bool> {
    let catalog = arena_tools::load_catalog(cli.catalog.as_deref())?;

    match cli.command {
        Commands::Validate {
            roster,
            ship,
            commands,
        } => {
            let roster = arena_tools::read_text(&roster)?;
            let text = arena_tools::read_text(&commands)?;
            let validation =
                arena_tools::validate::validate_commands(&catalog, &roster, &ship, &text)?;
            for line in validation.render() {
                println!("{line}");
            }
            Ok(validation.is_valid())
        }
        Commands::Play {
            roster,
            commands,
            rounds,
            json,
        } => {
            let roster = arena_tools::read_text(&roster)?;
            let (game, reports) = arena_tools::play::run(&catalog, &roster, &commands, rounds)?;
            if json {
                println!("{}", arena_tools::play::histories_json(&game)?);
            } else {
                for line in arena_tools::play::summary(&game, &reports) {
                    println!("{line}");
                }
            }
            Ok(true)
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}
