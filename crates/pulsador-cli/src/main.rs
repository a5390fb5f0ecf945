use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod game;

#[derive(Parser)]
#[command(name = "pulsador", version, about = "Pulsador: hold the button for exactly the target time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play interactively in the terminal
    Play(commands::play::PlayArgs),
    /// Score one round with explicit timings
    Round(commands::round::RoundArgs),
    /// Draw a target duration
    Target(commands::target::TargetArgs),
    /// Difficulty tiers
    Tier {
        #[command(subcommand)]
        action: commands::tier::TierAction,
    },
    /// Progression and round statistics
    Stats,
    /// Recorded rounds
    History(commands::history::HistoryArgs),
    /// Start a new game (personal bests are kept)
    Reset {
        /// Also delete the local round history
        #[arg(long)]
        history: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PULSADOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Round(args) => commands::round::run(args),
        Commands::Target(args) => commands::target::run(args),
        Commands::Tier { action } => commands::tier::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::History(args) => commands::history::run(args),
        Commands::Reset { history } => commands::reset::run(history),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pulsador", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
