use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "smarteval", version, about = "SmartEval status and reminder sweeps")]
struct Cli {
    /// Database file (default: ~/.config/smarteval/smarteval.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until Ctrl-C
    Run,
    /// Run a single sweep and print its summary
    Sweep {
        #[command(subcommand)]
        action: commands::sweep::SweepAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Assessment management
    Assessment {
        #[command(subcommand)]
        action: commands::assessment::AssessmentAction,
    },
    /// Student directory
    Student {
        #[command(subcommand)]
        action: commands::student::StudentAction,
    },
    /// Queued reminder messages
    Outbox {
        #[command(subcommand)]
        action: commands::outbox::OutboxAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let default_filter = smarteval_core::Config::load_or_default().logging.filter;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = commands::db_path(cli.db).and_then(|db| match cli.command {
        Commands::Run => commands::run::run(&db),
        Commands::Sweep { action } => commands::sweep::run(&db, action),
        Commands::Task { action } => commands::task::run(&db, action),
        Commands::Assessment { action } => commands::assessment::run(&db, action),
        Commands::Student { action } => commands::student::run(&db, action),
        Commands::Outbox { action } => commands::outbox::run(&db, action),
        Commands::Config { action } => commands::config::run(action),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
