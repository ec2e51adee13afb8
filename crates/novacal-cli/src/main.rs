use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "novacal-cli",
    version,
    about = "Novacal auto-scheduling CLI",
    after_help = "All times are UTC: \"today\" is the current UTC date and working windows such as the default 08:00-22:00 are UTC wall-clock times."
)]
struct Cli {
    /// Owner whose tasks are read and written (defaults to config `owner`)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Custom tasks split into blocks
    Custom {
        #[command(subcommand)]
        action: commands::custom::CustomAction,
    },
    /// Automatic scheduling
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Per-weekday working hours
    Hours {
        #[command(subcommand)]
        action: commands::hours::HoursAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let owner = cli.owner;
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, owner),
        Commands::Custom { action } => commands::custom::run(action, owner),
        Commands::Schedule { action } => commands::schedule::run(action, owner),
        Commands::Hours { action } => commands::hours::run(action, owner),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "novacal-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
