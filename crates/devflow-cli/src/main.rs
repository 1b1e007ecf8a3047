use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use devflow_core::Scope;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "devflow")]
#[command(about = "devflow - developer workflow CLI for issue trackers and git hosts", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file, or migrate it if it already exists
    Init {
        /// Initialize the current repository's configuration instead of the global one
        #[arg(long)]
        project: bool,
    },
    /// Inspect and apply configuration migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Read or change configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Show the current version and pending migrations of each configuration
    Status,
    /// Apply pending migrations
    Run {
        /// Configuration to migrate (both when omitted)
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
    },
    /// Reverse the most recently applied migration
    Down {
        /// Identity of the migration to reverse
        id: String,
        #[arg(long, value_enum)]
        scope: ScopeArg,
    },
    /// Print a fresh migration identity
    New,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a value (dotted keys address nested tables, e.g. jira.url)
    Get {
        key: String,
        #[arg(long)]
        project: bool,
    },
    /// Set a value; "true"/"false" and integers are stored typed
    Set {
        key: String,
        value: String,
        #[arg(long)]
        project: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Global,
    Project,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Global => Scope::Global,
            ScopeArg::Project => Scope::Project,
        }
    }
}

fn scope_of(project: bool) -> Scope {
    if project { Scope::Project } else { Scope::Global }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Init { project } => commands::init::run(scope_of(project))?,
        Commands::Migrate { action } => match action {
            MigrateAction::Status => commands::migrate::status()?,
            MigrateAction::Run { scope } => commands::migrate::run(scope.map(Scope::from))?,
            MigrateAction::Down { id, scope } => commands::migrate::down(&id, scope.into())?,
            MigrateAction::New => commands::migrate::new_id(),
        },
        Commands::Config { action } => match action {
            ConfigAction::Get { key, project } => commands::config::get(scope_of(project), &key)?,
            ConfigAction::Set {
                key,
                value,
                project,
            } => commands::config::set(scope_of(project), &key, &value)?,
        },
    }

    Ok(())
}
