use crate::server;
use crate::tasks::{add_user, migrate};
use clap::{Args, Parser, Subcommand};
use placement_portal::auth::Role;
use placement_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Placement Portal API",
    about = "Serve and administer the placement portal experience service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Apply pending database migrations and exit
    Migrate(StoreArgs),
    /// Manage portal user accounts
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Provision a user with an explicit role
    Add(AddUserArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StoreArgs {
    /// Override the configured database URL
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AddUserArgs {
    #[command(flatten)]
    pub(crate) store: StoreArgs,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) first_name: String,
    #[arg(long)]
    pub(crate) last_name: String,
    /// One of admin, student, junior
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: Role,
    #[arg(long)]
    pub(crate) department: Option<String>,
    #[arg(long)]
    pub(crate) batch_year: Option<i64>,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw)
        .ok_or_else(|| format!("unknown role '{raw}' (expected admin, student, or junior)"))
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Migrate(args) => migrate(args).await,
        Command::User {
            command: UserCommand::Add(args),
        } => add_user(args).await,
    }
}
