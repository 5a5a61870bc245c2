//! Server binary: run the listener, or manage accounts.

use clap::{Parser, Subcommand};
use slide48::auth;
use slide48::client::frontend;
use slide48::config::ServerConfig;
use slide48::server::Server;
use slide48::storage::Store;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slide48-server", about = "slide48 game server")]
struct Args {
    /// Configuration file (key = value lines).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file.
    #[arg(short, long)]
    listen: Option<String>,

    /// Database path, overriding the configuration file.
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a player account (prompts for the password).
    Adduser { name: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::defaults()?,
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(database) = args.database {
        config.database = database;
    }

    let store = Store::open(&config.database)?;

    match args.command {
        Some(Command::Adduser { name }) => {
            let password = frontend::prompt_password("password: ")?;
            let id = store.create_user(&name, &auth::hash_password(&password))?;
            println!("created user {name:?} (id {id})");
            Ok(())
        }
        None => {
            let server = Server::bind(&config.listen, store)?;
            server.run()?;
            Ok(())
        }
    }
}
