//! Client binary: log in, mirror the server's game and play it in the
//! terminal.

use clap::Parser;
use slide48::client::frontend::{self, Frontend, PlayerInput, TerminalFrontend};
use slide48::client::game::{GameMirror, ReplayError};
use slide48::client::{ClientError, Connection};
use slide48::server::DEFAULT_PORT;
use std::error::Error;
use std::fmt;
use std::io;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "slide48", about = "slide48 game client")]
struct Args {
    /// Server host.
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(Debug)]
enum AppError {
    Client(ClientError),
    Replay(ReplayError),
    Io(io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Client(e) => write!(f, "{e}"),
            AppError::Replay(e) => write!(f, "{e}"),
            AppError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Client(e) => Some(e),
            AppError::Replay(e) => Some(e),
            AppError::Io(e) => Some(e),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        AppError::Client(e)
    }
}

impl From<ReplayError> for AppError {
    fn from(e: ReplayError) -> Self {
        AppError::Replay(e)
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e)
    }
}

impl AppError {
    fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Client(ClientError::Connect(_)) => ExitCode::from(2),
            AppError::Client(ClientError::Timeout) => ExitCode::from(3),
            _ => ExitCode::FAILURE,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let conn = Connection::connect((args.host.as_str(), args.port))?;

    loop {
        let user = frontend::prompt_line("user: ")?;
        let password = frontend::prompt_password("password: ")?;
        if conn.login(&user, &password)? {
            break;
        }
        println!("login failed, try again");
    }

    let (board, won, score) = conn.fetch_data()?;
    let mut game = GameMirror::from_data(board, won, score);

    let mut terminal = TerminalFrontend::new()?;
    loop {
        terminal.render(&game)?;
        match terminal.next_input()? {
            PlayerInput::Quit => break,
            PlayerInput::Restart => {
                let blocks = conn.restart()?;
                game.apply_restart(&blocks);
            }
            PlayerInput::Move(direction) => {
                let result = conn.play(direction)?;
                game.apply_turn(&result)?;
            }
        }
    }
    Ok(())
}
