//! Per-connection session: the framed read loop, command dispatch and an
//! ordered writer thread.
//!
//! A session starts unauthenticated and accepts only `LOG-` until the
//! credentials check succeeds. A failed login keeps the session open; any
//! protocol violation, framing error or storage failure tears the
//! connection down. Replies go through an mpsc queue drained by a
//! dedicated writer thread, so they reach the peer in dispatch order.

use crate::protocol::{self, ProtocolError, Request, Response};
use crate::server::player::PlayerData;
use crate::server::ServerContext;
use crate::stats::Stat;
use crate::storage::StorageError;
use std::error::Error;
use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Why a session ended abnormally.
#[derive(Debug)]
pub enum SessionError {
    Protocol(ProtocolError),
    Storage(StorageError),
    /// A command other than `LOG-` arrived before a successful login.
    NotAuthenticated(&'static str),
    /// A gameplay command arrived before `DAT-REQ` loaded the player.
    NoDataLoaded(&'static str),
    /// The writer thread is gone; nothing can be delivered any more.
    WriterClosed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Protocol(e) => write!(f, "{e}"),
            SessionError::Storage(e) => write!(f, "{e}"),
            SessionError::NotAuthenticated(command) => {
                write!(f, "{command} before a successful login")
            }
            SessionError::NoDataLoaded(command) => {
                write!(f, "{command} before player data was requested")
            }
            SessionError::WriterClosed => write!(f, "writer thread closed"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Protocol(e) => Some(e),
            SessionError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        SessionError::Protocol(e)
    }
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        SessionError::Storage(e)
    }
}

impl SessionError {
    /// An ordinary peer hangup rather than a fault worth warning about.
    fn is_disconnect(&self) -> bool {
        matches!(
            self,
            SessionError::Protocol(ProtocolError::Io(e)) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}

struct Session {
    id: u64,
    ctx: Arc<ServerContext>,
    /// Set by a successful login, before any data is loaded.
    identity: Option<(i64, String)>,
    /// Set by `DAT-REQ`; owns the authoritative game state.
    player: Option<PlayerData>,
}

/// Session thread entry point. Runs the read loop to completion, then
/// flushes any loaded player state and leaves the registry.
pub fn run(mut stream: TcpStream, id: u64, ctx: Arc<ServerContext>) {
    let mut session = Session {
        id,
        ctx: Arc::clone(&ctx),
        identity: None,
        player: None,
    };

    match stream.try_clone() {
        Ok(writer) => {
            let (tx, rx) = mpsc::channel::<String>();
            let drain = thread::spawn(move || drain_responses(writer, rx));

            if let Err(e) = session.serve(&mut stream, &tx) {
                if e.is_disconnect() {
                    tracing::info!(id, "peer disconnected");
                } else {
                    tracing::warn!(id, error = %e, "session aborted");
                }
            }

            drop(tx);
            let _ = drain.join();
        }
        Err(e) => tracing::warn!(id, error = %e, "could not split session socket"),
    }

    let _ = stream.shutdown(Shutdown::Both);
    session.teardown();
    ctx.registry().leave(id);
    tracing::info!(id, "session closed");
}

/// Writer thread body: deliver queued replies in order until the session
/// drops its sender or the peer stops accepting writes.
fn drain_responses(mut writer: TcpStream, queue: Receiver<String>) {
    for body in queue {
        if protocol::write_frame(&mut writer, &body).is_err() {
            break;
        }
    }
}

impl Session {
    fn serve(&mut self, reader: &mut TcpStream, out: &Sender<String>) -> Result<(), SessionError> {
        loop {
            let body = protocol::read_frame(reader)?;
            let request = Request::parse(&body)?;
            tracing::debug!(id = self.id, request = %body, "dispatch");
            let response = self.dispatch(request)?;
            out.send(response.encode())
                .map_err(|_| SessionError::WriterClosed)?;
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<Response, SessionError> {
        match request {
            Request::Login {
                user,
                password_hash,
            } => self.login(&user, &password_hash),
            Request::DataRequest => self.load_data(),
            Request::Play(direction) => {
                let player = self
                    .player
                    .as_mut()
                    .ok_or(SessionError::NoDataLoaded("PLA"))?;
                Ok(Response::PlayOk(player.play(direction)))
            }
            Request::Restart => {
                let player = self
                    .player
                    .as_mut()
                    .ok_or(SessionError::NoDataLoaded("RES-"))?;
                Ok(Response::RestartOk(player.restart()))
            }
        }
    }

    fn login(&mut self, user: &str, password_hash: &str) -> Result<Response, SessionError> {
        if self.player.is_some() {
            return Err(SessionError::Protocol(ProtocolError::Malformed(
                "login after player data was loaded".into(),
            )));
        }
        match self.ctx.store().check_login(user, password_hash)? {
            Some(player_id) => {
                tracing::info!(id = self.id, user, "login accepted");
                self.identity = Some((player_id, user.to_string()));
                Ok(Response::LoginOk)
            }
            None => {
                tracing::info!(id = self.id, user, "login rejected");
                Ok(Response::LoginFail)
            }
        }
    }

    fn load_data(&mut self) -> Result<Response, SessionError> {
        let (player_id, name) = self
            .identity
            .clone()
            .ok_or(SessionError::NotAuthenticated("DAT-REQ"))?;
        let row = self.ctx.store().load_player(player_id)?;
        let player = PlayerData::load(player_id, name, row)?;
        let response = Response::Data {
            board: player.board().clone(),
            won: player.won(),
            score: player.score(),
        };
        self.player = Some(player);
        Ok(response)
    }

    /// Flush the loaded player back to storage, if any was loaded.
    fn teardown(&mut self) {
        let Some(mut player) = self.player.take() else {
            return;
        };
        player.finish_session();
        let flushed = self.ctx.store().save_player(
            player.id(),
            &player.board().serialize(),
            player.won(),
            player.score(),
            player.session_stats(),
        );
        match flushed {
            Ok(()) => {
                let totals = player.total_stats();
                tracing::info!(
                    id = self.id,
                    player = player.name(),
                    moves = totals.get(Stat::TotalMoves),
                    wins = totals.get(Stat::GameWins),
                    highest_score = totals.get(Stat::HighestScore),
                    "state flushed"
                );
            }
            Err(e) => {
                tracing::error!(id = self.id, player = player.name(), error = %e, "flush failed");
            }
        }
    }
}
