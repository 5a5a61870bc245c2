//! TCP client: the connection pipeline and typed request helpers.
//!
//! The connection keeps one reader thread and one writer thread around a
//! blocking socket. Callers issue strictly one request at a time; the
//! reply is awaited on a condition variable with a timeout, so a stalled
//! server surfaces as an error instead of hanging the frontend.

pub mod frontend;
pub mod game;

use crate::auth;
use crate::game::turn::TurnResult;
use crate::game::{Block, Board, Coord, Direction};
use crate::protocol::{self, ProtocolError, Request, Response};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long a request waits for its reply before giving up.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced to the client frontend.
#[derive(Debug)]
pub enum ClientError {
    /// Could not reach the server at all.
    Connect(io::Error),
    /// No reply within the deadline.
    Timeout,
    /// The server went away mid-session.
    Disconnected,
    /// The reply did not decode.
    Protocol(ProtocolError),
    /// A well-formed reply of the wrong kind for the request.
    UnexpectedReply(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connect(e) => write!(f, "could not connect: {e}"),
            ClientError::Timeout => write!(f, "server did not reply in time"),
            ClientError::Disconnected => write!(f, "server closed the connection"),
            ClientError::Protocol(e) => write!(f, "{e}"),
            ClientError::UnexpectedReply(body) => write!(f, "unexpected reply {body:?}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Connect(e) => Some(e),
            ClientError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        ClientError::Protocol(e)
    }
}

#[derive(Default)]
struct InboxState {
    replies: VecDeque<String>,
    closed: bool,
}

#[derive(Default)]
struct Inbox {
    state: Mutex<InboxState>,
    ready: Condvar,
}

impl Inbox {
    fn push(&self, body: String) {
        self.lock().replies.push_back(body);
        self.ready.notify_all();
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    /// Wait for the next reply body, up to the deadline.
    fn take(&self, timeout: Duration) -> Result<String, ClientError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(body) = state.replies.pop_front() {
                return Ok(body);
            }
            if state.closed {
                return Err(ClientError::Disconnected);
            }
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(ClientError::Timeout)?;
            state = match self.ready.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InboxState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// One live connection to the server.
pub struct Connection {
    outbox: Sender<String>,
    inbox: Arc<Inbox>,
    socket: TcpStream,
}

impl Connection {
    /// Connect and spin up the reader and writer threads.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Connection, ClientError> {
        let socket = TcpStream::connect(addr).map_err(ClientError::Connect)?;

        let inbox = Arc::new(Inbox::default());
        let mut reader = socket.try_clone().map_err(ClientError::Connect)?;
        let reader_inbox = Arc::clone(&inbox);
        thread::spawn(move || {
            loop {
                match protocol::read_frame(&mut reader) {
                    Ok(body) => reader_inbox.push(body),
                    Err(_) => break,
                }
            }
            reader_inbox.close();
        });

        let mut writer = socket.try_clone().map_err(ClientError::Connect)?;
        let (outbox, outgoing) = mpsc::channel::<String>();
        thread::spawn(move || {
            for body in outgoing {
                if protocol::write_frame(&mut writer, &body).is_err() {
                    break;
                }
            }
        });

        Ok(Connection {
            outbox,
            inbox,
            socket,
        })
    }

    /// Issue one request and wait for its reply with the default timeout.
    pub fn request(&self, request: &Request) -> Result<Response, ClientError> {
        self.request_with_timeout(request, DEFAULT_REPLY_TIMEOUT)
    }

    /// `request` with an explicit reply deadline.
    pub fn request_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        self.outbox
            .send(request.encode())
            .map_err(|_| ClientError::Disconnected)?;
        let body = self.inbox.take(timeout)?;
        Ok(Response::parse(&body)?)
    }

    /// Authenticate. Returns whether the server accepted the credentials;
    /// a rejection leaves the connection open for another attempt.
    pub fn login(&self, user: &str, password: &str) -> Result<bool, ClientError> {
        let reply = self.request(&Request::Login {
            user: user.to_string(),
            password_hash: auth::hash_password(password),
        })?;
        match reply {
            Response::LoginOk => Ok(true),
            Response::LoginFail => Ok(false),
            other => Err(ClientError::UnexpectedReply(other.encode())),
        }
    }

    /// Fetch the saved board, won flag and score.
    pub fn fetch_data(&self) -> Result<(Board, bool, i64), ClientError> {
        match self.request(&Request::DataRequest)? {
            Response::Data { board, won, score } => Ok((board, won, score)),
            other => Err(ClientError::UnexpectedReply(other.encode())),
        }
    }

    /// Play one direction; the reply describes everything that happened.
    pub fn play(&self, direction: Direction) -> Result<TurnResult, ClientError> {
        match self.request(&Request::Play(direction))? {
            Response::PlayOk(result) => Ok(result),
            other => Err(ClientError::UnexpectedReply(other.encode())),
        }
    }

    /// Start a fresh game; the reply lists the new starting blocks.
    pub fn restart(&self) -> Result<Vec<(Block, Coord)>, ClientError> {
        match self.request(&Request::Restart)? {
            Response::RestartOk(blocks) => Ok(blocks),
            other => Err(ClientError::UnexpectedReply(other.encode())),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Unblocks the reader thread; the writer exits with the sender.
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}
