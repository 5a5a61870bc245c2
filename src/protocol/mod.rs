//! Wire protocol: message framing and the command codecs.
//!
//! Every message is a 4-byte space-padded decimal ASCII header holding the
//! body length, followed by the body itself (at most 256 bytes). Bodies are
//! ASCII commands with `+`-delimited payload fields:
//!
//! ```text
//! C->S  LOG-<user>+<passwordHash>     S->C  LOG-OK / LOG-FAIL
//! C->S  DAT-REQ                       S->C  DAT-SEND+<board>+<won>+<score>
//! C->S  PLA-<LEFT|RIGHT|UP|DOWN>      S->C  PLA-OK+<turnResult>
//! C->S  RES-                          S->C  RES-OK+<value x y>*
//! ```
//!
//! A header that does not parse, or that claims a body longer than the
//! maximum, is a framing error; the connection that produced it is treated
//! as corrupted and closed, never retried at this layer.

use crate::game::turn::{TurnDecodeError, TurnResult};
use crate::game::{Block, Board, Coord, Direction, BOARD_HEIGHT, BOARD_WIDTH};
use std::error::Error;
use std::fmt;
use std::io::{Read, Write};

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 4;
/// Maximum body length in bytes.
pub const MAX_BODY_LEN: usize = 256;

/// Errors raised by the framing layer and the command codecs.
#[derive(Debug)]
pub enum ProtocolError {
    /// Header unparsable or body length over the maximum. Connection-fatal.
    Framing { length: usize },
    /// A structurally invalid command or payload. Connection-fatal on the
    /// receiving side.
    Malformed(String),
    /// Transport failure underneath the framing layer.
    Io(std::io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Framing { length } => {
                write!(f, "framing error: body length {length} exceeds {MAX_BODY_LEN}")
            }
            ProtocolError::Malformed(what) => write!(f, "malformed message: {what}"),
            ProtocolError::Io(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProtocolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::Io(e)
    }
}

impl From<TurnDecodeError> for ProtocolError {
    fn from(e: TurnDecodeError) -> Self {
        ProtocolError::Malformed(e.0)
    }
}

/// Encode a body length as the fixed-width ASCII header.
pub fn encode_header(length: usize) -> Result<[u8; HEADER_LEN], ProtocolError> {
    if length > MAX_BODY_LEN {
        return Err(ProtocolError::Framing { length });
    }
    let text = format!("{length:>4}");
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

/// Decode a header back into a body length.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize, ProtocolError> {
    let text = std::str::from_utf8(header).map_err(|_| ProtocolError::Framing { length: 0 })?;
    let length: usize = text
        .trim()
        .parse()
        .map_err(|_| ProtocolError::Framing { length: 0 })?;
    if length > MAX_BODY_LEN {
        return Err(ProtocolError::Framing { length });
    }
    Ok(length)
}

/// Frame a body into header + payload bytes ready for the wire.
pub fn encode_frame(body: &str) -> Result<Vec<u8>, ProtocolError> {
    let header = encode_header(body.len())?;
    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(body.as_bytes());
    Ok(frame)
}

/// Read exactly one framed body from the transport. A framing error here
/// means the stream is corrupted; the caller must close it without reading
/// the claimed body.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<String, ProtocolError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let length = decode_header(&header)?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    String::from_utf8(body).map_err(|_| ProtocolError::Malformed("non-ASCII body".into()))
}

/// Frame and write one body to the transport.
pub fn write_frame<W: Write>(writer: &mut W, body: &str) -> Result<(), ProtocolError> {
    let frame = encode_frame(body)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// A client-to-server command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Login { user: String, password_hash: String },
    DataRequest,
    Play(Direction),
    Restart,
}

impl Request {
    pub fn encode(&self) -> String {
        match self {
            Request::Login {
                user,
                password_hash,
            } => format!("LOG-{user}+{password_hash}"),
            Request::DataRequest => "DAT-REQ".to_string(),
            Request::Play(direction) => format!("PLA-{}", direction.as_str()),
            Request::Restart => "RES-".to_string(),
        }
    }

    pub fn parse(body: &str) -> Result<Request, ProtocolError> {
        if let Some(rest) = body.strip_prefix("LOG-") {
            let (user, password_hash) = rest
                .split_once('+')
                .ok_or_else(|| ProtocolError::Malformed("login without password".into()))?;
            if user.is_empty() {
                return Err(ProtocolError::Malformed("login without user".into()));
            }
            return Ok(Request::Login {
                user: user.to_string(),
                password_hash: password_hash.to_string(),
            });
        }
        if body == "DAT-REQ" {
            return Ok(Request::DataRequest);
        }
        if let Some(rest) = body.strip_prefix("PLA-") {
            let direction = Direction::from_str(rest)
                .ok_or_else(|| ProtocolError::Malformed(format!("unknown direction {rest:?}")))?;
            return Ok(Request::Play(direction));
        }
        if body == "RES-" {
            return Ok(Request::Restart);
        }
        Err(ProtocolError::Malformed(format!(
            "unrecognized command {body:?}"
        )))
    }
}

/// A server-to-client reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    LoginOk,
    LoginFail,
    Data {
        board: Board,
        won: bool,
        score: i64,
    },
    PlayOk(TurnResult),
    RestartOk(Vec<(Block, Coord)>),
}

impl Response {
    pub fn encode(&self) -> String {
        match self {
            Response::LoginOk => "LOG-OK".to_string(),
            Response::LoginFail => "LOG-FAIL".to_string(),
            Response::Data { board, won, score } => {
                format!("DAT-SEND+{}+{}+{}", board.serialize(), u8::from(*won), score)
            }
            Response::PlayOk(result) => format!("PLA-OK+{}", result.serialize()),
            Response::RestartOk(blocks) => {
                let triples = blocks
                    .iter()
                    .map(|(block, at)| format!("{} {} {}", block, at.x, at.y))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("RES-OK+{triples}")
            }
        }
    }

    pub fn parse(body: &str) -> Result<Response, ProtocolError> {
        match body {
            "LOG-OK" => return Ok(Response::LoginOk),
            "LOG-FAIL" => return Ok(Response::LoginFail),
            _ => {}
        }
        if let Some(rest) = body.strip_prefix("DAT-SEND+") {
            let fields: Vec<&str> = rest.split('+').collect();
            if fields.len() != 3 {
                return Err(ProtocolError::Malformed("bad data payload".into()));
            }
            let board = Board::deserialize(fields[0])
                .ok_or_else(|| ProtocolError::Malformed("bad board payload".into()))?;
            let won = match fields[1] {
                "0" => false,
                "1" => true,
                _ => return Err(ProtocolError::Malformed("bad won flag".into())),
            };
            let score: i64 = fields[2]
                .parse()
                .map_err(|_| ProtocolError::Malformed("bad score".into()))?;
            return Ok(Response::Data { board, won, score });
        }
        if let Some(rest) = body.strip_prefix("PLA-OK+") {
            return Ok(Response::PlayOk(TurnResult::deserialize(rest)?));
        }
        if let Some(rest) = body.strip_prefix("RES-OK+") {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            if tokens.len() % 3 != 0 {
                return Err(ProtocolError::Malformed("truncated spawn list".into()));
            }
            let mut blocks = Vec::with_capacity(tokens.len() / 3);
            for triple in tokens.chunks(3) {
                let exp: u8 = triple[0]
                    .parse()
                    .map_err(|_| ProtocolError::Malformed("bad spawn value".into()))?;
                let block = Block::from_exponent(exp)
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| ProtocolError::Malformed("bad spawn value".into()))?;
                let x: usize = triple[1]
                    .parse()
                    .map_err(|_| ProtocolError::Malformed("bad spawn coordinate".into()))?;
                let y: usize = triple[2]
                    .parse()
                    .map_err(|_| ProtocolError::Malformed("bad spawn coordinate".into()))?;
                if x >= BOARD_WIDTH || y >= BOARD_HEIGHT {
                    return Err(ProtocolError::Malformed(
                        "spawn coordinate off the board".into(),
                    ));
                }
                blocks.push((block, Coord::new(x, y)));
            }
            return Ok(Response::RestartOk(blocks));
        }
        Err(ProtocolError::Malformed(format!(
            "unrecognized reply {body:?}"
        )))
    }
}
