//! Local mirror of the server-side game.
//!
//! The client never recomputes turn logic. It replays the operations the
//! server reports, in order, against its copy of the board; a replay that
//! does not fit the local state means the mirror has diverged and the
//! session cannot continue.

use crate::game::turn::{TurnOp, TurnResult};
use crate::game::{Block, Board, Coord};
use std::error::Error;
use std::fmt;

/// A reported operation that does not apply to the local board.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplayError(pub String);

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board mirror diverged: {}", self.0)
    }
}

impl Error for ReplayError {}

/// The client's view of the game: board, flags and score as last reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameMirror {
    board: Board,
    won: bool,
    lost: bool,
    score: i64,
}

impl GameMirror {
    /// Seed the mirror from a `DAT-SEND` reply.
    pub fn from_data(board: Board, won: bool, score: i64) -> GameMirror {
        GameMirror {
            board,
            won,
            lost: false,
            score,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn lost(&self) -> bool {
        self.lost
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Replay one turn's operations, spawn and flags.
    pub fn apply_turn(&mut self, result: &TurnResult) -> Result<(), ReplayError> {
        for op in &result.operations {
            match *op {
                TurnOp::Move { from, to } => self.replay_move(from, to)?,
                TurnOp::Merge { from, to } => self.replay_merge(from, to)?,
            }
        }
        if let Some((block, at)) = result.spawned {
            if !self.board.get(at).is_empty() {
                return Err(ReplayError(format!("spawn onto occupied cell {at}")));
            }
            self.board.set(at, block);
        }
        self.score += result.score;
        if result.won {
            self.won = true;
        }
        if result.lost {
            self.lost = true;
        }
        Ok(())
    }

    fn replay_move(&mut self, from: Coord, to: Coord) -> Result<(), ReplayError> {
        let block = self.board.get(from);
        if block.is_empty() {
            return Err(ReplayError(format!("move from empty cell {from}")));
        }
        if !self.board.get(to).is_empty() {
            return Err(ReplayError(format!("move onto occupied cell {to}")));
        }
        self.board.set(to, block);
        self.board.set(from, Block::EMPTY);
        Ok(())
    }

    fn replay_merge(&mut self, from: Coord, to: Coord) -> Result<(), ReplayError> {
        let block = self.board.get(from);
        let target = self.board.get(to);
        if block.is_empty() || block != target {
            return Err(ReplayError(format!("merge of unequal cells {from} {to}")));
        }
        let raised = block
            .raised()
            .ok_or_else(|| ReplayError(format!("merge overflow at {to}")))?;
        self.board.set(to, raised);
        self.board.set(from, Block::EMPTY);
        Ok(())
    }

    /// Replay a restart: fresh board with the reported starting blocks.
    pub fn apply_restart(&mut self, blocks: &[(Block, Coord)]) {
        self.board = Board::empty();
        self.won = false;
        self.lost = false;
        self.score = 0;
        for &(block, at) in blocks {
            self.board.set(at, block);
        }
    }
}
