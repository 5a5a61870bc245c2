//! Turn result: the structured record of everything one turn caused, with
//! its canonical wire serialization.
//!
//! Format (fields separated by `|`):
//!
//! ```text
//! op1 op2 ... opN|spawnValue spawnX spawnY|won|lost|score
//! ```
//!
//! Each op is five space-separated integers `opcode fromX fromY toX toY`
//! with opcode 1 = Move, 2 = Merge. A turn that had no effect serializes
//! with an empty first field and a `0 0 0` spawn record.

use super::{Block, Coord, BOARD_HEIGHT, BOARD_WIDTH};
use std::error::Error;
use std::fmt;

/// Error raised when a serialized turn result cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDecodeError(pub String);

impl fmt::Display for TurnDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not decode turn result: {}", self.0)
    }
}

impl Error for TurnDecodeError {}

/// A single block relocation within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOp {
    /// The block at `from` slid to the empty cell `to`.
    Move { from: Coord, to: Coord },
    /// The block at `from` merged into the equal block at `to`, doubling it.
    Merge { from: Coord, to: Coord },
}

impl TurnOp {
    fn opcode(self) -> u8 {
        match self {
            TurnOp::Move { .. } => 1,
            TurnOp::Merge { .. } => 2,
        }
    }

    pub fn from(self) -> Coord {
        match self {
            TurnOp::Move { from, .. } | TurnOp::Merge { from, .. } => from,
        }
    }

    pub fn to(self) -> Coord {
        match self {
            TurnOp::Move { to, .. } | TurnOp::Merge { to, .. } => to,
        }
    }
}

/// Everything that happened in one turn. The operation order matters: each
/// operation is replayable against the board state left by the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnResult {
    /// Slides and merges, in emission order.
    pub operations: Vec<TurnOp>,
    /// Block spawned after the turn, if the turn had any effect.
    pub spawned: Option<(Block, Coord)>,
    /// A merge this turn produced the winning tile for the first time.
    pub won: bool,
    /// The board is full with no merge available.
    pub lost: bool,
    /// Score gained this turn (sum of post-merge tile values).
    pub score: i64,
}

impl TurnResult {
    /// Whether the turn had any effect. A no-op turn carries no spawn,
    /// no score and no terminal flags.
    pub fn played(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn push_move(&mut self, from: Coord, to: Coord) {
        self.operations.push(TurnOp::Move { from, to });
    }

    pub fn push_merge(&mut self, from: Coord, to: Coord) {
        self.operations.push(TurnOp::Merge { from, to });
    }

    /// Serialize to the canonical wire form.
    pub fn serialize(&self) -> String {
        let ops = self
            .operations
            .iter()
            .map(|op| {
                let (from, to) = (op.from(), op.to());
                format!("{} {} {} {} {}", op.opcode(), from.x, from.y, to.x, to.y)
            })
            .collect::<Vec<_>>()
            .join(" ");

        let (spawn_block, spawn_at) = match self.spawned {
            Some((block, at)) => (block, at),
            None => (Block::EMPTY, Coord::new(0, 0)),
        };

        format!(
            "{}|{} {} {}|{}|{}|{}",
            ops,
            spawn_block,
            spawn_at.x,
            spawn_at.y,
            u8::from(self.won),
            u8::from(self.lost),
            self.score
        )
    }

    /// Decode a wire-form turn result, rejecting anything malformed.
    pub fn deserialize(data: &str) -> Result<TurnResult, TurnDecodeError> {
        let fields: Vec<&str> = data.split('|').collect();
        if fields.len() != 5 {
            return Err(TurnDecodeError(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        }

        let mut result = TurnResult::default();

        let tokens: Vec<&str> = fields[0].split_whitespace().collect();
        if tokens.len() % 5 != 0 {
            return Err(TurnDecodeError("truncated operation list".into()));
        }
        for op in tokens.chunks(5) {
            let nums: Vec<usize> = op
                .iter()
                .map(|t| t.parse::<usize>())
                .collect::<Result<_, _>>()
                .map_err(|_| TurnDecodeError("non-numeric operation token".into()))?;
            let from = board_coord(nums[1], nums[2])?;
            let to = board_coord(nums[3], nums[4])?;
            match nums[0] {
                1 => result.push_move(from, to),
                2 => result.push_merge(from, to),
                other => {
                    return Err(TurnDecodeError(format!("unknown opcode {other}")));
                }
            }
        }

        let spawn: Vec<&str> = fields[1].split_whitespace().collect();
        if spawn.len() != 3 {
            return Err(TurnDecodeError("malformed spawn record".into()));
        }
        let exp: u8 = spawn[0]
            .parse()
            .map_err(|_| TurnDecodeError("non-numeric spawn value".into()))?;
        if exp != 0 {
            let block = Block::from_exponent(exp)
                .ok_or_else(|| TurnDecodeError("spawn value out of range".into()))?;
            let x: usize = spawn[1]
                .parse()
                .map_err(|_| TurnDecodeError("non-numeric spawn coordinate".into()))?;
            let y: usize = spawn[2]
                .parse()
                .map_err(|_| TurnDecodeError("non-numeric spawn coordinate".into()))?;
            result.spawned = Some((block, board_coord(x, y)?));
        }

        result.won = parse_flag(fields[2])?;
        result.lost = parse_flag(fields[3])?;
        result.score = fields[4]
            .trim()
            .parse()
            .map_err(|_| TurnDecodeError("non-numeric score".into()))?;

        Ok(result)
    }
}

/// Coordinates on the wire must land on the board; anything else is a
/// malformed message, never an index into the grid.
fn board_coord(x: usize, y: usize) -> Result<Coord, TurnDecodeError> {
    if x < BOARD_WIDTH && y < BOARD_HEIGHT {
        Ok(Coord::new(x, y))
    } else {
        Err(TurnDecodeError(format!("coordinate ({x}, {y}) off the board")))
    }
}

fn parse_flag(field: &str) -> Result<bool, TurnDecodeError> {
    let n: i64 = field
        .trim()
        .parse()
        .map_err(|_| TurnDecodeError("non-numeric flag".into()))?;
    Ok(n != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> TurnResult {
        let mut result = TurnResult::default();
        result.push_move(Coord::new(3, 0), Coord::new(0, 0));
        result.push_merge(Coord::new(2, 1), Coord::new(0, 1));
        result.spawned = Some((Block::SECOND, Coord::new(3, 3)));
        result.won = true;
        result.score = 2052;
        result
    }

    #[test]
    fn test_round_trip_with_operations() {
        let result = sample_result();
        let wire = result.serialize();
        assert_eq!(TurnResult::deserialize(&wire).unwrap(), result);
    }

    #[test]
    fn test_round_trip_single_operation() {
        let mut result = TurnResult::default();
        result.push_merge(Coord::new(1, 0), Coord::new(0, 0));
        result.spawned = Some((Block::LOWEST, Coord::new(2, 2)));
        result.score = 4;
        let decoded = TurnResult::deserialize(&result.serialize()).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_round_trip_no_op_turn() {
        let result = TurnResult::default();
        let wire = result.serialize();
        assert_eq!(wire, "|0 0 0|0|0|0");
        let decoded = TurnResult::deserialize(&wire).unwrap();
        assert_eq!(decoded, result);
        assert!(!decoded.played());
    }

    #[test]
    fn test_serialized_form_is_stable() {
        let result = sample_result();
        assert_eq!(result.serialize(), "1 3 0 0 0 2 2 1 0 1|2 3 3|1|0|2052");
    }

    #[test]
    fn test_deserialize_rejects_missing_fields() {
        assert!(TurnResult::deserialize("").is_err());
        assert!(TurnResult::deserialize("|0 0 0|0|0").is_err());
        assert!(TurnResult::deserialize("|0 0 0|0|0|0|0").is_err());
    }

    #[test]
    fn test_deserialize_rejects_bad_tokens() {
        assert!(TurnResult::deserialize("1 0 0 0|0 0 0|0|0|0").is_err());
        assert!(TurnResult::deserialize("9 0 0 1 0|0 0 0|0|0|0").is_err());
        assert!(TurnResult::deserialize("|x 0 0|0|0|0").is_err());
        assert!(TurnResult::deserialize("|0 0 0|yes|0|0").is_err());
        assert!(TurnResult::deserialize("|0 0 0|0|0|abc").is_err());
        assert!(TurnResult::deserialize("|0 0|0|0|0").is_err());
    }

    #[test]
    fn test_deserialize_rejects_off_board_coordinates() {
        assert!(TurnResult::deserialize("1 9 9 9 9|0 0 0|0|0|0").is_err());
        assert!(TurnResult::deserialize("2 0 0 4 0|0 0 0|0|0|0").is_err());
        assert!(TurnResult::deserialize("|1 4 0|0|0|0").is_err());
        assert!(TurnResult::deserialize("|1 0 4|0|0|0").is_err());
    }
}
