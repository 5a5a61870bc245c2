//! Board model: blocks, coordinates, directions and the grid itself.
//!
//! A block is stored as an exponent of two (0 means the cell is empty,
//! 1 means a "2" tile, 2 means a "4" tile and so on). The board is a fixed
//! 4x4 grid addressed by (x, y). All game-state mutation goes through the
//! turn engine, the spawner or a full replacement on load/restart.

pub mod engine;
pub mod spawn;
pub mod turn;

use std::fmt;

/// Board width in cells.
pub const BOARD_WIDTH: usize = 4;
/// Board height in cells.
pub const BOARD_HEIGHT: usize = 4;

/// Exclusive upper bound on block exponents. 2^17 = 131072 is the
/// theoretical maximum on a 4x4 board.
pub const MAX_BLOCK: u8 = 18;

/// Exponent of the winning tile (2^11 = 2048).
pub const WINNING_BLOCK: Block = Block(11);

/// Chance (percent) of spawning the second-lowest tile instead of the lowest.
pub const SECOND_TILE_SPAWN_CHANCE: u32 = 15;

/// Number of blocks placed at game start and on restart.
pub const DEFAULT_START_BLOCKS: usize = 2;

/// A single tile value, stored as an exponent of two. `Block(0)` is an
/// empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Block(u8);

impl Block {
    /// The empty cell.
    pub const EMPTY: Block = Block(0);
    /// The lowest spawnable tile ("2").
    pub const LOWEST: Block = Block(1);
    /// The second-lowest spawnable tile ("4").
    pub const SECOND: Block = Block(2);

    /// Create a block from a raw exponent, rejecting out-of-range values.
    pub fn from_exponent(exp: u8) -> Option<Block> {
        if exp < MAX_BLOCK {
            Some(Block(exp))
        } else {
            None
        }
    }

    /// Raw exponent of this block.
    pub fn exponent(self) -> u8 {
        self.0
    }

    /// Whether this cell holds no tile.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Numeric tile value (2^exponent). Zero for an empty cell.
    pub fn value(self) -> i64 {
        if self.0 == 0 {
            0
        } else {
            1i64 << self.0
        }
    }

    /// The block one exponent higher, or `None` at the representable maximum.
    pub fn raised(self) -> Option<Block> {
        Block::from_exponent(self.0 + 1)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cell position on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Coord {
        Coord { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four playable directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Wire name of the direction (`LEFT`, `RIGHT`, `UP`, `DOWN`).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }

    /// Parse a wire name back into a direction.
    pub fn from_str(s: &str) -> Option<Direction> {
        match s {
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }

    /// Unit step of travel as (dx, dy).
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }
}

/// The fixed 4x4 grid of blocks, owned exclusively by one player session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Block; BOARD_HEIGHT]; BOARD_WIDTH],
}

impl Board {
    /// An all-empty board.
    pub fn empty() -> Board {
        Board::default()
    }

    pub fn get(&self, at: Coord) -> Block {
        self.cells[at.x][at.y]
    }

    pub fn set(&mut self, at: Coord, block: Block) {
        self.cells[at.x][at.y] = block;
    }

    /// All cell positions, in serialization order (x-major).
    pub fn coords() -> impl Iterator<Item = Coord> {
        (0..BOARD_WIDTH).flat_map(|x| (0..BOARD_HEIGHT).map(move |y| Coord::new(x, y)))
    }

    /// Positions of all empty cells, in serialization order.
    pub fn empty_cells(&self) -> Vec<Coord> {
        Board::coords().filter(|&c| self.get(c).is_empty()).collect()
    }

    /// The highest tile currently on the board.
    pub fn max_block(&self) -> Block {
        Board::coords()
            .map(|c| self.get(c))
            .max()
            .unwrap_or(Block::EMPTY)
    }

    /// Serialize every cell exponent, `|`-joined, flat index `i = x*H + y`.
    /// This is the wire and storage form of a full board.
    pub fn serialize(&self) -> String {
        Board::coords()
            .map(|c| self.get(c).to_string())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Rebuild a board from its serialized form. Fails on a wrong cell
    /// count, a non-numeric token or an out-of-range exponent.
    pub fn deserialize(data: &str) -> Option<Board> {
        let mut board = Board::empty();
        let mut count = 0;
        for (i, token) in data.split('|').enumerate() {
            if i >= BOARD_WIDTH * BOARD_HEIGHT {
                return None;
            }
            let exp: u8 = token.trim().parse().ok()?;
            let at = Coord::new(i / BOARD_HEIGHT, i % BOARD_HEIGHT);
            board.set(at, Block::from_exponent(exp)?);
            count += 1;
        }
        if count == BOARD_WIDTH * BOARD_HEIGHT {
            Some(board)
        } else {
            None
        }
    }
}
