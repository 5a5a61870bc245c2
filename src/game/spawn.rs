//! Random spawn generator.
//!
//! Picks uniformly among the empty cells; 15% of spawns are the
//! second-lowest tile, the rest the lowest. The generic `_with_rng`
//! variants exist so tests can drive spawning with a seeded RNG.

use super::{Block, Board, Coord, DEFAULT_START_BLOCKS, SECOND_TILE_SPAWN_CHANCE};
use rand::Rng;

/// Place one random block on the board, mutating it in place.
///
/// Returns `None` when the board has no empty cell; every caller that runs
/// after an effective turn is guaranteed at least one (the origin of the
/// last operation is empty).
pub fn spawn_block(board: &mut Board) -> Option<(Block, Coord)> {
    spawn_block_with_rng(board, &mut rand::rng())
}

/// `spawn_block` with an explicit RNG.
pub fn spawn_block_with_rng<R: Rng>(board: &mut Board, rng: &mut R) -> Option<(Block, Coord)> {
    let empty = board.empty_cells();
    if empty.is_empty() {
        return None;
    }
    let at = empty[rng.random_range(0..empty.len())];
    let block = if rng.random_range(0..100) < SECOND_TILE_SPAWN_CHANCE {
        Block::SECOND
    } else {
        Block::LOWEST
    };
    board.set(at, block);
    Some((block, at))
}

/// Seed a fresh game: the default number of starting blocks on an empty
/// board. Returns the spawned blocks in placement order.
pub fn initial_blocks(board: &mut Board) -> Vec<(Block, Coord)> {
    initial_blocks_with_rng(board, &mut rand::rng())
}

/// `initial_blocks` with an explicit RNG.
pub fn initial_blocks_with_rng<R: Rng>(board: &mut Board, rng: &mut R) -> Vec<(Block, Coord)> {
    (0..DEFAULT_START_BLOCKS)
        .filter_map(|_| spawn_block_with_rng(board, rng))
        .collect()
}
