//! Turn engine: the deterministic slide/merge rules.
//!
//! Each direction sweeps the board one line at a time (rows for horizontal
//! play, columns for vertical play), visiting cells strictly in travel order
//! so a block always merges or moves toward the already-processed part of
//! the line. A merged block's origin becomes empty and is skipped, so it can
//! never merge twice in one turn; the merge target can still absorb a later
//! equal block, which reproduces the chain behavior of the game.

use super::turn::TurnResult;
use super::{Block, Board, Coord, Direction, BOARD_HEIGHT, BOARD_WIDTH, WINNING_BLOCK};

/// Apply one directional turn to the board, mutating it in place.
///
/// Returns the operations emitted, the score gained (sum of post-merge tile
/// values) and whether a merge produced the winning tile. The spawn, the
/// loss check and all statistics are the caller's responsibility, and must
/// be skipped entirely when the result reports no operations.
pub fn apply_turn(board: &mut Board, direction: Direction) -> TurnResult {
    let mut result = TurnResult::default();
    let (dx, dy) = direction.delta();

    for from in sweep_order(direction) {
        let current = board.get(from);
        if current.is_empty() {
            continue;
        }

        let target = nearest_toward_edge(board, from, dx, dy);
        let at_target = board.get(target);

        if at_target.is_empty() {
            // The whole line up to the edge is clear.
            board.set(target, current);
            board.set(from, Block::EMPTY);
            result.push_move(from, target);
        } else if at_target == current {
            match at_target.raised() {
                Some(raised) => {
                    board.set(target, raised);
                    board.set(from, Block::EMPTY);
                    result.push_merge(from, target);
                    result.score += raised.value();
                    if raised == WINNING_BLOCK {
                        result.won = true;
                    }
                }
                // Equal tiles at the representable maximum stay blocked.
                None => {}
            }
        } else {
            // Blocked by an unequal tile; slide into the slot just before
            // it, unless the blocker is already adjacent.
            let slot = step_back(target, dx, dy);
            if slot != from {
                board.set(slot, current);
                board.set(from, Block::EMPTY);
                result.push_move(from, slot);
            }
        }
    }

    result
}

/// Whether the game is lost: no empty cell and no horizontally or
/// vertically adjacent pair of equal tiles anywhere on the board.
pub fn is_game_over(board: &Board) -> bool {
    if !board.empty_cells().is_empty() {
        return false;
    }
    for x in 0..BOARD_WIDTH {
        for y in 0..BOARD_HEIGHT {
            let here = board.get(Coord::new(x, y));
            if x + 1 < BOARD_WIDTH && board.get(Coord::new(x + 1, y)) == here {
                return false;
            }
            if y + 1 < BOARD_HEIGHT && board.get(Coord::new(x, y + 1)) == here {
                return false;
            }
        }
    }
    true
}

/// Cells to visit for a sweep, in travel order, skipping the leading edge
/// line (its blocks have nowhere to go).
fn sweep_order(direction: Direction) -> Vec<Coord> {
    let mut order = Vec::with_capacity(BOARD_WIDTH * BOARD_HEIGHT);
    match direction {
        Direction::Left => {
            for y in 0..BOARD_HEIGHT {
                for x in 1..BOARD_WIDTH {
                    order.push(Coord::new(x, y));
                }
            }
        }
        Direction::Right => {
            for y in 0..BOARD_HEIGHT {
                for x in (0..BOARD_WIDTH - 1).rev() {
                    order.push(Coord::new(x, y));
                }
            }
        }
        Direction::Up => {
            for x in 0..BOARD_WIDTH {
                for y in 1..BOARD_HEIGHT {
                    order.push(Coord::new(x, y));
                }
            }
        }
        Direction::Down => {
            for x in 0..BOARD_WIDTH {
                for y in (0..BOARD_HEIGHT - 1).rev() {
                    order.push(Coord::new(x, y));
                }
            }
        }
    }
    order
}

/// Walk from `from` toward the edge, skipping empty cells. Stops on the
/// first occupied cell, or on the edge cell itself if the line is clear.
fn nearest_toward_edge(board: &Board, from: Coord, dx: i32, dy: i32) -> Coord {
    let (mut x, mut y) = (from.x as i32, from.y as i32);
    loop {
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || nx >= BOARD_WIDTH as i32 || ny >= BOARD_HEIGHT as i32 {
            break;
        }
        x = nx;
        y = ny;
        if !board.get(Coord::new(x as usize, y as usize)).is_empty() {
            break;
        }
    }
    Coord::new(x as usize, y as usize)
}

/// One step back from `at`, against the direction of travel. Only called
/// with `at` strictly between the origin and the edge, so it cannot leave
/// the board.
fn step_back(at: Coord, dx: i32, dy: i32) -> Coord {
    Coord::new((at.x as i32 - dx) as usize, (at.y as i32 - dy) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::turn::TurnOp;

    fn block(exp: u8) -> Block {
        Block::from_exponent(exp).unwrap()
    }

    fn row_board(exps: [u8; 4]) -> Board {
        let mut board = Board::empty();
        for (x, &exp) in exps.iter().enumerate() {
            board.set(Coord::new(x, 0), block(exp));
        }
        board
    }

    #[test]
    fn test_two_equal_blocks_merge_left() {
        let mut board = row_board([1, 1, 0, 0]);
        let result = apply_turn(&mut board, Direction::Left);

        assert!(result.played());
        assert_eq!(
            result.operations,
            vec![TurnOp::Merge {
                from: Coord::new(1, 0),
                to: Coord::new(0, 0),
            }]
        );
        assert_eq!(board.get(Coord::new(0, 0)).value(), 4);
        assert!(board.get(Coord::new(1, 0)).is_empty());
        assert_eq!(result.score, 4);
        assert!(!result.won);
    }

    #[test]
    fn test_full_row_of_equal_blocks_merges_pairwise() {
        let mut board = row_board([1, 1, 1, 1]);
        let result = apply_turn(&mut board, Direction::Left);

        let merges = result
            .operations
            .iter()
            .filter(|op| matches!(op, TurnOp::Merge { .. }))
            .count();
        assert_eq!(merges, 2);
        assert_eq!(result.score, 8);
        assert_eq!(board.get(Coord::new(0, 0)).value(), 4);
        assert_eq!(board.get(Coord::new(1, 0)).value(), 4);
        assert!(board.get(Coord::new(2, 0)).is_empty());
        assert!(board.get(Coord::new(3, 0)).is_empty());
    }

    #[test]
    fn test_merge_target_can_chain_within_one_turn() {
        // [2, 2, 4] -> the merged 4 absorbs the trailing 4.
        let mut board = row_board([1, 1, 2, 0]);
        let result = apply_turn(&mut board, Direction::Left);

        assert_eq!(result.operations.len(), 2);
        assert!(result
            .operations
            .iter()
            .all(|op| matches!(op, TurnOp::Merge { .. })));
        assert_eq!(board.get(Coord::new(0, 0)).value(), 8);
        assert_eq!(result.score, 4 + 8);
    }

    #[test]
    fn test_blocked_line_is_a_no_op() {
        let mut board = row_board([1, 2, 3, 4]);
        let before = board.clone();
        let result = apply_turn(&mut board, Direction::Left);

        assert!(!result.played());
        assert_eq!(result.score, 0);
        assert!(result.spawned.is_none());
        assert_eq!(board, before);
    }

    #[test]
    fn test_no_op_repeats_after_line_settles() {
        let mut board = row_board([1, 2, 0, 0]);
        let first = apply_turn(&mut board, Direction::Left);
        assert!(!first.played());
        let second = apply_turn(&mut board, Direction::Left);
        assert!(!second.played());
    }

    #[test]
    fn test_slide_right_then_merge_on_far_edge() {
        let mut board = row_board([0, 1, 1, 0]);
        let result = apply_turn(&mut board, Direction::Right);

        assert_eq!(
            result.operations,
            vec![
                TurnOp::Move {
                    from: Coord::new(2, 0),
                    to: Coord::new(3, 0),
                },
                TurnOp::Merge {
                    from: Coord::new(1, 0),
                    to: Coord::new(3, 0),
                },
            ]
        );
        assert_eq!(board.get(Coord::new(3, 0)).value(), 4);
        assert_eq!(result.score, 4);
    }

    #[test]
    fn test_vertical_sweeps_use_columns() {
        let mut board = Board::empty();
        board.set(Coord::new(2, 1), block(3));
        board.set(Coord::new(2, 3), block(3));

        // (2, 1) slides to the top, then (2, 3) merges into it.
        let result = apply_turn(&mut board, Direction::Up);
        assert_eq!(board.get(Coord::new(2, 0)).value(), 16);

        let mut down = Board::empty();
        down.set(Coord::new(1, 0), block(2));
        let down_result = apply_turn(&mut down, Direction::Down);
        assert_eq!(
            down_result.operations,
            vec![TurnOp::Move {
                from: Coord::new(1, 0),
                to: Coord::new(1, 3),
            }]
        );
        assert_eq!(result.score, 16);
    }

    #[test]
    fn test_unequal_blocker_stops_the_slide_short() {
        let mut board = row_board([2, 0, 0, 1]);
        let result = apply_turn(&mut board, Direction::Left);

        assert_eq!(
            result.operations,
            vec![TurnOp::Move {
                from: Coord::new(3, 0),
                to: Coord::new(1, 0),
            }]
        );
        assert_eq!(board.get(Coord::new(1, 0)).value(), 2);
    }

    #[test]
    fn test_score_equals_sum_of_post_merge_values() {
        // Two independent rows merging in one turn.
        let mut board = Board::empty();
        board.set(Coord::new(0, 0), block(4));
        board.set(Coord::new(1, 0), block(4));
        board.set(Coord::new(0, 2), block(6));
        board.set(Coord::new(3, 2), block(6));

        let result = apply_turn(&mut board, Direction::Left);
        assert_eq!(result.score, 32 + 128);
    }

    #[test]
    fn test_winning_merge_sets_won() {
        let mut board = row_board([10, 10, 0, 0]);
        let result = apply_turn(&mut board, Direction::Left);

        assert!(result.won);
        assert_eq!(board.get(Coord::new(0, 0)), WINNING_BLOCK);
    }

    #[test]
    fn test_game_over_requires_full_board_without_merges() {
        // Full board, no adjacent equals anywhere.
        let mut full = Board::empty();
        let exps = [[1, 2, 1, 2], [3, 4, 3, 4], [1, 2, 1, 2], [3, 4, 3, 4]];
        for (x, col) in exps.iter().enumerate() {
            for (y, &exp) in col.iter().enumerate() {
                full.set(Coord::new(x, y), block(exp));
            }
        }
        assert!(is_game_over(&full));

        // One adjacent equal pair keeps the game alive.
        let mut mergeable = full.clone();
        mergeable.set(Coord::new(0, 1), block(1));
        assert!(!is_game_over(&mergeable));

        // Any empty cell keeps the game alive.
        let mut open = full.clone();
        open.set(Coord::new(2, 2), Block::EMPTY);
        assert!(!is_game_over(&open));
    }
}
