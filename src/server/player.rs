//! Server-side player state: the authoritative board, score, flags and the
//! per-session statistics tally.

use crate::game::turn::{TurnOp, TurnResult};
use crate::game::{engine, spawn, Block, Board, Coord, Direction};
use crate::stats::Stats;
use crate::storage::{PlayerRow, StorageError};
use rand::Rng;
use std::time::Instant;

/// One logged-in player's in-memory state. Owned exclusively by its
/// session; created on a successful data load and flushed to storage when
/// the session ends.
pub struct PlayerData {
    id: i64,
    name: String,
    board: Board,
    won: bool,
    score: i64,
    session_stats: Stats,
    lifetime_stats: Stats,
    /// Game start: now, or the last restart.
    game_start: Instant,
    session_start: Instant,
}

impl PlayerData {
    /// Build from a stored row after `DAT-REQ`.
    pub fn load(id: i64, name: String, row: PlayerRow) -> Result<PlayerData, StorageError> {
        let board = Board::deserialize(&row.board)
            .ok_or_else(|| StorageError::CorruptRow(format!("board for player {id}")))?;
        let now = Instant::now();
        Ok(PlayerData {
            id,
            name,
            board,
            won: row.won,
            score: row.score,
            session_stats: Stats::default(),
            lifetime_stats: row.stats,
            game_start: now,
            session_start: now,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn session_stats(&self) -> &Stats {
        &self.session_stats
    }

    /// Session tally folded onto the lifetime totals.
    pub fn total_stats(&self) -> Stats {
        self.session_stats.combined(&self.lifetime_stats)
    }

    /// Run one directional turn against the board.
    pub fn play(&mut self, direction: Direction) -> TurnResult {
        self.play_with_rng(direction, &mut rand::rng())
    }

    /// `play` with an explicit RNG for the spawn.
    pub fn play_with_rng<R: Rng>(&mut self, direction: Direction, rng: &mut R) -> TurnResult {
        let mut result = engine::apply_turn(&mut self.board, direction);
        if !result.played() {
            // Ineffective turn: no spawn, no score, no stats, no checks.
            return result;
        }

        result.spawned = spawn::spawn_block_with_rng(&mut self.board, rng);
        self.score += result.score;

        let moves = result
            .operations
            .iter()
            .filter(|op| matches!(op, TurnOp::Move { .. }))
            .count() as i64;
        let merges = result.operations.len() as i64 - moves;

        self.session_stats.record_play(direction);
        self.session_stats.record_blocks_moved(moves);
        self.session_stats.record_blocks_merged(merges);
        self.session_stats.add_score(result.score);
        self.session_stats.note_highest_score(self.score);
        // The maximal-block slot tracks tiles the player built, so only
        // merge results feed it, not loaded or spawned tiles.
        if let Some(best_merged) = result
            .operations
            .iter()
            .filter(|op| matches!(op, TurnOp::Merge { .. }))
            .map(|op| self.board.get(op.to()).value())
            .max()
        {
            self.session_stats.note_maximal_block(best_merged);
        }

        let game_secs = self.game_start.elapsed().as_secs() as i64;
        if result.won && !self.won {
            self.won = true;
            self.session_stats.record_win(game_secs);
        } else {
            // The flag reports the winning transition only.
            result.won = false;
            if !self.won && engine::is_game_over(&self.board) {
                result.lost = true;
                self.session_stats.record_loss(game_secs);
            }
        }

        result
    }

    /// Reset to a fresh game: empty board re-seeded with the default
    /// starting blocks, score and won flag cleared. Session statistics
    /// keep accumulating across the restart.
    pub fn restart(&mut self) -> Vec<(Block, Coord)> {
        self.restart_with_rng(&mut rand::rng())
    }

    /// `restart` with an explicit RNG for the initial spawns.
    pub fn restart_with_rng<R: Rng>(&mut self, rng: &mut R) -> Vec<(Block, Coord)> {
        self.board = Board::empty();
        self.won = false;
        self.score = 0;
        self.game_start = Instant::now();
        self.session_stats.record_restart();
        spawn::initial_blocks_with_rng(&mut self.board, rng)
    }

    /// Close out the session tally before the flush to storage.
    pub fn finish_session(&mut self) {
        let session_secs = self.session_start.elapsed().as_secs() as i64;
        self.session_stats.add_time_played(session_secs);
    }

    #[cfg(test)]
    pub(crate) fn force_board(&mut self, board: Board) {
        self.board = board;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stat;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn loaded_player(board: &Board) -> PlayerData {
        let row = PlayerRow {
            board: board.serialize(),
            won: false,
            score: 0,
            stats: Stats::default(),
        };
        PlayerData::load(7, "ada".into(), row).unwrap()
    }

    fn block(exp: u8) -> Block {
        Block::from_exponent(exp).unwrap()
    }

    #[test]
    fn test_load_rejects_a_corrupt_board() {
        let row = PlayerRow {
            board: "not|a|board".into(),
            won: false,
            score: 0,
            stats: Stats::default(),
        };
        assert!(PlayerData::load(1, "ada".into(), row).is_err());
    }

    #[test]
    fn test_effective_play_spawns_scores_and_counts() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut board = Board::empty();
        board.set(Coord::new(0, 0), block(1));
        board.set(Coord::new(1, 0), block(1));
        let mut player = loaded_player(&board);

        let result = player.play_with_rng(Direction::Left, &mut rng);
        assert!(result.played());
        let (spawned, at) = result.spawned.unwrap();
        assert_eq!(player.board().get(at), spawned);
        assert_eq!(player.score(), 4);
        assert_eq!(player.session_stats().get(Stat::LeftMoves), 1);
        assert_eq!(player.session_stats().get(Stat::BlocksMerged), 1);
        assert_eq!(player.session_stats().get(Stat::TotalScore), 4);
        assert_eq!(player.session_stats().get(Stat::HighestScore), 4);
        assert_eq!(player.session_stats().get(Stat::MaximalBlock), 4);
    }

    #[test]
    fn test_maximal_block_counts_merges_only() {
        let mut rng = StdRng::seed_from_u64(11);
        // A large loaded tile sits apart from the pair that merges.
        let mut board = Board::empty();
        board.set(Coord::new(0, 0), block(1));
        board.set(Coord::new(1, 0), block(1));
        board.set(Coord::new(3, 3), block(9));
        let mut player = loaded_player(&board);

        let result = player.play_with_rng(Direction::Left, &mut rng);
        assert!(result.played());
        assert_eq!(player.session_stats().get(Stat::MaximalBlock), 4);
    }

    #[test]
    fn test_no_op_play_leaves_everything_untouched() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut board = Board::empty();
        board.set(Coord::new(0, 0), block(1));
        let mut player = loaded_player(&board);

        let result = player.play_with_rng(Direction::Left, &mut rng);
        assert!(!result.played());
        assert!(result.spawned.is_none());
        assert_eq!(player.score(), 0);
        assert_eq!(player.session_stats(), &Stats::default());
        assert_eq!(player.board(), &board);
    }

    #[test]
    fn test_win_is_reported_on_the_transition_only() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut board = Board::empty();
        board.set(Coord::new(0, 0), block(10));
        board.set(Coord::new(1, 0), block(10));
        let mut player = loaded_player(&board);

        let first = player.play_with_rng(Direction::Left, &mut rng);
        assert!(first.won);
        assert!(player.won());
        assert_eq!(player.session_stats().get(Stat::GameWins), 1);

        // Another winning merge after the transition stays quiet.
        let mut again = Board::empty();
        again.set(Coord::new(0, 0), block(10));
        again.set(Coord::new(1, 0), block(10));
        player.force_board(again);
        let second = player.play_with_rng(Direction::Left, &mut rng);
        assert!(second.played());
        assert!(!second.won);
        assert_eq!(player.session_stats().get(Stat::GameWins), 1);
    }

    #[test]
    fn test_loss_detected_when_spawn_fills_a_dead_board() {
        let mut rng = StdRng::seed_from_u64(1);
        // One hole at (0, 1); sliding column 0 down moves the 16 from
        // (0, 0) into it, and the forced spawn refills (0, 0). Neither a
        // "2" nor a "4" spawn can sit next to an equal tile, so the board
        // is dead afterwards.
        let exps = [[4, 0, 5, 6], [7, 8, 9, 10], [4, 5, 6, 7], [8, 9, 10, 11]];
        let mut board = Board::empty();
        for (x, col) in exps.iter().enumerate() {
            for (y, &exp) in col.iter().enumerate() {
                if exp > 0 {
                    board.set(Coord::new(x, y), block(exp));
                }
            }
        }
        let mut player = loaded_player(&board);
        let result = player.play_with_rng(Direction::Down, &mut rng);

        assert_eq!(
            result.operations,
            vec![TurnOp::Move {
                from: Coord::new(0, 0),
                to: Coord::new(0, 1),
            }]
        );
        let (_, at) = result.spawned.unwrap();
        assert_eq!(at, Coord::new(0, 0));
        assert!(result.lost);
        assert!(engine::is_game_over(player.board()));
        assert_eq!(player.session_stats().get(Stat::GameLosses), 1);
    }

    #[test]
    fn test_restart_reseeds_and_keeps_session_stats() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut board = Board::empty();
        board.set(Coord::new(0, 0), block(1));
        board.set(Coord::new(1, 0), block(1));
        let mut player = loaded_player(&board);
        player.play_with_rng(Direction::Left, &mut rng);
        assert!(player.score() > 0);

        let spawned = player.restart_with_rng(&mut rng);
        assert_eq!(spawned.len(), 2);
        assert_eq!(player.score(), 0);
        assert!(!player.won());
        assert_eq!(player.board().empty_cells().len(), 14);
        assert_eq!(player.session_stats().get(Stat::GameRestarts), 1);
        assert_eq!(player.session_stats().get(Stat::TotalMoves), 1);
    }

    #[test]
    fn test_finish_session_accumulates_time_played() {
        let board = Board::empty();
        let mut player = loaded_player(&board);
        player.finish_session();
        // Sub-second session truncates to zero seconds; the slot must not
        // go negative or panic.
        assert!(player.session_stats().get(Stat::TotalTimePlayed) >= 0);
    }
}
