//! Fixed-slot player statistics.
//!
//! A `Stats` value is a vector of named counters and extrema, one slot per
//! `Stat`. The same shape is used for the running session tally and for the
//! lifetime totals loaded from storage; two values combine per slot (sum
//! for counters, max/min for extrema). "Fastest" extrema only update from a
//! non-zero baseline: the first recorded value sets the slot instead of
//! being compared against the zero initializer.

use crate::game::Direction;

/// How a slot accumulates when merged into another `Stats` value or into
/// the lifetime table in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    Sum,
    Max,
    /// Minimum, ignoring unset (zero) values.
    Min,
}

/// Identity of one statistics slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Stat {
    LeftMoves = 0,
    RightMoves,
    UpMoves,
    DownMoves,
    TotalMoves,
    BlocksMoved,
    BlocksMerged,
    GameRestarts,
    GameWins,
    GameLosses,
    TotalTimePlayed,
    TotalScore,
    HighestScore,
    MaximalBlock,
    SlowestWin,
    SlowestLoss,
    FastestWin,
    FastestLoss,
}

impl Stat {
    /// Number of slots.
    pub const COUNT: usize = 18;

    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::LeftMoves,
        Stat::RightMoves,
        Stat::UpMoves,
        Stat::DownMoves,
        Stat::TotalMoves,
        Stat::BlocksMoved,
        Stat::BlocksMerged,
        Stat::GameRestarts,
        Stat::GameWins,
        Stat::GameLosses,
        Stat::TotalTimePlayed,
        Stat::TotalScore,
        Stat::HighestScore,
        Stat::MaximalBlock,
        Stat::SlowestWin,
        Stat::SlowestLoss,
        Stat::FastestWin,
        Stat::FastestLoss,
    ];

    /// Stable slot index, also used as the storage key.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn accumulation(self) -> Accumulation {
        match self {
            Stat::HighestScore | Stat::MaximalBlock | Stat::SlowestWin | Stat::SlowestLoss => {
                Accumulation::Max
            }
            Stat::FastestWin | Stat::FastestLoss => Accumulation::Min,
            _ => Accumulation::Sum,
        }
    }
}

/// A full vector of statistics slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    slots: [i64; Stat::COUNT],
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            slots: [0; Stat::COUNT],
        }
    }
}

impl Stats {
    /// Rebuild from raw slot values, e.g. rows loaded from storage. Slots
    /// beyond `Stat::COUNT` are rejected; missing ones stay zero.
    pub fn from_slots(values: &[(usize, i64)]) -> Option<Stats> {
        let mut stats = Stats::default();
        for &(index, value) in values {
            if index >= Stat::COUNT {
                return None;
            }
            stats.slots[index] = value;
        }
        Some(stats)
    }

    pub fn get(&self, stat: Stat) -> i64 {
        self.slots[stat.index()]
    }

    /// Raw slot values in index order.
    pub fn slots(&self) -> &[i64; Stat::COUNT] {
        &self.slots
    }

    /// One directional command was played effectively.
    pub fn record_play(&mut self, direction: Direction) {
        let slot = match direction {
            Direction::Left => Stat::LeftMoves,
            Direction::Right => Stat::RightMoves,
            Direction::Up => Stat::UpMoves,
            Direction::Down => Stat::DownMoves,
        };
        self.slots[slot.index()] += 1;
        self.slots[Stat::TotalMoves.index()] += 1;
    }

    pub fn record_blocks_moved(&mut self, count: i64) {
        self.slots[Stat::BlocksMoved.index()] += count;
    }

    pub fn record_blocks_merged(&mut self, count: i64) {
        self.slots[Stat::BlocksMerged.index()] += count;
    }

    pub fn record_restart(&mut self) {
        self.slots[Stat::GameRestarts.index()] += 1;
    }

    /// The winning tile was reached; `game_secs` is the duration of the
    /// game since its start or last restart.
    pub fn record_win(&mut self, game_secs: i64) {
        self.slots[Stat::GameWins.index()] += 1;
        bump_max(&mut self.slots[Stat::SlowestWin.index()], game_secs);
        bump_min(&mut self.slots[Stat::FastestWin.index()], game_secs);
    }

    /// The board filled up with no merge left.
    pub fn record_loss(&mut self, game_secs: i64) {
        self.slots[Stat::GameLosses.index()] += 1;
        bump_max(&mut self.slots[Stat::SlowestLoss.index()], game_secs);
        bump_min(&mut self.slots[Stat::FastestLoss.index()], game_secs);
    }

    pub fn add_score(&mut self, score: i64) {
        self.slots[Stat::TotalScore.index()] += score;
    }

    pub fn note_highest_score(&mut self, score: i64) {
        bump_max(&mut self.slots[Stat::HighestScore.index()], score);
    }

    pub fn note_maximal_block(&mut self, value: i64) {
        bump_max(&mut self.slots[Stat::MaximalBlock.index()], value);
    }

    /// Session duration flushed on disconnect.
    pub fn add_time_played(&mut self, secs: i64) {
        self.slots[Stat::TotalTimePlayed.index()] += secs;
    }

    /// Per-slot combination of two stats of the same shape, e.g. the
    /// running session tally on top of the lifetime totals.
    pub fn combined(&self, other: &Stats) -> Stats {
        let mut out = Stats::default();
        for stat in Stat::ALL {
            let i = stat.index();
            let (a, b) = (self.slots[i], other.slots[i]);
            out.slots[i] = match stat.accumulation() {
                Accumulation::Sum => a + b,
                Accumulation::Max => a.max(b),
                Accumulation::Min => match (a, b) {
                    (0, b) => b,
                    (a, 0) => a,
                    (a, b) => a.min(b),
                },
            };
        }
        out
    }
}

fn bump_max(slot: &mut i64, value: i64) {
    if value > *slot {
        *slot = value;
    }
}

fn bump_min(slot: &mut i64, value: i64) {
    if value != 0 && (*slot == 0 || value < *slot) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_counts_per_direction_and_total() {
        let mut stats = Stats::default();
        stats.record_play(Direction::Left);
        stats.record_play(Direction::Left);
        stats.record_play(Direction::Down);
        assert_eq!(stats.get(Stat::LeftMoves), 2);
        assert_eq!(stats.get(Stat::DownMoves), 1);
        assert_eq!(stats.get(Stat::RightMoves), 0);
        assert_eq!(stats.get(Stat::TotalMoves), 3);
    }

    #[test]
    fn test_fastest_extrema_start_from_first_real_value() {
        let mut stats = Stats::default();
        stats.record_win(90);
        assert_eq!(stats.get(Stat::FastestWin), 90);
        assert_eq!(stats.get(Stat::SlowestWin), 90);

        stats.record_win(40);
        stats.record_win(200);
        assert_eq!(stats.get(Stat::FastestWin), 40);
        assert_eq!(stats.get(Stat::SlowestWin), 200);
        assert_eq!(stats.get(Stat::GameWins), 3);
    }

    #[test]
    fn test_combined_sums_counters_and_merges_extrema() {
        let mut session = Stats::default();
        session.record_play(Direction::Up);
        session.add_score(120);
        session.note_highest_score(900);
        session.record_loss(30);

        let mut lifetime = Stats::default();
        lifetime.record_play(Direction::Up);
        lifetime.add_score(1000);
        lifetime.note_highest_score(2500);
        lifetime.record_loss(75);

        let total = session.combined(&lifetime);
        assert_eq!(total.get(Stat::UpMoves), 2);
        assert_eq!(total.get(Stat::TotalScore), 1120);
        assert_eq!(total.get(Stat::HighestScore), 2500);
        assert_eq!(total.get(Stat::FastestLoss), 30);
        assert_eq!(total.get(Stat::SlowestLoss), 75);
    }

    #[test]
    fn test_combined_min_ignores_unset_side() {
        let mut session = Stats::default();
        session.record_win(50);
        let lifetime = Stats::default();
        let total = session.combined(&lifetime);
        assert_eq!(total.get(Stat::FastestWin), 50);
    }

    #[test]
    fn test_from_slots_round_trips_and_validates() {
        let mut stats = Stats::default();
        stats.record_play(Direction::Right);
        stats.note_maximal_block(64);

        let rows: Vec<(usize, i64)> = stats
            .slots()
            .iter()
            .enumerate()
            .map(|(i, &v)| (i, v))
            .collect();
        assert_eq!(Stats::from_slots(&rows), Some(stats));
        assert_eq!(Stats::from_slots(&[(Stat::COUNT, 1)]), None);
    }
}
