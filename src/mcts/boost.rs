use crate::game::Board;
use crate::game::Point;
use crate::game::Stone;
use crate::threat::Threats;

/// multiplicative prior boosts for one tier of the tree. root and child
/// tiers carry distinct factors; the tuning gain from arena feedback scales
/// every factor's excess over neutral.
#[derive(Debug, Clone, Copy)]
pub struct BoostTier {
    pub win: f32,
    pub block_win: f32,
    pub open_four: f32,
    pub block_open_four: f32,
    pub four: f32,
    pub block_four: f32,
    pub open_three: f32,
    pub block_open_three: f32,
    pub three: f32,
    pub block_three: f32,
    pub long_link: f32,
}

impl BoostTier {
    pub fn root(gain: f32) -> Self {
        Self {
            win: 1.0,
            block_win: 1.0,
            open_four: 1.5,
            block_open_four: 1.3,
            four: 1.15,
            block_four: 1.10,
            open_three: 1.08,
            block_open_three: 1.05,
            three: 1.05,
            block_three: 1.03,
            long_link: 1.03,
        }
        .scaled(gain)
    }

    pub fn child(gain: f32) -> Self {
        Self {
            win: 5.0,
            block_win: 2.0,
            open_four: 1.3,
            block_open_four: 1.2,
            four: 1.1,
            block_four: 1.08,
            open_three: 1.05,
            block_open_three: 1.03,
            three: 1.02,
            block_three: 1.01,
            long_link: 1.02,
        }
        .scaled(gain)
    }

    fn scaled(self, gain: f32) -> Self {
        let scale = |f: f32| 1.0 + (f - 1.0) * gain;
        Self {
            win: scale(self.win),
            block_win: scale(self.block_win),
            open_four: scale(self.open_four),
            block_open_four: scale(self.block_open_four),
            four: scale(self.four),
            block_four: scale(self.block_four),
            open_three: scale(self.open_three),
            block_open_three: scale(self.block_open_three),
            three: scale(self.three),
            block_three: scale(self.block_three),
            long_link: scale(self.long_link),
        }
    }

    /// multiply the masked prior vector by the tactical factors for every
    /// cell the detector flags, for mover and opponent alike
    pub fn apply(&self, policy: &mut [f32], board: &Board, to_move: Stone) {
        let n = board.size();
        let ref mine = Threats::from((board, to_move));
        let ref theirs = Threats::from((board, to_move.opponent()));
        let mut bump = |points: &[Point], factor: f32| {
            for point in points {
                policy[point.flat(n)] *= factor;
            }
        };
        bump(&mine.wins, self.win);
        bump(&theirs.wins, self.block_win);
        bump(&mine.open_fours, self.open_four);
        bump(&theirs.open_fours, self.block_open_four);
        bump(&mine.fours, self.four);
        bump(&theirs.fours, self.block_four);
        bump(&mine.open_threes, self.open_three);
        bump(&theirs.open_threes, self.block_open_three);
        bump(&mine.threes, self.three);
        bump(&theirs.threes, self.block_three);
        bump(&mine.long_links, self.long_link);
    }
}
