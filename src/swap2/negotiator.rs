use crate::Millis;
use crate::Value;
use crate::game::Board;
use crate::game::Point;
use crate::game::Stone;
use crate::nn::Oracle;
use std::time::Duration;
use std::time::Instant;

/// the agreed opening: the stones on the board, whose turn it is, and
/// whether the players exchanged colors along the way
#[derive(Debug, Clone)]
pub struct Opening {
    pub board: Board,
    pub to_move: Stone,
    pub swap_colors: bool,
}

/// the Swap2 protocol. the first player proposes a black-white-black
/// triple near the center; the second player picks whichever of the three
/// continuations a shallow network rollout scores best for them.
pub struct Negotiator<'a> {
    oracle: &'a Oracle,
    plies: usize,
    budget_ms: Millis,
}

impl<'a> Negotiator<'a> {
    pub fn new(oracle: &'a Oracle) -> Self {
        Self {
            oracle,
            plies: crate::SWAP2_ROLLOUT_PLIES,
            budget_ms: crate::SWAP2_BUDGET_MS,
        }
    }

    /// the proposal triple: B(c,c), W(c,c+1), B(c+1,c+1) for center c
    pub fn propose(size: usize) -> Board {
        let c = size / 2;
        let mut board = Board::empty(size);
        board.put(Point::from((c, c)), Stone::Black);
        board.put(Point::from((c, c + 1)), Stone::White);
        board.put(Point::from((c + 1, c + 1)), Stone::Black);
        board
    }

    /// the second player's choice among the three options, each scored by
    /// its expected value for the second player
    pub fn second(&self, board: &Board) -> Opening {
        let deadline = Instant::now() + Duration::from_millis(self.budget_ms);

        // option 1: take black. the first player continues as white.
        let take_black = Opening {
            board: board.clone(),
            to_move: Stone::White,
            swap_colors: true,
        };
        let v1 = -self.shallow(board, Stone::White, deadline);

        // option 2: stay white and add one white stone; black moves next.
        let (extended, v2) = match self.greedy(board, Stone::White) {
            None => (board.clone(), Value::MIN),
            Some(point) => {
                let extended = board.with(point, Stone::White);
                let v = -self.shallow(&extended, Stone::Black, deadline);
                (extended, v)
            }
        };
        let stay_white = Opening {
            board: extended,
            to_move: Stone::Black,
            swap_colors: false,
        };

        // option 3: add one white and one black, then the first player
        // takes whichever color scores better; the second player is left
        // with -max of the two.
        let balanced = self
            .greedy(board, Stone::White)
            .map(|w| board.with(w, Stone::White))
            .and_then(|b| self.greedy(&b, Stone::Black).map(|p| b.with(p, Stone::Black)));
        let (option3, v3) = match balanced {
            None => (None, Value::MIN),
            Some(placed) => {
                let v_white = self.shallow(&placed, Stone::White, deadline);
                let v_black = self.shallow(&placed, Stone::Black, deadline);
                let opening = Opening {
                    board: placed,
                    to_move: Stone::White,
                    // the first player keeps black unless white scores better
                    swap_colors: v_white > v_black,
                };
                (Some(opening), -v_white.max(v_black))
            }
        };

        log::debug!("swap2 option values: take-black {:.3} stay-white {:.3} balance {:.3}", v1, v2, v3);
        if v1 >= v2 && v1 >= v3 {
            take_black
        } else if v2 >= v3 {
            stay_white
        } else {
            option3.expect("option 3 scored above MIN only when placed")
        }
    }

    /// greedy rollout of a few plies, then the raw network value, signed
    /// back to the perspective of the side to move at entry
    fn shallow(&self, board: &Board, to_move: Stone, deadline: Instant) -> Value {
        let mut board = board.clone();
        let mut side = to_move;
        let mut sign = 1.0f32;
        for _ in 0..self.plies {
            if Instant::now() >= deadline {
                break;
            }
            let Some(point) = self.greedy(&board, side) else {
                break;
            };
            board.put(point, side);
            if board.wins(point, side) {
                return sign;
            }
            side = side.opponent();
            sign = -sign;
        }
        sign * self.oracle.raw(&board, side).value
    }

    /// highest-prior playable cell under the raw policy
    fn greedy(&self, board: &Board, to_move: Stone) -> Option<Point> {
        let n = board.size();
        let prediction = self.oracle.raw(board, to_move);
        board
            .legal_moves(board.candidate_radius())
            .into_iter()
            .filter(|&p| board.is_playable(p, to_move))
            .max_by(|a, b| {
                prediction.policy[a.flat(n)]
                    .partial_cmp(&prediction.policy[b.flat(n)])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::Evaluator;
    use crate::nn::Prediction;
    use std::sync::Arc;

    struct Uniform;

    impl Evaluator for Uniform {
        fn board_size(&self) -> usize {
            15
        }
        fn fingerprint(&self) -> String {
            "uniform".into()
        }
        fn predict(&self, batch: &[Vec<f32>]) -> Vec<Prediction> {
            batch
                .iter()
                .map(|_| Prediction {
                    policy: vec![1.0 / 225.0; 225],
                    value: 0.0,
                })
                .collect()
        }
    }

    #[test]
    fn proposal_is_a_centered_triple() {
        let board = Negotiator::propose(15);
        assert_eq!(board.stones(), 3);
        assert_eq!(board.get(Point::from((7, 7))), Some(Stone::Black));
        assert_eq!(board.get(Point::from((7, 8))), Some(Stone::White));
        assert_eq!(board.get(Point::from((8, 8))), Some(Stone::Black));
    }

    #[test]
    fn second_returns_a_coherent_continuation() {
        let oracle = Oracle::new(Arc::new(Uniform), 64);
        let negotiator = Negotiator::new(&oracle);
        let proposal = Negotiator::propose(15);
        let opening = negotiator.second(&proposal);
        match (opening.board.stones(), opening.swap_colors) {
            // option 1: untouched proposal, colors exchanged
            (3, true) => assert_eq!(opening.to_move, Stone::White),
            // option 2: one extra white stone, colors kept
            (4, false) => assert_eq!(opening.to_move, Stone::Black),
            // option 3: one extra white and black stone each
            (5, _) => assert_eq!(opening.to_move, Stone::White),
            unexpected => panic!("not a swap2 continuation: {:?}", unexpected),
        }
    }

    #[test]
    fn rollout_value_is_bounded() {
        let oracle = Oracle::new(Arc::new(Uniform), 64);
        let negotiator = Negotiator::new(&oracle);
        let proposal = Negotiator::propose(15);
        let deadline = Instant::now() + Duration::from_millis(500);
        let value = negotiator.shallow(&proposal, Stone::White, deadline);
        assert!(value >= -1.0 && value <= 1.0);
    }
}
