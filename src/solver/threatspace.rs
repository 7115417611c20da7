use crate::Millis;
use crate::game::Board;
use crate::game::Point;
use crate::game::Stone;
use crate::threat::Threats;
use std::cell::Cell;
use std::time::Duration;
use std::time::Instant;

/// depth-bounded threat-space search, used as a short-circuit before the
/// network-guided search. VCF restricts candidates to win/open-four/open-
/// three makers; VCT widens them with every four. both honor a node cap and
/// a soft deadline, whichever triggers first.
pub struct Solver {
    deadline: Instant,
    nodes: Cell<usize>,
    vcf_depth: usize,
    vct_depth: usize,
}

impl Solver {
    /// deadline: min(SOLVER_DEADLINE_MS, 30% of the total think budget).
    /// fast mode (or budgets at/below the fast threshold) shrinks VCT depth.
    pub fn new(total_budget_ms: Millis, fast: bool) -> Self {
        let soft = crate::SOLVER_DEADLINE_MS.min(total_budget_ms * 3 / 10);
        let vct_depth = if fast || total_budget_ms <= crate::SYMMETRY_BUDGET_FAST_MS {
            crate::VCT_FAST_DEPTH
        } else {
            crate::VCT_MAX_DEPTH
        };
        Self {
            deadline: Instant::now() + Duration::from_millis(soft.max(1)),
            nodes: Cell::new(crate::SOLVER_NODE_CAP),
            vcf_depth: crate::VCF_MAX_DEPTH,
            vct_depth,
        }
    }

    pub fn nodes_left(&self) -> usize {
        self.nodes.get()
    }
}

// forced-win searches
impl Solver {
    /// victory by continuous fours: narrow candidates, depth 3
    pub fn forced_win(&self, board: &Board, stone: Stone) -> Option<Point> {
        self.wins_at(board, stone, self.vcf_depth, false)
    }

    /// victory by continuous threats: every four joins the candidates
    pub fn threat_win(&self, board: &Board, stone: Stone) -> Option<Point> {
        self.wins_at(board, stone, self.vct_depth, true)
    }

    /// a candidate forces a win when it (i) wins outright, (ii) leaves two
    /// simultaneous winning replies, or (iii) leaves exactly one winning
    /// reply whose forced block still loses to a shallower forced win
    fn wins_at(&self, board: &Board, stone: Stone, depth: usize, wide: bool) -> Option<Point> {
        if depth == 0 || self.exhausted() {
            return None;
        }
        let ref threats = Threats::from((board, stone));
        for candidate in threats.forcing(wide) {
            if !self.spend() {
                return None;
            }
            if !board.is_playable(candidate, stone) {
                continue;
            }
            if board.wins(candidate, stone) {
                return Some(candidate);
            }
            let ref placed = board.with(candidate, stone);
            let continuations = Threats::from((placed, stone)).wins;
            match continuations.len() {
                0 => continue,
                1 => {
                    // the opponent is forced to block, unless they mate first
                    let opponent = stone.opponent();
                    if !Threats::from((placed, opponent)).wins.is_empty() {
                        continue;
                    }
                    let block = continuations[0];
                    if !placed.is_playable(block, opponent) {
                        return Some(candidate);
                    }
                    let ref blocked = placed.with(block, opponent);
                    if self.wins_at(blocked, stone, depth - 1, wide).is_some() {
                        return Some(candidate);
                    }
                }
                _ => return Some(candidate),
            }
        }
        None
    }
}

// defensive search
impl Solver {
    /// when the opponent of `defender` holds a forced win, find a block
    /// that refutes it. candidates are the opponent's threat squares, then
    /// nearby cells ordered center-out. None when no refutation exists
    /// (or the opponent held no forced win to begin with).
    pub fn defend(&self, board: &Board, defender: Stone) -> Option<Point> {
        let attacker = defender.opponent();
        self.threat_win(board, attacker)?;
        let center = board.center();
        let mut candidates = Threats::from((board, attacker)).squares();
        let mut fallback = board.legal_moves(1);
        fallback.sort_by_key(|p| p.distance(&center));
        for point in fallback {
            if !candidates.contains(&point) {
                candidates.push(point);
            }
        }
        for block in candidates {
            if self.exhausted() {
                return None;
            }
            if !board.is_playable(block, defender) {
                continue;
            }
            let ref held = board.with(block, defender);
            if self.threat_win(held, attacker).is_none() {
                return Some(block);
            }
        }
        None
    }
}

// budget accounting
impl Solver {
    fn spend(&self) -> bool {
        let left = self.nodes.get();
        if left == 0 {
            return false;
        }
        self.nodes.set(left - 1);
        true
    }

    fn exhausted(&self) -> bool {
        self.nodes.get() == 0 || Instant::now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(usize, usize, Stone)]) -> Board {
        let mut board = Board::empty(15);
        for &(r, c, stone) in stones {
            board.put(Point::from((r, c)), stone);
        }
        board
    }

    #[test]
    fn immediate_five_is_a_forced_win() {
        let board = board_with(&[
            (7, 7, Stone::Black),
            (7, 8, Stone::Black),
            (7, 9, Stone::Black),
            (7, 10, Stone::Black),
        ]);
        let solver = Solver::new(5_000, false);
        let found = solver.forced_win(&board, Stone::Black);
        assert!(matches!(
            found,
            Some(p) if p == Point::from((7, 6)) || p == Point::from((7, 11))
        ));
    }

    #[test]
    fn open_four_maker_is_a_double_threat() {
        let board = board_with(&[
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        let solver = Solver::new(5_000, false);
        let found = solver.forced_win(&board, Stone::Black);
        assert!(matches!(
            found,
            Some(p) if p == Point::from((7, 4)) || p == Point::from((7, 8))
        ));
    }

    #[test]
    fn four_three_combination_found_at_depth_two() {
        // (7,7) makes a blocked four (forcing) and a vertical open three;
        // after the forced block the vertical line becomes an open four
        let board = board_with(&[
            (7, 3, Stone::White),
            (7, 4, Stone::Black),
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (8, 7, Stone::Black),
            (9, 7, Stone::Black),
        ]);
        let solver = Solver::new(5_000, false);
        assert_eq!(solver.forced_win(&board, Stone::Black), Some(Point::from((7, 7))));
    }

    #[test]
    fn no_win_from_quiet_position() {
        let board = board_with(&[(7, 7, Stone::Black), (8, 8, Stone::White)]);
        let solver = Solver::new(5_000, false);
        assert_eq!(solver.forced_win(&board, Stone::Black), None);
        assert_eq!(solver.threat_win(&board, Stone::White), None);
    }

    #[test]
    fn defense_refutes_open_three() {
        let board = board_with(&[
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
            (0, 0, Stone::White),
        ]);
        let solver = Solver::new(5_000, false);
        let block = solver.defend(&board, Stone::White).expect("block exists");
        let ref held = board.with(block, Stone::White);
        let fresh = Solver::new(5_000, false);
        assert_eq!(fresh.threat_win(held, Stone::Black), None);
    }

    #[test]
    fn defense_is_none_without_a_threat() {
        let board = board_with(&[(7, 7, Stone::Black)]);
        let solver = Solver::new(5_000, false);
        assert_eq!(solver.defend(&board, Stone::White), None);
    }

    #[test]
    fn node_cap_terminates_search() {
        let board = board_with(&[
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        let solver = Solver::new(5_000, false);
        solver.nodes.set(0);
        assert_eq!(solver.forced_win(&board, Stone::Black), None);
    }

    #[test]
    fn forbidden_candidates_are_skipped() {
        // the only forcing square for black is a 4-4 point
        let board = board_with(&[
            (7, 3, Stone::Black),
            (7, 4, Stone::Black),
            (7, 5, Stone::Black),
            (4, 7, Stone::Black),
            (5, 7, Stone::Black),
            (6, 7, Stone::Black),
            (7, 2, Stone::White),
            (3, 7, Stone::White),
            (7, 8, Stone::White),
        ]);
        assert!(board.is_forbidden(Point::from((7, 7))));
        let solver = Solver::new(5_000, false);
        assert_ne!(solver.forced_win(&board, Stone::Black), Some(Point::from((7, 7))));
    }
}
