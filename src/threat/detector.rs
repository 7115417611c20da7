use crate::game::Board;
use crate::game::DIRECTIONS;
use crate::game::Point;
use crate::game::Stone;

/// every tactical placement available to one side, found by a deterministic
/// scan over the candidate ring. each list is deduplicated by construction
/// (one membership test per candidate); ordering follows the cell scan.
#[derive(Debug, Clone, Default)]
pub struct Threats {
    /// cells whose placement completes a five
    pub wins: Vec<Point>,
    /// cells whose placement yields a four with both extensions empty
    pub open_fours: Vec<Point>,
    /// cells whose placement yields a line of five with exactly one gap
    pub fours: Vec<Point>,
    /// cells whose placement yields an open three
    pub open_threes: Vec<Point>,
    /// cells whose placement yields a contiguous three with an open end
    pub threes: Vec<Point>,
    /// cells bridging two friendly stones within three-step gaps both ways
    pub long_links: Vec<Point>,
}

impl From<(&Board, Stone)> for Threats {
    fn from((board, stone): (&Board, Stone)) -> Self {
        let mut threats = Self::default();
        // radius 3: long-link candidates sit up to three steps from a stone
        for candidate in board.legal_moves(3) {
            let ref placed = board.with(candidate, stone);
            if board.wins(candidate, stone) {
                threats.wins.push(candidate);
            }
            if placed.makes_open_four(candidate, stone) {
                threats.open_fours.push(candidate);
            }
            if DIRECTIONS
                .iter()
                .any(|&d| placed.four_in(candidate, stone, d))
            {
                threats.fours.push(candidate);
            }
            if DIRECTIONS
                .iter()
                .any(|&d| placed.open_three_in(candidate, stone, d))
            {
                threats.open_threes.push(candidate);
            }
            if placed.makes_open_ended_three(candidate, stone) {
                threats.threes.push(candidate);
            }
            if board.makes_long_link(candidate, stone) {
                threats.long_links.push(candidate);
            }
        }
        threats
    }
}

impl Threats {
    /// the candidate set for forced-win search: moves that either win now
    /// or force the opponent's hand next ply
    pub fn forcing(&self, wide: bool) -> Vec<Point> {
        let mut forcing = Vec::new();
        let mut admit = |points: &[Point]| {
            for &point in points {
                if !forcing.contains(&point) {
                    forcing.push(point);
                }
            }
        };
        admit(&self.wins);
        admit(&self.open_fours);
        if wide {
            admit(&self.fours);
        }
        admit(&self.open_threes);
        forcing
    }

    /// every square that participates in a threat, used for block candidates
    pub fn squares(&self) -> Vec<Point> {
        let mut squares = Vec::new();
        for points in [
            &self.wins,
            &self.open_fours,
            &self.fours,
            &self.open_threes,
        ] {
            for &point in points {
                if !squares.contains(&point) {
                    squares.push(point);
                }
            }
        }
        squares
    }
}

impl Board {
    /// a contiguous run of exactly four through `point` with both ends empty
    fn makes_open_four(&self, point: Point, stone: Stone) -> bool {
        DIRECTIONS.iter().any(|&d| {
            if self.run_length(point, stone, d) != 4 {
                return false;
            }
            let forward = (1..)
                .find(|&k| {
                    self.offset(point, d, k)
                        .map_or(true, |p| self.get(p) != Some(stone))
                })
                .expect("the scan leaves the board");
            let backward = (1..)
                .find(|&k| {
                    self.offset(point, d, -k)
                        .map_or(true, |p| self.get(p) != Some(stone))
                })
                .expect("the scan leaves the board");
            let ahead = self.offset(point, d, forward);
            let behind = self.offset(point, d, -backward);
            ahead.map_or(false, |p| self.is_empty_at(p))
                && behind.map_or(false, |p| self.is_empty_at(p))
        })
    }

    /// a contiguous run of exactly three through `point` with at least one
    /// empty extension
    fn makes_open_ended_three(&self, point: Point, stone: Stone) -> bool {
        DIRECTIONS.iter().any(|&d| {
            if self.run_length(point, stone, d) != 3 {
                return false;
            }
            let forward = (1..)
                .find(|&k| {
                    self.offset(point, d, k)
                        .map_or(true, |p| self.get(p) != Some(stone))
                })
                .expect("the scan leaves the board");
            let backward = (1..)
                .find(|&k| {
                    self.offset(point, d, -k)
                        .map_or(true, |p| self.get(p) != Some(stone))
                })
                .expect("the scan leaves the board");
            let ahead = self.offset(point, d, forward);
            let behind = self.offset(point, d, -backward);
            ahead.map_or(false, |p| self.is_empty_at(p))
                || behind.map_or(false, |p| self.is_empty_at(p))
        })
    }

    /// the nearest stone within three steps on both sides of `point` along
    /// some direction is friendly, with only empties in between
    fn makes_long_link(&self, point: Point, stone: Stone) -> bool {
        let linked = |d: (isize, isize), sign: isize| -> bool {
            for k in 1..=3isize {
                match self.offset(point, d, sign * k) {
                    None => return false,
                    Some(next) => match self.get(next) {
                        Some(s) => return s == stone,
                        None => continue,
                    },
                }
            }
            false
        };
        DIRECTIONS.iter().any(|&d| linked(d, 1) && linked(d, -1))
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
    fn immediate_win_found_both_ends() {
        let board = board_with(&[
            (7, 7, Stone::Black),
            (7, 8, Stone::Black),
            (7, 9, Stone::Black),
            (7, 10, Stone::Black),
            (8, 7, Stone::White),
        ]);
        let threats = Threats::from((&board, Stone::Black));
        assert!(threats.wins.contains(&Point::from((7, 6))));
        assert!(threats.wins.contains(&Point::from((7, 11))));
        assert_eq!(threats.wins.len(), 2);
    }

    #[test]
    fn open_four_maker_detected() {
        let board = board_with(&[
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        let threats = Threats::from((&board, Stone::Black));
        assert!(threats.open_fours.contains(&Point::from((7, 4))));
        assert!(threats.open_fours.contains(&Point::from((7, 8))));
    }

    #[test]
    fn blocked_line_is_a_four_not_open() {
        let board = board_with(&[
            (7, 4, Stone::White),
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        let threats = Threats::from((&board, Stone::Black));
        assert!(!threats.open_fours.contains(&Point::from((7, 8))));
        assert!(threats.fours.contains(&Point::from((7, 8))));
    }

    #[test]
    fn gapped_four_detected() {
        let board = board_with(&[
            (7, 4, Stone::Black),
            (7, 5, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        let threats = Threats::from((&board, Stone::Black));
        // (7,6) fills the gap into a four threatening (7,3) and (7,8)
        assert!(threats.fours.contains(&Point::from((7, 6))));
    }

    #[test]
    fn open_three_maker_detected() {
        let board = board_with(&[(7, 6, Stone::Black), (7, 7, Stone::Black)]);
        let threats = Threats::from((&board, Stone::Black));
        assert!(threats.open_threes.contains(&Point::from((7, 5))));
        assert!(threats.open_threes.contains(&Point::from((7, 8))));
    }

    #[test]
    fn connected_three_maker_detected() {
        let board = board_with(&[(7, 6, Stone::White), (7, 7, Stone::White)]);
        let threats = Threats::from((&board, Stone::White));
        assert!(threats.threes.contains(&Point::from((7, 5))));
        assert!(threats.threes.contains(&Point::from((7, 8))));
    }

    #[test]
    fn long_link_bridges_gaps() {
        let board = board_with(&[(7, 4, Stone::Black), (7, 10, Stone::Black)]);
        let threats = Threats::from((&board, Stone::Black));
        assert!(threats.long_links.contains(&Point::from((7, 7))));
        assert!(!threats.long_links.contains(&Point::from((7, 5))));
    }

    #[test]
    fn forcing_set_is_deduplicated() {
        let board = board_with(&[
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        let threats = Threats::from((&board, Stone::Black));
        let forcing = threats.forcing(true);
        let mut unique = forcing.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), forcing.len());
    }
}
