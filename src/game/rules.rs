use super::board::Board;
use super::board::Point;
use super::board::Stone;

/// the four line directions; each covers both of its orientations
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

impl Board {
    /// step k cells from point along (dr, dc), None when off the board
    pub fn offset(&self, point: Point, (dr, dc): (isize, isize), k: isize) -> Option<Point> {
        let row = point.row as isize + dr * k;
        let col = point.col as isize + dc * k;
        if row < 0 || col < 0 || row >= self.size() as isize || col >= self.size() as isize {
            None
        } else {
            Some(Point::from((row as usize, col as usize)))
        }
    }

    /// radius 2 in the early game, radius 1 after
    pub fn candidate_radius(&self) -> usize {
        if self.stones() <= crate::EARLY_GAME_STONES.max(self.size() / 3) {
            2
        } else {
            1
        }
    }

    /// empty cells within chebyshev distance `radius` of any stone.
    /// the center cell when the board is empty.
    pub fn legal_moves(&self, radius: usize) -> Vec<Point> {
        if self.stones() == 0 {
            return vec![self.center()];
        }
        let occupied = self.occupied().map(|(p, _)| p).collect::<Vec<_>>();
        self.empties()
            .filter(|empty| occupied.iter().any(|stone| empty.distance(stone) <= radius))
            .collect()
    }

    /// contiguous run length through `point` along one direction, with the
    /// cell at `point` counted as `stone` whether or not it is placed yet
    pub fn run_length(&self, point: Point, stone: Stone, direction: (isize, isize)) -> usize {
        let mut length = 1;
        for sign in [1isize, -1] {
            for k in 1.. {
                match self.offset(point, direction, sign * k) {
                    Some(next) if self.get(next) == Some(stone) => length += 1,
                    _ => break,
                }
            }
        }
        length
    }

    /// true iff placing `stone` at `point` completes five or more in a row
    pub fn wins(&self, point: Point, stone: Stone) -> bool {
        DIRECTIONS
            .iter()
            .any(|&d| self.run_length(point, stone, d) >= 5)
    }

    /// the forbidden-move rule, black only: a placement that simultaneously
    /// creates two or more open threes, or two or more fours, in distinct
    /// directions. a placement that completes a five is always legal.
    pub fn is_forbidden(&self, point: Point) -> bool {
        if !self.is_empty_at(point) {
            return false;
        }
        if self.wins(point, Stone::Black) {
            return false;
        }
        let ref placed = self.with(point, Stone::Black);
        let open_threes = DIRECTIONS
            .iter()
            .filter(|&&d| placed.open_three_in(point, Stone::Black, d))
            .count();
        let fours = DIRECTIONS
            .iter()
            .filter(|&&d| placed.four_in(point, Stone::Black, d))
            .count();
        open_threes >= 2 || fours >= 2
    }

    /// a 6-cell window along `direction` whose frame cells are both empty
    /// and whose interior holds exactly three friendly stones and one
    /// empty, with `point` among the stones and no opponent in the window
    pub(crate) fn open_three_in(&self, point: Point, stone: Stone, direction: (isize, isize)) -> bool {
        (-4..=-1).any(|start: isize| {
            let window = (0..6)
                .map(|i| self.offset(point, direction, start + i))
                .collect::<Option<Vec<_>>>();
            match window {
                None => false,
                Some(cells) => {
                    let frame_open =
                        self.is_empty_at(cells[0]) && self.is_empty_at(cells[5]);
                    let interior = &cells[1..5];
                    let friendly = interior
                        .iter()
                        .filter(|&&c| self.get(c) == Some(stone))
                        .count();
                    let empties = interior.iter().filter(|&&c| self.is_empty_at(c)).count();
                    frame_open && friendly == 3 && empties == 1
                }
            }
        })
    }

    /// a 5-cell window along `direction` holding exactly four friendly
    /// stones and one empty, with `point` among the stones and no opponent
    pub(crate) fn four_in(&self, point: Point, stone: Stone, direction: (isize, isize)) -> bool {
        (-4..=0).any(|start: isize| {
            let window = (0..5)
                .map(|i| self.offset(point, direction, start + i))
                .collect::<Option<Vec<_>>>();
            match window {
                None => false,
                Some(cells) => {
                    let friendly = cells
                        .iter()
                        .filter(|&&c| self.get(c) == Some(stone))
                        .count();
                    let empties = cells.iter().filter(|&&c| self.is_empty_at(c)).count();
                    friendly == 4 && empties == 1
                }
            }
        })
    }

    /// legality filter applied wherever a candidate move is admitted:
    /// the cell is empty, and for black it is not a forbidden placement
    pub fn is_playable(&self, point: Point, stone: Stone) -> bool {
        self.is_empty_at(point)
            && match stone {
                Stone::Black => !self.is_forbidden(point),
                Stone::White => true,
            }
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
    fn empty_board_offers_center() {
        let board = Board::empty(15);
        assert_eq!(board.legal_moves(1), vec![Point::from((7, 7))]);
    }

    #[test]
    fn legal_moves_respect_radius() {
        let board = board_with(&[(7, 7, Stone::Black)]);
        let near = board.legal_moves(1);
        assert_eq!(near.len(), 8);
        assert!(near.iter().all(|p| p.distance(&Point::from((7, 7))) == 1));
        let wide = board.legal_moves(2);
        assert_eq!(wide.len(), 24);
    }

    #[test]
    fn five_in_a_row_wins() {
        let board = board_with(&[
            (7, 3, Stone::Black),
            (7, 4, Stone::Black),
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
        ]);
        assert!(board.wins(Point::from((7, 7)), Stone::Black));
        assert!(board.wins(Point::from((7, 2)), Stone::Black));
        assert!(!board.wins(Point::from((8, 7)), Stone::Black));
    }

    #[test]
    fn diagonal_win_detected() {
        let board = board_with(&[
            (3, 3, Stone::White),
            (4, 4, Stone::White),
            (5, 5, Stone::White),
            (7, 7, Stone::White),
        ]);
        assert!(board.wins(Point::from((6, 6)), Stone::White));
    }

    #[test]
    fn overline_counts_as_win() {
        let board = board_with(&[
            (7, 2, Stone::Black),
            (7, 3, Stone::Black),
            (7, 4, Stone::Black),
            (7, 6, Stone::Black),
            (7, 7, Stone::Black),
        ]);
        assert!(board.wins(Point::from((7, 5)), Stone::Black));
    }

    #[test]
    fn double_open_three_is_forbidden() {
        // two open threes through (7,7): one horizontal, one vertical
        let board = board_with(&[
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (5, 7, Stone::Black),
            (6, 7, Stone::Black),
        ]);
        assert!(board.is_forbidden(Point::from((7, 7))));
    }

    #[test]
    fn double_four_is_forbidden() {
        // (7,7) completes a gapped horizontal four and a vertical four
        let board = board_with(&[
            (7, 3, Stone::Black),
            (7, 4, Stone::Black),
            (7, 5, Stone::Black),
            (4, 7, Stone::Black),
            (5, 7, Stone::Black),
            (6, 7, Stone::Black),
            (7, 2, Stone::White),
            (3, 7, Stone::White),
        ]);
        assert!(board.is_forbidden(Point::from((7, 7))));
    }

    #[test]
    fn five_overrides_forbidden() {
        // completing five while also making a second four stays legal
        let board = board_with(&[
            (7, 3, Stone::Black),
            (7, 4, Stone::Black),
            (7, 5, Stone::Black),
            (7, 6, Stone::Black),
            (4, 7, Stone::Black),
            (5, 7, Stone::Black),
            (6, 7, Stone::Black),
        ]);
        assert!(board.wins(Point::from((7, 7)), Stone::Black));
        assert!(!board.is_forbidden(Point::from((7, 7))));
    }

    #[test]
    fn single_open_three_is_fine() {
        let board = board_with(&[(7, 5, Stone::Black), (7, 6, Stone::Black)]);
        assert!(!board.is_forbidden(Point::from((7, 7))));
    }

    #[test]
    fn white_never_forbidden() {
        let board = board_with(&[
            (7, 5, Stone::White),
            (7, 6, Stone::White),
            (5, 7, Stone::White),
            (6, 7, Stone::White),
        ]);
        assert!(board.is_playable(Point::from((7, 7)), Stone::White));
    }
}
