use super::board::Board;
use super::board::Point;
use super::board::Stone;

/// the eight symmetries of the square. boards, points, and policy vectors
/// all transform through the same point map.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Transform {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    Transpose,
    AntiTranspose,
}

impl Transform {
    pub const ALL: [Self; 8] = [
        Self::Identity,
        Self::Rotate90,
        Self::Rotate180,
        Self::Rotate270,
        Self::FlipHorizontal,
        Self::FlipVertical,
        Self::Transpose,
        Self::AntiTranspose,
    ];

    pub fn apply(&self, point: Point, n: usize) -> Point {
        let Point { row: r, col: c } = point;
        let m = n - 1;
        let (row, col) = match self {
            Self::Identity => (r, c),
            Self::Rotate90 => (c, m - r),
            Self::Rotate180 => (m - r, m - c),
            Self::Rotate270 => (m - c, r),
            Self::FlipHorizontal => (r, m - c),
            Self::FlipVertical => (m - r, c),
            Self::Transpose => (c, r),
            Self::AntiTranspose => (m - c, m - r),
        };
        Point::from((row, col))
    }

    pub const fn inverse(&self) -> Self {
        match self {
            Self::Rotate90 => Self::Rotate270,
            Self::Rotate270 => Self::Rotate90,
            other => *other,
        }
    }

    pub fn board(&self, board: &Board) -> Board {
        let n = board.size();
        let mut transformed = Board::empty(n);
        for (point, stone) in board.occupied() {
            transformed.put(self.apply(point, n), stone);
        }
        transformed
    }

    /// carry a flat policy vector into the transformed orientation
    pub fn policy(&self, policy: &[f32], n: usize) -> Vec<f32> {
        let mut transformed = vec![0.0; policy.len()];
        for index in 0..n * n {
            let point = Point::unflat(index, n);
            transformed[self.apply(point, n).flat(n)] = policy[index];
        }
        transformed
    }
}

/// the canonical form of a board: the lexicographically smallest encoding
/// over all eight symmetries, together with the transform that reaches it
pub fn canonical(board: &Board) -> (String, Transform) {
    Transform::ALL
        .iter()
        .map(|&t| (t.board(board).encode(), t))
        .min_by(|a, b| a.0.cmp(&b.0))
        .expect("eight symmetries")
}

/// cache key: canonical encoding plus side-to-move
pub fn canonical_key(board: &Board, to_move: Stone) -> String {
    let (encoding, _) = canonical(board);
    format!("{}:{}", encoding, to_move.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    #[test]
    fn inverse_undoes_point_map() {
        let n = 15;
        for t in Transform::ALL {
            for index in 0..n * n {
                let point = Point::unflat(index, n);
                assert_eq!(t.inverse().apply(t.apply(point, n), n), point);
            }
        }
    }

    #[test]
    fn inverse_undoes_board_map() {
        let board = Board::random();
        for t in Transform::ALL {
            assert_eq!(t.inverse().board(&t.board(&board)), board);
        }
    }

    #[test]
    fn policy_transform_tracks_points() {
        let n = 15;
        let mut policy = vec![0.0; n * n];
        let point = Point::from((3, 11));
        policy[point.flat(n)] = 1.0;
        for t in Transform::ALL {
            let moved = t.policy(&policy, n);
            assert!(moved[t.apply(point, n).flat(n)] == 1.0);
        }
    }

    #[test]
    fn canonical_is_symmetry_invariant() {
        let board = Board::random();
        let (encoding, _) = canonical(&board);
        for t in Transform::ALL {
            let (other, _) = canonical(&t.board(&board));
            assert_eq!(other, encoding);
        }
    }

    #[test]
    fn canonical_is_idempotent() {
        let board = Board::random();
        let (encoding, transform) = canonical(&board);
        let canonicalized = transform.board(&board);
        assert_eq!(canonicalized.encode(), encoding);
        let (again, _) = canonical(&canonicalized);
        assert_eq!(again, encoding);
    }

    #[test]
    fn transformed_legal_moves_are_transformed() {
        let mut board = Board::empty(15);
        board.put(Point::from((4, 9)), Stone::Black);
        board.put(Point::from((5, 5)), Stone::White);
        for t in Transform::ALL {
            let mut direct = t
                .board(&board)
                .legal_moves(1)
                .into_iter()
                .collect::<Vec<_>>();
            let mut mapped = board
                .legal_moves(1)
                .into_iter()
                .map(|p| t.apply(p, 15))
                .collect::<Vec<_>>();
            direct.sort();
            mapped.sort();
            assert_eq!(direct, mapped);
        }
    }
}
