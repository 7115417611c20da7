use crate::Arbitrary;
use serde::Deserialize;
use serde::Serialize;

/// stone colors. the opponent relation is total.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    pub const fn opponent(&self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
    pub const fn code(&self) -> char {
        match self {
            Self::Black => 'b',
            Self::White => 'w',
        }
    }
}

impl std::fmt::Display for Stone {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// a cell address. (row, col), both in [0, n)
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn flat(&self, n: usize) -> usize {
        self.row * n + self.col
    }
    pub const fn unflat(index: usize, n: usize) -> Self {
        Self {
            row: index / n,
            col: index % n,
        }
    }
    /// chebyshev distance
    pub fn distance(&self, other: &Self) -> usize {
        self.row
            .abs_diff(other.row)
            .max(self.col.abs_diff(other.col))
    }
}

impl From<(usize, usize)> for Point {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// the n x n grid. value-typed and cheaply clonable: searches clone the
/// board per simulation path rather than undoing moves.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Stone>>,
}

impl Board {
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
    pub fn center(&self) -> Point {
        Point::from((self.size / 2, self.size / 2))
    }
    pub fn get(&self, point: Point) -> Option<Stone> {
        self.cells[point.flat(self.size)]
    }
    pub fn is_empty_at(&self, point: Point) -> bool {
        self.get(point).is_none()
    }
    pub fn put(&mut self, point: Point, stone: Stone) {
        self.cells[point.flat(self.size)] = Some(stone);
    }
    pub fn take(&mut self, point: Point) {
        self.cells[point.flat(self.size)] = None;
    }
    /// pure placement, used where a simulation path branches
    pub fn with(&self, point: Point, stone: Stone) -> Self {
        let mut next = self.clone();
        next.put(point, stone);
        next
    }

    pub fn stones(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
    pub fn has_empty(&self) -> bool {
        self.cells.iter().any(|c| c.is_none())
    }
    pub fn contains(&self, point: Point) -> bool {
        point.row < self.size && point.col < self.size
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Point, Stone)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|stone| (Point::unflat(i, self.size), stone)))
    }
    pub fn empties(&self) -> impl Iterator<Item = Point> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                None => Some(Point::unflat(i, self.size)),
                Some(_) => None,
            })
    }

    /// rows joined by '|' using 'b'/'w'/'-'. this is the wire encoding
    /// shared by the transposition keys and the opening book.
    pub fn encode(&self) -> String {
        (0..self.size)
            .map(|r| {
                (0..self.size)
                    .map(|c| match self.get(Point::from((r, c))) {
                        Some(stone) => stone.code(),
                        None => '-',
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn decode(encoded: &str) -> Option<Self> {
        let rows = encoded.split('|').collect::<Vec<_>>();
        let size = rows.len();
        let mut board = Self::empty(size);
        for (r, row) in rows.iter().enumerate() {
            if row.chars().count() != size {
                return None;
            }
            for (c, cell) in row.chars().enumerate() {
                match cell {
                    'b' => board.put(Point::from((r, c)), Stone::Black),
                    'w' => board.put(Point::from((r, c)), Stone::White),
                    '-' => {}
                    _ => return None,
                }
            }
        }
        Some(board)
    }

    /// grid of cells for the JSON sample/request formats
    pub fn rows(&self) -> Vec<Vec<Option<Stone>>> {
        (0..self.size)
            .map(|r| {
                (0..self.size)
                    .map(|c| self.get(Point::from((r, c))))
                    .collect()
            })
            .collect()
    }

    pub fn from_rows(rows: &[Vec<Option<Stone>>]) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        let mut board = Self::empty(size);
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(stone) = cell {
                    board.put(Point::from((r, c)), *stone);
                }
            }
        }
        Some(board)
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for r in 0..self.size {
            for c in 0..self.size {
                let glyph = match self.get(Point::from((r, c))) {
                    Some(Stone::Black) => 'x',
                    Some(Stone::White) => 'o',
                    None => '.',
                };
                write!(f, "{} ", glyph)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Arbitrary for Board {
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let mut board = Self::empty(crate::BOARD_SIZE);
        let stones = rng.random_range(0..64);
        for i in 0..stones {
            let point = Point::unflat(
                rng.random_range(0..crate::BOARD_SIZE * crate::BOARD_SIZE),
                crate::BOARD_SIZE,
            );
            if board.is_empty_at(point) {
                let stone = if i % 2 == 0 { Stone::Black } else { Stone::White };
                board.put(point, stone);
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_is_total() {
        assert!(Stone::Black.opponent() == Stone::White);
        assert!(Stone::White.opponent() == Stone::Black);
        assert!(Stone::Black.opponent().opponent() == Stone::Black);
    }

    #[test]
    fn flat_unflat_roundtrip() {
        let n = 15;
        for index in 0..n * n {
            assert_eq!(Point::unflat(index, n).flat(n), index);
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let board = Board::random();
        let encoded = board.encode();
        assert_eq!(Board::decode(&encoded), Some(board));
    }

    #[test]
    fn rows_roundtrip() {
        let board = Board::random();
        assert_eq!(Board::from_rows(&board.rows()), Some(board));
    }

    #[test]
    fn empty_board_has_no_stones() {
        let board = Board::empty(15);
        assert_eq!(board.stones(), 0);
        assert!(board.has_empty());
        assert_eq!(board.center(), Point::from((7, 7)));
    }
}
