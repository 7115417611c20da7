use crate::game::Board;
use crate::game::Point;
use crate::game::canonical;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// one published book line: the position encoded rows-joined-by-'|' with
/// 'b'/'w'/'-', and the recommended reply in that orientation
#[derive(Debug, Clone, Deserialize)]
pub struct BookEntry {
    pub board_hash: String,
    pub best_move: [usize; 2],
    #[serde(default)]
    pub move_count: Option<usize>,
}

/// the preloaded opening book. entries are canonicalized at load time, so
/// a query canonicalizes once, looks up, and rotates the stored move back
/// into its own orientation.
pub struct OpeningBook {
    size: usize,
    entries: HashMap<String, Point>,
}

impl OpeningBook {
    pub fn load(path: &Path, size: usize) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read opening book {}", path.display()))?;
        let parsed: Vec<BookEntry> = serde_json::from_str(&raw).context("parse opening book")?;
        let mut entries = HashMap::new();
        let mut rejected = 0usize;
        for entry in parsed {
            let Some(board) = Board::decode(&entry.board_hash) else {
                rejected += 1;
                continue;
            };
            if board.size() != size {
                rejected += 1;
                continue;
            }
            let point = Point::from((entry.best_move[0], entry.best_move[1]));
            if !board.contains(point) {
                rejected += 1;
                continue;
            }
            let (encoding, transform) = canonical(&board);
            entries
                .entry(encoding)
                .or_insert_with(|| transform.apply(point, size));
        }
        if rejected > 0 {
            log::warn!("opening book: {} malformed entries dropped", rejected);
        }
        log::info!("opening book loaded: {} positions", entries.len());
        Ok(Self { size, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// find the book reply for a position in the caller's orientation,
    /// verified against the actual board occupancy
    pub fn lookup(&self, board: &Board) -> Option<Point> {
        let (encoding, transform) = canonical(board);
        self.entries
            .get(&encoding)
            .map(|&stored| transform.inverse().apply(stored, self.size))
            .filter(|&point| board.is_empty_at(point))
    }
}
