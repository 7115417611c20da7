use crate::Prior;
use crate::Visits;
use crate::game::Point;
use crate::game::Stone;

/// one search-tree node, arena-allocated. children materialize lazily out
/// of the sorted candidate list as progressive widening admits them, so
/// `children[i]` always corresponds to `candidates[i]`.
#[derive(Debug, Clone)]
pub struct Node {
    pub to_move: Stone,
    pub parent: Option<usize>,
    pub move_in: Option<Point>,
    pub prior: Prior,
    pub visits: Visits,
    pub value_sum: f64,
    /// game ply at this node (stones on the board)
    pub depth: u16,
    pub children: Vec<usize>,
    pub candidates: Vec<(Point, Prior)>,
    pub expanded: bool,
    pub pending: bool,
    /// value from this node's side-to-move perspective when the position
    /// is decided: -1 when the incoming move won, 0 when the board is full
    pub terminal: Option<f32>,
}

impl Node {
    fn leaf(to_move: Stone, parent: Option<usize>, move_in: Option<Point>, prior: Prior, depth: u16) -> Self {
        Self {
            to_move,
            parent,
            move_in,
            prior,
            visits: 0,
            value_sum: 0.0,
            depth,
            children: Vec::new(),
            candidates: Vec::new(),
            expanded: false,
            pending: false,
            terminal: None,
        }
    }

    /// mean backed-up value from this node's side-to-move perspective
    pub fn value(&self) -> f32 {
        if self.visits > 0 {
            (self.value_sum / self.visits as f64) as f32
        } else {
            0.0
        }
    }
}

/// the arena. nodes live for one search and are dropped wholesale with it.
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(to_move: Stone, depth: u16) -> Self {
        Self {
            nodes: vec![Node::leaf(to_move, None, None, 1.0, depth)],
        }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// admitted child count under progressive widening:
    /// base + step * floor(sqrt(visits)), bounded by the tier cap and the
    /// candidate list
    pub fn allowance(&self, index: usize, base: usize, step: usize, cap: usize) -> usize {
        let node = &self.nodes[index];
        let grown = base + step * (node.visits as f64).sqrt().floor() as usize;
        grown.min(cap).min(node.candidates.len())
    }

    /// materialize children up to the current allowance
    pub fn widen(&mut self, index: usize, base: usize, step: usize, cap: usize) {
        let allowed = self.allowance(index, base, step, cap);
        while self.nodes[index].children.len() < allowed {
            let slot = self.nodes[index].children.len();
            let (point, prior) = self.nodes[index].candidates[slot];
            let to_move = self.nodes[index].to_move.opponent();
            let depth = self.nodes[index].depth + 1;
            let child = Node::leaf(to_move, Some(index), Some(point), prior, depth);
            self.nodes.push(child);
            let handle = self.nodes.len() - 1;
            self.nodes[index].children.push(handle);
        }
    }

    /// PUCT selection among materialized children: argmax of
    /// Q + c * prior * sqrt(parent visits) / (1 + child visits),
    /// with Q the negated child value (value inverts across plies)
    pub fn select(&self, index: usize, c_puct: f32) -> Option<usize> {
        let parent = &self.nodes[index];
        let sqrt_visits = (parent.visits.max(1) as f32).sqrt();
        parent
            .children
            .iter()
            .copied()
            .map(|child| {
                let node = &self.nodes[child];
                let q = -node.value();
                let u = c_puct * node.prior * sqrt_visits / (1.0 + node.visits as f32);
                (child, q + u)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(child, _)| child)
    }

    /// most-visited root child; the strict comparison keeps ties on the
    /// earliest-inserted child
    pub fn favorite(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for &child in &self.root().children {
            match best {
                None => best = Some(child),
                Some(incumbent) => {
                    if self.nodes[child].visits > self.nodes[incumbent].visits {
                        best = Some(child);
                    }
                }
            }
        }
        best
    }
}
