use super::boost::BoostTier;
use super::node::Tree;
use super::noise;
use super::ttable::TranspositionTable;
use crate::Millis;
use crate::Visits;
use crate::config::Settings;
use crate::game::Board;
use crate::game::Point;
use crate::game::Stone;
use crate::game::canonical;
use crate::nn::Oracle;
use crate::nn::Prediction;
use crate::nn::symmetries_for;
use crate::solver::Solver;
use crate::threat::Threats;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::Duration;
use std::time::Instant;

/// every knob of one search, resolved from Settings and the think budget.
/// fast mode kicks in on short budgets: smaller batches, laxer early stop,
/// and widening caps reduced to roughly forty percent.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub budget_ms: Millis,
    pub fast: bool,
    pub batch_size: usize,
    pub c_puct: f32,
    pub c_puct_deep: f32,
    pub dirichlet_alpha: f32,
    pub dirichlet_epsilon: f32,
    pub k_child_base: usize,
    pub k_child_step: usize,
    pub k_child_max: usize,
    pub k_root_max: usize,
    pub early_stop_min_visits: Visits,
    pub early_stop_ratio: f32,
    pub forbidden_penalty: f32,
    pub tt_prior_mix_root: f32,
    pub tt_prior_mix_child: f32,
    pub root_boosts: BoostTier,
    pub child_boosts: BoostTier,
    pub noise: bool,
}

impl SearchParams {
    pub fn new(settings: &Settings, budget_ms: Millis) -> Self {
        let fast = budget_ms <= crate::SYMMETRY_BUDGET_FAST_MS;
        let shrink = |x: usize| if fast { (x * 2 / 5).max(1) } else { x };
        Self {
            budget_ms,
            fast,
            batch_size: if fast {
                crate::MCTS_BATCH_SIZE_FAST.min(settings.batch_size)
            } else {
                settings.batch_size
            },
            c_puct: settings.c_puct,
            c_puct_deep: settings.c_puct_deep,
            dirichlet_alpha: settings.dirichlet_alpha,
            dirichlet_epsilon: settings.dirichlet_epsilon,
            k_child_base: shrink(settings.k_child_base),
            k_child_step: shrink(settings.k_child_step),
            k_child_max: shrink(settings.k_child_max),
            k_root_max: settings.k_root_max,
            early_stop_min_visits: if fast {
                crate::EARLY_STOP_MIN_VISITS_FAST
            } else {
                settings.early_stop_min_visits
            },
            early_stop_ratio: if fast {
                crate::EARLY_STOP_RATIO_FAST
            } else {
                settings.early_stop_ratio
            },
            forbidden_penalty: settings.forbidden_penalty,
            tt_prior_mix_root: settings.tt_prior_mix_root,
            tt_prior_mix_child: settings.tt_prior_mix_child,
            root_boosts: BoostTier::root(settings.boost_gain),
            child_boosts: BoostTier::child(settings.boost_gain),
            noise: true,
        }
    }

    /// strip the root noise, for gating matches and serving
    pub fn quiet(mut self) -> Self {
        self.noise = false;
        self
    }

    fn c_for(&self, depth: u16) -> f32 {
        if depth < crate::C_PUCT_DEPTH_SWITCH {
            self.c_puct
        } else {
            self.c_puct_deep
        }
    }
}

/// which stage of the move pipeline produced the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    ThreatSearch,
    Mate,
    Block,
    Guided,
    Fallback,
}

/// the search result: a move (None on a full board), the root visit
/// distribution, and where it came from
#[derive(Debug, Clone)]
pub struct Decision {
    pub point: Option<Point>,
    pub policy: Vec<(Point, Visits)>,
    pub origin: Origin,
}

impl Decision {
    fn single(point: Point, origin: Origin) -> Self {
        Self {
            point: Some(point),
            policy: vec![(point, 1)],
            origin,
        }
    }

    /// wire form: [r, c], with [-1, -1] as the no-move sentinel
    pub fn sentinel(&self) -> [i32; 2] {
        match self.point {
            Some(p) => [p.row as i32, p.col as i32],
            None => [-1, -1],
        }
    }
}

enum Probe {
    Pending { path: Vec<usize>, board: Board },
    Terminal { path: Vec<usize>, value: f32 },
    Busy,
}

/// one full move decision: tactical short-circuits first, then the
/// network-guided PUCT loop with batched leaf evaluation
pub struct Search<'a> {
    oracle: &'a Oracle,
    tt: &'a TranspositionTable,
    params: SearchParams,
    rng: SmallRng,
}

impl<'a> Search<'a> {
    pub fn new(
        oracle: &'a Oracle,
        tt: &'a TranspositionTable,
        params: SearchParams,
        seed: u64,
    ) -> Self {
        Self {
            oracle,
            tt,
            params,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// the top-level contract: a legal move within budget + small grace,
    /// with tactical wins returned before any network call
    pub fn best_move(&mut self, board: &Board, to_move: Stone) -> Decision {
        let deadline = Instant::now() + Duration::from_millis(self.params.budget_ms);
        if !board.has_empty() {
            return Decision {
                point: None,
                policy: Vec::new(),
                origin: Origin::Fallback,
            };
        }
        let solver = Solver::new(self.params.budget_ms, self.params.fast);
        if let Some(point) = solver.threat_win(board, to_move) {
            return Decision::single(point, Origin::ThreatSearch);
        }
        if let Some(point) = solver.forced_win(board, to_move) {
            return Decision::single(point, Origin::ThreatSearch);
        }
        let ref mine = Threats::from((board, to_move));
        if let Some(point) = mine
            .wins
            .iter()
            .copied()
            .find(|&p| board.is_playable(p, to_move))
        {
            return Decision::single(point, Origin::Mate);
        }
        let ref theirs = Threats::from((board, to_move.opponent()));
        if let Some(point) = theirs
            .wins
            .iter()
            .copied()
            .find(|&p| board.is_playable(p, to_move))
        {
            return Decision::single(point, Origin::Block);
        }
        if let Some(point) = solver.defend(board, to_move) {
            return Decision::single(point, Origin::Block);
        }
        self.guided(board, to_move, deadline).0
    }

    /// the PUCT loop against the shared deadline. public to the crate so
    /// the tree invariants stay testable; callers outside tests want
    /// best_move.
    pub(crate) fn guided(&mut self, board: &Board, to_move: Stone, deadline: Instant) -> (Decision, Tree) {
        let symmetries = symmetries_for(self.params.budget_ms, self.params.fast);
        let prediction = self.oracle.root(board, to_move, symmetries);
        let mut tree = Tree::new(to_move, board.stones() as u16);
        self.expand(&mut tree, 0, board, &prediction);
        self.tt
            .observe(&root_key(board, to_move), prediction.value);
        tree.nodes[0].visits += 1;
        tree.nodes[0].value_sum += prediction.value as f64;

        while Instant::now() < deadline {
            let mut pendings: Vec<(Vec<usize>, Board)> = Vec::new();
            let mut progressed = false;
            for _ in 0..self.params.batch_size {
                match self.probe(&mut tree, board) {
                    Probe::Busy => break,
                    Probe::Terminal { path, value } => {
                        progressed = true;
                        Self::touch(&mut tree, &path);
                        Self::backprop(&mut tree, &path, value);
                    }
                    Probe::Pending { path, board } => {
                        progressed = true;
                        Self::touch(&mut tree, &path);
                        let leaf = *path.last().expect("non-empty path");
                        tree.nodes[leaf].pending = true;
                        pendings.push((path, board));
                    }
                }
            }
            if !pendings.is_empty() {
                let requests = pendings
                    .iter()
                    .map(|(path, leaf_board)| {
                        let leaf = *path.last().expect("non-empty path");
                        (leaf_board.clone(), tree.nodes[leaf].to_move)
                    })
                    .collect::<Vec<_>>();
                let predictions = self.oracle.batch(&requests);
                for ((path, leaf_board), prediction) in pendings.into_iter().zip(predictions) {
                    let leaf = *path.last().expect("non-empty path");
                    self.expand(&mut tree, leaf, &leaf_board, &prediction);
                    self.tt.observe(
                        &root_key(&leaf_board, tree.nodes[leaf].to_move),
                        prediction.value,
                    );
                    tree.nodes[leaf].pending = false;
                    Self::backprop(&mut tree, &path, prediction.value);
                }
            } else if !progressed {
                break;
            }
            if self.stopped_early(&tree) {
                break;
            }
        }

        let policy = tree
            .root()
            .children
            .iter()
            .map(|&c| (tree.nodes[c].move_in.expect("children carry moves"), tree.nodes[c].visits))
            .collect::<Vec<_>>();
        let decision = match tree.favorite() {
            Some(child) => Decision {
                point: tree.nodes[child].move_in,
                policy,
                origin: Origin::Guided,
            },
            None => Decision {
                point: Self::fallback(board, to_move),
                policy,
                origin: Origin::Fallback,
            },
        };
        (decision, tree)
    }

    /// descend by PUCT to an evaluation leaf, widening as visits allow and
    /// settling terminal values on first arrival
    fn probe(&mut self, tree: &mut Tree, root_board: &Board) -> Probe {
        let mut board = root_board.clone();
        let mut index = 0usize;
        let mut path = vec![0usize];
        loop {
            if let Some(value) = tree.nodes[index].terminal {
                return Probe::Terminal { path, value };
            }
            if !tree.nodes[index].expanded {
                if tree.nodes[index].pending {
                    return Probe::Busy;
                }
                return Probe::Pending { path, board };
            }
            let cap = if index == 0 {
                self.params.k_root_max
            } else {
                self.params.k_child_max
            };
            tree.widen(index, self.params.k_child_base, self.params.k_child_step, cap);
            let c_puct = self.params.c_for(tree.nodes[index].depth);
            let Some(child) = tree.select(index, c_puct) else {
                // expanded but no admissible move: dead end scores even
                tree.nodes[index].terminal = Some(0.0);
                continue;
            };
            let mover = tree.nodes[index].to_move;
            let point = tree.nodes[child].move_in.expect("children carry moves");
            board.put(point, mover);
            if tree.nodes[child].terminal.is_none() && !tree.nodes[child].expanded {
                if board.wins(point, mover) {
                    // the mover who just won is the parent
                    tree.nodes[child].terminal = Some(-1.0);
                } else if !board.has_empty() {
                    tree.nodes[child].terminal = Some(0.0);
                }
            }
            path.push(child);
            index = child;
        }
    }

    /// count the simulation into every node along its path
    fn touch(tree: &mut Tree, path: &[usize]) {
        for &index in path {
            tree.nodes[index].visits += 1;
        }
    }

    /// accumulate the leaf value up the path, flipping sign each ply
    fn backprop(tree: &mut Tree, path: &[usize], leaf_value: f32) {
        for (height, &index) in path.iter().rev().enumerate() {
            let signed = if height % 2 == 0 {
                leaf_value
            } else {
                -leaf_value
            };
            tree.nodes[index].value_sum += signed as f64;
        }
    }

    /// masked, TT-mixed, boosted, renormalized, noise-mixed expansion
    fn expand(&mut self, tree: &mut Tree, index: usize, board: &Board, prediction: &Prediction) {
        let root = index == 0;
        let to_move = tree.nodes[index].to_move;
        let n = board.size();
        let legal = board.legal_moves(board.candidate_radius());
        let mut policy = vec![0.0f32; n * n];
        for &p in &legal {
            policy[p.flat(n)] = prediction.policy[p.flat(n)].max(0.0);
        }
        if !normalize(&mut policy) && !legal.is_empty() {
            let uniform = 1.0 / legal.len() as f32;
            for &p in &legal {
                policy[p.flat(n)] = uniform;
            }
        }

        let (encoding, transform) = canonical(board);
        let key = format!("{}:{}", encoding, to_move.code());
        let entry = self.tt.probe(&key);
        self.tt.stash_priors(&key, transform.policy(&policy, n));
        let mix = if root {
            self.params.tt_prior_mix_root
        } else {
            self.params.tt_prior_mix_child
        };
        if mix > 0.0 {
            if let Some(remembered) = entry.as_ref().and_then(|e| e.priors.as_ref()) {
                let remembered = transform.inverse().policy(remembered, n);
                for &p in &legal {
                    let i = p.flat(n);
                    policy[i] = (1.0 - mix) * policy[i] + mix * remembered[i];
                }
                normalize(&mut policy);
            }
        }

        let tier = if root {
            self.params.root_boosts
        } else {
            self.params.child_boosts
        };
        tier.apply(&mut policy, board, to_move);
        if to_move == Stone::Black {
            for &p in &legal {
                if board.is_forbidden(p) {
                    policy[p.flat(n)] *= self.params.forbidden_penalty;
                }
            }
        }
        normalize(&mut policy);

        if root && self.params.noise && board.stones() <= 8usize.max(n / 2) {
            let support = legal
                .iter()
                .map(|p| p.flat(n))
                .filter(|&i| policy[i] > 0.0)
                .collect::<Vec<_>>();
            noise::dirichlet_mix(
                &mut policy,
                &support,
                self.params.dirichlet_alpha,
                self.params.dirichlet_epsilon,
                &mut self.rng,
            );
        }

        let mut candidates = legal
            .iter()
            .filter(|p| policy[p.flat(n)] > 0.0)
            .map(|&p| (p, policy[p.flat(n)]))
            .collect::<Vec<_>>();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        tree.nodes[index].candidates = candidates;
        tree.nodes[index].expanded = true;

        // common positions start from the table's mean instead of zero;
        // the synthetic visits stay on this node and never reach ancestors
        if let Some(entry) = entry {
            if entry.visits > 0 {
                let synth = crate::TT_BOOTSTRAP_VISITS.min(entry.visits);
                tree.nodes[index].visits += synth;
                tree.nodes[index].value_sum += (entry.mean * synth as f32) as f64;
            }
        }
    }

    fn stopped_early(&self, tree: &Tree) -> bool {
        let mut best = 0;
        let mut second = 0;
        for &child in &tree.root().children {
            let visits = tree.nodes[child].visits;
            if visits > best {
                second = best;
                best = visits;
            } else if visits > second {
                second = visits;
            }
        }
        best >= self.params.early_stop_min_visits
            && best as f32 >= self.params.early_stop_ratio * second.max(1) as f32
    }

    fn fallback(board: &Board, to_move: Stone) -> Option<Point> {
        board
            .legal_moves(board.candidate_radius())
            .into_iter()
            .find(|&p| board.is_playable(p, to_move))
            .or_else(|| board.empties().next())
    }
}

fn root_key(board: &Board, to_move: Stone) -> String {
    crate::game::canonical_key(board, to_move)
}

fn normalize(policy: &mut [f32]) -> bool {
    let sum = policy.iter().sum::<f32>();
    if sum <= f32::MIN_POSITIVE {
        false
    } else {
        for p in policy.iter_mut() {
            *p /= sum;
        }
        true
    }
}
