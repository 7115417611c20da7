use super::sample::Meta;
use super::sample::Sample;
use crate::Millis;
use crate::config::Settings;
use crate::game::Board;
use crate::game::Point;
use crate::game::Stone;
use crate::mcts::Decision;
use crate::mcts::Search;
use crate::mcts::SearchParams;
use crate::mcts::TranspositionTable;
use crate::nn::NetModel;
use crate::nn::Oracle;
use crate::swap2::Negotiator;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::UnboundedSender;

/// what a worker streams back to the orchestrator
#[derive(Debug)]
pub enum WorkerMessage {
    Batch {
        worker: usize,
        game_id: String,
        samples: Vec<Sample>,
    },
    Finished {
        worker: usize,
        games: usize,
    },
    Crashed {
        worker: usize,
        error: String,
    },
}

/// what the orchestrator may ask of a worker between games
#[derive(Debug, Clone)]
pub enum Directive {
    Reload { own: String },
    Stop,
}

/// a single self-play driver: its own search state, its own rng, and up to
/// two cached models (own side and opponent side). games run to completion
/// even when a stop arrives mid-game.
pub struct Worker {
    id: usize,
    settings: Settings,
    own: Arc<Oracle>,
    own_path: String,
    opponent: Option<(String, Arc<Oracle>)>,
    tt: Arc<TranspositionTable>,
    rng: SmallRng,
    games: usize,
}

impl Worker {
    pub fn new(
        id: usize,
        settings: Settings,
        own: Arc<Oracle>,
        own_path: String,
        opponent: Option<(String, Arc<Oracle>)>,
        tt: Arc<TranspositionTable>,
    ) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .subsec_nanos() as u64;
        Self {
            id,
            settings,
            own,
            own_path,
            opponent,
            tt,
            rng: SmallRng::seed_from_u64(nanos ^ (id as u64) << 32),
            games: 0,
        }
    }

    /// loop games until told to stop, streaming each finished batch
    pub fn run(
        mut self,
        outbox: UnboundedSender<WorkerMessage>,
        directives: std::sync::mpsc::Receiver<Directive>,
        stop: Arc<AtomicBool>,
    ) {
        while !stop.load(Ordering::Relaxed) && !crate::interrupted() {
            let mut stopping = false;
            while let Ok(directive) = directives.try_recv() {
                match directive {
                    Directive::Stop => stopping = true,
                    Directive::Reload { own } => self.reload(own),
                }
            }
            if stopping {
                break;
            }
            match self.play_game() {
                Ok(samples) => {
                    let game_id = format!("{}-{}", self.id, self.games);
                    self.games += 1;
                    if !samples.is_empty() {
                        let _ = outbox.send(WorkerMessage::Batch {
                            worker: self.id,
                            game_id,
                            samples,
                        });
                    }
                }
                Err(error) => {
                    let _ = outbox.send(WorkerMessage::Crashed {
                        worker: self.id,
                        error: error.to_string(),
                    });
                    return;
                }
            }
        }
        let _ = outbox.send(WorkerMessage::Finished {
            worker: self.id,
            games: self.games,
        });
    }

    /// swap the own-side model in; the opponent snapshot stays cached.
    /// a reload of the same path still re-reads it (the store may have
    /// been replaced underneath an unchanged name).
    fn reload(&mut self, own: String) {
        match NetModel::load(Path::new(&own)) {
            Ok(model) => {
                self.own = Arc::new(Oracle::new(Arc::new(model), self.settings.cache_capacity));
                self.own_path = own;
            }
            Err(error) => log::warn!("worker {} kept stale model: {}", self.id, error),
        }
    }

    fn oracle_for(&self, stone: Stone, own_color: Stone) -> Arc<Oracle> {
        if stone == own_color {
            self.own.clone()
        } else {
            match &self.opponent {
                Some((_, oracle)) => oracle.clone(),
                None => self.own.clone(),
            }
        }
    }

    /// phase-dependent think schedule: 80% of base through move 6, 120%
    /// through move 30, 100% after; clamped and jittered
    fn think_time(&mut self, move_index: usize) -> Millis {
        let base = self.settings.think_time_ms as f64;
        let scaled = match move_index {
            0..=6 => 0.8 * base,
            7..=30 => 1.2 * base,
            _ => base,
        };
        let jitter = self.rng.random_range(0.9..1.1);
        ((scaled * jitter) as Millis).max(crate::THINK_TIME_MIN_MS)
    }

    /// sample from the visit distribution through the exploration window,
    /// play the favorite deterministically after
    fn choose(&mut self, board: &Board, to_move: Stone, decision: &Decision, move_index: usize) -> Option<Point> {
        let playable = decision
            .policy
            .iter()
            .filter(|(p, _)| board.is_playable(*p, to_move))
            .copied()
            .collect::<Vec<_>>();
        if move_index < self.settings.exploration_moves && playable.len() > 1 {
            use rand::distr::Distribution;
            use rand::distr::weighted::WeightedIndex;
            let weights = playable.iter().map(|(_, v)| *v).collect::<Vec<_>>();
            if let Ok(picker) = WeightedIndex::new(&weights) {
                return Some(playable[picker.sample(&mut self.rng)].0);
            }
        }
        decision
            .point
            .filter(|&p| board.is_playable(p, to_move))
            .or_else(|| playable.first().map(|(p, _)| *p))
    }

    /// one game end to end, returning its sample batch in move order
    fn play_game(&mut self) -> anyhow::Result<Vec<Sample>> {
        let n = self.settings.board_size;
        let mut own_color = if self.games % 2 == 0 {
            Stone::Black
        } else {
            Stone::White
        };
        let (mut board, mut to_move) = if self.settings.swap2_opening {
            let proposal = Negotiator::propose(n);
            let second = self.oracle_for(Stone::White, own_color);
            let opening = Negotiator::new(&second).second(&proposal);
            if opening.swap_colors {
                own_color = own_color.opponent();
            }
            (opening.board, opening.to_move)
        } else {
            (Board::empty(n), Stone::Black)
        };

        let game_id = format!("{}-{}", self.id, self.games);
        let mut records: Vec<Sample> = Vec::new();
        let mut winner: Option<Stone> = None;
        let mut move_index = 0usize;
        let tags = if self.opponent.is_some() {
            vec!["vs_past".to_string()]
        } else {
            Vec::new()
        };

        while board.has_empty() {
            let budget = self.think_time(move_index);
            let oracle = self.oracle_for(to_move, own_color);
            let teacher = oracle.raw(&board, to_move);
            let params = SearchParams::new(&self.settings, budget);
            let seed = self.rng.random::<u64>();
            let mut search = Search::new(&oracle, &self.tt, params, seed);
            let decision = search.best_move(&board, to_move);
            let Some(point) = self.choose(&board, to_move, &decision, move_index) else {
                break;
            };

            let mut mcts_policy = vec![0.0f32; n * n];
            let total = decision.policy.iter().map(|(_, v)| *v).sum::<u32>();
            if total > 0 {
                for (p, visits) in &decision.policy {
                    mcts_policy[p.flat(n)] = *visits as f32 / total as f32;
                }
            } else {
                mcts_policy[point.flat(n)] = 1.0;
            }

            records.push(Sample {
                state: board.rows(),
                player: to_move,
                mcts_policy,
                teacher_policy: teacher.policy,
                teacher_value: teacher.value,
                final_value: 0,
                meta: Meta {
                    source: "self_play".into(),
                    game_id: game_id.clone(),
                    move_index,
                    total_moves: 0,
                    result: 0,
                    tags: tags.clone(),
                    extra: serde_json::Value::Null,
                },
            });

            board.put(point, to_move);
            if board.wins(point, to_move) {
                winner = Some(to_move);
                break;
            }
            to_move = to_move.opponent();
            move_index += 1;
            if crate::interrupted() {
                break;
            }
        }

        let total_moves = records.len();
        let score = |player: Stone| -> i8 {
            match winner {
                None => 0,
                Some(w) if w == player => 1,
                Some(_) => -1,
            }
        };
        let result = score(Stone::Black);
        for record in records.iter_mut() {
            record.final_value = score(record.player);
            record.meta.total_moves = total_moves;
            record.meta.result = result;
        }
        log::debug!(
            "worker {} game {} finished: {} moves, winner {:?}",
            self.id,
            game_id,
            total_moves,
            winner
        );
        Ok(records)
    }
}
