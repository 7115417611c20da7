use super::tally::Tally;
use super::tally::Verdict;
use crate::config::Settings;
use crate::game::Board;
use crate::game::Stone;
use crate::mcts::Search;
use crate::mcts::SearchParams;
use crate::mcts::TranspositionTable;
use crate::nn::Evaluator;
use crate::nn::NetModel;
use crate::nn::Oracle;
use anyhow::Context;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// the arena_result record written next to the model store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaReport {
    pub ts: u64,
    pub games: usize,
    pub candidate_wins: usize,
    pub prod_wins: usize,
    pub draws: usize,
    pub winrate: f64,
    pub candidate_fingerprint: String,
    pub prod_fingerprint: String,
    pub threshold: f64,
    pub promoted: bool,
}

/// head-to-head gate between the candidate and the reigning production
/// model: alternating colors, quiet (noise-free) searches, early stop in
/// both directions, and an atomic promotion on success.
pub struct Gate {
    settings: Settings,
}

impl Gate {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn run(&self) -> anyhow::Result<ArenaReport> {
        let ref settings = self.settings;
        let candidate_model = NetModel::load(Path::new(&settings.candidate_model_dir))
            .context("candidate model missing, nothing to gate")?;
        let prod_model = NetModel::load(Path::new(&settings.prod_model_dir))
            .context("production model missing")?;
        let candidate_fingerprint = candidate_model.fingerprint();
        let prod_fingerprint = prod_model.fingerprint();
        log::info!(
            "arena: candidate {} vs prod {} over {} games",
            candidate_fingerprint,
            prod_fingerprint,
            settings.arena_games
        );

        let candidate = Oracle::new(
            std::sync::Arc::new(candidate_model),
            settings.cache_capacity,
        );
        let prod = Oracle::new(std::sync::Arc::new(prod_model), settings.cache_capacity);
        // one table per contender: table values are evaluator-specific
        let candidate_tt = TranspositionTable::new(settings.tt_capacity);
        let prod_tt = TranspositionTable::new(settings.tt_capacity);

        let mut tally = Tally::new(settings.arena_games, settings.arena_threshold);
        let mut rng = SmallRng::seed_from_u64(settings.arena_games as u64);
        let verdict = loop {
            let candidate_is_black = tally.played % 2 == 0;
            let candidate_won = self.duel(
                &candidate,
                &candidate_tt,
                &prod,
                &prod_tt,
                candidate_is_black,
                rng.random(),
            );
            tally.record(candidate_won);
            log::info!(
                "arena game {}/{}: {} (cand {} prod {} draw {})",
                tally.played,
                tally.scheduled,
                match candidate_won {
                    Some(true) => "candidate",
                    Some(false) => "prod",
                    None => "draw",
                },
                tally.candidate_wins,
                tally.prod_wins,
                tally.draws
            );
            match tally.verdict() {
                Verdict::Continue => continue,
                decided => break decided,
            }
        };

        let passed = verdict == Verdict::Passed;
        let promoted = if passed && settings.promote {
            match self.promote() {
                Ok(()) => true,
                Err(error) => {
                    log::error!("promotion failed, prod left intact: {}", error);
                    false
                }
            }
        } else {
            false
        };
        let report = ArenaReport {
            ts: millis(),
            games: tally.played,
            candidate_wins: tally.candidate_wins,
            prod_wins: tally.prod_wins,
            draws: tally.draws,
            winrate: tally.winrate(),
            candidate_fingerprint,
            prod_fingerprint,
            threshold: settings.arena_threshold,
            promoted,
        };
        std::fs::write(
            &settings.arena_result_path,
            serde_json::to_string_pretty(&report)?,
        )
        .context("write arena result")?;
        log::info!(
            "arena {}: winrate {:.3} over {} games, promoted={}",
            if passed { "passed" } else { "failed" },
            report.winrate,
            report.games,
            report.promoted
        );
        Ok(report)
    }

    /// one game under the current opening rule. Some(true) when the
    /// candidate won, Some(false) when prod did, None on a draw
    fn duel(
        &self,
        candidate: &Oracle,
        candidate_tt: &TranspositionTable,
        prod: &Oracle,
        prod_tt: &TranspositionTable,
        mut candidate_is_black: bool,
        seed: u64,
    ) -> Option<bool> {
        let n = self.settings.board_size;
        let (mut board, mut to_move) = if self.settings.swap2_opening {
            let proposal = crate::swap2::Negotiator::propose(n);
            // the second player (initially white) negotiates
            let second = if candidate_is_black { prod } else { candidate };
            let opening = crate::swap2::Negotiator::new(second).second(&proposal);
            if opening.swap_colors {
                candidate_is_black = !candidate_is_black;
            }
            (opening.board, opening.to_move)
        } else {
            (Board::empty(n), Stone::Black)
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        while board.has_empty() {
            let candidate_turn = (to_move == Stone::Black) == candidate_is_black;
            let (oracle, tt) = if candidate_turn {
                (candidate, candidate_tt)
            } else {
                (prod, prod_tt)
            };
            let params =
                SearchParams::new(&self.settings, self.settings.arena_think_time_ms).quiet();
            let mut search = Search::new(oracle, tt, params, rng.random());
            let decision = search.best_move(&board, to_move);
            let Some(point) = decision.point.filter(|&p| board.is_playable(p, to_move)) else {
                break;
            };
            board.put(point, to_move);
            if board.wins(point, to_move) {
                return Some((to_move == Stone::Black) == candidate_is_black);
            }
            to_move = to_move.opponent();
        }
        None
    }

    /// archive the old prod and swap the candidate in. staged copies plus
    /// bounded rename retries: a failure at any step leaves prod usable.
    fn promote(&self) -> anyhow::Result<()> {
        let ref settings = self.settings;
        let prod = PathBuf::from(&settings.prod_model_dir);
        let candidate = PathBuf::from(&settings.candidate_model_dir);
        let snapshot = PathBuf::from(&settings.past_models_dir).join(format!("prod_{}", millis()));
        let staged = prod.with_extension("next");
        let retired = prod.with_extension("old");

        copy_dir(&prod, &snapshot).context("snapshot old prod")?;
        copy_dir(&candidate, &staged).context("stage candidate")?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match std::fs::rename(&prod, &retired) {
                Ok(()) => {}
                Err(error) if attempt < crate::PROMOTION_RETRIES => {
                    log::warn!("promotion retry {}: prod busy ({})", attempt, error);
                    std::thread::sleep(std::time::Duration::from_millis(
                        crate::PROMOTION_RETRY_DELAY_MS,
                    ));
                    continue;
                }
                Err(error) => {
                    std::fs::remove_dir_all(&staged).ok();
                    return Err(error).context("retire old prod");
                }
            }
            match std::fs::rename(&staged, &prod) {
                Ok(()) => break,
                Err(error) => {
                    // put the old prod back before giving up or retrying
                    std::fs::rename(&retired, &prod).context("restore prod")?;
                    if attempt < crate::PROMOTION_RETRIES {
                        log::warn!("promotion retry {}: swap busy ({})", attempt, error);
                        std::thread::sleep(std::time::Duration::from_millis(
                            crate::PROMOTION_RETRY_DELAY_MS,
                        ));
                        continue;
                    }
                    std::fs::remove_dir_all(&staged).ok();
                    return Err(error).context("install candidate");
                }
            }
        }
        std::fs::remove_dir_all(&retired).ok();
        log::info!("promoted candidate to prod, snapshot at {}", snapshot.display());
        Ok(())
    }
}

fn millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_millis() as u64
}

/// flat directory copy; model stores hold no subdirectories
fn copy_dir(from: &Path, to: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        if entry.path().is_file() {
            std::fs::copy(entry.path(), to.join(entry.file_name()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gomokuzero-arena-{}-{}", tag, std::process::id()))
    }

    fn settings_in(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.prod_model_dir = root.join("prod").to_string_lossy().into_owned();
        settings.candidate_model_dir = root.join("candidate").to_string_lossy().into_owned();
        settings.past_models_dir = root.join("past_models").to_string_lossy().into_owned();
        settings.arena_result_path = root.join("arena_result.json").to_string_lossy().into_owned();
        settings
    }

    #[test]
    fn gate_requires_a_candidate() {
        let root = scratch("nocand");
        let settings = settings_in(&root);
        NetModel::random(15, 1)
            .save(Path::new(&settings.prod_model_dir))
            .unwrap();
        assert!(Gate::new(settings).run().is_err());
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn promotion_archives_and_swaps() {
        let root = scratch("promote");
        let settings = settings_in(&root);
        let old = NetModel::random(15, 1);
        let new = NetModel::random(15, 2);
        old.save(Path::new(&settings.prod_model_dir)).unwrap();
        new.save(Path::new(&settings.candidate_model_dir)).unwrap();
        Gate::new(settings.clone()).promote().unwrap();
        let swapped = NetModel::load(Path::new(&settings.prod_model_dir)).unwrap();
        assert_eq!(swapped.fingerprint(), new.fingerprint());
        let snapshots = std::fs::read_dir(&settings.past_models_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect::<Vec<_>>();
        assert_eq!(snapshots.len(), 1);
        let archived = NetModel::load(&snapshots[0].path()).unwrap();
        assert_eq!(archived.fingerprint(), old.fingerprint());
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn arena_report_roundtrips() {
        let report = ArenaReport {
            ts: 1,
            games: 42,
            candidate_wins: 30,
            prod_wins: 10,
            draws: 2,
            winrate: 30.0 / 42.0,
            candidate_fingerprint: "aa".into(),
            prod_fingerprint: "bb".into(),
            threshold: 0.60,
            promoted: true,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: ArenaReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.games, 42);
        assert!(back.promoted);
    }
}
