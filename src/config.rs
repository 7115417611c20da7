use crate::Millis;
use crate::Visits;

/// read an env var, falling back to the crate default when unset or unparseable
fn var<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// every tunable of the system in one place. defaults are the crate
/// constants; each field is overridable through the environment; the
/// multiplicative boost gain and TT prior mixes additionally pick up the
/// persisted arena-feedback overlay.
#[derive(Debug, Clone)]
pub struct Settings {
    // board
    pub board_size: usize,
    // self-play
    pub num_workers: usize,
    pub think_time_ms: Millis,
    pub exploration_moves: usize,
    pub save_interval_ms: Millis,
    pub selfplay_duration_ms: Millis,
    pub past_model_probability: f64,
    pub swap2_opening: bool,
    // arena
    pub arena_games: usize,
    pub arena_think_time_ms: Millis,
    pub arena_threshold: f64,
    pub promote: bool,
    // search
    pub batch_size: usize,
    pub tt_capacity: usize,
    pub cache_capacity: usize,
    pub dirichlet_alpha: f32,
    pub dirichlet_epsilon: f32,
    pub c_puct: f32,
    pub c_puct_deep: f32,
    pub k_child_base: usize,
    pub k_child_step: usize,
    pub k_child_max: usize,
    pub k_root_max: usize,
    pub early_stop_min_visits: Visits,
    pub early_stop_ratio: f32,
    pub forbidden_penalty: f32,
    pub boost_gain: f32,
    pub tt_prior_mix_root: f32,
    pub tt_prior_mix_child: f32,
    // stores
    pub prod_model_dir: String,
    pub candidate_model_dir: String,
    pub past_models_dir: String,
    pub replay_dir: String,
    pub status_path: String,
    pub arena_result_path: String,
    pub tuning_path: String,
    pub book_path: Option<String>,
    // model refresh
    pub model_url: Option<String>,
    pub model_check_interval_ms: Millis,
    // pipeline
    pub pipeline_cycles: usize,
    pub forever: bool,
    pub pipeline_interval_ms: Millis,
    pub on_error_delay_ms: Millis,
    pub distill_cmd: Option<String>,
    pub upload_cmd: Option<String>,
    pub book_cmd: Option<String>,
    pub webhook_url: Option<String>,
    // hosting
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board_size: crate::BOARD_SIZE,
            num_workers: crate::NUM_WORKERS,
            think_time_ms: crate::THINK_TIME_MS,
            exploration_moves: crate::EXPLORATION_MOVES,
            save_interval_ms: crate::SAVE_INTERVAL_MS,
            selfplay_duration_ms: crate::SELF_PLAY_DURATION_MS,
            past_model_probability: crate::PAST_MODEL_PROBABILITY,
            swap2_opening: false,
            arena_games: crate::ARENA_GAMES,
            arena_think_time_ms: crate::ARENA_THINK_TIME_MS,
            arena_threshold: crate::ARENA_THRESHOLD,
            promote: true,
            batch_size: crate::MCTS_BATCH_SIZE,
            tt_capacity: crate::TT_CAPACITY,
            cache_capacity: crate::PREDICTION_CACHE_CAPACITY,
            dirichlet_alpha: crate::DIRICHLET_ALPHA,
            dirichlet_epsilon: crate::DIRICHLET_EPSILON,
            c_puct: crate::C_PUCT,
            c_puct_deep: crate::C_PUCT_DEEP,
            k_child_base: crate::K_CHILD_BASE,
            k_child_step: crate::K_CHILD_STEP,
            k_child_max: crate::K_CHILD_MAX,
            k_root_max: crate::K_ROOT_MAX,
            early_stop_min_visits: crate::EARLY_STOP_MIN_VISITS,
            early_stop_ratio: crate::EARLY_STOP_RATIO,
            forbidden_penalty: 0.0,
            boost_gain: 1.0,
            tt_prior_mix_root: crate::TT_PRIOR_MIX_ROOT,
            tt_prior_mix_child: crate::TT_PRIOR_MIX_CHILD,
            prod_model_dir: "models/prod".into(),
            candidate_model_dir: "models/candidate".into(),
            past_models_dir: "past_models".into(),
            replay_dir: "replay".into(),
            status_path: "status.json".into(),
            arena_result_path: "arena_result.json".into(),
            tuning_path: "tuning.json".into(),
            book_path: None,
            model_url: None,
            model_check_interval_ms: crate::MODEL_CHECK_INTERVAL_MS,
            pipeline_cycles: 0,
            forever: false,
            pipeline_interval_ms: crate::PIPELINE_INTERVAL_MS,
            on_error_delay_ms: crate::ON_ERROR_DELAY_MS,
            distill_cmd: None,
            upload_cmd: None,
            book_cmd: None,
            webhook_url: None,
            bind_addr: "0.0.0.0:8017".into(),
        }
    }
}

impl Settings {
    /// environment over defaults, tuning overlay over environment
    pub fn load() -> Self {
        let ref defaults = Self::default();
        let mut settings = Self {
            board_size: var("BOARD_SIZE", defaults.board_size),
            num_workers: var("NUM_WORKERS", num_cpus::get().min(defaults.num_workers)),
            think_time_ms: var("THINK_TIME_MS", defaults.think_time_ms),
            exploration_moves: var("EXPLORATION_MOVES", defaults.exploration_moves),
            save_interval_ms: var("SAVE_INTERVAL_MS", defaults.save_interval_ms),
            selfplay_duration_ms: var("SELF_PLAY_DURATION_MS", defaults.selfplay_duration_ms),
            past_model_probability: var("PAST_MODEL_PROBABILITY", defaults.past_model_probability),
            swap2_opening: var("SWAP2_OPENING", defaults.swap2_opening),
            arena_games: var("ARENA_GAMES", defaults.arena_games),
            arena_think_time_ms: var("ARENA_THINK_TIME", defaults.arena_think_time_ms),
            arena_threshold: var("ARENA_THRESHOLD", defaults.arena_threshold),
            promote: var("PROMOTE", defaults.promote),
            batch_size: var("MCTS_BATCH_SIZE", defaults.batch_size),
            tt_capacity: var("TT_CAPACITY", defaults.tt_capacity),
            cache_capacity: var("PREDICTION_CACHE_CAPACITY", defaults.cache_capacity),
            dirichlet_alpha: var("DIRICHLET_ALPHA", defaults.dirichlet_alpha),
            dirichlet_epsilon: var("DIRICHLET_EPSILON", defaults.dirichlet_epsilon),
            c_puct: var("C_PUCT", defaults.c_puct),
            c_puct_deep: var("C_PUCT_DEEP", defaults.c_puct_deep),
            k_child_base: var("K_CHILD_BASE", defaults.k_child_base),
            k_child_step: var("K_CHILD_STEP", defaults.k_child_step),
            k_child_max: var("K_CHILD_MAX", defaults.k_child_max),
            k_root_max: var("K_ROOT_MAX", defaults.k_root_max),
            early_stop_min_visits: var("EARLY_STOP_MIN_VISITS", defaults.early_stop_min_visits),
            early_stop_ratio: var("EARLY_STOP_RATIO", defaults.early_stop_ratio),
            forbidden_penalty: var("FORBIDDEN_PENALTY", defaults.forbidden_penalty),
            boost_gain: defaults.boost_gain,
            tt_prior_mix_root: var("TT_PRIOR_MIX_ROOT", defaults.tt_prior_mix_root),
            tt_prior_mix_child: var("TT_PRIOR_MIX_CHILD", defaults.tt_prior_mix_child),
            prod_model_dir: var("PROD_MODEL_DIR", defaults.prod_model_dir.clone()),
            candidate_model_dir: var("CANDIDATE_MODEL_DIR", defaults.candidate_model_dir.clone()),
            past_models_dir: var("PAST_MODELS_DIR", defaults.past_models_dir.clone()),
            replay_dir: var("REPLAY_DIR", defaults.replay_dir.clone()),
            status_path: var("STATUS_PATH", defaults.status_path.clone()),
            arena_result_path: var("ARENA_RESULT_PATH", defaults.arena_result_path.clone()),
            tuning_path: var("TUNING_PATH", defaults.tuning_path.clone()),
            book_path: optional("BOOK_PATH"),
            model_url: optional("MODEL_URL"),
            model_check_interval_ms: var("MODEL_CHECK_INTERVAL_MS", defaults.model_check_interval_ms),
            pipeline_cycles: var("PIPELINE_CYCLES", defaults.pipeline_cycles),
            forever: var("FOREVER", defaults.forever),
            pipeline_interval_ms: var("PIPELINE_INTERVAL_MS", defaults.pipeline_interval_ms),
            on_error_delay_ms: var("ON_ERROR_DELAY_MS", defaults.on_error_delay_ms),
            distill_cmd: optional("DISTILL_CMD"),
            upload_cmd: optional("UPLOAD_CMD"),
            book_cmd: optional("BOOK_CMD"),
            webhook_url: optional("WEBHOOK_URL"),
            bind_addr: var("BIND_ADDR", defaults.bind_addr.clone()),
        };
        if let Some(tuning) = Tuning::read(&settings.tuning_path) {
            settings.apply(&tuning);
        }
        settings
    }

    pub fn apply(&mut self, tuning: &Tuning) {
        self.boost_gain = tuning.boost_gain;
        self.tt_prior_mix_root = tuning.tt_prior_mix_root;
        self.tt_prior_mix_child = tuning.tt_prior_mix_child;
    }
}

/// the arena-feedback overlay persisted between cycles. the gain scales
/// every multiplicative boost factor's excess over 1.0 and stays within
/// ten percent of neutral; the mixes stay within [0, 0.6].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Tuning {
    pub boost_gain: f32,
    pub tt_prior_mix_root: f32,
    pub tt_prior_mix_child: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            boost_gain: 1.0,
            tt_prior_mix_root: crate::TT_PRIOR_MIX_ROOT,
            tt_prior_mix_child: crate::TT_PRIOR_MIX_CHILD,
        }
    }
}

impl Tuning {
    pub fn read(path: &str) -> Option<Self> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
    }

    pub fn write(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let settings = Settings::default();
        assert_eq!(settings.board_size, crate::BOARD_SIZE);
        assert_eq!(settings.arena_games, crate::ARENA_GAMES);
        assert_eq!(settings.batch_size, crate::MCTS_BATCH_SIZE);
        assert!(settings.forbidden_penalty == 0.0);
    }

    #[test]
    fn tuning_roundtrip() {
        let tuning = Tuning {
            boost_gain: 1.05,
            tt_prior_mix_root: 0.25,
            tt_prior_mix_child: 0.40,
        };
        let json = serde_json::to_string(&tuning).unwrap();
        let back: Tuning = serde_json::from_str(&json).unwrap();
        assert!(back.boost_gain == tuning.boost_gain);
        assert!(back.tt_prior_mix_child == tuning.tt_prior_mix_child);
    }
}
