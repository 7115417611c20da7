pub mod arena;
pub mod config;
pub mod game;
pub mod hosting;
pub mod mcts;
pub mod nn;
pub mod pipeline;
pub mod selfplay;
pub mod solver;
pub mod swap2;
pub mod threat;

/// dimensional analysis types
pub type Value = f32;
pub type Prior = f32;
pub type Probability = f32;
pub type Visits = u32;
pub type Millis = u64;

// board parameters
pub const BOARD_SIZE: usize = 15;
/// candidate radius switches from 2 to 1 once this many stones are down
pub const EARLY_GAME_STONES: usize = 6;

// tactical solver parameters
pub const VCF_MAX_DEPTH: usize = 3;
pub const VCT_MAX_DEPTH: usize = 4;
pub const VCT_FAST_DEPTH: usize = 2;
pub const SOLVER_NODE_CAP: usize = 20_000;
/// soft deadline: min(this, 30% of the total think budget)
pub const SOLVER_DEADLINE_MS: Millis = 1_500;

// mcts parameters
pub const C_PUCT: f32 = 2.0;
pub const C_PUCT_DEEP: f32 = 1.5;
pub const C_PUCT_DEPTH_SWITCH: u16 = 20;
pub const DIRICHLET_ALPHA: f32 = 0.12;
pub const DIRICHLET_EPSILON: f32 = 0.25;
pub const K_CHILD_BASE: usize = 24;
pub const K_CHILD_STEP: usize = 12;
pub const K_CHILD_MAX: usize = 128;
pub const K_ROOT_MAX: usize = 256;
pub const MCTS_BATCH_SIZE: usize = 8;
pub const MCTS_BATCH_SIZE_FAST: usize = 4;
pub const EARLY_STOP_MIN_VISITS: Visits = 220;
pub const EARLY_STOP_MIN_VISITS_FAST: Visits = 120;
pub const EARLY_STOP_RATIO: f32 = 2.2;
pub const EARLY_STOP_RATIO_FAST: f32 = 1.8;
pub const TT_CAPACITY: usize = 20_000;
pub const TT_BOOTSTRAP_VISITS: Visits = 3;
pub const TT_PRIOR_MIX_ROOT: f32 = 0.20;
pub const TT_PRIOR_MIX_CHILD: f32 = 0.35;
pub const PREDICTION_CACHE_CAPACITY: usize = 5_000;
/// budgets at or under these switch symmetry count 8 -> 4 -> 1
pub const SYMMETRY_BUDGET_HALF_MS: Millis = 1_200;
pub const SYMMETRY_BUDGET_FAST_MS: Millis = 900;

// self-play parameters
pub const NUM_WORKERS: usize = 4;
pub const EXPLORATION_MOVES: usize = 15;
pub const THINK_TIME_MS: Millis = 1_000;
pub const THINK_TIME_MIN_MS: Millis = 200;
pub const SAVE_INTERVAL_MS: Millis = 30_000;
pub const SELF_PLAY_DURATION_MS: Millis = 1_800_000;
pub const PAST_MODEL_PROBABILITY: f64 = 0.5;
pub const SWAP2_ROLLOUT_PLIES: usize = 3;
pub const SWAP2_BUDGET_MS: Millis = 500;

// arena parameters
pub const ARENA_GAMES: usize = 200;
pub const ARENA_THINK_TIME_MS: Millis = 3_000;
pub const ARENA_THRESHOLD: f64 = 0.60;
pub const PROMOTION_RETRIES: usize = 10;
pub const PROMOTION_RETRY_DELAY_MS: Millis = 500;

// pipeline parameters
pub const PIPELINE_INTERVAL_MS: Millis = 0;
pub const ON_ERROR_DELAY_MS: Millis = 60_000;
pub const MODEL_CHECK_INTERVAL_MS: Millis = 300_000;

// hosting parameters
pub const THINK_TIME_FORCE_MIN_MS: Millis = 200;
pub const THINK_TIME_FORCE_MAX_MS: Millis = 5_000;
pub const BOOK_MAX_MOVES: usize = 12;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// initialize dual logging (terminal + file) with timestamped log files
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// register ctrl-c handler for immediate (non-graceful) termination
pub fn kys() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        println!();
        log::warn!("violent interrupt received, exiting immediately");
        std::process::exit(0);
    });
}

/// global interrupt flag for graceful shutdown coordination
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);
/// optional run deadline from RUN_DURATION env var
static DEADLINE: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// check if graceful shutdown was requested (via stdin "Q") or deadline reached
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
        || DEADLINE
            .get()
            .map_or(false, |d| std::time::Instant::now() >= *d)
}

/// register graceful interrupt handler. type "Q" + Enter to stop after the
/// current game or cycle. optionally set RUN_DURATION (e.g. "2h", "30m").
pub fn brb() {
    if let Ok(duration) = std::env::var("RUN_DURATION") {
        if let Some(deadline) = parse_duration(&duration) {
            let _ = DEADLINE.set(std::time::Instant::now() + deadline);
            log::info!("run will stop after {}", duration);
        }
    }
    std::thread::spawn(|| {
        loop {
            let ref mut buffer = String::new();
            if let Ok(_) = std::io::stdin().read_line(buffer) {
                if buffer.trim().to_uppercase() == "Q" {
                    log::warn!("graceful interrupt requested, finishing current work...");
                    INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
                    break;
                }
            }
        }
    });
}

/// parse duration string like "30s", "5m", "2h", "1d"
fn parse_duration(s: &str) -> Option<std::time::Duration> {
    let s = s.trim();
    let (num, unit) = s.split_at(s.len().saturating_sub(1));
    let value: u64 = num.parse().ok()?;
    match unit {
        "s" => Some(std::time::Duration::from_secs(value)),
        "m" => Some(std::time::Duration::from_secs(value * 60)),
        "h" => Some(std::time::Duration::from_secs(value * 3600)),
        "d" => Some(std::time::Duration::from_secs(value * 86400)),
        _ => None,
    }
}
