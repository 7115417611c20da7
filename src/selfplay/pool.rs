use super::buffer::ReplayBuffer;
use super::worker::Directive;
use super::worker::Worker;
use super::worker::WorkerMessage;
use crate::config::Settings;
use crate::mcts::TranspositionTable;
use crate::nn::Evaluator;
use crate::nn::NetModel;
use crate::nn::Oracle;
use anyhow::Context;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// what one self-play window produced
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SelfPlayReport {
    pub games: usize,
    pub samples: usize,
    pub workers: usize,
    pub crashed: usize,
}

/// the orchestrator: spawns the worker fleet, collects sample batches over
/// a typed channel, flushes the replay buffer on a timer, and runs the
/// whole window against a deadline. crashed workers are logged and not
/// respawned; the deficit is just reduced throughput.
pub struct Pool {
    settings: Settings,
}

impl Pool {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub async fn run(&self) -> anyhow::Result<SelfPlayReport> {
        let ref settings = self.settings;
        let prod_dir = PathBuf::from(&settings.prod_model_dir);
        let model = match NetModel::load(&prod_dir) {
            Ok(model) => model,
            Err(error) => {
                log::warn!("no production model ({}), bootstrapping", error);
                NetModel::bootstrap(&prod_dir, settings.board_size)?
            }
        };
        log::info!(
            "self-play window: {} workers, model {}",
            settings.num_workers,
            model.fingerprint()
        );
        let prod = Arc::new(Oracle::new(Arc::new(model), settings.cache_capacity));
        let tt = Arc::new(TranspositionTable::new(settings.tt_capacity));
        let (outbox, mut inbox) = tokio::sync::mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .subsec_nanos() as u64;
        let mut rng = SmallRng::seed_from_u64(nanos);

        let mut controls = Vec::new();
        let mut handles = Vec::new();
        for id in 0..settings.num_workers {
            let opponent = self.opponent(&mut rng);
            if let Some((ref path, _)) = opponent {
                log::info!("worker {} plays a past model: {}", id, path);
            }
            let worker = Worker::new(
                id,
                settings.clone(),
                prod.clone(),
                settings.prod_model_dir.clone(),
                opponent,
                tt.clone(),
            );
            let (control, directives) = std::sync::mpsc::channel();
            controls.push(control);
            let outbox = outbox.clone();
            let stop = stop.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                worker.run(outbox, directives, stop)
            }));
        }
        drop(outbox);

        let mut buffer = ReplayBuffer::new(&settings.replay_dir);
        let mut served_mtime = NetModel::mtime(PathBuf::from(&settings.prod_model_dir).as_path());
        let mut report = SelfPlayReport {
            workers: settings.num_workers,
            ..SelfPlayReport::default()
        };
        let expiry = tokio::time::sleep(Duration::from_millis(settings.selfplay_duration_ms));
        tokio::pin!(expiry);
        let mut ticker = tokio::time::interval(Duration::from_millis(
            settings.save_interval_ms.max(1_000),
        ));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    None => break,
                    Some(message) => Self::absorb(message, &mut buffer, &mut report),
                },
                _ = ticker.tick() => {
                    if let Err(error) = buffer.flush() {
                        log::warn!("flush failed, retrying next interval: {}", error);
                    }
                    let disk = NetModel::mtime(std::path::Path::new(&settings.prod_model_dir));
                    if disk.is_some() && disk != served_mtime {
                        served_mtime = disk;
                        log::info!("production model changed, asking workers to reload");
                        for control in &controls {
                            let _ = control.send(Directive::Reload {
                                own: settings.prod_model_dir.clone(),
                            });
                        }
                    }
                }
                _ = &mut expiry => {
                    log::info!("self-play window closed, letting running games finish");
                    break;
                }
            }
            if crate::interrupted() {
                log::info!("self-play interrupted, letting running games finish");
                break;
            }
        }

        // no more restarts: signal, then drain whatever still completes
        stop.store(true, Ordering::Relaxed);
        for control in &controls {
            let _ = control.send(Directive::Stop);
        }
        while let Some(message) = inbox.recv().await {
            Self::absorb(message, &mut buffer, &mut report);
        }
        for handle in handles {
            let _ = handle.await;
        }
        buffer.flush().context("final replay flush")?;
        log::info!(
            "self-play done: {} games, {} samples, {} crashed workers",
            report.games,
            report.samples,
            report.crashed
        );
        Ok(report)
    }

    fn absorb(message: WorkerMessage, buffer: &mut ReplayBuffer, report: &mut SelfPlayReport) {
        match message {
            WorkerMessage::Batch {
                worker,
                game_id,
                samples,
            } => {
                log::debug!(
                    "worker {} delivered game {} ({} samples)",
                    worker,
                    game_id,
                    samples.len()
                );
                report.games += 1;
                report.samples += samples.len();
                buffer.extend(samples);
            }
            WorkerMessage::Finished { worker, games } => {
                log::info!("worker {} retired after {} games", worker, games);
            }
            WorkerMessage::Crashed { worker, error } => {
                report.crashed += 1;
                log::error!("worker {} crashed, not respawning: {}", worker, error);
            }
        }
    }

    /// with PAST_MODEL_PROBABILITY, pit the fleet member against a random
    /// snapshot from past_models; otherwise mirror-match the current model
    fn opponent(&self, rng: &mut SmallRng) -> Option<(String, Arc<Oracle>)> {
        if !rng.random_bool(self.settings.past_model_probability) {
            return None;
        }
        let snapshots = match std::fs::read_dir(&self.settings.past_models_dir) {
            Err(_) => return None,
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .map(|e| e.path())
                .collect::<Vec<_>>(),
        };
        if snapshots.is_empty() {
            return None;
        }
        let pick = &snapshots[rng.random_range(0..snapshots.len())];
        match NetModel::load(pick) {
            Ok(model) => {
                let oracle = Oracle::new(Arc::new(model), self.settings.cache_capacity);
                Some((pick.to_string_lossy().into_owned(), Arc::new(oracle)))
            }
            Err(error) => {
                log::warn!("past model {} unreadable: {}", pick.display(), error);
                None
            }
        }
    }
}
