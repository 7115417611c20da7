use super::book::OpeningBook;
use crate::config::Settings;
use crate::mcts::TranspositionTable;
use crate::nn::Evaluator;
use crate::nn::NetModel;
use crate::nn::Oracle;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

/// the model currently answering requests, plus its staleness markers
pub struct Served {
    pub oracle: Arc<Oracle>,
    pub fingerprint: String,
    pub mtime: Option<SystemTime>,
    pub etag: Option<String>,
}

/// shared server state: a guarded pointer to the served model (old models
/// drain naturally as in-flight requests hold their Arc), the process-wide
/// transposition table, and the optional opening book.
pub struct Engine {
    pub settings: Settings,
    served: RwLock<Option<Arc<Served>>>,
    pub tt: TranspositionTable,
    pub book: Option<OpeningBook>,
    seeds: AtomicU64,
}

impl Engine {
    /// build from disk; a missing model leaves the engine serving 503s
    /// until the watcher finds one
    pub fn start(settings: Settings) -> Self {
        let book = settings.book_path.as_ref().and_then(|path| {
            match OpeningBook::load(Path::new(path), settings.board_size) {
                Ok(book) => Some(book),
                Err(error) => {
                    log::warn!("opening book unavailable: {}", error);
                    None
                }
            }
        });
        let engine = Self {
            tt: TranspositionTable::new(settings.tt_capacity),
            book,
            served: RwLock::new(None),
            seeds: AtomicU64::new(0x9e3779b97f4a7c15),
            settings,
        };
        if let Err(error) = engine.reload_from_disk(None) {
            log::warn!("no model at startup: {}", error);
        }
        engine
    }

    pub fn served(&self) -> Option<Arc<Served>> {
        self.served.read().expect("served lock").clone()
    }

    pub fn seed(&self) -> u64 {
        self.seeds.fetch_add(0x9e3779b97f4a7c15, Ordering::Relaxed)
    }

    /// load the prod directory and swap it in
    pub fn reload_from_disk(&self, etag: Option<String>) -> anyhow::Result<()> {
        let dir = Path::new(&self.settings.prod_model_dir);
        let model = NetModel::load(dir)?;
        let served = Served {
            fingerprint: model.fingerprint(),
            oracle: Arc::new(Oracle::new(
                Arc::new(model),
                self.settings.cache_capacity,
            )),
            mtime: NetModel::mtime(dir),
            etag,
        };
        log::info!("serving model {}", served.fingerprint);
        *self.served.write().expect("served lock") = Some(Arc::new(served));
        Ok(())
    }

    /// one staleness probe: remote ETag when a model URL is configured,
    /// manifest mtime otherwise
    pub async fn refresh(&self, client: &reqwest::Client) {
        match &self.settings.model_url {
            Some(url) => {
                if let Err(error) = self.refresh_remote(client, url).await {
                    log::warn!("remote model check failed: {}", error);
                }
            }
            None => {
                let current = self.served().and_then(|s| s.mtime);
                let disk = NetModel::mtime(Path::new(&self.settings.prod_model_dir));
                if disk.is_some() && disk != current {
                    if let Err(error) = self.reload_from_disk(None) {
                        log::warn!("model reload failed, keeping last good: {}", error);
                    }
                }
            }
        }
    }

    /// fetch {url}/model.json conditionally; on change, download the
    /// manifest and its weight blobs into the prod directory and reload
    async fn refresh_remote(&self, client: &reqwest::Client, url: &str) -> anyhow::Result<()> {
        let manifest_url = format!("{}/model.json", url.trim_end_matches('/'));
        let mut request = client.get(&manifest_url);
        if let Some(etag) = self.served().and_then(|s| s.etag.clone()) {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(());
        }
        let response = response.error_for_status()?;
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let manifest_text = response.text().await?;
        let manifest: crate::nn::Manifest =
            serde_json::from_str(&manifest_text).map_err(anyhow::Error::from)?;
        let dir = Path::new(&self.settings.prod_model_dir);
        std::fs::create_dir_all(dir)?;
        for blob in &manifest.weights {
            let blob_url = format!("{}/{}", url.trim_end_matches('/'), blob);
            let bytes = client
                .get(&blob_url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            std::fs::write(dir.join(blob), &bytes)?;
        }
        std::fs::write(dir.join("model.json"), manifest_text)?;
        self.reload_from_disk(etag)
    }
}

/// the periodic staleness loop, spawned next to the HTTP server
pub async fn watch(engine: Arc<Engine>) {
    let client = reqwest::Client::new();
    let interval = std::time::Duration::from_millis(
        engine.settings.model_check_interval_ms.max(1_000),
    );
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // the immediate first tick
    loop {
        ticker.tick().await;
        engine.refresh(&client).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(tag: &str) -> Settings {
        let root = std::env::temp_dir().join(format!(
            "gomokuzero-served-{}-{}",
            tag,
            std::process::id()
        ));
        let mut settings = Settings::default();
        settings.prod_model_dir = root.join("prod").to_string_lossy().into_owned();
        settings
    }

    #[test]
    fn missing_model_serves_nothing() {
        let engine = Engine::start(settings_in("missing"));
        assert!(engine.served().is_none());
    }

    #[test]
    fn disk_model_is_served_and_reload_swaps() {
        let settings = settings_in("swap");
        let dir = std::path::PathBuf::from(&settings.prod_model_dir);
        NetModel::random(15, 1).save(&dir).unwrap();
        let engine = Engine::start(settings);
        let first = engine.served().unwrap();
        NetModel::random(15, 2).save(&dir).unwrap();
        engine.reload_from_disk(None).unwrap();
        let second = engine.served().unwrap();
        assert_ne!(first.fingerprint, second.fingerprint);
        // the old Arc stays usable for requests still holding it
        assert_eq!(first.oracle.board_size(), 15);
        std::fs::remove_dir_all(dir.parent().unwrap()).ok();
    }

    #[test]
    fn seeds_never_repeat() {
        let engine = Engine::start(settings_in("seeds"));
        let a = engine.seed();
        let b = engine.seed();
        assert_ne!(a, b);
    }
}
