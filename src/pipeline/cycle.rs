use super::status::Phase;
use super::status::StatusFile;
use super::tuning;
use crate::arena::Gate;
use crate::config::Settings;
use crate::selfplay::Pool;
use serde_json::Value;
use serde_json::json;
use std::time::Duration;

/// the pipeline driver. each cycle runs self-play, the external
/// distillation driver, the arena gate, and (on promotion) the publish
/// stages, in that order. every stage failure lands in status.error and
/// the cycle carries on; only the operator stops an endless loop.
pub struct Cycle {
    settings: Settings,
    status: StatusFile,
    client: reqwest::Client,
}

impl Cycle {
    pub fn new(settings: Settings) -> Self {
        let status = StatusFile::new(&settings.status_path);
        Self {
            settings,
            status,
            client: reqwest::Client::new(),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let endless = self.settings.forever || self.settings.pipeline_cycles == 0;
        let mut cycle = 0usize;
        loop {
            cycle += 1;
            log::info!("pipeline cycle {} starting", cycle);
            let failed = self.once(cycle).await;
            self.report(json!({ "phase": Phase::Idle, "cycle": cycle }))
                .await;
            if !endless && cycle >= self.settings.pipeline_cycles {
                break;
            }
            if crate::interrupted() {
                log::info!("pipeline interrupted after cycle {}", cycle);
                break;
            }
            let delay = if failed {
                self.settings.on_error_delay_ms
            } else {
                self.settings.pipeline_interval_ms
            };
            if delay > 0 {
                log::info!("sleeping {}ms before next cycle", delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        Ok(())
    }

    /// one cycle; true when any stage errored
    async fn once(&self, cycle: usize) -> bool {
        let mut failed = false;

        // self-play
        self.report(json!({ "phase": Phase::SelfPlay, "cycle": cycle, "error": null }))
            .await;
        match Pool::new(self.settings.clone()).run().await {
            Ok(report) => {
                self.report(json!({ "selfplay": report })).await;
            }
            Err(error) => {
                failed = true;
                self.fail("selfplay", &error.to_string()).await;
            }
        }

        // distillation driver (external)
        self.report(json!({ "phase": Phase::Distill, "cycle": cycle }))
            .await;
        match self.external("distill", self.settings.distill_cmd.clone()).await {
            Ok(ran) => {
                self.report(json!({ "distill": { "ran": ran } })).await;
            }
            Err(error) => {
                failed = true;
                self.fail("distill", &error.to_string()).await;
            }
        }

        // arena gate
        self.report(json!({ "phase": Phase::Arena, "cycle": cycle }))
            .await;
        let mut promoted = false;
        let gate = Gate::new(self.settings.clone());
        match tokio::task::spawn_blocking(move || gate.run()).await {
            Ok(Ok(report)) => {
                promoted = report.promoted;
                self.report(json!({ "arena": report })).await;
                if let Err(error) = tuning::nudge(&self.settings, report.winrate) {
                    log::warn!("tuning feedback not persisted: {}", error);
                }
            }
            Ok(Err(error)) => {
                failed = true;
                self.fail("arena", &error.to_string()).await;
            }
            Err(error) => {
                failed = true;
                self.fail("arena", &error.to_string()).await;
            }
        }

        // publish stages, only meaningful after a promotion
        if promoted {
            self.report(json!({ "phase": Phase::Upload, "cycle": cycle }))
                .await;
            match self.external("upload", self.settings.upload_cmd.clone()).await {
                Ok(ran) => {
                    self.report(json!({ "upload": { "ran": ran, "ok": true } }))
                        .await;
                }
                Err(error) => {
                    failed = true;
                    self.fail("upload", &error.to_string()).await;
                }
            }
        }

        // opening-book import never fails a cycle
        self.report(json!({ "phase": Phase::BookImport, "cycle": cycle }))
            .await;
        match self.external("book", self.settings.book_cmd.clone()).await {
            Ok(ran) => {
                self.report(json!({ "book": { "ran": ran, "ok": true } })).await;
            }
            Err(error) => {
                log::warn!("book import failed (non-fatal): {}", error);
                self.report(json!({ "book": { "ok": false } })).await;
            }
        }

        failed
    }

    /// run one configured external stage command through the shell.
    /// Ok(false) when no command is configured.
    async fn external(&self, stage: &str, command: Option<String>) -> anyhow::Result<bool> {
        let Some(command) = command else {
            log::info!("{} stage has no command configured, skipping", stage);
            return Ok(false);
        };
        log::info!("{} stage: {}", stage, command);
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .status()
            .await?;
        if status.success() {
            Ok(true)
        } else {
            Err(anyhow::anyhow!("{} command exited with {}", stage, status))
        }
    }

    async fn fail(&self, stage: &str, message: &str) {
        log::error!("{} stage failed: {}", stage, message);
        self.report(json!({ "error": format!("{}: {}", stage, message) }))
            .await;
    }

    /// merge into the status file and mirror the merged document to the
    /// webhook when one is configured. webhook errors are logged only.
    async fn report(&self, patch: Value) {
        let merged = match self.status.merge(patch) {
            Ok(merged) => merged,
            Err(error) => {
                log::warn!("status update lost: {}", error);
                return;
            }
        };
        if let Some(url) = &self.settings.webhook_url {
            if let Err(error) = self.client.post(url).json(&merged).send().await {
                log::warn!("webhook post failed: {}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(tag: &str) -> Settings {
        let root = std::env::temp_dir().join(format!(
            "gomokuzero-cycle-{}-{}",
            tag,
            std::process::id()
        ));
        let mut settings = Settings::default();
        settings.status_path = root
            .join("status.json")
            .to_string_lossy()
            .into_owned();
        std::fs::create_dir_all(&root).unwrap();
        settings
    }

    #[tokio::test]
    async fn unset_stage_command_is_skipped() {
        let cycle = Cycle::new(settings_in("skip"));
        assert!(!cycle.external("distill", None).await.unwrap());
    }

    #[tokio::test]
    async fn successful_command_reports_ran() {
        let cycle = Cycle::new(settings_in("ok"));
        assert!(cycle.external("distill", Some("true".into())).await.unwrap());
    }

    #[tokio::test]
    async fn failing_command_surfaces_an_error() {
        let cycle = Cycle::new(settings_in("err"));
        assert!(cycle.external("upload", Some("false".into())).await.is_err());
    }

    #[tokio::test]
    async fn reports_accumulate_in_the_status_file() {
        let settings = settings_in("report");
        let path = settings.status_path.clone();
        std::fs::remove_file(&path).ok();
        let cycle = Cycle::new(settings);
        cycle
            .report(json!({ "phase": Phase::SelfPlay, "cycle": 3 }))
            .await;
        cycle.report(json!({ "selfplay": { "games": 9 } })).await;
        let status = StatusFile::new(&path).read();
        assert_eq!(status["cycle"], 3);
        assert_eq!(status["phase"], "self_play");
        assert_eq!(status["selfplay"]["games"], 9);
        std::fs::remove_file(&path).ok();
    }
}
