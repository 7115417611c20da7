use crate::config::Settings;
use crate::config::Tuning;

/// arena feedback: nudge the tactical boost gain and the TT prior mixes by
/// a step proportional to the margin over the gating threshold. the gain
/// stays within ten percent of neutral; the mixes within [0, 0.6]. the
/// adjusted values persist so following cycles pick them up.
pub fn nudge(settings: &Settings, winrate: f64) -> anyhow::Result<Tuning> {
    let mut tuning = Tuning::read(&settings.tuning_path).unwrap_or_default();
    let step = (winrate - settings.arena_threshold) as f32 * 0.2;
    tuning.boost_gain = (tuning.boost_gain + step).clamp(0.9, 1.1);
    tuning.tt_prior_mix_root = (tuning.tt_prior_mix_root + step * 0.5).clamp(0.0, 0.6);
    tuning.tt_prior_mix_child = (tuning.tt_prior_mix_child + step * 0.5).clamp(0.0, 0.6);
    tuning.write(&settings.tuning_path)?;
    log::info!(
        "tuning nudged: gain {:.3}, mix root {:.3}, mix child {:.3}",
        tuning.boost_gain,
        tuning.tt_prior_mix_root,
        tuning.tt_prior_mix_child
    );
    Ok(tuning)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(path: &str) -> Settings {
        let mut settings = Settings::default();
        settings.tuning_path = path.to_string();
        settings
    }

    fn scratch(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("gomokuzero-tuning-{}-{}.json", tag, std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn winning_margin_raises_the_gain() {
        let path = scratch("up");
        std::fs::remove_file(&path).ok();
        let settings = settings_with(&path);
        let tuning = nudge(&settings, 0.80).unwrap();
        assert!(tuning.boost_gain > 1.0);
        assert!(tuning.boost_gain <= 1.1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn losing_margin_stays_clamped() {
        let path = scratch("down");
        std::fs::remove_file(&path).ok();
        let settings = settings_with(&path);
        for _ in 0..10 {
            nudge(&settings, 0.0).unwrap();
        }
        let tuning = Tuning::read(&path).unwrap();
        assert!((tuning.boost_gain - 0.9).abs() < 1e-6);
        assert!(tuning.tt_prior_mix_root >= 0.0);
        assert!(tuning.tt_prior_mix_child >= 0.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn nudges_accumulate_across_cycles() {
        let path = scratch("accumulate");
        std::fs::remove_file(&path).ok();
        let settings = settings_with(&path);
        let first = nudge(&settings, 0.70).unwrap();
        let second = nudge(&settings, 0.70).unwrap();
        assert!(second.boost_gain >= first.boost_gain);
        std::fs::remove_file(&path).ok();
    }
}
