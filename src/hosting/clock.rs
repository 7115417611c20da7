use crate::Millis;

/// the time fields a caller may provide, in preference order
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeHints {
    pub force_think_time_ms: Option<Millis>,
    pub time_left_ms: Option<Millis>,
    pub turn_limit_ms: Option<Millis>,
    pub turn_ends_at: Option<u64>,
}

/// game phase by move count, mirroring the self-play schedule boundaries
fn fraction(moves: usize) -> f64 {
    match moves {
        0..=6 => 0.35,
        7..=30 => 0.55,
        _ => 0.50,
    }
}

fn fallback(moves: usize) -> Millis {
    match moves {
        0..=6 => 1_500,
        7..=30 => 3_000,
        _ => 1_500,
    }
}

const SAFETY_MARGIN_MS: Millis = 200;

/// compute the think budget for one request. a forced value is clamped and
/// obeyed; otherwise a phase-dependent fraction of whatever clock signal is
/// present, minus a safety margin; otherwise the "base+increment"
/// approximation (default 5+1); otherwise static phase defaults.
pub fn think_time(moves: usize, hints: TimeHints, time_control: Option<&str>) -> Millis {
    let clamp = |ms: Millis| ms.clamp(crate::THINK_TIME_FORCE_MIN_MS, crate::THINK_TIME_FORCE_MAX_MS);
    if let Some(forced) = hints.force_think_time_ms {
        return clamp(forced);
    }
    let remaining = hints
        .time_left_ms
        .or(hints.turn_limit_ms)
        .or_else(|| {
            hints.turn_ends_at.map(|ends| {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .expect("time moves slow")
                    .as_millis() as u64;
                ends.saturating_sub(now)
            })
        });
    if let Some(remaining) = remaining {
        let allotted = (remaining as f64 * fraction(moves)) as Millis;
        return clamp(allotted.saturating_sub(SAFETY_MARGIN_MS));
    }
    if let Some(control) = time_control {
        if let Some((base_min, increment_s)) = parse_time_control(control) {
            // spread the base over a nominal forty moves
            let per_move = base_min * 60_000 / 40 + increment_s * 1_000;
            return clamp(per_move.saturating_sub(SAFETY_MARGIN_MS));
        }
    }
    fallback(moves)
}

/// "5+1" style: minutes of base time plus seconds of increment
fn parse_time_control(control: &str) -> Option<(Millis, Millis)> {
    let (base, increment) = control.trim().split_once('+')?;
    Some((base.parse().ok()?, increment.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_time_is_clamped() {
        let mut hints = TimeHints::default();
        hints.force_think_time_ms = Some(50);
        assert_eq!(think_time(0, hints, None), 200);
        hints.force_think_time_ms = Some(60_000);
        assert_eq!(think_time(0, hints, None), 5_000);
        hints.force_think_time_ms = Some(800);
        assert_eq!(think_time(0, hints, None), 800);
    }

    #[test]
    fn time_left_takes_a_phase_fraction() {
        let mut hints = TimeHints::default();
        hints.time_left_ms = Some(10_000);
        // early: 10000 * 0.35 - 200 = 3300
        assert_eq!(think_time(3, hints, None), 3_300);
        // mid: 10000 * 0.55 - 200 = 5300, clamped
        assert_eq!(think_time(15, hints, None), 5_000);
        // late: 10000 * 0.50 - 200 = 4800
        assert_eq!(think_time(40, hints, None), 4_800);
    }

    #[test]
    fn time_left_beats_turn_limit() {
        let mut hints = TimeHints::default();
        hints.time_left_ms = Some(2_000);
        hints.turn_limit_ms = Some(50_000);
        // 2000 * 0.35 - 200 = 500
        assert_eq!(think_time(0, hints, None), 500);
    }

    #[test]
    fn base_plus_increment_fallback() {
        let hints = TimeHints::default();
        // 5 minutes over 40 moves + 1s - margin = 7500 + 1000 - 200, clamped
        assert_eq!(think_time(10, hints, Some("5+1")), 5_000);
        // 1 minute: 1500 + 0 - 200 = 1300
        assert_eq!(think_time(10, hints, Some("1+0")), 1_300);
    }

    #[test]
    fn static_defaults_by_phase() {
        let hints = TimeHints::default();
        assert_eq!(think_time(2, hints, None), 1_500);
        assert_eq!(think_time(20, hints, None), 3_000);
        assert_eq!(think_time(50, hints, None), 1_500);
    }
}
