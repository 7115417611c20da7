use rand::rngs::SmallRng;
use rand_distr::Distribution;
use rand_distr::Gamma;

/// mix Dirichlet(alpha) noise into the prior over `support` with weight
/// `epsilon`. the Dirichlet draw is built from per-cell Gamma(alpha, 1)
/// samples normalized to one, so the mixed vector stays a distribution.
pub fn dirichlet_mix(
    policy: &mut [f32],
    support: &[usize],
    alpha: f32,
    epsilon: f32,
    rng: &mut SmallRng,
) {
    if support.len() < 2 {
        return;
    }
    let gamma = Gamma::new(alpha, 1.0).expect("positive alpha");
    let draws = support
        .iter()
        .map(|_| gamma.sample(rng).max(f32::MIN_POSITIVE))
        .collect::<Vec<f32>>();
    let total = draws.iter().sum::<f32>();
    for (&cell, draw) in support.iter().zip(draws.iter()) {
        policy[cell] = (1.0 - epsilon) * policy[cell] + epsilon * draw / total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn mixing_preserves_normalization() {
        let mut rng = SmallRng::seed_from_u64(9);
        let support = (0..10).collect::<Vec<_>>();
        let mut policy = vec![0.1; 10];
        dirichlet_mix(&mut policy, &support, 0.12, 0.25, &mut rng);
        let sum = policy.iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(policy.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn same_seed_same_noise() {
        let support = (0..8).collect::<Vec<_>>();
        let mut a = vec![0.125; 8];
        let mut b = vec![0.125; 8];
        dirichlet_mix(&mut a, &support, 0.12, 0.25, &mut SmallRng::seed_from_u64(5));
        dirichlet_mix(&mut b, &support, 0.12, 0.25, &mut SmallRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn singleton_support_untouched() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut policy = vec![1.0];
        dirichlet_mix(&mut policy, &[0], 0.12, 0.25, &mut rng);
        assert!(policy[0] == 1.0);
    }
}
