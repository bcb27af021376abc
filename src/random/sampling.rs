//! Discrete draws used by the cohort and genetics code. All functions take the generator
//! explicitly and are generic over it.

use rand_distr::{Binomial, Distribution, Gamma, Poisson};

use crate::rand::Rng;

/// `1 - e^x`. With `x = -rate * dt` this is the probability that an exponentially distributed
/// event happens within `dt`.
#[must_use]
pub fn expcdf(x: f64) -> f64 {
    1.0 - x.exp()
}

/// Number of successes in `n` trials with success probability `p`. `p` is clamped to `[0, 1]`.
pub fn binomial<R: Rng + ?Sized>(rng: &mut R, n: u32, p: f64) -> u32 {
    if n == 0 || !(p > 0.0) {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    let distribution = Binomial::new(u64::from(n), p)
        .unwrap_or_else(|e| panic!("internal error: binomial({n}, {p}): {e}"));
    // The result is bounded by `n`.
    distribution.sample(rng) as u32
}

/// Splits `n` items into `fractions.len()` bins with a sequence of conditional binomial draws.
///
/// The counts always sum to `n`: the last bin receives whatever is left. Fractions do not need
/// to be normalized; they are treated as relative weights.
pub fn multinomial<R: Rng + ?Sized>(rng: &mut R, n: u32, fractions: &[f64]) -> Vec<u32> {
    let mut counts = vec![0u32; fractions.len()];
    if fractions.is_empty() {
        return counts;
    }

    let mut remaining_items = n;
    let mut remaining_weight: f64 = fractions.iter().sum();
    let last = fractions.len() - 1;
    for (i, fraction) in fractions.iter().enumerate() {
        if i == last || remaining_items == 0 {
            counts[i] = remaining_items;
            remaining_items = 0;
            continue;
        }
        let p = if remaining_weight > 0.0 {
            fraction / remaining_weight
        } else {
            0.0
        };
        let drawn = binomial(rng, remaining_items, p);
        counts[i] = drawn;
        remaining_items -= drawn;
        remaining_weight -= fraction;
    }
    counts
}

/// Gamma distributed value with shape `k` and scale `theta`.
pub fn gamma<R: Rng + ?Sized>(rng: &mut R, k: f64, theta: f64) -> f64 {
    let distribution = Gamma::new(k, theta)
        .unwrap_or_else(|e| panic!("internal error: gamma({k}, {theta}): {e}"));
    distribution.sample(rng)
}

/// Number of failures before `successes` successes, where each trial succeeds with probability
/// `p`. Drawn as a Gamma-Poisson mixture so that `successes` may be non-integral.
pub fn negative_binomial<R: Rng + ?Sized>(rng: &mut R, successes: f64, p: f64) -> u32 {
    if !(p < 1.0) {
        return 0;
    }
    let lambda = gamma(rng, successes, (1.0 - p) / p);
    if !(lambda > 0.0) {
        return 0;
    }
    let poisson = Poisson::new(lambda)
        .unwrap_or_else(|e| panic!("internal error: poisson({lambda}): {e}"));
    let draw: f64 = poisson.sample(rng);
    draw.min(f64::from(u32::MAX)) as u32
}

/// Sample a random element uniformly from a container of known length.
///
/// We do not assume the container is randomly indexable, only that it can be iterated over.
pub fn sample_single_from_known_length<I, R, T>(rng: &mut R, mut iter: I) -> Option<T>
where
    R: Rng,
    I: Iterator<Item = T> + ExactSizeIterator<Item = T>,
{
    let len = iter.len();
    if len == 0 {
        return None;
    }
    // This little trick with `u32` makes this function 30% faster.
    let index = rng.random_range(0..len as u32) as usize;
    iter.nth(index)
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn binomial_edge_cases() {
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(binomial(&mut rng, 0, 0.5), 0);
        assert_eq!(binomial(&mut rng, 100, 0.0), 0);
        assert_eq!(binomial(&mut rng, 100, -1.0), 0);
        assert_eq!(binomial(&mut rng, 100, 1.0), 100);
        assert_eq!(binomial(&mut rng, 100, 2.0), 100);
        assert_eq!(binomial(&mut rng, 100, f64::NAN), 0);
        assert!(binomial(&mut rng, 100, 0.5) <= 100);
    }

    #[test]
    fn binomial_mean() {
        let mut rng = SmallRng::seed_from_u64(7);
        let trials = 2000;
        let total: u64 = (0..trials)
            .map(|_| u64::from(binomial(&mut rng, 100, 0.3)))
            .sum();
        let mean = total as f64 / f64::from(trials);
        assert!((mean - 30.0).abs() < 1.0, "mean was {mean}");
    }

    #[test]
    fn multinomial_conserves_total() {
        let mut rng = SmallRng::seed_from_u64(42);
        for n in [0u32, 1, 3, 4, 17, 100, 10_000] {
            let counts = multinomial(&mut rng, n, &[0.25, 0.25, 0.25, 0.25]);
            assert_eq!(counts.len(), 4);
            assert_eq!(counts.iter().sum::<u32>(), n);
        }
    }

    #[test]
    fn multinomial_respects_zero_weights() {
        let mut rng = SmallRng::seed_from_u64(42);
        let counts = multinomial(&mut rng, 50, &[0.0, 1.0, 0.0]);
        assert_eq!(counts, vec![0, 50, 0]);
        assert!(multinomial(&mut rng, 50, &[]).is_empty());
    }

    #[test]
    fn multinomial_is_roughly_even() {
        let mut rng = SmallRng::seed_from_u64(1);
        let counts = multinomial(&mut rng, 40_000, &[0.25, 0.25, 0.25, 0.25]);
        for count in counts {
            assert!((f64::from(count) - 10_000.0).abs() < 500.0, "count was {count}");
        }
    }

    #[test]
    fn negative_binomial_mean() {
        // Failures before 12 successes with p = 0.5 has mean 12.
        let mut rng = SmallRng::seed_from_u64(3);
        let trials = 5000;
        let total: u64 = (0..trials)
            .map(|_| u64::from(negative_binomial(&mut rng, 12.0, 0.5)))
            .sum();
        let mean = total as f64 / f64::from(trials);
        assert!((mean - 12.0).abs() < 0.5, "mean was {mean}");
        assert_eq!(negative_binomial(&mut rng, 12.0, 1.0), 0);
    }

    #[test]
    fn gamma_mean() {
        let mut rng = SmallRng::seed_from_u64(11);
        let trials = 5000;
        let total: f64 = (0..trials).map(|_| gamma(&mut rng, 2.0, 0.38)).sum();
        let mean = total / f64::from(trials);
        assert!((mean - 0.76).abs() < 0.05, "mean was {mean}");
    }

    #[test]
    fn expcdf_values() {
        assert_eq!(expcdf(0.0), 0.0);
        assert!((expcdf(-1.0) - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn single_from_known_length() {
        let mut rng = SmallRng::seed_from_u64(42);
        let data = [1, 2, 3];
        let picked = sample_single_from_known_length(&mut rng, data.iter()).unwrap();
        assert!(data.contains(picked));
        let empty: [u32; 0] = [];
        assert!(sample_single_from_known_length(&mut rng, empty.iter()).is_none());
    }
}
