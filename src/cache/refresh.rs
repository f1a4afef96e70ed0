//! Early Refresh Module
//!
//! Probabilistic early expiration (XFetch). A read of a still-valid entry may be
//! declared due for recompute before its hard expiry, with a probability that
//! grows as the remaining lifetime shrinks, as the value gets more expensive to
//! recompute, and as the key gets hotter. Recomputes are thereby spread across
//! the tail of the TTL window instead of colliding at the expiry instant.

use rand::Rng;

/// Default variance factor.
pub const DEFAULT_BETA: f64 = 1.0;

// == Early Refresh Policy ==
#[derive(Debug, Clone, Copy)]
pub struct EarlyRefreshPolicy {
    beta: f64,
}

impl Default for EarlyRefreshPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BETA)
    }
}

impl EarlyRefreshPolicy {
    pub fn new(beta: f64) -> Self {
        Self {
            beta: if beta.is_finite() { beta.max(0.0) } else { DEFAULT_BETA },
        }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Draws `U ~ Uniform(0, 1]` and evaluates [`should_refresh_with`].
    ///
    /// [`should_refresh_with`]: EarlyRefreshPolicy::should_refresh_with
    pub fn should_refresh<R: Rng + ?Sized>(
        &self,
        remaining_secs: f64,
        compute_cost_secs: f64,
        access_frequency: f64,
        rng: &mut R,
    ) -> bool {
        if remaining_secs <= 0.0 {
            return true;
        }
        // gen() samples [0, 1); flip it to exclude ln(0)
        let u = 1.0 - rng.gen::<f64>();
        self.should_refresh_with(remaining_secs, compute_cost_secs, access_frequency, u)
    }

    /// Deterministic core of the decision for a given draw `u` in (0, 1].
    ///
    /// `score = beta * ln(u) * cost / remaining`, scaled by `1 + frequency / 10`;
    /// the read is a refresh when the adjusted score drops below -1, i.e. when the
    /// randomly stretched recompute time reaches past the expiry instant.
    pub fn should_refresh_with(
        &self,
        remaining_secs: f64,
        compute_cost_secs: f64,
        access_frequency: f64,
        u: f64,
    ) -> bool {
        if remaining_secs <= 0.0 {
            return true;
        }
        if !(u > 0.0 && u <= 1.0) {
            return false;
        }
        let cost = if compute_cost_secs.is_finite() {
            compute_cost_secs.max(0.0)
        } else {
            0.0
        };
        let frequency = if access_frequency.is_finite() {
            access_frequency.max(0.0)
        } else {
            0.0
        };

        let score = self.beta * u.ln() * cost / remaining_secs;
        let adjusted = score * (1.0 + frequency / 10.0);
        // NaN compares false and never triggers a refresh
        adjusted < -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_expired_is_always_refresh() {
        let policy = EarlyRefreshPolicy::default();
        assert!(policy.should_refresh_with(0.0, 0.0, 0.0, 1.0));
        assert!(policy.should_refresh_with(-5.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn test_zero_cost_never_refreshes() {
        let policy = EarlyRefreshPolicy::default();
        assert!(!policy.should_refresh_with(0.001, 0.0, 100.0, 1e-300));
    }

    #[test]
    fn test_threshold_boundary() {
        let policy = EarlyRefreshPolicy::new(1.0);
        // ln(u) * 2 / 10 < -1  <=>  ln(u) < -5
        assert!(policy.should_refresh_with(10.0, 2.0, 0.0, (-5.1f64).exp()));
        assert!(!policy.should_refresh_with(10.0, 2.0, 0.0, (-4.9f64).exp()));
    }

    #[test]
    fn test_frequency_raises_pressure() {
        let policy = EarlyRefreshPolicy::new(1.0);
        let u = (-4.0f64).exp();
        // ln(u) * 2 / 10 = -0.8: not enough alone, but * (1 + 10/10) = -1.6
        assert!(!policy.should_refresh_with(10.0, 2.0, 0.0, u));
        assert!(policy.should_refresh_with(10.0, 2.0, 10.0, u));
    }

    #[test]
    fn test_less_remaining_time_refreshes_more() {
        let policy = EarlyRefreshPolicy::new(1.0);
        let u = 0.5;
        assert!(!policy.should_refresh_with(100.0, 1.0, 0.0, u));
        assert!(policy.should_refresh_with(0.5, 1.0, 0.0, u));
    }

    #[test]
    fn test_zero_beta_disables() {
        let policy = EarlyRefreshPolicy::new(0.0);
        assert!(!policy.should_refresh_with(0.01, 100.0, 100.0, 1e-9));
        assert!(policy.should_refresh_with(0.0, 100.0, 100.0, 1e-9));
    }

    #[test]
    fn test_invalid_draw_rejected() {
        let policy = EarlyRefreshPolicy::default();
        assert!(!policy.should_refresh_with(10.0, 100.0, 0.0, 0.0));
        assert!(!policy.should_refresh_with(10.0, 100.0, 0.0, f64::NAN));
    }

    #[test]
    fn test_refresh_rate_increases_near_expiry() {
        let policy = EarlyRefreshPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        let count = |remaining: f64, rng: &mut StdRng| {
            (0..2000)
                .filter(|_| policy.should_refresh(remaining, 1.0, 0.0, &mut *rng))
                .count()
        };
        let far = count(10.0, &mut rng);
        let near = count(0.5, &mut rng);

        // P(refresh) = exp(-remaining / cost): ~0.00005 far, ~0.61 near
        assert!(far < 20, "far from expiry refreshed {} times", far);
        assert!(near > 1000, "near expiry refreshed only {} times", near);
    }
}
