// src/load_balancer/weighted_random.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::Backend;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Backs the `weighted-round-robin` setting.
///
/// Each pick draws uniformly from `[0, total_weight)` and walks the weights
/// until the draw is used up, so long-run shares converge to
/// `weight / total_weight` without any short-run ordering.
pub struct WeightedRandomBalancer {
    rng: Mutex<StdRng>,
}

impl WeightedRandomBalancer {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence, for reproducible distributions.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for WeightedRandomBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for WeightedRandomBalancer {
    fn select_backend(&self, backends: &[&Backend]) -> Option<usize> {
        let total: u64 = backends.iter().map(|b| u64::from(b.weight)).sum();
        if total == 0 {
            return None;
        }

        let mut draw = self.rng.lock().gen_range(0..total);
        for (idx, backend) in backends.iter().enumerate() {
            let weight = u64::from(backend.weight);
            if draw < weight {
                return Some(idx);
            }
            draw -= weight;
        }

        // Unreachable while draw < total.
        None
    }

    fn name(&self) -> &'static str {
        "weighted_random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::health::HealthStatus;
    use crate::load_balancer::select_healthy;

    fn weighted(weights: &[u32]) -> Vec<Backend> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                Backend::new(
                    &BackendConfig::new(format!("b{i}"), "localhost", 3000 + i as u16).with_weight(*w),
                )
            })
            .collect()
    }

    #[test]
    fn test_distribution_follows_weights() {
        let balancer = WeightedRandomBalancer::with_seed(42);
        let pool = weighted(&[1, 3]);
        let trials = 4_000;

        let mut counts = [0usize; 2];
        for _ in 0..trials {
            counts[select_healthy(&balancer, &pool).unwrap()] += 1;
        }

        let light = counts[0] as f64 / trials as f64;
        let heavy = counts[1] as f64 / trials as f64;
        assert!((light - 0.25).abs() <= 0.05, "light share {light}");
        assert!((heavy - 0.75).abs() <= 0.05, "heavy share {heavy}");
    }

    #[test]
    fn test_only_healthy_backends_are_drawn() {
        let balancer = WeightedRandomBalancer::with_seed(7);
        let mut pool = weighted(&[10, 1]);
        pool[0].set_health(HealthStatus::Unhealthy);

        for _ in 0..100 {
            assert_eq!(select_healthy(&balancer, &pool), Some(1));
        }
    }
}
