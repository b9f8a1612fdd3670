// src/load_balancer/least_connections.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::Backend;

/// Picks the backend with the fewest in-flight requests. Ties go to the
/// earliest backend in configuration order.
#[derive(Debug, Default)]
pub struct LeastConnectionsBalancer;

impl LeastConnectionsBalancer {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnectionsBalancer {
    fn select_backend(&self, backends: &[&Backend]) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;

        for (idx, backend) in backends.iter().enumerate() {
            let conns = backend.active_connections();
            match best {
                Some((_, min)) if conns >= min => {}
                _ => best = Some((idx, conns)),
            }
        }

        best.map(|(idx, _)| idx)
    }

    fn name(&self) -> &'static str {
        "least_connections"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::load_balancer::select_healthy;
    use crate::health::HealthStatus;

    fn backends(count: usize) -> Vec<Backend> {
        (0..count)
            .map(|i| Backend::new(&BackendConfig::new(format!("b{i}"), "localhost", 3000 + i as u16)))
            .collect()
    }

    #[test]
    fn test_selects_least_loaded() {
        let balancer = LeastConnectionsBalancer::new();
        let mut pool = backends(3);

        pool[0].acquire();
        pool[0].acquire();
        pool[1].acquire();

        assert_eq!(select_healthy(&balancer, &pool), Some(2));
    }

    #[test]
    fn test_ties_go_to_first_backend() {
        let balancer = LeastConnectionsBalancer::new();
        let mut pool = backends(3);
        pool[0].acquire();

        assert_eq!(select_healthy(&balancer, &pool), Some(1));
    }

    #[test]
    fn test_ignores_unhealthy_idle_backend() {
        let balancer = LeastConnectionsBalancer::new();
        let mut pool = backends(2);
        pool[0].set_health(HealthStatus::Unhealthy);
        pool[1].acquire();

        assert_eq!(select_healthy(&balancer, &pool), Some(1));
    }

    #[test]
    fn test_choice_never_exceeds_other_loads() {
        let balancer = LeastConnectionsBalancer::new();
        let mut pool = backends(4);

        for _ in 0..40 {
            let chosen = select_healthy(&balancer, &pool).unwrap();
            let load = pool[chosen].active_connections();
            assert!(pool.iter().all(|b| load <= b.active_connections()));
            pool[chosen].acquire();
        }
        assert!(pool.iter().all(|b| b.active_connections() == 10));
    }
}
