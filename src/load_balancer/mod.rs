// src/load_balancer/mod.rs
mod algorithm;
mod least_connections;
mod round_robin;
mod weighted_random;

pub use algorithm::{select_healthy, LoadBalancer}; // trait
pub use least_connections::LeastConnectionsBalancer;
pub use round_robin::RoundRobinBalancer;
pub use weighted_random::WeightedRandomBalancer;
pub use crate::config::LoadBalancerAlgorithm; // enum exposed if needed

pub fn create_load_balancer(algorithm: LoadBalancerAlgorithm) -> Box<dyn LoadBalancer> {
    match algorithm {
        LoadBalancerAlgorithm::RoundRobin => Box::new(RoundRobinBalancer::new()),
        LoadBalancerAlgorithm::LeastConnections => Box::new(LeastConnectionsBalancer::new()),
        LoadBalancerAlgorithm::WeightedRandom => Box::new(WeightedRandomBalancer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_configured_algorithm() {
        let cases = [
            (LoadBalancerAlgorithm::RoundRobin, "round_robin"),
            (LoadBalancerAlgorithm::LeastConnections, "least_connections"),
            (LoadBalancerAlgorithm::WeightedRandom, "weighted_random"),
        ];
        for (algorithm, name) in cases {
            assert_eq!(create_load_balancer(algorithm).name(), name);
        }
    }
}
