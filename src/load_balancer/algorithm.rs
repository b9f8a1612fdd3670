// src/load_balancer/algorithm.rs
use crate::proxy::Backend;

pub trait LoadBalancer: Send + Sync {
    /// Pick one of `backends` (already filtered to the healthy set) and
    /// return its position in that slice.
    fn select_backend(&self, backends: &[&Backend]) -> Option<usize>;

    fn name(&self) -> &'static str;
}

/// Filter `backends` to the healthy subset, let `balancer` choose, and map
/// the choice back to an index into `backends`.
pub fn select_healthy(balancer: &dyn LoadBalancer, backends: &[Backend]) -> Option<usize> {
    let (positions, healthy): (Vec<usize>, Vec<&Backend>) = backends
        .iter()
        .enumerate()
        .filter(|(_, backend)| backend.is_healthy())
        .unzip();

    if healthy.is_empty() {
        return None;
    }

    balancer
        .select_backend(&healthy)
        .and_then(|chosen| positions.get(chosen).copied())
}
