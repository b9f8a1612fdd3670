// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::Backend;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Positional rotation over the healthy set.
///
/// The cursor is never rewound when the healthy set grows or shrinks, so a
/// backend flapping in and out of health skews the rotation for a few picks.
#[derive(Debug, Default)]
pub struct RoundRobinBalancer {
    counter: AtomicUsize,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn select_backend(&self, backends: &[&Backend]) -> Option<usize> {
        if backends.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % backends.len();
        Some(index)
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
