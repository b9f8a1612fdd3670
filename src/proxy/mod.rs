// src/proxy/mod.rs
mod backend;
mod pool;
#[allow(clippy::module_inception)]
mod proxy;

pub use backend::Backend;
pub use pool::{BackendLease, BackendPool, ProbeTarget};
pub use proxy::{Proxy, ProxyError, BACKEND_HEADER, RESPONSE_TIME_HEADER};
