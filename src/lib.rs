//! vehcache
//!
//! TTL memoizing caches for rate-limited getters, a reset registry that
//! invalidates every cache at once, and a vehicle telemetry client built on
//! top of them.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod logging;
pub mod poller;
pub mod reset;
pub mod vehicle;
