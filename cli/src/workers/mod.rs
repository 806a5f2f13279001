//! Async building blocks: bounded polling, bounded parallelism, rate limiting

pub mod poller;
pub mod rate_limiter;
pub mod runner;
