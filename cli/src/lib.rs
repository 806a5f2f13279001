//! siteship library
//!
//! Deploys a locally built static site to the hosting API.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod storage;
pub mod telemetry;
pub mod ui;
pub mod utils;
pub mod workers;
