//! Deploy orchestration

pub mod deployer;
pub mod effects;
pub mod freshness;
pub mod fsm;
pub mod github;
pub mod manifest;
pub mod options;
pub mod target;
