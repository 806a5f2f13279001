//! Hosting API access

pub mod api;
pub mod client;
