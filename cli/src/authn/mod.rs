//! Authentication

pub mod api_key;
pub mod session;
