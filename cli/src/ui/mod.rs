//! Terminal interaction

pub mod output;
pub mod prompt;
