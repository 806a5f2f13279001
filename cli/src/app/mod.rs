//! Process boundary: command line, production effects, dispatch

pub mod effects;
pub mod options;
pub mod run;
