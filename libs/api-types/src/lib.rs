//! Siteship API wire models
//!
//! Request and response bodies exchanged with the hosting API. These types
//! carry no behavior beyond (de)serialization and a few field helpers.

pub mod models;

pub use models::*;
