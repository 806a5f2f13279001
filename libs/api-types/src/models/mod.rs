//! API models

pub mod deploy;
pub mod error;
pub mod github;
pub mod project;
pub mod user;

pub use deploy::*;
pub use error::*;
pub use github::*;
pub use project::*;
pub use user::*;
