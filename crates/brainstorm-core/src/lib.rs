pub mod config;
pub mod error;
pub mod types;

pub use config::BrainstormConfig;
pub use error::{BrainstormError, Result};
pub use types::*;
