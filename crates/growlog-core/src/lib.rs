pub mod config;
pub mod error;
pub mod types;

pub use config::GrowlogConfig;
pub use error::{GrowlogError, Result};
pub use types::*;
