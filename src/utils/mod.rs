pub mod config;
pub mod error;
pub mod time;

pub use config::*;
pub use error::*;
