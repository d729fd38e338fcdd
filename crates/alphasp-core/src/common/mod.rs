pub mod config;
pub mod constants;

pub use config::{ConfigError, RecombinationConfig, load_recombination_config};
