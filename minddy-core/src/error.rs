use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinddyError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
