use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Load(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
