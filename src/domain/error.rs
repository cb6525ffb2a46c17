//! Domain error types.

/// Top-level error type for alloctrader.
#[derive(Debug, thiserror::Error)]
pub enum AlloctraderError {
    #[error("invalid price {price}: prices must be positive and finite")]
    InvalidPrice { price: f64 },

    #[error("invalid configuration {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("state snapshot error: {reason}")]
    State { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlloctraderError {
    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        AlloctraderError::InvalidConfiguration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&AlloctraderError> for std::process::ExitCode {
    fn from(err: &AlloctraderError) -> Self {
        let code: u8 = match err {
            AlloctraderError::Io(_) => 1,
            AlloctraderError::InvalidConfiguration { .. }
            | AlloctraderError::ConfigParse { .. }
            | AlloctraderError::ConfigMissing { .. } => 2,
            AlloctraderError::Data { .. } | AlloctraderError::State { .. } => 3,
            AlloctraderError::InvalidPrice { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
