/// Core error types for the SEVY gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No API key configured for provider")]
    NoApiKey,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to connect to store: {0}")]
    Connect(String),

    #[error("Query failed: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
