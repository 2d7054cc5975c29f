use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefundError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Gateway error on table '{table}': {message}")]
    Gateway { table: String, message: String },

    #[error("Duplicate key {key} in table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("Invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    #[error("No calculated refunds to write; run the calculation first")]
    NoCalculation,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "sheets")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RefundError {
    pub fn gateway(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Gateway {
            table: table.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RefundError>;
