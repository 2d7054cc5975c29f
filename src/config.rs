use crate::error::{RefundError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Identifies the spreadsheet and the credential used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_SHEETS_BASE_URL.to_string()
}

impl SheetsConfig {
    /// Builds a config from explicit values, rejecting blanks.
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let config = Self {
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
            base_url: default_base_url(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads `SPREADSHEET_ID`, `GOOGLE_ACCESS_TOKEN` and the optional
    /// `SHEETS_BASE_URL` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| RefundError::MissingConfig(format!("{} is not set", key)))
        };

        let config = Self {
            spreadsheet_id: required("SPREADSHEET_ID")?,
            access_token: required("GOOGLE_ACCESS_TOKEN")?,
            base_url: lookup("SHEETS_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(default_base_url),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(RefundError::MissingConfig(
                "spreadsheet ID is empty".to_string(),
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(RefundError::MissingConfig("access token is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationOptions {
    /// Reject duplicate join keys at load time instead of warning.
    #[serde(default)]
    pub strict_keys: bool,
}

impl CalculationOptions {
    pub fn strict() -> Self {
        Self { strict_keys: true }
    }
}
