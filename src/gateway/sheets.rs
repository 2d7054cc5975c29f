use super::{SheetGateway, WriteOutcome};
use crate::config::SheetsConfig;
use crate::error::{RefundError, Result};
use crate::schema::CellValue;
use log::{debug, info};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_rows: usize,
}

/// Google Sheets v4 values API client authenticated with a bearer token.
#[derive(Clone)]
pub struct GoogleSheetsGateway {
    client: Client,
    config: SheetsConfig,
}

impl GoogleSheetsGateway {
    pub fn new(config: SheetsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SheetsConfig::from_env()?)
    }

    fn values_url(&self, sheet_name: &str, a1_range: &str) -> Result<Url> {
        let base = format!(
            "{}/spreadsheets/{}/values",
            self.config.base_url.trim_end_matches('/'),
            self.config.spreadsheet_id
        );
        let mut url = Url::parse(&base)
            .map_err(|e| RefundError::MissingConfig(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RefundError::MissingConfig("base URL cannot hold a path".to_string()))?
            .push(&format!("{}!{}", sheet_name, a1_range));
        Ok(url)
    }

    async fn ensure_success(sheet_name: &str, action: &str, res: Response) -> Result<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await?;
        Err(RefundError::gateway(
            sheet_name,
            format!("failed to {} sheet (status {}): {}", action, status, body),
        ))
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetGateway for GoogleSheetsGateway {
    async fn read(&self, sheet_name: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(sheet_name, range)?;
        debug!("Reading {}!{}", sheet_name, range);

        let res = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let res = Self::ensure_success(sheet_name, "read", res).await?;

        let body: ValueRange = res.json().await?;
        let rows: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();

        info!("Read {} rows from {}", rows.len(), sheet_name);
        Ok(rows)
    }

    async fn write(&self, sheet_name: &str, rows: &[Vec<CellValue>]) -> Result<WriteOutcome> {
        let mut clear_url = self.values_url(sheet_name, "A2:Z")?;
        let cleared_path = format!("{}:clear", clear_url.path());
        clear_url.set_path(&cleared_path);

        let res = self
            .client
            .post(clear_url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({}))
            .send()
            .await?;
        Self::ensure_success(sheet_name, "clear", res).await?;

        let mut write_url = self.values_url(sheet_name, "A2")?;
        write_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");

        let res = self
            .client
            .put(write_url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        let res = Self::ensure_success(sheet_name, "write", res).await?;

        let body: UpdateValuesResponse = res.json().await?;
        info!("Wrote {} rows to {}", body.updated_rows, sheet_name);
        Ok(WriteOutcome {
            updated_rows: body.updated_rows,
        })
    }
}
