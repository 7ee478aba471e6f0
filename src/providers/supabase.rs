use crate::core::config::SupabaseConfig;
use crate::core::record::LoanRecord;
use crate::core::store::LoanStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, instrument};

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Loan store backed by a Supabase table, accessed through its REST API.
pub struct SupabaseStore {
    base_url: String,
    table: String,
    api_key: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("flashvault/0.1")
            .build()?;
        Ok(SupabaseStore {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            table: config.table.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Extracts the message to show for a failed response: the PostgREST
    /// `message` field, the raw body, or the status line.
    async fn failure_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<PostgrestError>(&body) {
            Ok(PostgrestError {
                message: Some(message),
                code,
                details,
                hint,
            }) => {
                debug!(?code, ?details, ?hint, "PostgREST error details");
                message
            }
            _ if !body.trim().is_empty() => body,
            _ => format!("HTTP error: {status}"),
        }
    }
}

#[async_trait]
impl LoanStore for SupabaseStore {
    #[instrument(name = "SupabaseInsert", skip(self, record), fields(table = %self.table))]
    async fn insert(&self, record: &LoanRecord) -> Result<()> {
        let url = self.table_url();
        debug!("Inserting loan record at {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = Self::failure_message(response).await;
            error!(%status, %message, "Insert rejected");
            return Err(anyhow!(message));
        }

        debug!(status = %response.status(), "Insert acknowledged");
        Ok(())
    }

    #[instrument(name = "SupabaseQuery", skip(self), fields(table = %self.table))]
    async fn query_all_desc(&self) -> Result<Vec<LoanRecord>> {
        let url = format!("{}?select=*&order=time.desc", self.table_url());
        debug!("Requesting loan log from {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = Self::failure_message(response).await;
            error!(%status, %message, "Query rejected");
            return Err(anyhow!(message));
        }

        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;

        let records: Vec<LoanRecord> = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse loan log response"
                );
                return Err(e).context("Failed to parse loan log response");
            }
        };

        debug!(count = records.len(), "Received loan log");
        Ok(records)
    }
}
