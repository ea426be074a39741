//! HTTP client for the order/product data service.

use clerk_config::DataServiceConfig;
use clerk_core::error::ToolError;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Thin JSON-over-GET client shared by the data tools.
pub struct DataClient {
    client: reqwest::Client,
    orders_endpoint: String,
    products_endpoint: String,
    max_results: usize,
}

impl DataClient {
    pub fn new(config: &DataServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            orders_endpoint: config.orders_endpoint.clone(),
            products_endpoint: config.products_endpoint.clone(),
            max_results: config.max_results,
        }
    }

    /// Orders endpoint with extra path segments appended (each one escaped).
    pub fn orders_url(&self, tool_name: &str, segments: &[&str]) -> Result<Url, ToolError> {
        join_segments(tool_name, &self.orders_endpoint, segments)
    }

    pub fn products_url(&self, tool_name: &str, segments: &[&str]) -> Result<Url, ToolError> {
        join_segments(tool_name, &self.products_endpoint, segments)
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies all
    /// surface as `ExecutionFailed`.
    pub async fn get_json(
        &self,
        tool_name: &str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        debug!(tool = tool_name, url = %url, "Querying data service");

        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("data service returned {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| failed(format!("invalid JSON from data service: {e}")))
    }

    /// Keep at most `max_results` rows of an array result; anything else is
    /// returned unchanged.
    pub fn truncate(&self, value: Value) -> Value {
        match value {
            Value::Array(mut rows) => {
                rows.truncate(self.max_results);
                Value::Array(rows)
            }
            other => other,
        }
    }
}

fn join_segments(tool_name: &str, base: &str, segments: &[&str]) -> Result<Url, ToolError> {
    let invalid = |reason: String| ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(format!("bad endpoint '{base}': {e}")))?;
    if !segments.is_empty() {
        url.path_segments_mut()
            .map_err(|_| invalid(format!("endpoint '{base}' cannot take a path")))?
            .pop_if_empty()
            .extend(segments);
    }
    Ok(url)
}
