/// Prometheus instant-query client
///
/// Issues `GET {base}/api/v1/query?query=<expr>` and decodes the vector
/// result. Missing `data`/`result` fields decode to an empty result set;
/// transport failures, non-2xx responses and `status: "error"` bodies are
/// reported as `DashError`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::core::error::DashError;
use crate::utils::QUERY_PATH;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryData {
    #[serde(default, rename = "resultType")]
    pub result_type: Option<String>,
    #[serde(default)]
    pub result: Option<Vec<QueryResult>>,
}

/// One labeled sample of an instant vector
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// `[unix_seconds, "value"]`, kept loose so odd payloads degrade to defaults
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl QueryResult {
    /// Build a result from labels and a textual value
    pub fn new(labels: &[(&str, &str)], value: &str) -> Self {
        Self {
            metric: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            value: Some(serde_json::json!([0, value])),
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metric.get(key).map(String::as_str)
    }

    /// The textual sample value (second element of `value`)
    pub fn raw_value(&self) -> Option<&str> {
        self.value.as_ref()?.as_array()?.get(1)?.as_str()
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.raw_value()?.trim().parse::<f64>().ok()
    }
}

/// Source of instant-query results; the seam between the poller and HTTP
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn query(&self, expr: &str) -> Result<Vec<QueryResult>, DashError>;
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    query_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> Result<Self, DashError> {
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(DashError::InvalidBaseUrl(base_url.to_string()));
        }

        // No request timeout: a slow backend simply delays the next snapshot
        let client = Client::builder()
            .user_agent(concat!("dockmon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DashError::Client)?;

        Ok(Self {
            client,
            query_url: format!("{}{}", base, QUERY_PATH),
        })
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    async fn query(&self, expr: &str) -> Result<Vec<QueryResult>, DashError> {
        tracing::debug!(query = expr, url = %self.query_url, "querying prometheus");

        let response = self
            .client
            .get(&self.query_url)
            .query(&[("query", expr)])
            .send()
            .await
            .map_err(|source| DashError::Http {
                query: expr.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::Status {
                query: expr.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| DashError::Http {
            query: expr.to_string(),
            source,
        })?;

        decode_response(expr, &body)
    }
}

/// Decode an instant-query body into its result list
pub fn decode_response(expr: &str, body: &str) -> Result<Vec<QueryResult>, DashError> {
    let parsed: QueryResponse = serde_json::from_str(body).map_err(|e| DashError::Decode {
        query: expr.to_string(),
        message: e.to_string(),
    })?;

    if parsed.status.as_deref() == Some("error") {
        let message = match (parsed.error_type, parsed.error) {
            (Some(kind), Some(error)) => format!("{}: {}", kind, error),
            (None, Some(error)) => error,
            (Some(kind), None) => kind,
            (None, None) => "unknown error".to_string(),
        };
        return Err(DashError::Backend {
            query: expr.to_string(),
            message,
        });
    }

    Ok(parsed.data.and_then(|d| d.result).unwrap_or_default())
}
