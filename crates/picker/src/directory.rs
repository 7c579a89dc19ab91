use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use tilly_core::config::DirectoryConfig;
use tilly_core::{Customer, CustomerId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory client could not be built: {0}")]
    Client(String),
    #[error("directory request failed: {0}")]
    Request(String),
    #[error("directory returned status {0}")]
    Status(u16),
    #[error("directory response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<Customer>, DirectoryError>;
}

/// Client for the customer search endpoint.
///
/// Sends `GET <endpoint>?term=<term>` with the `X-Requested-With` header the
/// directory requires before it will answer picker traffic.
pub struct HttpCustomerDirectory {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCustomerDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| DirectoryError::Client(error.to_string()))?;

        Ok(Self { client, endpoint: config.endpoint.clone() })
    }
}

#[async_trait]
impl CustomerDirectory for HttpCustomerDirectory {
    async fn search(&self, term: &str) -> Result<Vec<Customer>, DirectoryError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("term", term)])
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|error| DirectoryError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let payload = response
            .json::<SearchResponse>()
            .await
            .map_err(|error| DirectoryError::Decode(error.to_string()))?;

        debug!(term, results = payload.results.len(), "directory search completed");

        Ok(payload.results.into_iter().map(CustomerRow::into_customer).collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<CustomerRow>,
}

#[derive(Debug, Deserialize)]
struct CustomerRow {
    id: RowId,
    text: String,
    points: u32,
}

/// Directories key rows by JSON numbers or strings; both normalize to text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowId {
    Number(i64),
    Text(String),
}

impl RowId {
    fn into_string(self) -> String {
        match self {
            RowId::Number(value) => value.to_string(),
            RowId::Text(value) => value,
        }
    }
}

impl CustomerRow {
    fn into_customer(self) -> Customer {
        Customer {
            id: CustomerId(self.id.into_string()),
            display_text: self.text,
            loyalty_points: self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use tilly_core::CustomerId;

    use super::{CustomerRow, SearchResponse};

    #[test]
    fn numeric_and_string_ids_both_normalize_to_text() {
        let raw = r#"{
            "results": [
                {"id": 7, "text": "Jane Doe (555-0142)", "points": 120},
                {"id": "c-19", "text": "Sam Patel (555-0000)", "points": 0}
            ]
        }"#;

        let payload: SearchResponse = serde_json::from_str(raw).expect("payload should decode");
        let customers: Vec<_> =
            payload.results.into_iter().map(CustomerRow::into_customer).collect();

        assert_eq!(customers[0].id, CustomerId::from("7"));
        assert_eq!(customers[0].loyalty_points, 120);
        assert_eq!(customers[1].id, CustomerId::from("c-19"));
        assert_eq!(customers[1].display_text, "Sam Patel (555-0000)");
    }

    #[test]
    fn negative_points_fail_to_decode() {
        let raw = r#"{"results": [{"id": 7, "text": "Jane Doe", "points": -5}]}"#;

        assert!(serde_json::from_str::<SearchResponse>(raw).is_err());
    }

    #[test]
    fn rows_without_points_fail_to_decode() {
        let raw = r#"{"results": [{"id": 7, "text": "Jane Doe"}]}"#;

        assert!(serde_json::from_str::<SearchResponse>(raw).is_err());
    }
}
