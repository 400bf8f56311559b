//! HTTP transport used by the price sources
//!
//! One request per call: no retries, no caching.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::FetchError;

/// Raw request/response boundary between price sources and the network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseGetter: Send + Sync {
    /// Perform a GET and return the response body
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// POST a GraphQL query and return the response body
    async fn query(
        &self,
        url: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<Vec<u8>, FetchError>;
}

/// GET `url` and decode the JSON body into `T`
pub async fn get_json<T: DeserializeOwned>(
    getter: &dyn ResponseGetter,
    url: &str,
) -> Result<T, FetchError> {
    let body = getter.get(url).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

/// `reqwest` backed implementation of [`ResponseGetter`]
#[derive(Debug, Clone)]
pub struct HttpResponseGetter {
    client: Client,
}

impl HttpResponseGetter {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ResponseGetter for HttpResponseGetter {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn query(
        &self,
        url: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<Vec<u8>, FetchError> {
        let body = GraphQlRequest { query, variables };
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Ticker {
        price: String,
    }

    #[tokio::test]
    async fn get_json_decodes_body() {
        let mut getter = MockResponseGetter::new();
        getter
            .expect_get()
            .times(1)
            .returning(|_| Ok(br#"{"price":"42.5"}"#.to_vec()));

        let ticker: Ticker =
            tokio_test::assert_ok!(get_json(&getter, "http://localhost/ticker").await);
        assert_eq!(ticker.price, "42.5");
    }

    #[tokio::test]
    async fn get_json_reports_malformed_body() {
        let mut getter = MockResponseGetter::new();
        getter
            .expect_get()
            .returning(|_| Ok(b"not json".to_vec()));

        let result: Result<Ticker, _> = get_json(&getter, "http://localhost/ticker").await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn http_getter_builds() {
        assert!(HttpResponseGetter::new(Duration::from_secs(5)).is_ok());
    }
}
