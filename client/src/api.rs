//! HTTP calls against a ratekeeper server.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::CONTENT_TYPE;

/// Status and raw body of a server answer.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Response status: {}", self.status)?;
        write!(f, "Response body: {}", self.body)
    }
}

/// Thin client for the ratekeeper HTTP API.
#[derive(Clone)]
pub struct RatesClient {
    http: reqwest::Client,
    base_url: String,
}

impl RatesClient {
    /// Create a client for a server base URL such as `http://localhost:8080`.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /rates/update_requests/{id}`
    pub async fn get_by_id(&self, id: u64) -> anyhow::Result<ApiResponse> {
        let url = format!("{}/rates/update_requests/{id}", self.base_url);
        self.send(self.http.get(url)).await
    }

    /// `GET /rates?currency_pair=...`
    pub async fn get_by_pair(&self, pair: &str) -> anyhow::Result<ApiResponse> {
        let url = format!("{}/rates", self.base_url);
        self.send(self.http.get(url).query(&[("currency_pair", pair)]))
            .await
    }

    /// `POST /rates/update_requests` with a raw JSON body.
    pub async fn post_update(&self, json_body: &str) -> anyhow::Result<ApiResponse> {
        let url = format!("{}/rates/update_requests", self.base_url);
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(json_body.to_string());
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<ApiResponse> {
        let response = request.send().await.context("request failed")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("reading response body")?;
        Ok(ApiResponse { status, body })
    }
}
