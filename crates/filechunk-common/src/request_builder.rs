use crate::error::CommonRequestError;
use bytes::Bytes;
use reqwest::{
    RequestBuilder as ReqwestRequestBuilder, StatusCode,
    header::{HeaderName, HeaderValue},
};
use std::collections::HashMap;

/// Authentication method for upload requests
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Session token carried in a dedicated header (e.g., X-File-Token: <token>)
    Header { header_name: String, token: String },
}

/// A POST target together with its request specific headers
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra_headers: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.extra_headers.unwrap_or_default();
        headers.insert(key.into(), value.into());
        self.extra_headers = Some(headers);
        self
    }
}

/// Configuration for request building
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub auth: Option<AuthMethod>,
    pub default_headers: HashMap<String, String>,
    pub user_agent: Option<String>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Status and body of a completed exchange, before any interpretation
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Builds and sends POST requests with the configured headers
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: reqwest::Client,
    config: RequestConfig,
}

impl RequestBuilder {
    pub fn new(client: reqwest::Client, config: RequestConfig) -> Self {
        Self { client, config }
    }

    /// Build a reqwest POST request for the given endpoint.
    ///
    /// Every header is validated here so a bad token or file field fails before
    /// anything is sent.
    pub fn build_request(
        &self,
        endpoint: &Endpoint,
    ) -> Result<ReqwestRequestBuilder, CommonRequestError> {
        let mut req = self.client.post(&endpoint.url);

        if let Some(AuthMethod::Header {
            ref header_name,
            ref token,
        }) = self.config.auth
        {
            req = req.header(header_name_of(header_name)?, header_value(header_name, token)?);
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(header_name_of(key)?, header_value(key, value)?);
        }

        if let Some(ref headers) = endpoint.extra_headers {
            for (key, value) in headers {
                req = req.header(header_name_of(key)?, header_value(key, value)?);
            }
        }

        if let Some(ref user_agent) = self.config.user_agent {
            req = req.header("user-agent", header_value("user-agent", user_agent)?);
        }

        Ok(req)
    }

    /// POST a raw byte body and collect the full response.
    pub async fn send_bytes(
        &self,
        endpoint: &Endpoint,
        body: Bytes,
    ) -> Result<RawResponse, CommonRequestError> {
        let req = self.build_request(endpoint)?;
        tracing::trace!(url = %endpoint.url, bytes = body.len(), "sending request body");
        let res = req.body(body).send().await?;
        Self::collect(res).await
    }

    /// POST without a body and collect the full response.
    pub async fn send_empty(&self, endpoint: &Endpoint) -> Result<RawResponse, CommonRequestError> {
        let req = self.build_request(endpoint)?;
        tracing::trace!(url = %endpoint.url, "sending empty request");
        let res = req.send().await?;
        Self::collect(res).await
    }

    async fn collect(res: reqwest::Response) -> Result<RawResponse, CommonRequestError> {
        let status = res.status();
        let body = res.bytes().await?;
        tracing::trace!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(RawResponse { status, body })
    }
}

fn header_name_of(name: &str) -> Result<HeaderName, CommonRequestError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| CommonRequestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, CommonRequestError> {
    HeaderValue::from_str(value).map_err(|e| CommonRequestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
