/// Public XRPC client over reqwest
use crate::{
    api::{Params, PostOutput, Xrpc},
    config::NetworkConfig,
    error::{ApiError, ClientError, ClientResult},
};
use async_trait::async_trait;
use reqwest::{header, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

/// XRPC client bound to one base host
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `https://public.api.bsky.app`)
    pub fn new(base_url: &str, config: &NetworkConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http(base_url, http))
    }

    /// Use a preconfigured reqwest client
    pub fn with_http(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.base_url, method)
    }

    /// GET with an optional bearer token
    pub async fn get_with_auth(
        &self,
        method: &str,
        params: &Params,
        bearer: Option<&str>,
    ) -> ClientResult<Option<Value>> {
        let mut url = self.method_url(method);
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.to_query_string());
        }

        debug!("XRPC GET {}", method);

        let response = authorize(self.http.get(&url), bearer).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::new(status.as_u16(), parse_lenient(&text)).into());
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&text)?))
    }

    /// POST with an optional bearer token
    pub async fn post_with_auth(
        &self,
        method: &str,
        data: Option<&Value>,
        bearer: Option<&str>,
    ) -> ClientResult<PostOutput> {
        debug!("XRPC POST {}", method);

        let mut request = authorize(self.http.post(self.method_url(method)), bearer);
        if let Some(data) = data {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(data)?);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(ApiError::new(status.as_u16(), parse_lenient(&text)).into());
        }

        if declares_json(&response) {
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(PostOutput::Json(Value::Null));
            }
            return Ok(PostOutput::Json(serde_json::from_str(&text)?));
        }

        Ok(PostOutput::Raw(response))
    }
}

#[async_trait]
impl Xrpc for ApiClient {
    async fn get(&self, method: &str, params: &Params) -> ClientResult<Option<Value>> {
        self.get_with_auth(method, params, None).await
    }

    async fn post(&self, method: &str, data: Option<&Value>) -> ClientResult<PostOutput> {
        self.post_with_auth(method, data, None).await
    }
}

fn authorize(request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Error bodies are kept for diagnostics when they parse, dropped otherwise
fn parse_lenient(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

fn declares_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false)
}
