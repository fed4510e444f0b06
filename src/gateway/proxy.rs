//! Forwarding client for the authority.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::config::GatewayConfig;
use crate::web::error::ApiError;
use crate::{FileShareError, Result};

/// Headers copied from the authority's response.
const RELAYED_HEADERS: [header::HeaderName; 2] = [header::CONTENT_TYPE, header::CONTENT_DISPOSITION];

/// Body of a forwarded request.
#[derive(Debug, Clone)]
pub enum Outbound {
    Empty,
    /// Already-validated JSON bytes.
    Json(Bytes),
    /// A single upload, sent as multipart field `file`.
    File { filename: String, data: Bytes },
}

/// One request to the authority.
#[derive(Debug, Clone)]
pub struct Forward {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub token: Option<String>,
    pub body: Outbound,
}

impl Forward {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            token: None,
            body: Outbound::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn json(mut self, body: Bytes) -> Self {
        self.body = Outbound::Json(body);
        self
    }

    pub fn file(mut self, filename: String, data: Bytes) -> Self {
        self.body = Outbound::File { filename, data };
        self
    }
}

/// HTTP client bound to the authority's base URL.
#[derive(Clone)]
pub struct AuthorityClient {
    client: Client,
    base_url: String,
}

impl AuthorityClient {
    /// Create a client. Every call is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| FileShareError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::new(
            &config.authority_url,
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `forward` and return the authority's answer.
    pub async fn send(&self, forward: Forward) -> Result<Upstream> {
        let url = format!("{}{}", self.base_url, forward.path);
        let mut request = self.client.request(forward.method, url);

        if !forward.query.is_empty() {
            request = request.query(&forward.query);
        }
        if let Some(token) = &forward.token {
            request = request.bearer_auth(token);
        }
        request = match forward.body {
            Outbound::Empty => request,
            Outbound::Json(bytes) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(bytes),
            Outbound::File { filename, data } => {
                let content_type = mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string();
                let length = data.len() as u64;
                let part = Part::stream_with_length(data, length)
                    .file_name(filename)
                    .mime_str(&content_type)
                    .map_err(|e| FileShareError::Upstream(e.to_string()))?;
                request.multipart(Form::new().part("file", part))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| FileShareError::Upstream(e.to_string()))?;

        let status = response.status();
        let mut headers = HeaderMap::new();
        for name in RELAYED_HEADERS {
            if let Some(value) = response.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| FileShareError::Upstream(e.to_string()))?;

        Ok(Upstream {
            status,
            headers,
            body,
        })
    }

    /// Send `forward` and turn the outcome into the client's response.
    ///
    /// Any transport failure answers the uniform internal error.
    pub async fn relay(&self, forward: Forward) -> Response {
        let path = forward.path.clone();
        match self.send(forward).await {
            Ok(upstream) => upstream.into_response(),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Authority unreachable");
                ApiError::internal().into_response()
            }
        }
    }
}

/// A response received from the authority.
#[derive(Debug)]
pub struct Upstream {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for Upstream {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        if !response.headers().contains_key(header::CONTENT_TYPE) {
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
        }
        response
    }
}
