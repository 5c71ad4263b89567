use std::{
    future::Future,
    pin::Pin,
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::header::HeaderValue;
use reqwest::{Client as ReqwestClient, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sonic_rs::{from_slice, to_vec};

pub type RestBytes = Bytes;
pub type RestFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
pub type RestResult<T> = Result<T, RestError>;

/// Request state reported by transports that track it (the mock does).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestTransportState {
    Idle,
    Busy,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestErrorKind {
    Connect,
    Send,
    Receive,
    Timeout,
    Parse,
    Internal,
}

/// Failure of a single call. HTTP status codes never produce one of these on
/// their own; `status` is set when a response arrived but its body was unusable,
/// or when the transport reported one alongside a failure.
#[derive(Clone, Debug, thiserror::Error)]
#[error("rest error {kind:?} status={status:?} retryable={retryable} {message}")]
pub struct RestError {
    pub kind: RestErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub retryable: bool,
}

impl RestError {
    pub fn new(
        kind: RestErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retryable,
        }
    }

    pub fn connect(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Connect, None, message, retryable)
    }

    pub fn send(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Send, None, message, retryable)
    }

    pub fn receive(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Receive, None, message, retryable)
    }

    pub fn timeout(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Timeout, None, message, retryable)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RestErrorKind::Internal, None, message, false)
    }

    pub fn from_json(err: sonic_rs::Error) -> Self {
        Self::new(RestErrorKind::Parse, None, err.to_string(), false)
    }

    fn from_reqwest(fallback: RestErrorKind, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            RestErrorKind::Timeout
        } else if err.is_connect() {
            RestErrorKind::Connect
        } else {
            fallback
        };
        let status = err.status().map(|s| s.as_u16());
        let retryable = err.is_timeout() || err.is_connect() || err.is_request();
        Self::new(kind, status, err.to_string(), retryable)
    }

    pub fn kind(&self) -> RestErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Clone, Debug)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, RestBytes)>,
    pub body: Option<RestBytes>,
    pub timeout: Option<Duration>,
}

impl RestRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<RestBytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_bearer_auth(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    pub fn with_body(mut self, body: impl Into<RestBytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the body to the JSON serialization of `payload`.
    pub fn with_json<T: Serialize>(self, payload: &T) -> RestResult<Self> {
        let body = to_vec(payload).map_err(RestError::from_json)?;
        Ok(self.with_body(body))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// First header value whose name matches `key`, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct RestResponse {
    pub status: u16,
    pub body: RestBytes,
    pub elapsed: Duration,
}

impl RestResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parses the body; a parse failure keeps the response status.
    pub fn json<T: DeserializeOwned>(&self) -> RestResult<T> {
        from_slice(&self.body).map_err(|err| RestError::from_json(err).with_status(self.status))
    }
}

pub trait RestTransport: Send + Sync {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>>;
}

pub type SharedRestTransport = dyn RestTransport + Send + Sync;

#[derive(Clone)]
pub struct Client {
    transport: std::sync::Arc<SharedRestTransport>,
}

impl Client {
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    pub fn with_transport<T>(transport: T) -> Self
    where
        T: RestTransport + 'static,
    {
        Self {
            transport: std::sync::Arc::new(transport),
        }
    }

    pub async fn execute(&self, request: RestRequest) -> RestResult<RestResponse> {
        self.transport.execute(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: ReqwestClient::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for ReqwestTransport {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let client = self.client.clone();
        Box::pin(async move {
            let start = Instant::now();
            let mut req = client.request(request.method.clone(), &request.url);

            for (key, value) in request.headers {
                let value = HeaderValue::from_bytes(value.as_ref())
                    .map_err(|err| RestError::internal(err.to_string()))?;
                req = req.header(key, value);
            }

            if let Some(body) = request.body {
                req = req.body(body);
            }

            if let Some(timeout) = request.timeout {
                req = req.timeout(timeout);
            }

            let resp = req
                .send()
                .await
                .map_err(|err| RestError::from_reqwest(RestErrorKind::Send, err))?;

            let status = resp.status().as_u16();
            let body = resp
                .bytes()
                .await
                .map_err(|err| RestError::from_reqwest(RestErrorKind::Receive, err))?;
            let elapsed = start.elapsed();

            Ok(RestResponse {
                status,
                body,
                elapsed,
            })
        })
    }
}
