use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::params::{Encoding, Parameters};
use crate::error::{Result, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Sink for one human-readable line per outgoing call. Lines never contain
/// the raw bot token.
pub type RequestLogger = Arc<dyn Fn(&str) + Send + Sync>;

/// Mask a secret for logs: first 7 + "***" + last 4 chars, or just "***"
/// when the secret is too short to show any of it.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

/// `errorCode` / `ErrorCode` / `error_code` all become `error_code`.
fn snake_case_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn decode_envelope(body: &[u8]) -> Option<Envelope> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let Value::Object(fields) = value else {
        return None;
    };
    let normalized: Map<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (snake_case_key(&k), v))
        .collect();
    serde_json::from_value(Value::Object(normalized)).ok()
}

/// Turn an HTTP status and raw body into the call's outcome.
///
/// A non-200 status wins over whatever the envelope says; an empty 200 body
/// counts as no data. The status check runs before the envelope decode on
/// purpose, so an unreadable body behind a non-200 status is still reported as
/// `InvalidStatusCode` rather than `DecodeError`.
pub(crate) fn classify<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    let raw = String::from_utf8_lossy(body).into_owned();
    let envelope = decode_envelope(body);

    if status != 200 {
        let (description, error_code) = match envelope {
            Some(env) => (env.description, env.error_code),
            None => (None, None),
        };
        return Err(TransportError::InvalidStatusCode {
            status,
            description,
            error_code,
            body: raw,
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(TransportError::NoDataReceived);
    }

    let envelope = envelope.ok_or_else(|| TransportError::DecodeError { body: raw.clone() })?;
    if !envelope.ok {
        return Err(TransportError::ServerError { body: raw });
    }

    serde_json::from_value(envelope.result.unwrap_or(Value::Null))
        .map_err(|_| TransportError::DecodeError { body: raw })
}

/// Shared Bot API client. Cloning is cheap; all clones share one connection
/// pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    token: Arc<str>,
    logger: RequestLogger,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &mask_token(&self.token))
            .finish()
    }
}

impl ApiClient {
    pub fn new(token: &str, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').into(),
            token: token.into(),
            logger: Arc::new(|line: &str| debug!("{}", line)),
        }
    }

    /// Reuse an existing HTTP client, e.g. one with a longer read timeout.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_logger(mut self, logger: RequestLogger) -> Self {
        self.logger = logger;
        self
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, endpoint)
    }

    fn log_request(&self, endpoint: &str, params: &Parameters) {
        let masked = mask_token(&self.token);
        let url = format!("{}/bot{}/{}", self.base_url, masked, endpoint);
        let mut payload = params.log_payload();
        if !self.token.is_empty() {
            payload = payload.replace(&*self.token, &masked);
        }
        (self.logger)(&format!("{} -> {} [{}]", endpoint, url, payload));
    }

    /// Perform one call and classify the outcome. Never retries.
    pub async fn call<T: DeserializeOwned>(&self, endpoint: &str, params: &Parameters) -> Result<T> {
        self.log_request(endpoint, params);

        let request = self.http.post(self.endpoint_url(endpoint));
        let request = match params.encoding() {
            Encoding::FormUrlEncoded => request.form(&params.form_fields()),
            Encoding::Multipart => request.multipart(params.to_multipart()?),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest(e.without_url().to_string())
            } else {
                warn!("{} request failed: {}", endpoint, e.without_url());
                TransportError::NoDataReceived
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            warn!("{} body read failed: {}", endpoint, e.without_url());
            TransportError::NoDataReceived
        })?;

        classify(status, &body)
    }

    /// Run the call on `context` and hand the outcome to `completion` there.
    /// The calling thread only schedules the work.
    pub fn call_with<T, F>(
        &self,
        endpoint: &str,
        params: Parameters,
        context: &Handle,
        completion: F,
    ) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let client = self.clone();
        let endpoint = endpoint.to_string();
        context.spawn(async move {
            let result = client.call::<T>(&endpoint, &params).await;
            completion(result);
        })
    }
}
