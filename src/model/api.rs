//! HTTP request wrapper with bounded retry and reply classification
//!
//! Every outbound request goes through [`RetryingHttpClient::request`],
//! which normalizes the outcome into an [`ApiReply`]. A status code of 0 is
//! the sentinel for "no usable reply" and is distinct from any real HTTP
//! status. [`ReplyClassifier`] then maps a reply onto the per-endpoint
//! ok/warn/fatal tables.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::time::sleep;

use crate::display::{Display, ShowOptions};

const RETRY_DELAY: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_WARN_DURATION: Duration = Duration::from_secs(5);

const NO_REPLY_TEXT: &str = "No reply content";

pub const APP_NAME: &str = "Spotify status";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Status code outside the endpoint's ok and warn tables.
    #[error("{call} api error {status} - {text}")]
    Status {
        call: &'static str,
        status: u16,
        text: String,
    },
    /// The one-time authorization listener finished without a code.
    #[error("authorization callback did not return a code")]
    Authorization,
}

/// Normalized reply of one logical request.
#[derive(Clone, Debug)]
pub struct ApiReply {
    /// HTTP status, or 0 when no usable reply was obtained.
    pub status_code: u16,
    /// Decoded JSON body, or an empty object.
    pub json: Value,
    /// Raw body or error text when no JSON was decoded.
    pub text: String,
}

impl ApiReply {
    fn no_reply(text: String) -> Self {
        Self {
            status_code: 0,
            json: Value::Object(Default::default()),
            text,
        }
    }
}

/// The raw body is only worth keeping as text when the decode produced
/// nothing; any non-empty JSON value already carries the content.
fn json_is_empty(json: &Value) -> bool {
    match json {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Performs one logical request with a uniform bounded retry policy.
///
/// The display corner dot is shown for the duration of every request as the
/// api-request indicator.
#[derive(Clone)]
pub struct RetryingHttpClient {
    http: reqwest::Client,
    display: Arc<dyn Display>,
    dot_size: u32,
}

impl RetryingHttpClient {
    pub fn new(display: Arc<dyn Display>, dot_size: u32) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            display,
            dot_size,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, &str)]>,
        headers: &[(&str, String)],
    ) -> ApiReply {
        self.display.show_corner_dot(self.dot_size);
        let reply = self.request_with_retry(method, url, form, headers).await;
        self.display.hide_corner_dot(self.dot_size);
        reply
    }

    async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, &str)]>,
        headers: &[(&str, String)],
    ) -> ApiReply {
        for attempt in 0..=1u32 {
            let may_retry = attempt == 0;
            tracing::debug!(%method, url, attempt, "api request");

            let mut builder = self.http.request(method.clone(), url);
            for (name, value) in headers {
                builder = builder.header(*name, value.as_str());
            }
            if let Some(form) = form {
                builder = builder.form(form);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(url, error = %e, "transport failure");
                    if may_retry {
                        sleep(RETRY_DELAY).await;
                        continue;
                    }
                    return ApiReply::no_reply(e.to_string());
                }
            };

            let status = response.status().as_u16();
            if !(200..500).contains(&status) {
                tracing::warn!(url, status, "unusable status");
                if may_retry {
                    sleep(RETRY_DELAY).await;
                    continue;
                }
                return ApiReply::no_reply(NO_REPLY_TEXT.to_string());
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url, error = %e, "failed to read reply body");
                    if may_retry {
                        sleep(RETRY_DELAY).await;
                        continue;
                    }
                    return ApiReply::no_reply(e.to_string());
                }
            };

            match serde_json::from_str::<Value>(&body) {
                Ok(json) => {
                    let text = if json_is_empty(&json) {
                        body
                    } else {
                        NO_REPLY_TEXT.to_string()
                    };
                    return ApiReply {
                        status_code: status,
                        json,
                        text,
                    };
                }
                // only a read that claims success gets the decode retried
                Err(e) if status == 200 && method == Method::GET => {
                    tracing::warn!(url, error = %e, "json decoding failed");
                    if may_retry {
                        sleep(RETRY_DELAY).await;
                        continue;
                    }
                    return ApiReply::no_reply(e.to_string());
                }
                // otherwise the non-JSON body is preserved verbatim
                Err(_) => {
                    return ApiReply {
                        status_code: status,
                        json: Value::Object(Default::default()),
                        text: body,
                    };
                }
            }
        }
        unreachable!("retry loop always returns")
    }
}

/// Maps replies onto per-endpoint ok/warn tables and surfaces the outcome.
///
/// Warn statuses are shown on the display for a bounded duration and the
/// caller keeps going; anything outside both tables is fatal so remote-API
/// changes never get silently masked.
#[derive(Clone)]
pub struct ReplyClassifier {
    display: Arc<dyn Display>,
    warn_duration: Duration,
}

impl ReplyClassifier {
    pub fn new(display: Arc<dyn Display>) -> Self {
        Self {
            display,
            warn_duration: DEFAULT_WARN_DURATION,
        }
    }

    pub fn with_warn_duration(mut self, warn_duration: Duration) -> Self {
        self.warn_duration = warn_duration;
        self
    }

    /// Returns `Ok(true)` for an ok status, `Ok(false)` after surfacing a
    /// warn status, and [`ApiError::Status`] for anything else.
    pub async fn check(
        &self,
        call: &'static str,
        reply: &ApiReply,
        ok: &[u16],
        warn: &[u16],
    ) -> Result<bool, ApiError> {
        tracing::debug!(call, status = reply.status_code, "status received");

        if ok.contains(&reply.status_code) {
            return Ok(true);
        }

        if warn.contains(&reply.status_code) {
            let warning = format!("{} api {}: {}", call, reply.status_code, reply.text);
            tracing::warn!(call, status = reply.status_code, text = %reply.text, "transient api warning");
            self.display.show(APP_NAME, &warning, ShowOptions::status());
            sleep(self.warn_duration).await;
            return Ok(false);
        }

        self.display.show(
            APP_NAME,
            &format!("{} api error {}", call, reply.status_code),
            ShowOptions::status(),
        );
        Err(ApiError::Status {
            call,
            status: reply.status_code,
            text: reply.text.clone(),
        })
    }

    /// Show a transient notice for a bounded duration.
    pub async fn notice(&self, secondary: &str, duration: Duration) {
        self.display.show(APP_NAME, secondary, ShowOptions::status());
        sleep(duration).await;
    }

    pub fn show_status(&self, primary: &str, secondary: &str) {
        self.display.show(primary, secondary, ShowOptions::status());
    }
}
