//! reqwest-backed [`Transport`] for the Discord REST API.
//!
//! Auth headers, multipart encoding and rate-limit bookkeeping live here and
//! nowhere else. The client waits out a bucket it already knows to be empty
//! before sending, but never retries: a `429` comes back to the caller as
//! [`HttpError::Api`] like any other non-success status.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_lock::Mutex;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use super::{HttpError, Method, RequestBody, Route, Transport};
use crate::types::id::{marker::ApplicationMarker, Id};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://discord.com/api/v10";
const DEFAULT_USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Response body characters quoted in a parse error.
const BODY_EXCERPT_CHARS: usize = 200;

/// Longest pre-emptive wait before a request goes out anyway.
const MAX_PREEMPTIVE_WAIT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Credentials and endpoint for [`DiscordHttpClient`].
#[derive(Clone)]
pub struct HttpConfig {
    pub token: String,
    pub application_id: Id<ApplicationMarker>,
    pub api_base: String,
    pub user_agent: String,
}

impl HttpConfig {
    pub fn new(token: impl Into<String>, application_id: Id<ApplicationMarker>) -> Self {
        Self {
            token: token.into(),
            application_id,
            api_base: BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Read `DISCORD_TOKEN`, `DISCORD_APPLICATION_ID` and the optional
    /// `DISCORD_API_BASE` from the environment.
    pub fn from_env() -> Result<Self, HttpError> {
        let token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| HttpError::Config("DISCORD_TOKEN environment variable not set".into()))?;
        let application_id = std::env::var("DISCORD_APPLICATION_ID")
            .map_err(|_| {
                HttpError::Config("DISCORD_APPLICATION_ID environment variable not set".into())
            })?
            .parse()
            .map_err(|_| HttpError::Config("DISCORD_APPLICATION_ID is not a snowflake".into()))?;

        let mut config = Self::new(token, application_id);
        if let Ok(base) = std::env::var("DISCORD_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Rate-limit tracker (per-bucket)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct RateLimitInfo {
    remaining: Option<u32>,
    reset_after: Option<f64>,
    bucket: Option<String>,
    is_global: bool,
}

#[derive(Debug, Clone)]
struct BucketState {
    remaining: u32,
    resets_at: Instant,
}

#[derive(Debug, Clone, Default)]
struct RateLimiter {
    /// Route bucket key → bucket id reported by Discord.
    route_buckets: HashMap<String, String>,
    /// Bucket id plus major parameter → state.
    buckets: HashMap<String, BucketState>,
    /// Global rate-limit: if set, no requests may be sent until this instant.
    global_until: Option<Instant>,
}

impl RateLimiter {
    /// Bucket state is scoped by the route's major parameter, so one
    /// interaction draining its bucket never delays another.
    fn state_key(bucket: &str, route: &Route) -> String {
        format!("{bucket}:{}", route.major_parameter())
    }

    /// How long to wait before sending on `route`, if at all.
    fn delay_for(&self, route: &Route, now: Instant) -> Option<Duration> {
        if let Some(until) = self.global_until {
            if until > now {
                return Some(until - now);
            }
        }

        let bucket_id = self.route_buckets.get(&route.bucket_key())?;
        let state = self.buckets.get(&Self::state_key(bucket_id, route))?;

        (state.remaining == 0 && state.resets_at > now).then(|| state.resets_at - now)
    }

    fn update(&mut self, route: &Route, info: &RateLimitInfo, now: Instant) {
        let reset_at = now + Duration::from_secs_f64(info.reset_after.unwrap_or(1.0).max(0.0));

        if info.is_global {
            self.global_until = Some(reset_at);
        }

        if let Some(bucket) = &info.bucket {
            self.route_buckets.insert(route.bucket_key(), bucket.clone());
            self.buckets.insert(
                Self::state_key(bucket, route),
                BucketState {
                    remaining: info.remaining.unwrap_or(1),
                    resets_at: reset_at,
                },
            );
        }
    }
}

/// The first characters of a response body, for error messages.
fn body_excerpt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).chars().take(BODY_EXCERPT_CHARS).collect()
}

fn parse_rate_limit_headers(headers: &HeaderMap) -> RateLimitInfo {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    RateLimitInfo {
        remaining: header("x-ratelimit-remaining").and_then(|s| s.parse().ok()),
        reset_after: header("x-ratelimit-reset-after").and_then(|s| s.parse().ok()),
        bucket: header("x-ratelimit-bucket").map(str::to_string),
        is_global: header("x-ratelimit-global") == Some("true"),
    }
}

// ---------------------------------------------------------------------------
// DiscordHttpClient
// ---------------------------------------------------------------------------

/// A thin, rate-limit–aware HTTP client for the Discord REST API.
///
/// Cheap to clone (internals are behind `Arc`).
#[derive(Clone)]
pub struct DiscordHttpClient {
    config: Arc<HttpConfig>,
    http: reqwest::Client,
    limiter: Arc<Mutex<RateLimiter>>,
}

impl DiscordHttpClient {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            limiter: Arc::new(Mutex::new(RateLimiter::default())),
        }
    }

    pub fn application_id(&self) -> Id<ApplicationMarker> {
        self.config.application_id
    }

    async fn wait_for_bucket(&self, route: &Route) {
        let delay = self.limiter.lock().await.delay_for(route, Instant::now());
        if let Some(delay) = delay {
            let delay = delay.min(MAX_PREEMPTIVE_WAIT);
            debug!(
                route = %route,
                delay_ms = delay.as_millis() as u64,
                "rate-limit pre-emptive backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn build_request(&self, route: &Route, body: RequestBody) -> Result<reqwest::RequestBuilder, HttpError> {
        let method = match route.method() {
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let url = format!("{}/{}", self.config.api_base, route.path(self.config.application_id));

        let req = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bot {}", self.config.token))
            .header(USER_AGENT, &self.config.user_agent);

        if !body.files.is_empty() {
            return Ok(req.multipart(build_multipart(body)?));
        }

        Ok(match body.json {
            Some(json) => req.json(&json),
            None => req,
        })
    }
}

#[async_trait]
impl Transport for DiscordHttpClient {
    async fn request(&self, route: Route, body: RequestBody) -> Result<Option<Value>, HttpError> {
        self.wait_for_bucket(&route).await;

        let resp = self
            .build_request(&route, body)?
            .send()
            .await
            .map_err(|e| {
                warn!(route = %route, error = %e, "request failed");
                HttpError::Transport(e.to_string())
            })?;

        let status = resp.status();
        let rl_info = parse_rate_limit_headers(resp.headers());

        // Update the limiter regardless of status.
        self.limiter
            .lock()
            .await
            .update(&route, &rl_info, Instant::now());

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(
                route = %route,
                status = status.as_u16(),
                global = rl_info.is_global,
                "Discord rejected request"
            );
            return Err(HttpError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
                route: route.to_string(),
            });
        }

        if bytes.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| HttpError::Serde(format!("{e}: {}", body_excerpt(&bytes))))
    }
}

impl fmt::Debug for DiscordHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordHttpClient")
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `payload_json` text part followed by one `files[i]` part per upload.
///
/// The uploads move into the form, so their bytes are released together
/// with the request.
fn build_multipart(body: RequestBody) -> Result<Form, HttpError> {
    let payload = body.json.unwrap_or_else(|| Value::Object(Default::default()));
    let mut form = Form::new().text("payload_json", payload.to_string());

    for (i, file) in body.files.into_iter().enumerate() {
        let part = Part::bytes(file.data)
            .file_name(file.filename)
            .mime_str("application/octet-stream")
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        form = form.part(format!("files[{i}]"), part);
    }

    Ok(form)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn parses_rate_limit_headers() {
        let info = parse_rate_limit_headers(&headers(&[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset-after", "1.5"),
            ("x-ratelimit-bucket", "abcd"),
        ]));
        assert_eq!(info.remaining, Some(0));
        assert_eq!(info.reset_after, Some(1.5));
        assert_eq!(info.bucket.as_deref(), Some("abcd"));
        assert!(!info.is_global);
    }

    fn channel_post(channel: u64) -> Route {
        Route::CreateMessage {
            channel_id: Id::new(channel),
        }
    }

    fn callback(interaction: u64) -> Route {
        Route::InteractionCallback {
            interaction_id: Id::new(interaction),
            token: format!("token-{interaction}"),
        }
    }

    fn exhausted(bucket: &str, reset_after: f64) -> RateLimitInfo {
        RateLimitInfo {
            remaining: Some(0),
            reset_after: Some(reset_after),
            bucket: Some(bucket.into()),
            is_global: false,
        }
    }

    #[test]
    fn exhausted_bucket_delays_until_reset() {
        let now = Instant::now();
        let mut limiter = RateLimiter::default();
        limiter.update(&channel_post(1), &exhausted("b", 2.0), now);

        let delay = limiter.delay_for(&channel_post(1), now).unwrap();
        assert_eq!(delay, Duration::from_secs(2));
        assert!(limiter.delay_for(&channel_post(2), now).is_none());
        assert!(limiter
            .delay_for(&channel_post(1), now + Duration::from_secs(3))
            .is_none());
    }

    #[test]
    fn exhausted_interaction_does_not_block_another() {
        let now = Instant::now();
        let mut limiter = RateLimiter::default();
        limiter.update(&callback(1), &exhausted("callbacks", 30.0), now);
        // the second interaction reports the same bucket hash with budget left
        limiter.update(
            &callback(2),
            &RateLimitInfo {
                remaining: Some(5),
                ..exhausted("callbacks", 30.0)
            },
            now,
        );

        assert!(limiter.delay_for(&callback(1), now).is_some());
        assert!(limiter.delay_for(&callback(2), now).is_none());
        assert!(limiter.delay_for(&callback(3), now).is_none());
    }

    #[test]
    fn global_limit_blocks_every_route() {
        let now = Instant::now();
        let mut limiter = RateLimiter::default();
        let info = RateLimitInfo {
            reset_after: Some(5.0),
            is_global: true,
            ..Default::default()
        };
        limiter.update(&channel_post(1), &info, now);
        assert!(limiter.delay_for(&callback(9), now).is_some());
    }

    #[test]
    fn remaining_budget_sends_immediately() {
        let now = Instant::now();
        let mut limiter = RateLimiter::default();
        let info = RateLimitInfo {
            remaining: Some(3),
            ..exhausted("b", 2.0)
        };
        limiter.update(&channel_post(1), &info, now);
        assert!(limiter.delay_for(&channel_post(1), now).is_none());
    }

    #[test]
    fn body_excerpt_cuts_on_char_boundary() {
        let mut body = "a".repeat(199);
        body.push('é');
        body.push_str("tail");

        let excerpt = body_excerpt(body.as_bytes());
        assert_eq!(excerpt.chars().count(), 200);
        assert!(excerpt.ends_with('é'));
        assert_eq!(body_excerpt(b"short"), "short");
    }

    #[test]
    fn debug_redacts_token() {
        let client = DiscordHttpClient::new(HttpConfig::new("super-secret", Id::new(1)));
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
