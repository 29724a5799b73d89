//! In-memory [`Transport`] that records every call.
//!
//! Responses are served from a queue; when the queue is empty, message
//! creating routes echo the request back as a message object so handles have
//! an id to work with, and everything else answers with no body.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::http::{HttpError, RequestBody, Route, Transport};

/// Snowflake of the first message id the echo responder hands out.
pub const FIRST_ECHO_ID: u64 = 900;

#[derive(Debug)]
pub struct RecordedCall {
    pub route: Route,
    pub json: Option<Value>,
    pub files: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    queued: Mutex<VecDeque<Result<Option<Value>, HttpError>>>,
    next_id: AtomicU64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(FIRST_ECHO_ID),
            ..Default::default()
        }
    }

    /// `(route, json)` for every call so far, in order.
    pub fn calls(&self) -> Vec<(Route, Option<Value>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| (call.route.clone(), call.json.clone()))
            .collect()
    }

    /// File names attached to call `index`.
    pub fn files(&self, index: usize) -> Vec<String> {
        self.calls.lock().unwrap()[index].files.clone()
    }

    pub fn respond_next(&self, value: Value) {
        self.queued.lock().unwrap().push_back(Ok(Some(value)));
    }

    pub fn fail_next(&self, error: HttpError) {
        self.queued.lock().unwrap().push_back(Err(error));
    }

    fn echo(&self, route: &Route, json: Option<&Value>) -> Option<Value> {
        let channel_id = match route {
            Route::CreateMessage { channel_id } => channel_id.get(),
            Route::CreateFollowUp { .. } => 100,
            _ => return None,
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let json = json.cloned().unwrap_or_else(|| json!({}));

        Some(json!({
            "id": id.to_string(),
            "channel_id": channel_id.to_string(),
            "content": json.get("content").and_then(Value::as_str).unwrap_or_default(),
            "components": json.get("components").cloned().unwrap_or_else(|| json!([])),
            "embeds": json.get("embeds").cloned().unwrap_or_else(|| json!([])),
            "flags": json.get("flags").cloned().unwrap_or_else(|| json!(0)),
        }))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn request(&self, route: Route, body: RequestBody) -> Result<Option<Value>, HttpError> {
        let queued = self.queued.lock().unwrap().pop_front();
        let response = match queued {
            Some(response) => response,
            None => Ok(self.echo(&route, body.json.as_ref())),
        };

        self.calls.lock().unwrap().push(RecordedCall {
            route,
            json: body.json,
            files: body.files.into_iter().map(|f| f.filename).collect(),
        });

        response
    }
}
