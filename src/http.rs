//! Transport seam for the Discord REST API.
//!
//! Every outbound call funnels through [`Transport::request`] so that auth,
//! rate-limit back-off and error mapping live in exactly one implementation.
//! The rest of the crate only ever names a [`Route`] and hands over a
//! [`RequestBody`]; the named operations in [`TransportExt`] are thin
//! wrappers that pick the route and shape the callback envelope.
//!
//! The reqwest-backed implementation lives in [`client`] behind the `io`
//! feature. Without it, callers bring their own `Transport`.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::custom::{InteractionCallback, InteractionCallbackType};
use crate::types::id::{
    marker::{ApplicationMarker, ChannelMarker, InteractionMarker, MessageMarker},
    Id,
};

#[cfg(feature = "io")]
pub mod client;

#[cfg(feature = "io")]
pub use client::{DiscordHttpClient, HttpConfig};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Non-success status from Discord.
    #[error("Discord API error {status} on {route}: {body}")]
    Api {
        status: u16,
        body: String,
        route: String,
    },
    /// Transport / network error.
    #[error("HTTP transport error: {0}")]
    Transport(String),
    /// Serialisation error.
    #[error("Serialisation error: {0}")]
    Serde(String),
    /// Missing or malformed client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Every REST operation this crate performs.
///
/// Interaction tokens are credentials, so neither `Display` nor `Debug`
/// prints them; both render the route template instead.
#[derive(Clone, PartialEq, Eq)]
pub enum Route {
    /// `POST /interactions/{id}/{token}/callback`. The callback type in the
    /// body decides between initial, deferred and edit-original responses.
    InteractionCallback {
        interaction_id: Id<InteractionMarker>,
        token: String,
    },
    CreateFollowUp {
        token: String,
    },
    EditResponse {
        token: String,
    },
    EditFollowUp {
        token: String,
        message_id: Id<MessageMarker>,
    },
    DeleteResponse {
        token: String,
    },
    DeleteFollowUp {
        token: String,
        message_id: Id<MessageMarker>,
    },
    CreateMessage {
        channel_id: Id<ChannelMarker>,
    },
    EditMessage {
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    },
    DeleteMessage {
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    },
}

impl Route {
    pub fn method(&self) -> Method {
        match self {
            Route::InteractionCallback { .. }
            | Route::CreateFollowUp { .. }
            | Route::CreateMessage { .. } => Method::Post,
            Route::EditResponse { .. }
            | Route::EditFollowUp { .. }
            | Route::EditMessage { .. } => Method::Patch,
            Route::DeleteResponse { .. }
            | Route::DeleteFollowUp { .. }
            | Route::DeleteMessage { .. } => Method::Delete,
        }
    }

    /// Request path relative to the API base, without a leading slash.
    pub fn path(&self, application_id: Id<ApplicationMarker>) -> String {
        match self {
            Route::InteractionCallback {
                interaction_id,
                token,
            } => format!("interactions/{interaction_id}/{token}/callback"),
            Route::CreateFollowUp { token } => format!("webhooks/{application_id}/{token}"),
            Route::EditResponse { token } | Route::DeleteResponse { token } => {
                format!("webhooks/{application_id}/{token}/messages/@original")
            }
            Route::EditFollowUp { token, message_id }
            | Route::DeleteFollowUp { token, message_id } => {
                format!("webhooks/{application_id}/{token}/messages/{message_id}")
            }
            Route::CreateMessage { channel_id } => format!("channels/{channel_id}/messages"),
            Route::EditMessage {
                channel_id,
                message_id,
            }
            | Route::DeleteMessage {
                channel_id,
                message_id,
            } => format!("channels/{channel_id}/messages/{message_id}"),
        }
    }

    /// The parameter Discord scopes rate limits by: the channel for channel
    /// routes, the interaction for callbacks, and the token (hashed) for
    /// webhook routes. Two interactions never share a bucket.
    pub fn major_parameter(&self) -> String {
        match self {
            Route::CreateMessage { channel_id }
            | Route::EditMessage { channel_id, .. }
            | Route::DeleteMessage { channel_id, .. } => format!("channel:{channel_id}"),
            Route::InteractionCallback { interaction_id, .. } => {
                format!("interaction:{interaction_id}")
            }
            Route::CreateFollowUp { token }
            | Route::EditResponse { token }
            | Route::EditFollowUp { token, .. }
            | Route::DeleteResponse { token }
            | Route::DeleteFollowUp { token, .. } => {
                let mut hasher = DefaultHasher::new();
                token.hash(&mut hasher);
                format!("webhook:{:016x}", hasher.finish())
            }
        }
    }

    /// Key used for per-route rate-limit bucketing. Never contains the token.
    pub fn bucket_key(&self) -> String {
        format!("{self} {}", self.major_parameter())
    }

    fn template(&self) -> &'static str {
        match self {
            Route::InteractionCallback { .. } => "/interactions/{interaction_id}/{token}/callback",
            Route::CreateFollowUp { .. } => "/webhooks/{application_id}/{token}",
            Route::EditResponse { .. } | Route::DeleteResponse { .. } => {
                "/webhooks/{application_id}/{token}/messages/@original"
            }
            Route::EditFollowUp { .. } | Route::DeleteFollowUp { .. } => {
                "/webhooks/{application_id}/{token}/messages/{message_id}"
            }
            Route::CreateMessage { .. } => "/channels/{channel_id}/messages",
            Route::EditMessage { .. } | Route::DeleteMessage { .. } => {
                "/channels/{channel_id}/messages/{message_id}"
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method().as_str(), self.template())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Route({self})")
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// A file attached to an outbound message.
///
/// The bytes are owned by the request that carries them and are dropped as
/// soon as that request completes, whether it succeeded or not.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, naming the upload after the file.
    #[cfg(feature = "io")]
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self { filename, data })
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// JSON body plus optional file parts.
///
/// With files attached, transports send `multipart/form-data` with the JSON
/// in a `payload_json` field and each file as `files[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    pub json: Option<Value>,
    pub files: Vec<FileUpload>,
}

impl RequestBody {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn json(json: Value) -> Self {
        Self {
            json: Some(json),
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<FileUpload>) -> Self {
        self.files = files;
        self
    }

    /// Wrap the JSON as the `data` of an interaction callback of `kind`.
    fn into_callback(self, kind: InteractionCallbackType) -> Result<Self, HttpError> {
        let callback = InteractionCallback {
            kind,
            data: self.json,
        };
        let json = serde_json::to_value(&callback).map_err(|e| HttpError::Serde(e.to_string()))?;
        Ok(Self {
            json: Some(json),
            files: self.files,
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// The single request method everything funnels through.
///
/// Implementations perform at most one attempt per call and return the
/// parsed response body, or `None` when Discord answered without one
/// (`204 No Content`).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, route: Route, body: RequestBody) -> Result<Option<Value>, HttpError>;
}

pub type SharedTransport = Arc<dyn Transport>;

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, route: Route, body: RequestBody) -> Result<Option<Value>, HttpError> {
        (**self).request(route, body).await
    }
}

fn require_body(route: &Route, value: Option<Value>) -> Result<Value, HttpError> {
    value.ok_or_else(|| HttpError::Serde(format!("empty response body from {route}")))
}

/// Named REST operations on top of [`Transport::request`].
#[async_trait]
pub trait TransportExt: Transport {
    /// Acknowledge with a message (callback type 4).
    async fn create_initial_response(
        &self,
        interaction_id: Id<InteractionMarker>,
        token: &str,
        body: RequestBody,
    ) -> Result<(), HttpError> {
        let route = Route::InteractionCallback {
            interaction_id,
            token: token.to_owned(),
        };
        let body = body.into_callback(InteractionCallbackType::ChannelMessageWithSource)?;
        self.request(route, body).await.map(drop)
    }

    /// Acknowledge now, deliver later (callback type 5, or 6 when the
    /// triggering message will be edited instead).
    async fn create_deferred_response(
        &self,
        interaction_id: Id<InteractionMarker>,
        token: &str,
        body: RequestBody,
        edit_original: bool,
    ) -> Result<(), HttpError> {
        let kind = if edit_original {
            InteractionCallbackType::DeferredUpdateMessage
        } else {
            InteractionCallbackType::DeferredChannelMessageWithSource
        };
        let route = Route::InteractionCallback {
            interaction_id,
            token: token.to_owned(),
        };
        self.request(route, body.into_callback(kind)?).await.map(drop)
    }

    /// Edit the component's message in place (callback type 7).
    async fn edit_original_via_callback(
        &self,
        interaction_id: Id<InteractionMarker>,
        token: &str,
        body: RequestBody,
    ) -> Result<(), HttpError> {
        let route = Route::InteractionCallback {
            interaction_id,
            token: token.to_owned(),
        };
        let body = body.into_callback(InteractionCallbackType::UpdateMessage)?;
        self.request(route, body).await.map(drop)
    }

    /// Create a follow-up message and return it as sent.
    async fn create_follow_up(&self, token: &str, body: RequestBody) -> Result<Value, HttpError> {
        let route = Route::CreateFollowUp {
            token: token.to_owned(),
        };
        let value = self.request(route.clone(), body).await?;
        require_body(&route, value)
    }

    /// Edit the original response, or a follow-up when `message_id` is set.
    async fn edit_response(
        &self,
        token: &str,
        message_id: Option<Id<MessageMarker>>,
        body: RequestBody,
    ) -> Result<Option<Value>, HttpError> {
        let token = token.to_owned();
        let route = match message_id {
            Some(message_id) => Route::EditFollowUp { token, message_id },
            None => Route::EditResponse { token },
        };
        self.request(route, body).await
    }

    /// Delete the original response, or a follow-up when `message_id` is set.
    async fn delete_response(
        &self,
        token: &str,
        message_id: Option<Id<MessageMarker>>,
    ) -> Result<(), HttpError> {
        let token = token.to_owned();
        let route = match message_id {
            Some(message_id) => Route::DeleteFollowUp { token, message_id },
            None => Route::DeleteResponse { token },
        };
        self.request(route, RequestBody::empty()).await.map(drop)
    }

    async fn send_channel_message(
        &self,
        channel_id: Id<ChannelMarker>,
        body: RequestBody,
    ) -> Result<Value, HttpError> {
        let route = Route::CreateMessage { channel_id };
        let value = self.request(route.clone(), body).await?;
        require_body(&route, value)
    }

    async fn edit_channel_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        body: RequestBody,
    ) -> Result<Option<Value>, HttpError> {
        let route = Route::EditMessage {
            channel_id,
            message_id,
        };
        self.request(route, body).await
    }

    async fn delete_channel_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), HttpError> {
        let route = Route::DeleteMessage {
            channel_id,
            message_id,
        };
        self.request(route, RequestBody::empty()).await.map(drop)
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
