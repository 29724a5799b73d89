//! Envelope and callback types that sit around the component model.
//!
//! The gateway envelope is what the external event stream hands us; the
//! callback types are the bodies posted to the interaction callback endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// One event from the gateway stream: opcode, data, sequence and event name.
///
/// The caller owns the connection; the [`Dispatcher`] only consumes these.
///
/// [`Dispatcher`]: crate::dispatch::Dispatcher
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayPayload {
    #[serde(default)]
    pub op: u8,
    #[serde(default)]
    pub d: Option<Value>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    /// Dispatch envelope with event name `t` and data `d`.
    pub fn dispatch(t: impl Into<String>, d: Value) -> Self {
        Self {
            op: 0,
            d: Some(d),
            s: None,
            t: Some(t.into()),
        }
    }
}

/// Callback kinds the component layer sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum InteractionCallbackType {
    /// Respond with a new message.
    ChannelMessageWithSource = 4,
    /// Acknowledge now, fill the response in with an edit later.
    DeferredChannelMessageWithSource = 5,
    /// Acknowledge now, edit the triggering message later.
    DeferredUpdateMessage = 6,
    /// Edit the triggering message in place.
    UpdateMessage = 7,
}

/// Body posted to `/interactions/{id}/{token}/callback`.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub kind: InteractionCallbackType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
