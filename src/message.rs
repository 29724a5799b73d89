//! Message handles: messages that carry typed component rows and know how to
//! edit or delete themselves.
//!
//! [`ComponentMessage`] wraps a channel [`Message`] rather than extending
//! it: the plain message data sits in `message`, the parsed rows sit next to
//! it, and the common fields are exposed through accessors.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::InteractionError;
use crate::http::{HttpError, SharedTransport, TransportExt};
use crate::payload::{EditMessage, Embeds, MessagePayload, PayloadBuilder};
use crate::types::codec::rows_from_wire;
use crate::types::component::ActionRow;
use crate::types::id::{
    marker::{ChannelMarker, GuildMarker, MessageMarker},
    Id,
};
use crate::types::message::{Embed, Message, MessageFlags};

// ---------------------------------------------------------------------------
// ComponentMessage
// ---------------------------------------------------------------------------

/// A channel message together with its parsed component rows.
#[derive(Clone)]
pub struct ComponentMessage {
    pub message: Message,
    pub components: Vec<ActionRow>,
    transport: SharedTransport,
    payloads: Arc<PayloadBuilder>,
}

impl ComponentMessage {
    /// Parse a message object as returned by the REST API or embedded in an
    /// interaction.
    pub fn from_wire(
        value: &Value,
        transport: SharedTransport,
        payloads: Arc<PayloadBuilder>,
    ) -> Result<Self, serde_json::Error> {
        let message = Message::deserialize(value)?;
        let components = value
            .get("components")
            .map(rows_from_wire)
            .unwrap_or_default();

        Ok(Self {
            message,
            components,
            transport,
            payloads,
        })
    }

    pub fn id(&self) -> Id<MessageMarker> {
        self.message.id
    }

    pub fn channel_id(&self) -> Id<ChannelMarker> {
        self.message.channel_id
    }

    pub fn guild_id(&self) -> Option<Id<GuildMarker>> {
        self.message.guild_id
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.message.embeds
    }

    pub fn flags(&self) -> MessageFlags {
        self.message.flags
    }

    pub fn is_ephemeral(&self) -> bool {
        self.message.flags.contains(MessageFlags::EPHEMERAL)
    }

    /// Patch the message and refresh the local copy.
    ///
    /// An edit with nothing in it makes no request.
    pub async fn edit(&mut self, edit: EditMessage) -> Result<(), InteractionError> {
        if edit.is_empty() {
            return Ok(());
        }

        let snapshot = LocalEdit::from(&edit);
        let body = self.payloads.edit_request(edit, self.message.flags);
        let response = self
            .transport
            .edit_channel_message(self.message.channel_id, self.message.id, body)
            .await?;

        match response.map(|value| self.refresh(&value)) {
            Some(Ok(())) => {}
            _ => snapshot.apply(&mut self.message, &mut self.components),
        }
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), InteractionError> {
        self.transport
            .delete_channel_message(self.message.channel_id, self.message.id)
            .await?;
        Ok(())
    }

    fn refresh(&mut self, value: &Value) -> Result<(), serde_json::Error> {
        self.message = Message::deserialize(value)?;
        self.components = value
            .get("components")
            .map(rows_from_wire)
            .unwrap_or_default();
        Ok(())
    }
}

impl fmt::Debug for ComponentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMessage")
            .field("message", &self.message)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

/// Fields of an edit, kept so they can be applied locally when the response
/// carries no message body.
struct LocalEdit {
    content: Option<String>,
    embeds: Option<Vec<Embed>>,
    components: Option<Vec<ActionRow>>,
    suppress_embeds: Option<bool>,
}

impl From<&EditMessage> for LocalEdit {
    fn from(edit: &EditMessage) -> Self {
        Self {
            content: edit.content.clone(),
            embeds: edit.embeds.as_list().map(<[Embed]>::to_vec),
            components: edit.components.clone(),
            suppress_embeds: edit.suppress_embeds,
        }
    }
}

impl LocalEdit {
    fn apply(self, message: &mut Message, components: &mut Vec<ActionRow>) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(embeds) = self.embeds {
            message.embeds = embeds;
        }
        if let Some(rows) = self.components {
            *components = rows;
        }
        if let Some(suppress) = self.suppress_embeds {
            message.flags.set(MessageFlags::SUPPRESS_EMBEDS, suppress);
        }
    }
}

// ---------------------------------------------------------------------------
// PartialMessage / SourceMessage
// ---------------------------------------------------------------------------

/// What's left of a message when only its id and flags came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialMessage {
    pub id: Id<MessageMarker>,
    pub ephemeral: bool,
}

impl PartialMessage {
    pub fn new(id: Id<MessageMarker>, flags: MessageFlags) -> Self {
        Self {
            id,
            ephemeral: flags.contains(MessageFlags::EPHEMERAL),
        }
    }
}

/// The message a component interaction originated from.
#[derive(Debug, Clone)]
pub enum SourceMessage {
    Full(Box<ComponentMessage>),
    Partial(PartialMessage),
}

impl SourceMessage {
    pub fn id(&self) -> Id<MessageMarker> {
        match self {
            SourceMessage::Full(message) => message.id(),
            SourceMessage::Partial(partial) => partial.id,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        match self {
            SourceMessage::Full(message) => message.is_ephemeral(),
            SourceMessage::Partial(partial) => partial.ephemeral,
        }
    }

    pub fn as_full(&self) -> Option<&ComponentMessage> {
        match self {
            SourceMessage::Full(message) => Some(&**message),
            SourceMessage::Partial(_) => None,
        }
    }

    pub fn as_full_mut(&mut self) -> Option<&mut ComponentMessage> {
        match self {
            SourceMessage::Full(message) => Some(&mut **message),
            SourceMessage::Partial(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// InteractionMessage
// ---------------------------------------------------------------------------

/// Which webhook message an [`InteractionMessage`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTarget {
    /// The interaction's own response (`@original`).
    Original,
    FollowUp(Id<MessageMarker>),
}

impl ResponseTarget {
    fn message_id(self) -> Option<Id<MessageMarker>> {
        match self {
            ResponseTarget::Original => None,
            ResponseTarget::FollowUp(id) => Some(id),
        }
    }
}

/// A response or follow-up sent for an interaction.
///
/// The fields mirror what was last sent, so the handle can be edited or
/// deleted without fetching the message first.
#[derive(Clone)]
pub struct InteractionMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    pub ephemeral: bool,
    target: ResponseTarget,
    token: String,
    transport: SharedTransport,
    payloads: Arc<PayloadBuilder>,
}

impl InteractionMessage {
    pub(crate) fn new(
        payload: &MessagePayload,
        ephemeral: bool,
        target: ResponseTarget,
        token: &str,
        transport: SharedTransport,
        payloads: Arc<PayloadBuilder>,
    ) -> Self {
        Self {
            content: payload.content.clone(),
            embeds: payload.embeds.as_list().map(<[Embed]>::to_vec).unwrap_or_default(),
            components: payload.components.clone(),
            ephemeral,
            target,
            token: token.to_owned(),
            transport,
            payloads,
        }
    }

    pub fn target(&self) -> ResponseTarget {
        self.target
    }

    /// Edit this message through the interaction webhook.
    pub async fn edit(&mut self, edit: EditMessage) -> Result<(), InteractionError> {
        let content = edit.content.clone();
        let embeds = edit.embeds.clone();
        let components = edit.components.clone();

        let flags = if self.ephemeral {
            MessageFlags::EPHEMERAL
        } else {
            MessageFlags::empty()
        };
        let body = self.payloads.edit_request(edit, flags);
        debug!(target_message = ?self.target, "editing interaction message");
        self.transport
            .edit_response(&self.token, self.target.message_id(), body)
            .await?;

        if content.is_some() {
            self.content = content;
        }
        if let Some(embeds) = embeds.as_list() {
            self.embeds = embeds.to_vec();
        }
        if let Some(rows) = components {
            self.components = rows;
        }
        Ok(())
    }

    /// Delete this message. Ephemeral messages can't be deleted; that is
    /// rejected before any request is made.
    pub async fn delete(&self) -> Result<(), InteractionError> {
        if self.ephemeral {
            return Err(InteractionError::EphemeralDelete);
        }
        self.transport
            .delete_response(&self.token, self.target.message_id())
            .await?;
        Ok(())
    }
}

impl fmt::Debug for InteractionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionMessage")
            .field("content", &self.content)
            .field("embeds", &self.embeds)
            .field("components", &self.components)
            .field("ephemeral", &self.ephemeral)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ComponentSender
// ---------------------------------------------------------------------------

/// Sends new messages with components to channels.
#[derive(Clone)]
pub struct ComponentSender {
    transport: SharedTransport,
    payloads: Arc<PayloadBuilder>,
}

impl ComponentSender {
    pub fn new(transport: SharedTransport, payloads: Arc<PayloadBuilder>) -> Self {
        Self {
            transport,
            payloads,
        }
    }

    pub async fn send(
        &self,
        channel_id: Id<ChannelMarker>,
        payload: MessagePayload,
    ) -> Result<ComponentMessage, InteractionError> {
        let body = self.payloads.request(payload);
        let value = self.transport.send_channel_message(channel_id, body).await?;

        ComponentMessage::from_wire(&value, self.transport.clone(), self.payloads.clone())
            .map_err(|e| HttpError::Serde(e.to_string()).into())
    }
}

impl fmt::Debug for ComponentSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSender")
            .field("payloads", &self.payloads)
            .finish_non_exhaustive()
    }
}

/// Embeds a local copy should hold after sending `embeds`.
pub(crate) fn embeds_after(embeds: &Embeds, current: &[Embed]) -> Vec<Embed> {
    embeds
        .as_list()
        .map_or_else(|| current.to_vec(), <[Embed]>::to_vec)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
