//! Turns raw gateway envelopes into typed component notifications.
//!
//! The [`Dispatcher`] sits downstream of whatever owns the gateway
//! connection. It only looks at `INTERACTION_CREATE` dispatches that carry a
//! component interaction, rebuilds an [`InteractionContext`] for each, and
//! hands it to application code over an `async_channel` as a
//! [`ComponentEvent`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::http::SharedTransport;
use crate::interaction::{InteractionContext, InteractionSource};
use crate::message::{ComponentMessage, ComponentSender, PartialMessage, SourceMessage};
use crate::payload::PayloadBuilder;
use crate::types::component::ComponentType;
use crate::types::custom::GatewayPayload;
use crate::types::guild::{Channel, Guild, Member};
use crate::types::id::{
    marker::{ChannelMarker, GuildMarker, MessageMarker},
    Id,
};
use crate::types::message::MessageFlags;

const INTERACTION_CREATE: &str = "INTERACTION_CREATE";

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A component interaction, ready to be answered.
#[derive(Debug)]
pub enum ComponentEvent {
    /// A button was clicked.
    ButtonPress(InteractionContext),
    /// Options were chosen in a select menu; `values` is filled in.
    Selection(InteractionContext),
}

impl ComponentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentEvent::ButtonPress(_) => "button_press",
            ComponentEvent::Selection(_) => "selection",
        }
    }

    pub fn context(&self) -> &InteractionContext {
        match self {
            ComponentEvent::ButtonPress(ctx) | ComponentEvent::Selection(ctx) => ctx,
        }
    }

    pub fn context_mut(&mut self) -> &mut InteractionContext {
        match self {
            ComponentEvent::ButtonPress(ctx) | ComponentEvent::Selection(ctx) => ctx,
        }
    }

    pub fn into_context(self) -> InteractionContext {
        match self {
            ComponentEvent::ButtonPress(ctx) | ComponentEvent::Selection(ctx) => ctx,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Looks up guilds and channels the interaction payload only names by id,
/// typically from a cache kept by the gateway owner.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn guild(&self, id: Id<GuildMarker>) -> Option<Guild>;
    async fn channel(&self, id: Id<ChannelMarker>) -> Option<Channel>;
}

/// Resolves nothing; contexts only carry ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl Resolver for NoopResolver {
    async fn guild(&self, _id: Id<GuildMarker>) -> Option<Guild> {
        None
    }

    async fn channel(&self, _id: Id<ChannelMarker>) -> Option<Channel> {
        None
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    transport: SharedTransport,
    payloads: Arc<PayloadBuilder>,
    resolver: Arc<dyn Resolver>,
    events: async_channel::Sender<ComponentEvent>,
}

impl Dispatcher {
    /// A dispatcher and the receiving end of its notifications.
    pub fn new(
        transport: SharedTransport,
        payloads: PayloadBuilder,
    ) -> (Self, async_channel::Receiver<ComponentEvent>) {
        let (events, rx) = async_channel::unbounded();
        let dispatcher = Self {
            transport,
            payloads: Arc::new(payloads),
            resolver: Arc::new(NoopResolver),
            events,
        };
        (dispatcher, rx)
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// A sender for new channel messages sharing this dispatcher's transport
    /// and defaults.
    pub fn sender(&self) -> ComponentSender {
        ComponentSender::new(self.transport.clone(), self.payloads.clone())
    }

    /// Process one gateway envelope. Returns whether a notification was
    /// emitted.
    pub async fn handle(&self, payload: GatewayPayload) -> bool {
        if payload.t.as_deref() != Some(INTERACTION_CREATE) {
            trace!(event = ?payload.t, "ignoring non-interaction event");
            return false;
        }
        let Some(d) = payload.d.filter(|d| !d.is_null()) else {
            trace!("ignoring interaction without data");
            return false;
        };
        if !is_component_interaction(&d) {
            trace!("ignoring non-component interaction");
            return false;
        }

        let Some(event) = self.build_event(&d).await else {
            return false;
        };

        debug!(
            event = event.name(),
            custom_id = %event.context().custom_id,
            "dispatching component interaction"
        );
        if self.events.send(event).await.is_err() {
            warn!("component event receiver dropped");
            return false;
        }
        true
    }

    async fn build_event(&self, d: &Value) -> Option<ComponentEvent> {
        let data = d.get("data");
        let component_type = data
            .and_then(|data| data.get("component_type"))
            .and_then(Value::as_u64)
            .map(ComponentType::try_from);

        let component_type = match component_type {
            Some(Ok(kind @ (ComponentType::Button | ComponentType::SelectMenu))) => kind,
            other => {
                debug!(component_type = ?other, "ignoring unsupported component type");
                return None;
            }
        };

        let interaction_id = field_id(d, "id");
        let token = d.get("token").and_then(Value::as_str);
        let (Some(interaction_id), Some(token)) = (interaction_id, token) else {
            warn!("interaction without id or token");
            return None;
        };

        let Some(custom_id) = data
            .and_then(|data| data.get("custom_id"))
            .and_then(Value::as_str)
        else {
            warn!(interaction = %interaction_id, "component interaction without custom_id");
            return None;
        };

        let member_id = d
            .pointer("/member/user/id")
            .or_else(|| d.pointer("/user/id"))
            .and_then(parse_id);
        let Some(member_id) = member_id else {
            warn!(interaction = %interaction_id, "interaction without an invoking user");
            return None;
        };

        let Some(raw_message) = d.get("message").filter(|m| m.is_object()) else {
            warn!(interaction = %interaction_id, "component interaction without a message");
            return None;
        };
        let Some(message) = self.source_message(raw_message) else {
            warn!(interaction = %interaction_id, "interaction message has no id");
            return None;
        };

        let mut ctx = InteractionContext::new(
            InteractionSource {
                interaction_id,
                token: token.to_string(),
                member_id,
                message,
                custom_id: custom_id.to_string(),
                component_type,
            },
            self.transport.clone(),
            self.payloads.clone(),
        );

        ctx.member = d.get("member").and_then(|member| {
            Member::deserialize(member)
                .map_err(|e| warn!(error = %e, "failed to parse interaction member"))
                .ok()
        });
        ctx.guild_id = field_id(d, "guild_id");
        ctx.channel_id = raw_message
            .get("channel_id")
            .and_then(parse_id)
            .or_else(|| field_id(d, "channel_id"));

        if let Some(guild_id) = ctx.guild_id {
            ctx.guild = self.resolver.guild(guild_id).await;
        }
        if let Some(channel_id) = ctx.channel_id {
            ctx.channel = self.resolver.channel(channel_id).await;
        }

        Some(match component_type {
            ComponentType::SelectMenu => {
                ctx.values = data
                    .and_then(|data| data.get("values"))
                    .and_then(|values| Vec::<String>::deserialize(values).ok())
                    .unwrap_or_default();
                ComponentEvent::Selection(ctx)
            }
            _ => ComponentEvent::ButtonPress(ctx),
        })
    }

    /// Full message when the payload has one, otherwise the id/flags stub.
    fn source_message(&self, raw: &Value) -> Option<SourceMessage> {
        let id: Id<MessageMarker> = field_id(raw, "id")?;
        let flags = raw
            .get("flags")
            .and_then(|flags| MessageFlags::deserialize(flags).ok())
            .unwrap_or_default();

        let is_stub = raw.as_object().is_some_and(|fields| fields.len() <= 2);
        if is_stub {
            return Some(SourceMessage::Partial(PartialMessage::new(id, flags)));
        }

        match ComponentMessage::from_wire(raw, self.transport.clone(), self.payloads.clone()) {
            Ok(message) => Some(SourceMessage::Full(Box::new(message))),
            Err(e) => {
                warn!(message = %id, error = %e, "failed to parse interaction message, using partial");
                Some(SourceMessage::Partial(PartialMessage::new(id, flags)))
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("payloads", &self.payloads)
            .field("receivers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

/// Component interactions name a `custom_id` or arrive on a message with
/// components.
fn is_component_interaction(d: &Value) -> bool {
    let has_custom_id = d.pointer("/data/custom_id").is_some_and(|v| !v.is_null());
    let has_components = d
        .pointer("/message/components")
        .and_then(Value::as_array)
        .is_some_and(|rows| !rows.is_empty());
    has_custom_id || has_components
}

fn parse_id<T>(value: &Value) -> Option<Id<T>> {
    Id::deserialize(value).ok()
}

fn field_id<T>(value: &Value, field: &str) -> Option<Id<T>> {
    value.get(field).and_then(parse_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use futures_lite::future::block_on;
    use serde_json::json;

    fn dispatcher() -> (Dispatcher, async_channel::Receiver<ComponentEvent>) {
        Dispatcher::new(Arc::new(RecordingTransport::new()), PayloadBuilder::new())
    }

    fn interaction(component_type: u64, extra_data: Value) -> Value {
        let mut data = json!({ "custom_id": "pick", "component_type": component_type });
        if let (Some(data), Some(extra)) = (data.as_object_mut(), extra_data.as_object()) {
            data.extend(extra.clone());
        }
        json!({
            "id": "1000",
            "token": "tok",
            "guild_id": "3",
            "member": { "user": { "id": "7", "username": "alice" }, "roles": [] },
            "data": data,
            "message": {
                "id": "50",
                "channel_id": "60",
                "content": "choose",
                "flags": 0,
                "components": [{
                    "type": 1,
                    "components": [{ "type": 2, "style": 1, "label": "A", "custom_id": "pick" }]
                }]
            }
        })
    }

    fn drain(rx: &async_channel::Receiver<ComponentEvent>) -> Vec<ComponentEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    // -- filtering -----------------------------------------------------------

    #[test]
    fn other_events_emit_nothing() {
        let (dispatcher, rx) = dispatcher();
        let payload = GatewayPayload::dispatch("MESSAGE_CREATE", interaction(2, json!({})));
        assert!(!block_on(dispatcher.handle(payload)));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn missing_data_emits_nothing() {
        let (dispatcher, rx) = dispatcher();
        let payload = GatewayPayload {
            op: 0,
            d: None,
            s: Some(3),
            t: Some(INTERACTION_CREATE.to_string()),
        };
        assert!(!block_on(dispatcher.handle(payload)));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn no_custom_id_and_no_components_emits_nothing() {
        let (dispatcher, rx) = dispatcher();
        let d = json!({
            "id": "1000",
            "token": "tok",
            "member": { "user": { "id": "7", "username": "alice" } },
            "data": { "name": "ping", "type": 1 },
            "message": { "id": "50", "flags": 0 }
        });
        assert!(!block_on(dispatcher.handle(GatewayPayload::dispatch(INTERACTION_CREATE, d))));
        assert!(drain(&rx).is_empty());
    }

    // -- notifications -------------------------------------------------------

    #[test]
    fn button_emits_one_button_press() {
        let (dispatcher, rx) = dispatcher();
        let payload = GatewayPayload::dispatch(INTERACTION_CREATE, interaction(2, json!({})));
        assert!(block_on(dispatcher.handle(payload)));

        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "button_press");

        let ctx = events[0].context();
        assert_eq!(ctx.interaction_id, Id::new(1000));
        assert_eq!(ctx.token(), "tok");
        assert_eq!(ctx.member_id, Id::new(7));
        assert_eq!(ctx.guild_id, Some(Id::new(3)));
        assert_eq!(ctx.channel_id, Some(Id::new(60)));
        assert_eq!(ctx.custom_id, "pick");
        assert_eq!(ctx.component_type, ComponentType::Button);
        assert!(ctx.values.is_empty());
        assert!(!ctx.deferred() && !ctx.responded());

        let source = ctx.message.as_full().unwrap();
        assert_eq!(source.components[0].components()[0].custom_id(), "pick");
        assert_eq!(
            ctx.member.as_ref().and_then(|m| m.display_name()),
            Some("alice")
        );
    }

    #[test]
    fn select_emits_one_selection_with_values() {
        let (dispatcher, rx) = dispatcher();
        let d = interaction(3, json!({ "values": ["red", "blue"] }));
        assert!(block_on(dispatcher.handle(GatewayPayload::dispatch(INTERACTION_CREATE, d))));

        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "selection");
        assert_eq!(events[0].context().values, vec!["red", "blue"]);
    }

    #[test]
    fn unknown_component_type_emits_nothing() {
        let (dispatcher, rx) = dispatcher();
        let d = interaction(4, json!({}));
        assert!(!block_on(dispatcher.handle(GatewayPayload::dispatch(INTERACTION_CREATE, d))));
        assert!(drain(&rx).is_empty());
    }

    // -- fallbacks -----------------------------------------------------------

    #[test]
    fn two_field_message_becomes_partial() {
        let (dispatcher, rx) = dispatcher();
        let mut d = interaction(2, json!({}));
        d["message"] = json!({ "id": "51", "flags": 64 });
        d["channel_id"] = json!("61");
        block_on(dispatcher.handle(GatewayPayload::dispatch(INTERACTION_CREATE, d)));

        let events = drain(&rx);
        let ctx = events[0].context();
        assert!(matches!(
            ctx.message,
            SourceMessage::Partial(PartialMessage { ephemeral: true, .. })
        ));
        assert_eq!(ctx.message.id(), Id::new(51));
        assert_eq!(ctx.channel_id, Some(Id::new(61)));
    }

    #[test]
    fn unparseable_message_degrades_to_partial() {
        let (dispatcher, rx) = dispatcher();
        let mut d = interaction(2, json!({}));
        d["message"]["channel_id"] = json!(["not", "an", "id"]);
        block_on(dispatcher.handle(GatewayPayload::dispatch(INTERACTION_CREATE, d)));

        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].context().message, SourceMessage::Partial(_)));
    }

    #[test]
    fn dm_interaction_uses_top_level_user() {
        let (dispatcher, rx) = dispatcher();
        let mut d = interaction(2, json!({}));
        let object = d.as_object_mut().unwrap();
        object.remove("member");
        object.remove("guild_id");
        object.insert("user".into(), json!({ "id": "8", "username": "dm" }));
        block_on(dispatcher.handle(GatewayPayload::dispatch(INTERACTION_CREATE, d)));

        let events = drain(&rx);
        let ctx = events[0].context();
        assert_eq!(ctx.member_id, Id::new(8));
        assert!(ctx.member.is_none());
        assert!(ctx.guild_id.is_none());
    }

    #[test]
    fn resolver_fills_guild_and_channel() {
        struct Fixed;

        #[async_trait]
        impl Resolver for Fixed {
            async fn guild(&self, id: Id<GuildMarker>) -> Option<Guild> {
                Some(Guild {
                    id,
                    name: "home".into(),
                    icon: None,
                    owner_id: None,
                })
            }

            async fn channel(&self, _id: Id<ChannelMarker>) -> Option<Channel> {
                None
            }
        }

        let (dispatcher, rx) = dispatcher();
        let dispatcher = dispatcher.with_resolver(Fixed);
        block_on(dispatcher.handle(GatewayPayload::dispatch(
            INTERACTION_CREATE,
            interaction(2, json!({})),
        )));

        let events = drain(&rx);
        let ctx = events[0].context();
        assert_eq!(ctx.guild.as_ref().map(|g| g.name.as_str()), Some("home"));
        assert!(ctx.channel.is_none());
    }
}
