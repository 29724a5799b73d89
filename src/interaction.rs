//! Per-interaction response state machine.
//!
//! An [`InteractionContext`] is created for every component interaction and
//! tracks two flags, `deferred` and `responded`. They alone decide which
//! wire operation a call turns into:
//!
//! | call            | state                      | wire operation                       |
//! |-----------------|----------------------------|--------------------------------------|
//! | `respond`       | fresh                      | callback type 4                      |
//! | `respond`       | deferred, not responded    | `PATCH .../messages/@original`       |
//! | `respond`       | responded                  | `POST /webhooks/...` (follow-up)     |
//! | `defer`         | fresh                      | callback type 5, or 6 to edit source |
//! | `edit_original` | not deferred/responded     | callback type 7                      |
//!
//! Misuse (editing the source after deferring, deferring twice, ...) is
//! rejected before any request goes out.
//!
//! The context is not internally synchronized: every state-changing call
//! takes `&mut self`, so a single task owns it while responding.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::InteractionError;
use crate::http::{HttpError, RequestBody, SharedTransport, TransportExt};
use crate::message::{embeds_after, InteractionMessage, ResponseTarget, SourceMessage};
use crate::payload::{EditMessage, Embeds, MessagePayload, PayloadBuilder};
use crate::types::message::MessageFlags;
use crate::types::component::ComponentType;
use crate::types::guild::{Channel, Guild, Member};
use crate::types::id::{
    marker::{ChannelMarker, GuildMarker, InteractionMarker, MessageMarker, UserMarker},
    Id,
};

/// Everything known about one component interaction, plus the handle to
/// answer it.
pub struct InteractionContext {
    pub interaction_id: Id<InteractionMarker>,
    token: String,
    pub member_id: Id<UserMarker>,
    pub member: Option<Member>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub guild: Option<Guild>,
    pub channel_id: Option<Id<ChannelMarker>>,
    pub channel: Option<Channel>,
    pub message: SourceMessage,
    pub custom_id: String,
    pub component_type: ComponentType,
    /// Chosen option values; empty unless `component_type` is a select menu.
    pub values: Vec<String>,
    deferred: bool,
    deferred_ephemeral: bool,
    responded: bool,
    transport: SharedTransport,
    payloads: Arc<PayloadBuilder>,
}

/// Inputs for [`InteractionContext::new`].
pub struct InteractionSource {
    pub interaction_id: Id<InteractionMarker>,
    pub token: String,
    pub member_id: Id<UserMarker>,
    pub message: SourceMessage,
    pub custom_id: String,
    pub component_type: ComponentType,
}

impl InteractionContext {
    pub fn new(
        source: InteractionSource,
        transport: SharedTransport,
        payloads: Arc<PayloadBuilder>,
    ) -> Self {
        Self {
            interaction_id: source.interaction_id,
            token: source.token,
            member_id: source.member_id,
            member: None,
            guild_id: None,
            guild: None,
            channel_id: None,
            channel: None,
            message: source.message,
            custom_id: source.custom_id,
            component_type: source.component_type,
            values: Vec::new(),
            deferred: false,
            deferred_ephemeral: false,
            responded: false,
            transport,
            payloads,
        }
    }

    /// The interaction token, the credential for every follow-up operation.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `<@member_id>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.member_id)
    }

    pub fn deferred(&self) -> bool {
        self.deferred
    }

    pub fn responded(&self) -> bool {
        self.responded
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Send a message for this interaction.
    ///
    /// The first call answers the interaction (or fills in the deferred
    /// placeholder); every later call creates a separate follow-up message.
    ///
    /// A deferred response keeps the visibility chosen in
    /// [`defer`](Self::defer); `ephemeral` and `tts` on `payload` are not sent.
    ///
    /// A follow-up whose response carries no message id fails with
    /// [`HttpError::Serde`] even though Discord delivered it: without the id
    /// the returned handle could not address the right message.
    pub async fn respond(
        &mut self,
        payload: MessagePayload,
    ) -> Result<InteractionMessage, InteractionError> {
        let snapshot = MessagePayload {
            files: Vec::new(),
            ..payload.clone()
        };

        if self.responded {
            return self.follow_up(payload, snapshot).await;
        }

        let ephemeral = if self.deferred {
            debug!(interaction = %self.interaction_id, "filling deferred response");
            let body = self.payloads.fill_request(payload);
            self.transport.edit_response(&self.token, None, body).await?;
            self.deferred_ephemeral
        } else {
            debug!(interaction = %self.interaction_id, "sending initial response");
            let ephemeral = payload.ephemeral;
            let body = self.payloads.request(payload);
            self.transport
                .create_initial_response(self.interaction_id, &self.token, body)
                .await?;
            ephemeral
        };

        self.responded = true;
        Ok(self.handle(&snapshot, ephemeral, ResponseTarget::Original))
    }

    async fn follow_up(
        &mut self,
        payload: MessagePayload,
        snapshot: MessagePayload,
    ) -> Result<InteractionMessage, InteractionError> {
        debug!(interaction = %self.interaction_id, "sending follow-up");
        let ephemeral = payload.ephemeral;
        let body = self.payloads.request(payload);
        let sent = self.transport.create_follow_up(&self.token, body).await?;

        let message_id = follow_up_id(&sent)?;
        Ok(self.handle(&snapshot, ephemeral, ResponseTarget::FollowUp(message_id)))
    }

    /// Acknowledge now and respond later.
    ///
    /// With `edit_original` the platform expects the triggering message to be
    /// edited; otherwise a new message fills the placeholder on the next
    /// [`respond`](Self::respond). `ephemeral` only applies to the latter.
    pub async fn defer(&mut self, ephemeral: bool, edit_original: bool) -> Result<(), InteractionError> {
        if self.responded {
            return Err(InteractionError::AlreadyResponded);
        }
        if self.deferred {
            return Err(InteractionError::AlreadyDeferred);
        }

        let data = if edit_original {
            None
        } else {
            self.payloads.build_deferred(ephemeral)
        };
        let body = RequestBody {
            json: data,
            files: Vec::new(),
        };

        debug!(interaction = %self.interaction_id, ephemeral, edit_original, "deferring");
        self.transport
            .create_deferred_response(self.interaction_id, &self.token, body, edit_original)
            .await?;

        self.deferred = true;
        self.deferred_ephemeral = ephemeral && !edit_original;
        Ok(())
    }

    /// Edit the message the component is attached to, as the interaction's
    /// response.
    ///
    /// Anything `edit` leaves unset keeps the source message's current value.
    /// Fails without a request once the interaction was deferred: a deferred
    /// interaction is resolved through [`respond`](Self::respond).
    pub async fn edit_original(&mut self, edit: EditMessage) -> Result<(), InteractionError> {
        if self.deferred {
            return Err(InteractionError::DeferredEditOriginal);
        }
        if self.responded {
            return Err(InteractionError::AlreadyResponded);
        }

        let mut edit = edit;
        let current_flags = match self.message.as_full() {
            Some(current) => {
                if edit.content.is_none() {
                    edit.content = Some(current.content().to_string());
                }
                if edit.embeds == Embeds::Unspecified {
                    edit.embeds = Embeds::Set(current.embeds().to_vec());
                }
                if edit.components.is_none() {
                    edit.components = Some(current.components.clone());
                }
                current.flags()
            }
            // unknown fields stay off the wire so Discord keeps them
            None if self.message.is_ephemeral() => MessageFlags::EPHEMERAL,
            None => MessageFlags::empty(),
        };

        let content = edit.content.clone();
        let embeds = edit.embeds.clone();
        let components = edit.components.clone();

        debug!(interaction = %self.interaction_id, "editing source message");
        let body = self.payloads.edit_request(edit, current_flags);
        self.transport
            .edit_original_via_callback(self.interaction_id, &self.token, body)
            .await?;

        if let Some(message) = self.message.as_full_mut() {
            if let Some(content) = content {
                message.message.content = content;
            }
            message.message.embeds = embeds_after(&embeds, &message.message.embeds);
            if let Some(components) = components {
                message.components = components;
            }
        }
        self.responded = true;
        Ok(())
    }

    fn handle(
        &self,
        payload: &MessagePayload,
        ephemeral: bool,
        target: ResponseTarget,
    ) -> InteractionMessage {
        InteractionMessage::new(
            payload,
            ephemeral,
            target,
            &self.token,
            self.transport.clone(),
            self.payloads.clone(),
        )
    }
}

fn follow_up_id(sent: &Value) -> Result<Id<MessageMarker>, HttpError> {
    sent.get("id")
        .and_then(|id| match id {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64().map(Id::new),
            _ => None,
        })
        .ok_or_else(|| HttpError::Serde("follow-up response has no message id".to_string()))
}

impl fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction_id", &self.interaction_id)
            .field("token", &"<redacted>")
            .field("member_id", &self.member_id)
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("message", &self.message)
            .field("custom_id", &self.custom_id)
            .field("component_type", &self.component_type)
            .field("values", &self.values)
            .field("deferred", &self.deferred)
            .field("responded", &self.responded)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FileUpload, Route};
    use crate::message::{ComponentMessage, PartialMessage};
    use crate::testing::{RecordingTransport, FIRST_ECHO_ID};
    use crate::types::component::{ActionRow, Button, ButtonStyle};
    use crate::types::message::{Embed, MessageFlags};
    use futures_lite::future::block_on;
    use serde_json::json;

    static_assertions::assert_impl_all!(InteractionContext: Send);

    fn partial_source() -> SourceMessage {
        SourceMessage::Partial(PartialMessage::new(Id::new(50), MessageFlags::empty()))
    }

    fn context_on(transport: Arc<RecordingTransport>, message: SourceMessage) -> InteractionContext {
        InteractionContext::new(
            InteractionSource {
                interaction_id: Id::new(1),
                token: "secret-token".to_string(),
                member_id: Id::new(7),
                message,
                custom_id: "btn".to_string(),
                component_type: ComponentType::Button,
            },
            transport,
            Arc::new(PayloadBuilder::new()),
        )
    }

    fn context() -> (Arc<RecordingTransport>, InteractionContext) {
        let transport = Arc::new(RecordingTransport::new());
        let ctx = context_on(transport.clone(), partial_source());
        (transport, ctx)
    }

    fn callback_type(call: &(Route, Option<serde_json::Value>)) -> Option<u64> {
        call.1.as_ref()?.get("type")?.as_u64()
    }

    // -- respond -------------------------------------------------------------

    #[test]
    fn first_respond_sends_initial_callback() {
        let (transport, mut ctx) = context();
        let message = block_on(ctx.respond(MessagePayload::new().content("hi"))).unwrap();

        assert!(ctx.responded());
        assert!(!ctx.deferred());
        assert_eq!(message.target(), ResponseTarget::Original);
        assert_eq!(message.content.as_deref(), Some("hi"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0].0, Route::InteractionCallback { .. }));
        assert_eq!(callback_type(&calls[0]), Some(4));
    }

    #[test]
    fn second_respond_creates_follow_up() {
        let (transport, mut ctx) = context();
        block_on(ctx.respond(MessagePayload::new().content("one"))).unwrap();
        let second = block_on(ctx.respond(MessagePayload::new().content("two"))).unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1].0, Route::CreateFollowUp { .. }));
        assert_eq!(
            second.target(),
            ResponseTarget::FollowUp(Id::new(FIRST_ECHO_ID))
        );
    }

    #[test]
    fn follow_up_handle_edits_its_own_message() {
        let (transport, mut ctx) = context();
        block_on(ctx.respond(MessagePayload::new().content("one"))).unwrap();
        let mut second = block_on(ctx.respond(MessagePayload::new().content("two"))).unwrap();

        block_on(second.edit(EditMessage::new().content("2"))).unwrap();
        assert!(matches!(
            transport.calls()[2].0,
            Route::EditFollowUp { message_id, .. } if message_id == Id::new(FIRST_ECHO_ID)
        ));
        assert_eq!(second.content.as_deref(), Some("2"));
    }

    #[test]
    fn follow_up_without_id_is_an_error() {
        let (transport, mut ctx) = context();
        block_on(ctx.respond(MessagePayload::new())).unwrap();
        transport.respond_next(json!({ "content": "no id" }));

        let err = block_on(ctx.respond(MessagePayload::new())).unwrap_err();
        assert!(matches!(err, InteractionError::Http(HttpError::Serde(_))));
    }

    #[test]
    fn respond_after_defer_edits_placeholder() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(false, false)).unwrap();
        assert!(ctx.deferred());
        assert!(!ctx.responded());

        block_on(ctx.respond(MessagePayload::new().content("done"))).unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(callback_type(&calls[0]), Some(5));
        assert!(matches!(calls[1].0, Route::EditResponse { .. }));
        assert_eq!(calls[1].1.as_ref().unwrap()["content"], "done");
        assert!(ctx.responded());
    }

    #[test]
    fn deferred_fill_is_an_edit_body() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(false, false)).unwrap();

        let message = block_on(ctx.respond(
            MessagePayload::new().content("x").ephemeral(true).tts(true),
        ))
        .unwrap();

        let calls = transport.calls();
        assert!(matches!(calls[1].0, Route::EditResponse { .. }));
        assert_eq!(calls[1].1, Some(json!({ "content": "x", "components": [] })));
        assert!(!message.ephemeral);
    }

    #[test]
    fn respond_after_update_defer_patches_original() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(true, true)).unwrap();
        let message = block_on(ctx.respond(MessagePayload::new().content("updated"))).unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(callback_type(&calls[0]), Some(6));
        assert!(matches!(calls[1].0, Route::EditResponse { .. }));
        assert!(callback_type(&calls[1]).is_none());
        assert_eq!(message.target(), ResponseTarget::Original);
        assert!(!message.ephemeral);
        assert!(ctx.responded());
    }

    #[test]
    fn ephemeral_defer_makes_response_ephemeral() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(true, false)).unwrap();
        let message = block_on(ctx.respond(MessagePayload::new().content("secret"))).unwrap();

        assert_eq!(
            transport.calls()[0].1,
            Some(json!({ "type": 5, "data": { "flags": 64 } }))
        );
        assert!(message.ephemeral);
        assert!(matches!(
            block_on(message.delete()),
            Err(InteractionError::EphemeralDelete)
        ));
    }

    #[test]
    fn ephemeral_and_tts_land_in_callback_data() {
        let (transport, mut ctx) = context();
        block_on(ctx.respond(MessagePayload::new().content("x").ephemeral(true).tts(false)))
            .unwrap();

        let body = transport.calls()[0].1.clone().unwrap();
        assert_eq!(body["data"]["flags"], 64);
        assert_eq!(body["data"]["tts"], false);
    }

    #[test]
    fn respond_forwards_files() {
        let (transport, mut ctx) = context();
        block_on(ctx.respond(
            MessagePayload::new().file(FileUpload::new("report.txt", b"ok".to_vec())),
        ))
        .unwrap();
        assert_eq!(transport.files(0), vec!["report.txt".to_string()]);
    }

    #[test]
    fn failed_respond_leaves_state_untouched() {
        let (transport, mut ctx) = context();
        transport.fail_next(HttpError::Transport("connection reset".into()));

        assert!(block_on(ctx.respond(MessagePayload::new())).is_err());
        assert!(!ctx.responded());
    }

    // -- defer ---------------------------------------------------------------

    #[test]
    fn defer_edit_original_uses_update_callback() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(true, true)).unwrap();
        assert_eq!(transport.calls()[0].1, Some(json!({ "type": 6 })));
    }

    #[test]
    fn defer_twice_or_after_respond_is_rejected() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(false, false)).unwrap();
        assert!(matches!(
            block_on(ctx.defer(false, false)),
            Err(InteractionError::AlreadyDeferred)
        ));

        let (_, mut answered) = context();
        block_on(answered.respond(MessagePayload::new())).unwrap();
        assert!(matches!(
            block_on(answered.defer(false, false)),
            Err(InteractionError::AlreadyResponded)
        ));
        assert_eq!(transport.calls().len(), 1);
    }

    // -- edit_original -------------------------------------------------------

    #[test]
    fn edit_original_after_defer_fails_without_request() {
        let (transport, mut ctx) = context();
        block_on(ctx.defer(false, false)).unwrap();

        let err = block_on(ctx.edit_original(EditMessage::new().content("x"))).unwrap_err();
        assert!(matches!(err, InteractionError::DeferredEditOriginal));
        assert!(err.to_string().contains("invalid for deferred interactions"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn edit_original_defaults_to_current_message() {
        let transport = Arc::new(RecordingTransport::new());
        let payloads = Arc::new(PayloadBuilder::new());
        let source = ComponentMessage::from_wire(
            &json!({
                "id": "50",
                "channel_id": "60",
                "content": "vote",
                "embeds": [{ "title": "poll" }],
                "components": [{
                    "type": 1,
                    "components": [{ "type": 2, "style": 1, "label": "Yes", "custom_id": "yes" }]
                }]
            }),
            transport.clone(),
            payloads,
        )
        .unwrap();
        let mut ctx = context_on(transport.clone(), SourceMessage::Full(Box::new(source)));

        block_on(ctx.edit_original(EditMessage::new().content("closed"))).unwrap();

        let body = transport.calls()[0].1.clone().unwrap();
        assert_eq!(body["type"], 7);
        assert_eq!(body["data"]["content"], "closed");
        assert_eq!(body["data"]["embeds"][0]["title"], "poll");
        assert_eq!(body["data"]["components"][0]["components"][0]["custom_id"], "yes");

        let local = ctx.message.as_full().unwrap();
        assert_eq!(local.content(), "closed");
        assert_eq!(local.components.len(), 1);
        assert!(ctx.responded());
    }

    #[test]
    fn edit_original_on_partial_source_sends_only_supplied_fields() {
        let (transport, mut ctx) = context();
        block_on(ctx.edit_original(EditMessage::new().content("only content"))).unwrap();

        assert_eq!(
            transport.calls()[0].1,
            Some(json!({ "type": 7, "data": { "content": "only content" } }))
        );
        assert!(ctx.responded());
    }

    #[test]
    fn edit_original_can_replace_components() {
        let (transport, mut ctx) = context();
        let row = ActionRow::new()
            .component(Button::new(ButtonStyle::Secondary, "Done").disabled(true))
            .unwrap();

        block_on(ctx.edit_original(
            EditMessage::new()
                .components(vec![row])
                .embeds(Embed::new().title("t")),
        ))
        .unwrap();

        let body = transport.calls()[0].1.clone().unwrap();
        assert_eq!(body["data"]["components"][0]["components"][0]["disabled"], true);
        assert!(body["data"]["content"].is_null());
    }

    // -- misc ----------------------------------------------------------------

    #[test]
    fn mention_and_redacted_debug() {
        let (_, ctx) = context();
        assert_eq!(ctx.mention(), "<@7>");
        assert_eq!(ctx.token(), "secret-token");
        assert!(!format!("{ctx:?}").contains("secret-token"));
    }
}
