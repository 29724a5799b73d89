//! Outbound message bodies.
//!
//! [`MessagePayload`] and [`EditMessage`] describe what the caller wants to
//! send; [`PayloadBuilder`] turns them into wire JSON, layering in the
//! process-wide defaults (currently the default allowed-mentions policy).
//! The builder is immutable once constructed and shared behind an `Arc`.

use serde_json::{json, Map, Value};

use crate::http::{FileUpload, RequestBody};
use crate::types::codec::rows_to_wire;
use crate::types::component::ActionRow;
use crate::types::message::{AllowedMentions, Embed, Message, MessageFlags, MessageReference};

// ---------------------------------------------------------------------------
// Payload pieces
// ---------------------------------------------------------------------------

/// Embeds to send.
///
/// `Unspecified` leaves the field out of the body entirely, `Clear` sends an
/// empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Embeds {
    #[default]
    Unspecified,
    Clear,
    Set(Vec<Embed>),
}

impl Embeds {
    /// The list this would leave on the message, if it says anything at all.
    pub fn as_list(&self) -> Option<&[Embed]> {
        match self {
            Embeds::Unspecified => None,
            Embeds::Clear => Some(&[]),
            Embeds::Set(embeds) => Some(embeds),
        }
    }

    fn to_wire(&self) -> Option<Value> {
        self.as_list().map(|embeds| json!(embeds))
    }
}

impl From<Embed> for Embeds {
    fn from(embed: Embed) -> Self {
        Embeds::Set(vec![embed])
    }
}

impl From<Vec<Embed>> for Embeds {
    fn from(embeds: Vec<Embed>) -> Self {
        Embeds::Set(embeds)
    }
}

impl From<Option<Vec<Embed>>> for Embeds {
    fn from(embeds: Option<Vec<Embed>>) -> Self {
        embeds.map_or(Embeds::Clear, Embeds::Set)
    }
}

/// Per-call allowed-mentions override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MentionOverride {
    /// Use the configured default as-is.
    #[default]
    Inherit,
    /// Suppress every mention.
    Suppress,
    /// Merge onto the configured default; fields set here win.
    Policy(AllowedMentions),
}

impl From<AllowedMentions> for MentionOverride {
    fn from(policy: AllowedMentions) -> Self {
        MentionOverride::Policy(policy)
    }
}

/// A message to create: an interaction response, follow-up, or channel send.
#[derive(Debug, Clone, Default)]
pub struct MessagePayload {
    pub content: Option<String>,
    pub components: Vec<ActionRow>,
    pub embeds: Embeds,
    pub tts: bool,
    pub ephemeral: bool,
    pub reply_to: Option<MessageReference>,
    /// Whether replying pings the replied-to author; defaults to `true`.
    pub mention_author: Option<bool>,
    pub allowed_mentions: MentionOverride,
    pub files: Vec<FileUpload>,
}

impl MessagePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn components(mut self, rows: Vec<ActionRow>) -> Self {
        self.components = rows;
        self
    }

    pub fn row(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }

    pub fn embeds(mut self, embeds: impl Into<Embeds>) -> Self {
        self.embeds = embeds.into();
        self
    }

    pub fn tts(mut self, tts: bool) -> Self {
        self.tts = tts;
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn reply_to(mut self, reference: MessageReference) -> Self {
        self.reply_to = Some(reference);
        self
    }

    /// Reply to `message`, carrying its channel and guild along.
    pub fn reply_to_message(self, message: &Message) -> Self {
        self.reply_to(MessageReference::to_message(
            message.id,
            message.channel_id,
            message.guild_id,
        ))
    }

    pub fn mention_author(mut self, mention: bool) -> Self {
        self.mention_author = Some(mention);
        self
    }

    pub fn allowed_mentions(mut self, mentions: impl Into<MentionOverride>) -> Self {
        self.allowed_mentions = mentions.into();
        self
    }

    pub fn suppress_mentions(mut self) -> Self {
        self.allowed_mentions = MentionOverride::Suppress;
        self
    }

    pub fn file(mut self, file: FileUpload) -> Self {
        self.files.push(file);
        self
    }
}

/// Changes to an existing message. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct EditMessage {
    pub content: Option<String>,
    pub embeds: Embeds,
    pub components: Option<Vec<ActionRow>>,
    pub suppress_embeds: Option<bool>,
    pub allowed_mentions: MentionOverride,
    pub files: Vec<FileUpload>,
}

impl EditMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embeds(mut self, embeds: impl Into<Embeds>) -> Self {
        self.embeds = embeds.into();
        self
    }

    pub fn components(mut self, rows: Vec<ActionRow>) -> Self {
        self.components = Some(rows);
        self
    }

    pub fn suppress_embeds(mut self, suppress: bool) -> Self {
        self.suppress_embeds = Some(suppress);
        self
    }

    pub fn allowed_mentions(mut self, mentions: impl Into<MentionOverride>) -> Self {
        self.allowed_mentions = mentions.into();
        self
    }

    pub fn file(mut self, file: FileUpload) -> Self {
        self.files.push(file);
        self
    }

    /// Nothing to send.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.embeds == Embeds::Unspecified
            && self.components.is_none()
            && self.suppress_embeds.is_none()
            && self.allowed_mentions == MentionOverride::Inherit
            && self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// The only place the ephemeral bit is written.
fn ephemeral_flags(ephemeral: bool) -> Option<MessageFlags> {
    ephemeral.then_some(MessageFlags::EPHEMERAL)
}

/// Assembles wire bodies from payloads plus process-wide defaults.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    allowed_mentions: Option<AllowedMentions>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default policy applied to every message unless overridden per call.
    pub fn with_allowed_mentions(mut self, mentions: AllowedMentions) -> Self {
        self.allowed_mentions = Some(mentions);
        self
    }

    pub fn default_allowed_mentions(&self) -> Option<&AllowedMentions> {
        self.allowed_mentions.as_ref()
    }

    /// Resolve a per-call override against the configured default.
    ///
    /// `None` means no policy at all, so the field is left out of the body.
    pub fn resolve_mentions(&self, mention: &MentionOverride) -> Option<AllowedMentions> {
        match mention {
            MentionOverride::Inherit => self.allowed_mentions.clone(),
            MentionOverride::Suppress => Some(AllowedMentions::none()),
            MentionOverride::Policy(policy) => Some(match &self.allowed_mentions {
                Some(default) => default.merge(policy),
                None => policy.clone(),
            }),
        }
    }

    /// Wire body for a new message.
    pub fn build(&self, payload: &MessagePayload) -> Value {
        let mut body = Map::new();
        body.insert("content".into(), json!(payload.content));
        body.insert("components".into(), rows_to_wire(&payload.components));
        body.insert("tts".into(), json!(payload.tts));

        if let Some(embeds) = payload.embeds.to_wire() {
            body.insert("embeds".into(), embeds);
        }
        if let Some(flags) = ephemeral_flags(payload.ephemeral) {
            body.insert("flags".into(), json!(flags));
        }

        let mut mentions = self.resolve_mentions(&payload.allowed_mentions);

        if let Some(reference) = &payload.reply_to {
            body.insert("message_reference".into(), json!(reference));

            let suppressed = payload.allowed_mentions == MentionOverride::Suppress;
            let ping_author = payload.mention_author.unwrap_or(!suppressed);
            let policy = mentions.get_or_insert_with(AllowedMentions::all);
            policy.replied_user = Some(ping_author);
        }

        if let Some(mentions) = mentions {
            body.insert("allowed_mentions".into(), json!(mentions));
        }

        Value::Object(body)
    }

    /// Wire body for the data of a deferred acknowledgement.
    ///
    /// Only the visibility of the eventual response is decided here.
    pub fn build_deferred(&self, ephemeral: bool) -> Option<Value> {
        ephemeral_flags(ephemeral).map(|flags| json!({ "flags": flags }))
    }

    /// Wire body that fills in a deferred response.
    ///
    /// The placeholder already exists, so this is an edit: visibility was
    /// fixed by the deferral, and creation-only fields (`tts`, `flags`,
    /// `message_reference`) are left out.
    pub fn build_fill(&self, payload: &MessagePayload) -> Value {
        let mut body = Map::new();
        body.insert("content".into(), json!(payload.content));
        body.insert("components".into(), rows_to_wire(&payload.components));

        if let Some(embeds) = payload.embeds.to_wire() {
            body.insert("embeds".into(), embeds);
        }
        if let Some(mentions) = self.resolve_mentions(&payload.allowed_mentions) {
            body.insert("allowed_mentions".into(), json!(mentions));
        }

        Value::Object(body)
    }

    /// Wire body for an edit. `current_flags` are the message's flags as
    /// last seen, needed to toggle embed suppression without clobbering the
    /// other bits.
    pub fn build_edit(&self, edit: &EditMessage, current_flags: MessageFlags) -> Value {
        let mut body = Map::new();

        if let Some(content) = &edit.content {
            body.insert("content".into(), json!(content));
        }
        if let Some(embeds) = edit.embeds.to_wire() {
            body.insert("embeds".into(), embeds);
        }
        if let Some(rows) = &edit.components {
            body.insert("components".into(), rows_to_wire(rows));
        }
        if let Some(suppress) = edit.suppress_embeds {
            let mut flags = current_flags;
            flags.set(MessageFlags::SUPPRESS_EMBEDS, suppress);
            body.insert("flags".into(), json!(flags));
        }
        if edit.allowed_mentions != MentionOverride::Inherit {
            if let Some(mentions) = self.resolve_mentions(&edit.allowed_mentions) {
                body.insert("allowed_mentions".into(), json!(mentions));
            }
        }

        Value::Object(body)
    }

    /// [`build`](Self::build) plus the payload's files.
    pub fn request(&self, mut payload: MessagePayload) -> RequestBody {
        let json = self.build(&payload);
        RequestBody::json(json).with_files(std::mem::take(&mut payload.files))
    }

    /// [`build_fill`](Self::build_fill) plus the payload's files.
    pub fn fill_request(&self, mut payload: MessagePayload) -> RequestBody {
        let json = self.build_fill(&payload);
        RequestBody::json(json).with_files(std::mem::take(&mut payload.files))
    }

    /// [`build_edit`](Self::build_edit) plus the edit's files.
    pub fn edit_request(&self, mut edit: EditMessage, current_flags: MessageFlags) -> RequestBody {
        let json = self.build_edit(&edit, current_flags);
        RequestBody::json(json).with_files(std::mem::take(&mut edit.files))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
