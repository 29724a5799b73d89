//! Message data: the message object itself, flags, references, embeds and
//! the allowed-mentions policy sent with outbound messages.

use bitflags::bitflags;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::guild::User;
use crate::types::id::{
    marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker},
    Id,
};

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Message flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MessageFlags: u64 {
        const CROSSPOSTED = 1;
        const IS_CROSSPOST = 1 << 1;
        const SUPPRESS_EMBEDS = 1 << 2;
        const SOURCE_MESSAGE_DELETED = 1 << 3;
        const URGENT = 1 << 4;
        const HAS_THREAD = 1 << 5;
        /// Only the invoking user can see the message.
        const EPHEMERAL = 1 << 6;
        /// A deferred response that hasn't been filled in yet.
        const LOADING = 1 << 7;
        const SUPPRESS_NOTIFICATIONS = 1 << 12;
    }
}

impl Serialize for MessageFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for MessageFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_bits_retain(u64::deserialize(deserializer)?))
    }
}

/// `null` flags are as good as none.
fn nullable_flags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MessageFlags, D::Error> {
    Ok(Option::<MessageFlags>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Message reference
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

/// A reply / crosspost reference.
///
/// Inbound references are parsed leniently: Discord omits `channel_id` in
/// some payloads and `fail_if_not_exists` defaults to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Id<MessageMarker>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Id<ChannelMarker>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Id<GuildMarker>>,
    #[serde(default = "default_true")]
    pub fail_if_not_exists: bool,
}

impl MessageReference {
    /// Reference pointing at `message_id` in `channel_id`.
    pub fn to_message(
        message_id: Id<MessageMarker>,
        channel_id: Id<ChannelMarker>,
        guild_id: Option<Id<GuildMarker>>,
    ) -> Self {
        Self {
            message_id: Some(message_id),
            channel_id: Some(channel_id),
            guild_id,
            fail_if_not_exists: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A message as returned by the REST API or embedded in an interaction.
///
/// Components are deliberately absent here; [`ComponentMessage`] wraps this
/// type and owns the typed rows.
///
/// [`ComponentMessage`]: crate::message::ComponentMessage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub id: Id<MessageMarker>,
    pub channel_id: Id<ChannelMarker>,
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default, deserialize_with = "nullable_flags")]
    pub flags: MessageFlags,
    #[serde(default)]
    pub message_reference: Option<MessageReference>,
}

// ---------------------------------------------------------------------------
// Embed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url: None,
        });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(EmbedMedia { url: url.into() });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(EmbedMedia { url: url.into() });
        self
    }

    pub fn author(mut self, name: impl Into<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            url: None,
            icon_url: None,
        });
        self
    }

    /// Set the embed timestamp (sent as RFC 3339).
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at.to_rfc3339_opts(SecondsFormat::Millis, true));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbedMedia {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

// ---------------------------------------------------------------------------
// Allowed mentions
// ---------------------------------------------------------------------------

/// Which users a message may ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMentions {
    All,
    /// Only these users; an empty list allows none.
    Only(Vec<Id<UserMarker>>),
}

/// Which roles a message may ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMentions {
    All,
    /// Only these roles; an empty list allows none.
    Only(Vec<Id<RoleMarker>>),
}

/// Allowed-mentions policy.
///
/// Unset fields (`None`) inherit from the policy this one is merged onto;
/// after merging, anything still unset is not allowed to ping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedMentions {
    pub everyone: Option<bool>,
    pub users: Option<UserMentions>,
    pub roles: Option<RoleMentions>,
    pub replied_user: Option<bool>,
}

impl AllowedMentions {
    /// Everything may ping.
    pub fn all() -> Self {
        Self {
            everyone: Some(true),
            users: Some(UserMentions::All),
            roles: Some(RoleMentions::All),
            replied_user: Some(true),
        }
    }

    /// Nothing may ping.
    pub fn none() -> Self {
        Self {
            everyone: Some(false),
            users: Some(UserMentions::Only(Vec::new())),
            roles: Some(RoleMentions::Only(Vec::new())),
            replied_user: Some(false),
        }
    }

    pub fn everyone(mut self, allow: bool) -> Self {
        self.everyone = Some(allow);
        self
    }

    pub fn users(mut self, users: UserMentions) -> Self {
        self.users = Some(users);
        self
    }

    pub fn roles(mut self, roles: RoleMentions) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn replied_user(mut self, allow: bool) -> Self {
        self.replied_user = Some(allow);
        self
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merge(&self, other: &AllowedMentions) -> AllowedMentions {
        AllowedMentions {
            everyone: other.everyone.or(self.everyone),
            users: other.users.clone().or_else(|| self.users.clone()),
            roles: other.roles.clone().or_else(|| self.roles.clone()),
            replied_user: other.replied_user.or(self.replied_user),
        }
    }
}

#[derive(Serialize)]
struct WireAllowedMentions {
    parse: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    users: Vec<Id<UserMarker>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    roles: Vec<Id<RoleMarker>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replied_user: Option<bool>,
}

impl Serialize for AllowedMentions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut parse = Vec::new();
        if self.everyone == Some(true) {
            parse.push("everyone");
        }
        let users = match &self.users {
            Some(UserMentions::All) => {
                parse.push("users");
                Vec::new()
            }
            Some(UserMentions::Only(ids)) => ids.clone(),
            None => Vec::new(),
        };
        let roles = match &self.roles {
            Some(RoleMentions::All) => {
                parse.push("roles");
                Vec::new()
            }
            Some(RoleMentions::Only(ids)) => ids.clone(),
            None => Vec::new(),
        };

        WireAllowedMentions {
            parse,
            users,
            roles,
            replied_user: self.replied_user,
        }
        .serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_round_trip_as_integer() {
        let flags = MessageFlags::EPHEMERAL | MessageFlags::SUPPRESS_EMBEDS;
        assert_eq!(serde_json::to_value(flags).unwrap(), json!(68));
        let parsed: MessageFlags = serde_json::from_value(json!(64)).unwrap();
        assert!(parsed.contains(MessageFlags::EPHEMERAL));
    }

    #[test]
    fn unknown_flag_bits_are_kept() {
        let parsed: MessageFlags = serde_json::from_value(json!(1u64 << 40)).unwrap();
        assert_eq!(parsed.bits(), 1 << 40);
    }

    #[test]
    fn reference_without_channel_parses() {
        let reference: MessageReference =
            serde_json::from_value(json!({ "message_id": "10" })).unwrap();
        assert_eq!(reference.message_id, Some(Id::new(10)));
        assert_eq!(reference.channel_id, None);
        assert!(reference.fail_if_not_exists);
    }

    #[test]
    fn message_with_null_flags_and_reply() {
        let message: Message = serde_json::from_value(json!({
            "id": "175928847299117063",
            "channel_id": "2",
            "content": "hi",
            "flags": null,
            "message_reference": { "message_id": "1", "guild_id": "3" },
        }))
        .unwrap();

        assert!(message.flags.is_empty());
        assert_eq!(
            message.message_reference.as_ref().and_then(|r| r.guild_id),
            Some(Id::new(3))
        );
    }

    #[test]
    fn embed_builder_skips_unset_fields() {
        let embed = Embed::new().title("Report").field("a", "b", true).color(0xFF6600);
        let wire = serde_json::to_value(&embed).unwrap();
        assert_eq!(wire["title"], "Report");
        assert_eq!(wire["fields"][0]["inline"], true);
        assert!(wire.get("description").is_none());
        assert!(wire.get("timestamp").is_none());
    }

    #[test]
    fn embed_timestamp_is_rfc3339() {
        let at = DateTime::from_timestamp(0, 0).unwrap();
        let embed = Embed::new().timestamp(at);
        assert_eq!(embed.timestamp.as_deref(), Some("1970-01-01T00:00:00.000Z"));
    }

    // -- allowed mentions ------------------------------------------------------

    #[test]
    fn all_and_none_policies() {
        assert_eq!(
            serde_json::to_value(AllowedMentions::all()).unwrap(),
            json!({ "parse": ["everyone", "users", "roles"], "replied_user": true })
        );
        assert_eq!(
            serde_json::to_value(AllowedMentions::none()).unwrap(),
            json!({ "parse": [], "replied_user": false })
        );
    }

    #[test]
    fn explicit_lists_are_sent() {
        let policy = AllowedMentions::default()
            .users(UserMentions::Only(vec![Id::new(1), Id::new(2)]))
            .roles(RoleMentions::All);
        assert_eq!(
            serde_json::to_value(policy).unwrap(),
            json!({ "parse": ["roles"], "users": ["1", "2"] })
        );
    }

    #[test]
    fn merge_prefers_override_fields() {
        let base = AllowedMentions::none().roles(RoleMentions::All);
        let merged = base.merge(&AllowedMentions::default().everyone(true));

        assert_eq!(merged.everyone, Some(true));
        assert_eq!(merged.roles, Some(RoleMentions::All));
        assert_eq!(merged.users, Some(UserMentions::Only(Vec::new())));
        assert_eq!(merged.replied_user, Some(false));
    }
}
