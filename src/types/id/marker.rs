//! Markers for the resource types this crate addresses by ID.
//!
//! Markers themselves perform no logical action, and are only used to
//! ensure that IDs of incorrect types aren't used. If IDs were only 64-bit
//! integers then a message's ID may be erroneously used in the place of where
//! a channel's ID is required; by using markers it can be ensured that only an
//! ID with a [`ChannelMarker`] can be used where a channel's ID is required.

/// Marker for application IDs.
///
/// Follow-up and response-edit webhooks are addressed by the application ID.
#[derive(Debug)]
#[non_exhaustive]
pub struct ApplicationMarker;

/// Marker for channel IDs.
///
/// Types such as [`Channel`] or [`ComponentMessage`] use this ID marker.
///
/// [`Channel`]: crate::types::guild::Channel
/// [`ComponentMessage`]: crate::message::ComponentMessage
#[derive(Debug)]
#[non_exhaustive]
pub struct ChannelMarker;

/// Marker for custom emoji IDs.
///
/// [`ComponentEmoji::Custom`] uses this ID marker.
///
/// [`ComponentEmoji::Custom`]: crate::types::component::ComponentEmoji::Custom
#[derive(Debug)]
#[non_exhaustive]
pub struct EmojiMarker;

/// Marker for guild IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct GuildMarker;

/// Marker for interaction IDs.
///
/// [`InteractionContext`] uses this ID marker.
///
/// [`InteractionContext`]: crate::interaction::InteractionContext
#[derive(Debug)]
#[non_exhaustive]
pub struct InteractionMarker;

/// Marker for message IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct MessageMarker;

/// Marker for role IDs.
///
/// Used by [`AllowedMentions`] role lists.
///
/// [`AllowedMentions`]: crate::types::message::AllowedMentions
#[derive(Debug)]
#[non_exhaustive]
pub struct RoleMarker;

/// Marker for user IDs.
///
/// Types such as [`User`] or [`Member`] use this ID marker.
///
/// [`User`]: crate::types::guild::User
/// [`Member`]: crate::types::guild::Member
#[derive(Debug)]
#[non_exhaustive]
pub struct UserMarker;
