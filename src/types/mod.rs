//! Discord data types used by the component layer.
//!
//! Only what a component interaction touches is modelled: typed snowflake
//! IDs, the component graph and its wire codec, messages, and the inline
//! guild/member data an interaction carries.
//!
//! | Module | Contents |
//! |---|---|
//! | [`id`] | `Id<T>` snowflakes with marker types |
//! | [`component`] | `ActionRow`, `Button`, `SelectMenu`, `MenuOption`, emoji references |
//! | [`codec`] | component ⇄ wire JSON |
//! | [`message`] | `Message`, flags, references, embeds, allowed mentions |
//! | [`guild`] | `User`, `Member`, `Guild`, `Channel` |
//! | [`custom`] | gateway envelope and interaction callback bodies |
//! | [`builders`] | shorthand component constructors |

// ===========================================================================
// Sub-modules
// ===========================================================================

/// Type-safe IDs with marker types.
pub mod id;

/// Components and their structural rules.
pub mod component;

/// Wire JSON encoding and parsing of components.
pub mod codec;

/// Messages, embeds, and mention policies.
pub mod message;

/// Users, members, guilds, and channels.
pub mod guild;

/// Gateway envelope and interaction callback types.
pub mod custom;

/// Shorthand component constructors.
pub mod builders;

// ===========================================================================
// Convenience re-exports
// ===========================================================================

// ---- IDs ------------------------------------------------------------------
pub use self::id::marker::{
    ApplicationMarker, ChannelMarker, EmojiMarker, GuildMarker, InteractionMarker, MessageMarker,
    RoleMarker, UserMarker,
};
pub use self::id::Id;

// ---- Components -----------------------------------------------------------
pub use self::component::{
    ActionRow, Button, ButtonStyle, Component, ComponentEmoji, ComponentType, MenuOption,
    SelectMenu,
};

// ---- Messages -------------------------------------------------------------
pub use self::message::{
    AllowedMentions, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Message,
    MessageFlags, MessageReference, RoleMentions, UserMentions,
};

// ---- Guild ----------------------------------------------------------------
pub use self::guild::{Channel, ChannelType, Guild, Member, User};

// ---- Gateway / callbacks --------------------------------------------------
pub use self::custom::{GatewayPayload, InteractionCallback, InteractionCallbackType};

// ---- Component helpers ----------------------------------------------------
pub use self::builders::{action_row, button, dropdown, link_button};
