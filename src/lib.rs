//! Message components and interaction responses for Discord bots.
//!
//! The crate sits between a gateway connection (owned by the caller) and the
//! REST API:
//!
//! - [`types`] models buttons, select menus and action rows, and converts
//!   them to and from Discord's wire JSON.
//! - [`dispatch::Dispatcher`] turns raw `INTERACTION_CREATE` envelopes into
//!   [`dispatch::ComponentEvent`]s.
//! - [`interaction::InteractionContext`] answers one interaction, choosing
//!   the correct REST call from its response state.
//! - [`http::Transport`] is the seam every request goes through; the `io`
//!   feature provides a reqwest-backed implementation.

pub mod dispatch;
pub mod error;
pub mod http;
pub mod interaction;
pub mod message;
pub mod payload;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{ComponentEvent, Dispatcher, NoopResolver, Resolver};
pub use error::{ComponentError, InteractionError};
pub use http::{FileUpload, HttpError, Route, Transport, TransportExt};
pub use interaction::InteractionContext;
pub use message::{ComponentMessage, ComponentSender, InteractionMessage, PartialMessage, SourceMessage};
pub use payload::{EditMessage, Embeds, MentionOverride, MessagePayload, PayloadBuilder};
