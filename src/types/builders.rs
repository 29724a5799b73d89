//! Shorthand constructors for components.
//!
//! Each helper builds a fresh value; nothing is shared between calls, so a
//! row returned by [`action_row`] can be filled without affecting any other.
//!
//! ```ignore
//! let row = action_row([
//!     button(ButtonStyle::Success, "Accept", "accept"),
//!     button(ButtonStyle::Danger, "Decline", "decline"),
//! ])?;
//! ```

use crate::error::ComponentError;
use crate::types::component::{ActionRow, Button, ButtonStyle, Component, MenuOption, SelectMenu};

/// Build an Action Row wrapping other components.
///
/// Fails under the same rules as [`ActionRow::add_component`].
pub fn action_row<I, C>(components: I) -> Result<ActionRow, ComponentError>
where
    I: IntoIterator<Item = C>,
    C: Into<Component>,
{
    ActionRow::with_components(components)
}

/// Build a button component.
///
/// For link buttons (style 5), use [`link_button`] instead.
pub fn button(style: ButtonStyle, label: impl Into<String>, custom_id: impl Into<String>) -> Button {
    Button::new(style, label).custom_id(custom_id)
}

/// Build a link button (style 5, no custom_id on the wire, requires url).
pub fn link_button(label: impl Into<String>, url: impl Into<String>) -> Button {
    Button::link(label, url)
}

/// Build a single-choice select menu.
pub fn dropdown(
    custom_id: impl Into<String>,
    placeholder: impl Into<String>,
    options: impl IntoIterator<Item = MenuOption>,
) -> SelectMenu {
    options.into_iter().fold(
        SelectMenu::new().custom_id(custom_id).placeholder(placeholder),
        SelectMenu::option,
    )
}
