//! Message components: buttons, select menus and the action rows that hold
//! them.
//!
//! Application code owns these values. Structural rules are enforced by
//! [`ActionRow::add_component`], the only way to grow a row; everything else
//! is plain data with builder-style setters.
//!
//! Conversion to and from the wire JSON lives in [`super::codec`].

use rand::RngCore;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::ComponentError;
use crate::types::id::{marker::EmojiMarker, Id};

/// Maximum number of components in a single action row.
pub const MAX_ROW_COMPONENTS: usize = 5;

/// Random bytes behind a generated custom ID (hex-encoded to 100 chars).
const CUSTOM_ID_BYTES: usize = 50;

/// Generate a custom ID for a component constructed without one.
///
/// The ID is owned by this process, not issued by Discord; 400 bits of
/// entropy keep collisions out of reach for the lifetime of the application.
pub fn generate_custom_id() -> String {
    let mut bytes = [0u8; CUSTOM_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ---------------------------------------------------------------------------
// Discriminants
// ---------------------------------------------------------------------------

/// Wire discriminant of a component (`"type"` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ComponentType {
    ActionRow = 1,
    Button = 2,
    SelectMenu = 3,
}

impl TryFrom<u64> for ComponentType {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ActionRow),
            2 => Ok(Self::Button),
            3 => Ok(Self::SelectMenu),
            other => Err(other),
        }
    }
}

/// Visual style of a [`Button`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
    /// Opens a URL instead of sending an interaction; carries no custom ID.
    Link = 5,
}

// ---------------------------------------------------------------------------
// Emoji
// ---------------------------------------------------------------------------

/// Emoji shown on a button or select option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentEmoji {
    /// A standard unicode emoji, e.g. `"🎲"`.
    Unicode(String),
    /// A guild's custom emoji.
    Custom {
        id: Id<EmojiMarker>,
        name: Option<String>,
        animated: bool,
    },
}

impl ComponentEmoji {
    /// Shorthand for [`ComponentEmoji::Custom`].
    pub fn custom(id: impl Into<Id<EmojiMarker>>, name: impl Into<String>, animated: bool) -> Self {
        Self::Custom {
            id: id.into(),
            name: Some(name.into()),
            animated,
        }
    }
}

impl From<&str> for ComponentEmoji {
    fn from(name: &str) -> Self {
        Self::Unicode(name.to_string())
    }
}

impl From<String> for ComponentEmoji {
    fn from(name: String) -> Self {
        Self::Unicode(name)
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// A clickable button.
///
/// Link buttons carry a `url` and never transmit their `custom_id`; every
/// other style transmits `custom_id` and never the `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub style: ButtonStyle,
    pub label: Option<String>,
    pub emoji: Option<ComponentEmoji>,
    pub custom_id: String,
    pub url: Option<String>,
    pub disabled: bool,
}

impl Button {
    /// Create an enabled button with a generated custom ID.
    pub fn new(style: ButtonStyle, label: impl Into<String>) -> Self {
        Self {
            style,
            label: Some(label.into()),
            emoji: None,
            custom_id: generate_custom_id(),
            url: None,
            disabled: false,
        }
    }

    /// Create a link button.
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(ButtonStyle::Link, label).url(url)
    }

    /// Replace the generated custom ID.
    pub fn custom_id(mut self, custom_id: impl Into<String>) -> Self {
        self.custom_id = custom_id.into();
        self
    }

    pub fn emoji(mut self, emoji: impl Into<ComponentEmoji>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Whether this button opens a URL.
    pub fn is_link(&self) -> bool {
        self.style == ButtonStyle::Link
    }
}

// ---------------------------------------------------------------------------
// Select menu
// ---------------------------------------------------------------------------

/// One choice inside a [`SelectMenu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
    pub emoji: Option<ComponentEmoji>,
    /// Pre-selected when the menu is rendered.
    pub default: bool,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            emoji: None,
            default: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn emoji(mut self, emoji: impl Into<ComponentEmoji>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Mark the option as pre-selected.
    pub fn selected(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

/// A dropdown of [`MenuOption`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub options: Vec<MenuOption>,
    pub placeholder: Option<String>,
    pub min_values: u8,
    pub max_values: u8,
    pub disabled: bool,
}

impl SelectMenu {
    /// Create an empty single-choice menu with a generated custom ID.
    pub fn new() -> Self {
        Self {
            custom_id: generate_custom_id(),
            options: Vec::new(),
            placeholder: None,
            min_values: 1,
            max_values: 1,
            disabled: false,
        }
    }

    /// Replace the generated custom ID.
    pub fn custom_id(mut self, custom_id: impl Into<String>) -> Self {
        self.custom_id = custom_id.into();
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn min_values(mut self, min_values: u8) -> Self {
        self.min_values = min_values;
        self
    }

    pub fn max_values(mut self, max_values: u8) -> Self {
        self.max_values = max_values;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Builder form of [`add_option`](Self::add_option).
    pub fn option(mut self, option: MenuOption) -> Self {
        self.options.push(option);
        self
    }

    /// Append an option. No capacity limit is applied.
    pub fn add_option(&mut self, option: MenuOption) -> &mut Self {
        self.options.push(option);
        self
    }
}

impl Default for SelectMenu {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Any component that can sit inside an [`ActionRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Button(Button),
    SelectMenu(SelectMenu),
}

impl Component {
    pub fn kind(&self) -> ComponentType {
        match self {
            Component::Button(_) => ComponentType::Button,
            Component::SelectMenu(_) => ComponentType::SelectMenu,
        }
    }

    pub fn custom_id(&self) -> &str {
        match self {
            Component::Button(button) => &button.custom_id,
            Component::SelectMenu(menu) => &menu.custom_id,
        }
    }

    pub fn is_disabled(&self) -> bool {
        match self {
            Component::Button(button) => button.disabled,
            Component::SelectMenu(menu) => menu.disabled,
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        match self {
            Component::Button(button) => button.disabled = disabled,
            Component::SelectMenu(menu) => menu.disabled = disabled,
        }
    }
}

impl From<Button> for Component {
    fn from(button: Button) -> Self {
        Component::Button(button)
    }
}

impl From<SelectMenu> for Component {
    fn from(menu: SelectMenu) -> Self {
        Component::SelectMenu(menu)
    }
}

// ---------------------------------------------------------------------------
// Action row
// ---------------------------------------------------------------------------

/// A horizontal row of up to five buttons, or exactly one select menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRow {
    components: Vec<Component>,
}

impl ActionRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a list of components, validating each in turn.
    pub fn with_components<I, C>(components: I) -> Result<Self, ComponentError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Component>,
    {
        let mut row = Self::new();
        for component in components {
            row.add_component(component)?;
        }
        Ok(row)
    }

    /// Rows parsed from Discord are taken as-is.
    pub(crate) fn from_parsed(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// Append a component.
    ///
    /// Fails with [`ComponentError::SelectOnly`] when a select menu would
    /// share the row with anything else, and with
    /// [`ComponentError::TooManyComponents`] when the row is already full.
    pub fn add_component(
        &mut self,
        component: impl Into<Component>,
    ) -> Result<&mut Self, ComponentError> {
        let component = component.into();

        if !self.components.is_empty() {
            if matches!(component, Component::SelectMenu(_)) || self.holds_select() {
                return Err(ComponentError::SelectOnly);
            }
            if self.components.len() >= MAX_ROW_COMPONENTS {
                return Err(ComponentError::TooManyComponents);
            }
        }

        self.components.push(component);
        Ok(self)
    }

    /// Builder form of [`add_component`](Self::add_component).
    pub fn component(mut self, component: impl Into<Component>) -> Result<Self, ComponentError> {
        self.add_component(component)?;
        Ok(self)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Enable or disable every component in the row.
    pub fn set_disabled(&mut self, disabled: bool) {
        for component in &mut self.components {
            component.set_disabled(disabled);
        }
    }

    /// Find a component by custom ID.
    pub fn find(&self, custom_id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.custom_id() == custom_id)
    }

    fn holds_select(&self) -> bool {
        self.components
            .iter()
            .any(|c| matches!(c, Component::SelectMenu(_)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
