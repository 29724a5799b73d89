//! Wire codec for message components.
//!
//! Components serialize through small `Wire*` structs that mirror Discord's
//! JSON schema. Parsing goes the other way and dispatches on the integer
//! `"type"` discriminant: `2` is a button, `3` a select menu, and anything
//! else is dropped.
//!
//! ```ignore
//! let rows = vec![ActionRow::with_components([Button::new(ButtonStyle::Primary, "Hi")])?];
//! let wire = rows_to_wire(&rows);
//! assert_eq!(rows_from_wire(&wire).len(), 1);
//! ```

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{trace, warn};

use crate::types::component::{
    generate_custom_id, ActionRow, Button, ButtonStyle, Component, ComponentEmoji, ComponentType,
    MenuOption, SelectMenu,
};
use crate::types::id::{marker::EmojiMarker, Id};

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEmoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Id<EmojiMarker>>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    animated: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireButton {
    #[serde(rename = "type")]
    kind: ComponentType,
    style: ButtonStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emoji: Option<WireEmoji>,
    #[serde(default)]
    disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMenuOption {
    label: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emoji: Option<WireEmoji>,
    #[serde(default)]
    default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireSelectMenu {
    #[serde(rename = "type")]
    kind: ComponentType,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(default)]
    min_values: Option<u8>,
    #[serde(default)]
    max_values: Option<u8>,
    #[serde(default)]
    options: Vec<WireMenuOption>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
struct WireActionRow<'a> {
    #[serde(rename = "type")]
    kind: ComponentType,
    components: &'a [Component],
}

// ---------------------------------------------------------------------------
// Model -> wire
// ---------------------------------------------------------------------------

impl From<&ComponentEmoji> for WireEmoji {
    fn from(emoji: &ComponentEmoji) -> Self {
        match emoji {
            ComponentEmoji::Unicode(name) => WireEmoji {
                id: None,
                name: Some(name.clone()),
                animated: None,
            },
            ComponentEmoji::Custom { id, name, animated } => WireEmoji {
                id: Some(*id),
                name: name.clone(),
                animated: Some(*animated),
            },
        }
    }
}

impl From<&Button> for WireButton {
    fn from(button: &Button) -> Self {
        let (custom_id, url) = if button.is_link() {
            (None, button.url.clone())
        } else {
            (Some(button.custom_id.clone()), None)
        };

        WireButton {
            kind: ComponentType::Button,
            style: button.style,
            label: button.label.clone(),
            emoji: button.emoji.as_ref().map(WireEmoji::from),
            disabled: button.disabled,
            custom_id,
            url,
        }
    }
}

impl From<&MenuOption> for WireMenuOption {
    fn from(option: &MenuOption) -> Self {
        WireMenuOption {
            label: option.label.clone(),
            value: option.value.clone(),
            description: option.description.clone(),
            emoji: option.emoji.as_ref().map(WireEmoji::from),
            default: option.default,
        }
    }
}

impl From<&SelectMenu> for WireSelectMenu {
    fn from(menu: &SelectMenu) -> Self {
        WireSelectMenu {
            kind: ComponentType::SelectMenu,
            custom_id: Some(menu.custom_id.clone()),
            placeholder: menu.placeholder.clone(),
            min_values: Some(menu.min_values),
            max_values: Some(menu.max_values),
            options: menu.options.iter().map(WireMenuOption::from).collect(),
            disabled: menu.disabled,
        }
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Component::Button(button) => WireButton::from(button).serialize(serializer),
            Component::SelectMenu(menu) => WireSelectMenu::from(menu).serialize(serializer),
        }
    }
}

impl Serialize for ActionRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireActionRow {
            kind: ComponentType::ActionRow,
            components: self.components(),
        }
        .serialize(serializer)
    }
}

impl Serialize for MenuOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireMenuOption::from(self).serialize(serializer)
    }
}

impl Serialize for ComponentEmoji {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEmoji::from(self).serialize(serializer)
    }
}

/// Serialize a single component.
pub fn component_to_wire(component: &Component) -> Value {
    serde_json::json!(component)
}

/// Serialize one action row.
pub fn row_to_wire(row: &ActionRow) -> Value {
    serde_json::json!(row)
}

/// Serialize a message's rows as the `"components"` array.
pub fn rows_to_wire(rows: &[ActionRow]) -> Value {
    Value::Array(rows.iter().map(row_to_wire).collect())
}

// ---------------------------------------------------------------------------
// Wire -> model
// ---------------------------------------------------------------------------

impl WireEmoji {
    fn into_emoji(self) -> Option<ComponentEmoji> {
        match self.id {
            Some(id) => Some(ComponentEmoji::Custom {
                id,
                name: self.name,
                animated: self.animated.unwrap_or(false),
            }),
            None => self.name.map(ComponentEmoji::Unicode),
        }
    }
}

impl From<WireButton> for Button {
    fn from(wire: WireButton) -> Self {
        Button {
            style: wire.style,
            label: wire.label,
            emoji: wire.emoji.and_then(WireEmoji::into_emoji),
            custom_id: wire.custom_id.unwrap_or_else(generate_custom_id),
            url: wire.url,
            disabled: wire.disabled,
        }
    }
}

impl From<WireMenuOption> for MenuOption {
    fn from(wire: WireMenuOption) -> Self {
        MenuOption {
            label: wire.label,
            value: wire.value,
            description: wire.description,
            emoji: wire.emoji.and_then(WireEmoji::into_emoji),
            default: wire.default,
        }
    }
}

impl From<WireSelectMenu> for SelectMenu {
    fn from(wire: WireSelectMenu) -> Self {
        SelectMenu {
            custom_id: wire.custom_id.unwrap_or_else(generate_custom_id),
            options: wire.options.into_iter().map(MenuOption::from).collect(),
            placeholder: wire.placeholder,
            min_values: wire.min_values.unwrap_or(1),
            max_values: wire.max_values.unwrap_or(1),
            disabled: wire.disabled,
        }
    }
}

/// Parse a single component, dropping unsupported or malformed ones.
pub fn component_from_wire(value: &Value) -> Option<Component> {
    let kind = value.get("type").and_then(Value::as_u64);

    match kind.map(ComponentType::try_from) {
        Some(Ok(ComponentType::Button)) => match WireButton::deserialize(value) {
            Ok(wire) => Some(Component::Button(wire.into())),
            Err(e) => {
                warn!(error = %e, "dropping malformed button");
                None
            }
        },
        Some(Ok(ComponentType::SelectMenu)) => match WireSelectMenu::deserialize(value) {
            Ok(wire) => Some(Component::SelectMenu(wire.into())),
            Err(e) => {
                warn!(error = %e, "dropping malformed select menu");
                None
            }
        },
        _ => {
            trace!(kind = ?kind, "dropping unsupported component");
            None
        }
    }
}

/// Parse a message's `"components"` array into action rows.
///
/// Anything that isn't an array yields no rows.
pub fn rows_from_wire(rows: &Value) -> Vec<ActionRow> {
    let Some(rows) = rows.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| {
            let components = row
                .get("components")
                .and_then(Value::as_array)
                .map(|list| list.iter().filter_map(component_from_wire).collect())
                .unwrap_or_default();
            ActionRow::from_parsed(components)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
