//! Typed snowflake IDs.
//!
//! Discord transmits snowflakes as JSON strings, but some payloads (and a lot
//! of hand-written test fixtures) use bare integers. [`Id`] accepts both and
//! always serializes back to the string form.

pub mod marker;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 64-bit snowflake tagged with the kind of resource it identifies.
pub struct Id<T> {
    value: u64,
    phantom: PhantomData<fn(T) -> T>,
}

impl<T> Id<T> {
    /// Wrap a raw snowflake.
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            phantom: PhantomData,
        }
    }

    /// The raw snowflake value.
    pub const fn get(self) -> u64 {
        self.value
    }

    /// Reinterpret the ID under another marker.
    pub const fn cast<New>(self) -> Id<New> {
        Id::new(self.value)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<T> FromStr for Id<T> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self::new)
    }
}

impl<T> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor<T>(PhantomData<fn(T) -> T>);

        impl<T> Visitor<'_> for IdVisitor<T> {
            type Value = Id<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake as a string or integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Id::new(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u64::try_from(value)
                    .map(Id::new)
                    .map_err(|_| E::custom("snowflake must not be negative"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value
                    .parse::<u64>()
                    .map(Id::new)
                    .map_err(|e| E::custom(format!("invalid snowflake {value:?}: {e}")))
            }
        }

        deserializer.deserialize_any(IdVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::marker::{ChannelMarker, MessageMarker};
    use super::Id;
    use serde_test::{assert_de_tokens, assert_tokens, Token};

    #[test]
    fn serializes_as_string() {
        let id = Id::<ChannelMarker>::new(114_941_315_417_899_012);
        assert_tokens(&id, &[Token::Str("114941315417899012")]);
    }

    #[test]
    fn accepts_integer_form() {
        assert_de_tokens(&Id::<MessageMarker>::new(42), &[Token::U64(42)]);
    }

    #[test]
    fn rejects_garbage() {
        let parsed: Result<Id<MessageMarker>, _> = serde_json::from_str("\"abc\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn cast_keeps_value() {
        let id = Id::<MessageMarker>::new(7);
        assert_eq!(id.cast::<ChannelMarker>().get(), 7);
    }
}
