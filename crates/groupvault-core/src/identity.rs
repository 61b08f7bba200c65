//! Opaque chat identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque integer identifying a chat user or a chat/group.
///
/// Telegram hands out signed 64-bit identifiers for both users and
/// chats (group ids are negative). This is the primary key for all
/// persisted state; the JSON state document stores it as a string key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(pub i64);

impl Identity {
    /// Returns the string form used as a JSON map key.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Identity {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for Identity {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}
