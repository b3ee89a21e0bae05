use serde::{Deserialize, Serialize};

/// Telephony call state change.
///
/// Serialized with a `state` tag. `OFFHOOK` is read as [`CallEvent::Active`]
/// and `IDLE` as [`CallEvent::Ended`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallEvent {
    /// Incoming call. The number may be missing or withheld.
    Ringing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        number: Option<String>,
    },
    #[serde(alias = "OFFHOOK")]
    Active,
    #[serde(alias = "IDLE")]
    Ended,
}

impl CallEvent {
    pub fn ringing(number: impl Into<String>) -> Self {
        Self::Ringing {
            number: Some(number.into()),
        }
    }

    /// Ringing without a number on the primary channel.
    pub fn ringing_withheld() -> Self {
        Self::Ringing { number: None }
    }
}
