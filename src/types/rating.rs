use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A user's rating of a bot message.
///
/// Ratings only ever take the values -1, 0, and 1.  Any other integer coming
/// from the backend is rejected when it is decoded; a `null` rating means the
/// message was never rated and decodes as [`Rating::Neutral`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    /// Thumbs down.
    Down,
    /// Not rated.
    #[default]
    Neutral,
    /// Thumbs up.
    Up,
}

/// One of the two vote buttons shown under a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    /// The upvote button.
    Up,
    /// The downvote button.
    Down,
}

impl Vote {
    /// The rating this button assigns when it is not already active.
    pub fn rating(self) -> Rating {
        match self {
            Vote::Up => Rating::Up,
            Vote::Down => Rating::Down,
        }
    }
}

impl Rating {
    /// Returns the signed integer stored by the backend.
    pub fn value(self) -> i8 {
        match self {
            Rating::Down => -1,
            Rating::Neutral => 0,
            Rating::Up => 1,
        }
    }

    /// Returns true if `vote`'s button is currently active.
    pub fn is_active(self, vote: Vote) -> bool {
        self == vote.rating()
    }

    /// Applies a click on `vote`'s button.
    ///
    /// Clicking the active button resets the rating to neutral; clicking an
    /// inactive button sets the button's rating.
    pub fn toggle(self, vote: Vote) -> Rating {
        if self.is_active(vote) {
            Rating::Neutral
        } else {
            vote.rating()
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Rating::Down),
            0 => Ok(Rating::Neutral),
            1 => Ok(Rating::Up),
            other => Err(Error::validation(
                format!("rating must be -1, 0, or 1, got {other}"),
                Some("rating".to_string()),
            )),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.value())
    }
}

impl Serialize for Rating {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i8(self.value())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            None => Ok(Rating::Neutral),
            Some(value) => Rating::try_from(value).map_err(serde::de::Error::custom),
        }
    }
}
