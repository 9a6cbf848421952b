use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Who wrote a message, in the client's vocabulary.
///
/// The backend stores OpenAI-style roles.  `assistant` maps to [`Author::Bot`],
/// `user` to [`Author::User`], and every other role is carried through
/// unchanged as [`Author::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Author {
    /// The person typing queries.
    User,
    /// The chat model, including search queries and search results.
    Bot,
    /// Any other role reported by the backend.
    Other(String),
}

impl Author {
    /// Maps a backend role name to an author.
    pub fn from_role(role: &str) -> Self {
        match role {
            "assistant" | "bot" => Author::Bot,
            "user" => Author::User,
            other => Author::Other(other.to_string()),
        }
    }

    /// Returns the author as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Author::User => "user",
            Author::Bot => "bot",
            Author::Other(role) => role,
        }
    }

    /// Returns true for messages written by the chat model.
    pub fn is_bot(&self) -> bool {
        matches!(self, Author::Bot)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Author {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Author {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let role = String::deserialize(deserializer)?;
        Ok(Author::from_role(&role))
    }
}
