//! Deserializers for columns the backend may send as `null`.

use serde::{Deserialize, Deserializer};

/// Deserialize a boolean flag, treating `null` as `false`.
pub fn bool_or_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Deserialize a string, treating `null` as empty.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "bool_or_false")]
        flag: bool,
        #[serde(default, deserialize_with = "string_or_empty")]
        text: String,
    }

    #[test]
    fn nulls_become_defaults() {
        let row: Row = serde_json::from_str(r#"{"flag":null,"text":null}"#).unwrap();
        assert!(!row.flag);
        assert!(row.text.is_empty());
        let row: Row = serde_json::from_str(r#"{"flag":true,"text":"hi"}"#).unwrap();
        assert!(row.flag);
        assert_eq!(row.text, "hi");
    }
}
