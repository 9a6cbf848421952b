use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The chat models the backend accepts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageModel {
    /// gpt-3.5-turbo-1106
    #[serde(rename = "gpt-3.5-turbo-1106")]
    Gpt35Turbo1106,

    /// gpt-4-1106-preview
    #[default]
    #[serde(rename = "gpt-4-1106-preview")]
    Gpt4Preview1106,
}

impl LanguageModel {
    /// Every selectable model, in display order.
    pub const ALL: [LanguageModel; 2] =
        [LanguageModel::Gpt35Turbo1106, LanguageModel::Gpt4Preview1106];

    /// Returns the identifier sent to the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageModel::Gpt35Turbo1106 => "gpt-3.5-turbo-1106",
            LanguageModel::Gpt4Preview1106 => "gpt-4-1106-preview",
        }
    }

    /// Returns the other model.
    pub fn toggle(self) -> Self {
        match self {
            LanguageModel::Gpt35Turbo1106 => LanguageModel::Gpt4Preview1106,
            LanguageModel::Gpt4Preview1106 => LanguageModel::Gpt35Turbo1106,
        }
    }
}

impl fmt::Display for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        LanguageModel::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::validation(
                    format!(
                        "unknown language model {s:?}; expected one of {}",
                        LanguageModel::ALL.map(LanguageModel::as_str).join(", ")
                    ),
                    Some("language_model".to_string()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_gpt4() {
        assert_eq!(LanguageModel::default(), LanguageModel::Gpt4Preview1106);
    }

    #[test]
    fn toggle_flips_between_the_two_models() {
        let model = LanguageModel::default();
        assert_eq!(model.toggle(), LanguageModel::Gpt35Turbo1106);
        assert_eq!(model.toggle().toggle(), model);
    }

    #[test]
    fn parses_and_serializes_identifiers() {
        let model: LanguageModel = "gpt-3.5-turbo-1106".parse().unwrap();
        assert_eq!(model, LanguageModel::Gpt35Turbo1106);
        assert_eq!(
            serde_json::to_string(&model).unwrap(),
            r#""gpt-3.5-turbo-1106""#
        );
        assert!("claude".parse::<LanguageModel>().is_err());
    }
}
