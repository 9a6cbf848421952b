//! Configuration types for the chat application.
//!
//! Values are resolved from, in decreasing precedence, command-line
//! arguments, `CONGRESSGPT_*` environment variables, a YAML file named with
//! `--config`, and built-in defaults.

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_API_BASE;
use crate::error::{Error, Result};
use crate::types::LanguageModel;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ENV_API_BASE: &str = "CONGRESSGPT_API_BASE";
const ENV_SUPABASE_URL: &str = "CONGRESSGPT_SUPABASE_URL";
const ENV_SUPABASE_KEY: &str = "CONGRESSGPT_SUPABASE_KEY";
const ENV_EMAIL: &str = "CONGRESSGPT_EMAIL";
const ENV_PASSWORD: &str = "CONGRESSGPT_PASSWORD";

/// Command-line arguments for the congressgpt-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// YAML file with default settings.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Chat API base URL.
    #[arrrg(
        optional,
        "Chat API base URL (default: http://localhost:8000/api/congressgpt/)",
        "URL"
    )]
    pub api_base: Option<String>,

    /// Supabase project URL.
    #[arrrg(optional, "Supabase project URL", "URL")]
    pub supabase_url: Option<String>,

    /// Language model to use.
    #[arrrg(optional, "Language model (default: gpt-4-1106-preview)", "MODEL")]
    pub model: Option<String>,

    /// Email to sign in with.
    #[arrrg(optional, "Email to sign in with", "EMAIL")]
    pub email: Option<String>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the chat API.
    pub api_base: String,

    /// Supabase project URL, used for sign-in and ratings.
    pub supabase_url: Option<String>,

    /// Supabase public API key.
    pub supabase_key: Option<String>,

    /// The model queries are answered with.
    pub model: LanguageModel,

    /// Email to sign in with; prompted for when unset.
    pub email: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            supabase_url: None,
            supabase_key: None,
            model: LanguageModel::default(),
            email: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            use_color: true,
        }
    }

    /// Resolves the configuration for `args`, reading the process
    /// environment and the file named by `--config`.
    pub fn resolve(args: ChatArgs) -> Result<Self> {
        let config = match args.config.as_deref() {
            Some(path) => Self::load_file(path)?,
            None => Self::new(),
        };
        config
            .with_env_from(|name| std::env::var(name).ok())
            .with_args(args)
    }

    /// Reads a YAML configuration file.  Missing keys take their defaults.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Overrides fields from environment variables looked up with `lookup`.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(api_base) = lookup(ENV_API_BASE) {
            self.api_base = api_base;
        }
        if let Some(url) = lookup(ENV_SUPABASE_URL) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = lookup(ENV_SUPABASE_KEY) {
            self.supabase_key = Some(key);
        }
        if let Some(email) = lookup(ENV_EMAIL) {
            self.email = Some(email);
        }
        self
    }

    /// Overrides fields from command-line arguments.
    pub fn with_args(mut self, args: ChatArgs) -> Result<Self> {
        if let Some(api_base) = args.api_base {
            self.api_base = api_base;
        }
        if let Some(url) = args.supabase_url {
            self.supabase_url = Some(url);
        }
        if let Some(model) = args.model {
            self.model = model.parse()?;
        }
        if let Some(email) = args.email {
            self.email = Some(email);
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if args.no_color {
            self.use_color = false;
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout must be at least one second"));
        }
        Ok(self)
    }

    /// Sets the chat API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the Supabase project URL and key.
    pub fn with_supabase(mut self, url: impl Into<String>, key: impl Into<String>) -> Self {
        self.supabase_url = Some(url.into());
        self.supabase_key = Some(key.into());
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: LanguageModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the sign-in email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the Supabase URL and key, or a configuration error naming
    /// whichever is missing.
    pub fn supabase(&self) -> Result<(&str, &str)> {
        let url = self.supabase_url.as_deref().ok_or_else(|| {
            Error::config(format!("set --supabase-url or {ENV_SUPABASE_URL}"))
        })?;
        let key = self
            .supabase_key
            .as_deref()
            .ok_or_else(|| Error::config(format!("set {ENV_SUPABASE_KEY}")))?;
        Ok((url, key))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the password from `CONGRESSGPT_PASSWORD`, if set.
pub fn password_from_env() -> Option<String> {
    std::env::var(ENV_PASSWORD)
        .ok()
        .filter(|password| !password.is_empty())
}
