//! Engine configuration.

use std::cell::RefCell;

use serde::Deserialize;

use crate::error::Result;

/// Environment variable read by [`Config::from_env`].
pub const RETAIN_METADATA_ENV: &str = "BINDERY_RETAIN_METADATA";

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Keep `data-*` binding attributes on rendered elements instead of
    /// stripping them once they have been read.
    pub retain_metadata: bool,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the configuration from the environment. Unset or unrecognised
    /// values fall back to the defaults.
    pub fn from_env() -> Self {
        let retain_metadata = std::env::var(RETAIN_METADATA_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Self { retain_metadata }
    }

    /// Make this the configuration used by renders on the current thread.
    pub fn install(self) {
        tracing::debug!(config = ?self, "installing configuration");
        CONFIG.with_borrow_mut(|config| *config = self);
    }

    /// The configuration installed on the current thread.
    pub fn current() -> Config {
        CONFIG.with_borrow(Clone::clone)
    }
}
