//! Locale context and fallback policy.
//!
//! The current and default locale are carried in an explicit
//! [`LocaleContext`] value that callers thread through resolution and
//! query-building calls.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default locale used when nothing else is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// Rule for picking a substitute value when the requested locale has no row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// No substitution; the value is absent.
    #[default]
    None,
    /// Use the row for the configured default locale.
    AppDefault,
    /// Use the first loaded row, whatever its locale.
    FirstAvailable,
}

impl FallbackPolicy {
    /// Returns the policy's configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AppDefault => "app-default",
            Self::FirstAvailable => "first-available",
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "app-default" | "app_default" | "default" => Ok(Self::AppDefault),
            "first-available" | "first_available" | "any" => Ok(Self::FirstAvailable),
            other => Err(Error::config(format!("unknown fallback policy: {other}"))),
        }
    }
}

/// The locales in effect for one request.
///
/// # Examples
///
/// ```
/// use locale_overlay::core::LocaleContext;
///
/// let ctx = LocaleContext::new("fr", "en");
/// assert_eq!(ctx.current(), "fr");
/// assert_eq!(ctx.default_locale(), "en");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleContext {
    current: String,
    default: String,
}

impl LocaleContext {
    /// Creates a context with explicit current and default locales.
    pub fn new(current: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            default: default.into(),
        }
    }

    /// Creates a context whose current locale is the default locale.
    pub fn with_default(default: impl Into<String>) -> Self {
        let default = default.into();
        Self {
            current: default.clone(),
            default,
        }
    }

    /// Returns a copy of this context switched to another current locale.
    #[must_use]
    pub fn switched_to(&self, current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            default: self.default.clone(),
        }
    }

    /// The locale reads and queries use when none is given.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The locale the `app-default` fallback targets.
    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default
    }
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::with_default(DEFAULT_LOCALE)
    }
}
