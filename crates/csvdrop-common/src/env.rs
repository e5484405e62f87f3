//! Typed access to configuration environment variables
//!
//! An unset variable and an empty one are treated the same way, so that a
//! `.env` line like `CSVDROP_DB_PASSWORD=` falls back to the default instead of
//! producing an empty credential.

use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Result type alias for environment lookups
pub type EnvResult<T> = std::result::Result<T, EnvError>;

/// A variable was present but its value could not be used
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid value '{value}' for {key}: {reason}")]
pub struct EnvError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl EnvError {
    pub fn new(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Read a variable, treating unset, empty and non-UTF-8 values as absent
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Read and parse a variable
///
/// Returns `Ok(None)` when the variable is absent and an error naming the key
/// when it is present but does not parse.
pub fn env_parse<T>(key: &str) -> EnvResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EnvError::new(key, raw.clone(), e.to_string())),
        None => Ok(None),
    }
}

/// Read a boolean flag
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`; anything else yields `default`.
pub fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
        _ => default,
    }
}
