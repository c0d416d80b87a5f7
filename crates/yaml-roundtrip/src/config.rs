//! Blank-line preservation mode and the decode/encode options built on it.
//!
//! The process-wide default lives in an [`AtomicBool`]. Readers and writers
//! may carry an explicit override; without one they read the default when an
//! operation runs, not when the instance is constructed.

use core::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

static PRESERVE_BLANK_LINES: AtomicBool = AtomicBool::new(false);

/// Set the process-wide blank-line preservation default.
pub fn set_preserve_blank_lines(enabled: bool) {
    PRESERVE_BLANK_LINES.store(enabled, Ordering::Release);
}

/// The current process-wide blank-line preservation default.
pub fn preserve_blank_lines() -> bool {
    PRESERVE_BLANK_LINES.load(Ordering::Acquire)
}

/// Per-instance preservation setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preservation {
    /// Follow the process-wide default at the time of each operation.
    #[default]
    Inherit,
    Enabled,
    Disabled,
}

impl Preservation {
    /// Resolve to a concrete flag for one decode/encode call.
    pub fn resolve(self) -> bool {
        match self {
            Self::Inherit => preserve_blank_lines(),
            Self::Enabled => true,
            Self::Disabled => false,
        }
    }
}

impl From<bool> for Preservation {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl From<Option<bool>> for Preservation {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Inherit, Self::from)
    }
}

/// Options for reading documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecodeOptions {
    /// Record blank lines on nodes. `None` follows the process default.
    pub preserve_blank_lines: Option<bool>,
}

/// Options for writing documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodeOptions {
    /// Spaces per indentation level.
    pub indent: usize,
    /// Write recorded blank lines. `None` follows the process default.
    pub preserve_blank_lines: Option<bool>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            preserve_blank_lines: None,
        }
    }
}

/// Settings file accepted by the command-line tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RoundtripConfig {
    pub decode: DecodeOptions,
    pub encode: EncodeOptions,
}

impl RoundtripConfig {
    /// Parse a TOML settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_ignores_default() {
        assert!(Preservation::Enabled.resolve());
        assert!(!Preservation::Disabled.resolve());
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Preservation::from(None), Preservation::Inherit);
        assert_eq!(Preservation::from(Some(true)), Preservation::Enabled);
        assert_eq!(Preservation::from(Some(false)), Preservation::Disabled);
    }

    #[test]
    fn parses_toml_config() {
        let config = RoundtripConfig::from_toml(
            "[decode]\npreserveBlankLines = true\n\n[encode]\nindent = 4\n",
        )
        .unwrap();
        assert_eq!(config.decode.preserve_blank_lines, Some(true));
        assert_eq!(config.encode.indent, 4);
        assert_eq!(config.encode.preserve_blank_lines, None);
    }

    #[test]
    fn empty_toml_is_default() {
        let config = RoundtripConfig::from_toml("").unwrap();
        assert_eq!(config, RoundtripConfig::default());
    }
}
