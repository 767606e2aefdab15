//! Hydration configuration.
//!
//! Selects the wire format a [`Hydrator`](crate::hydrate::Hydrator) expects
//! and whether the standard temporal and spatial functions are registered.
//! Loadable from JSON:
//!
//! ```json
//! { "format": { "kind": "json", "version": "rest" }, "builtin_functions": true }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// The only legacy JSON protocol version the pre-pass understands.
pub const SUPPORTED_JSON_VERSION: &str = "rest";

/// Lowest binary protocol version with the `N`/`R`/`r`/`P` structure layouts.
pub const MIN_PACKSTREAM_VERSION: u32 = 1;

/// Wire format and protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireFormat {
    /// Binary tagged structures.
    PackStream {
        #[serde(deserialize_with = "version_number")]
        version: u32,
    },
    /// Legacy REST JSON, normalised before decoding.
    Json { version: String },
}

impl Default for WireFormat {
    fn default() -> Self {
        WireFormat::PackStream { version: MIN_PACKSTREAM_VERSION }
    }
}

impl WireFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, WireFormat::Json { .. })
    }
}

/// Tagged enums buffer their fields, and arbitrary-precision numbers only
/// survive that buffering as `Number`.
fn version_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| D::Error::custom(format!("invalid PackStream version {number}")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationConfig {
    #[serde(default)]
    pub format: WireFormat,
    /// Register the standard temporal and spatial hydration functions.
    #[serde(default)]
    pub builtin_functions: bool,
}

impl HydrationConfig {
    pub fn packstream(version: u32) -> Self {
        Self { format: WireFormat::PackStream { version }, ..Self::default() }
    }

    pub fn json(version: impl Into<String>) -> Self {
        Self { format: WireFormat::Json { version: version.into() }, ..Self::default() }
    }

    pub fn with_builtin_functions(mut self) -> Self {
        self.builtin_functions = true;
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: HydrationConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject protocol versions this crate cannot hydrate.
    pub fn validate(&self) -> Result<()> {
        match &self.format {
            WireFormat::Json { version } if version != SUPPORTED_JSON_VERSION => {
                Err(Error::Configuration(format!("Unsupported JSON version {version:?}")))
            }
            WireFormat::PackStream { version } if *version < MIN_PACKSTREAM_VERSION => {
                Err(Error::Configuration(format!("Unsupported PackStream version {version}")))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_packstream_v1() {
        let config = HydrationConfig::default();
        assert_eq!(config.format, WireFormat::PackStream { version: 1 });
        assert!(!config.builtin_functions);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_version_must_be_rest() {
        assert!(HydrationConfig::json("rest").validate().is_ok());
        assert!(matches!(
            HydrationConfig::json("v2").validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            HydrationConfig::packstream(0).validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let config = HydrationConfig::from_json(
            r#"{"format": {"kind": "json", "version": "rest"}, "builtin_functions": true}"#,
        )
        .unwrap();
        assert!(config.format.is_json());
        assert!(config.builtin_functions);

        assert!(matches!(HydrationConfig::from_json("{}"), Ok(c) if c == HydrationConfig::default()));
        assert!(matches!(HydrationConfig::from_json("{"), Err(Error::Json(_))));
        assert!(matches!(
            HydrationConfig::from_json(r#"{"format": {"kind": "json", "version": "1.0"}}"#),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_packstream_version_from_json() {
        let config = HydrationConfig::from_json(r#"{"format": {"kind": "pack_stream", "version": 3}}"#).unwrap();
        assert_eq!(config.format, WireFormat::PackStream { version: 3 });
        assert!(matches!(
            HydrationConfig::from_json(r#"{"format": {"kind": "pack_stream", "version": 0}}"#),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            HydrationConfig::from_json(r#"{"format": {"kind": "pack_stream", "version": -1}}"#),
            Err(Error::Json(_))
        ));
    }
}
