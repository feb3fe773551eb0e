//! Blueprint encodings on disk: TOML and JSON

use std::fmt;
use std::path::Path;

use contracts::{ContractError, FusionBlueprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Case-insensitive extension lookup
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "{}: no file extension, expected .toml or .json",
                path.display()
            ))
        })?;
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!(
                "{}: unsupported extension .{ext}, expected .toml or .json",
                path.display()
            ))
        })
    }

    /// Deserialize a blueprint; missing sections take their defaults
    pub(crate) fn decode(self, content: &str) -> Result<FusionBlueprint, ContractError> {
        let decoded = match self {
            Self::Toml => toml::from_str(content).map_err(boxed),
            Self::Json => serde_json::from_str(content).map_err(boxed),
        };
        decoded.map_err(|e| ContractError::ConfigParse {
            message: format!("{self} decode failed: {e}"),
            source: Some(e),
        })
    }

    pub(crate) fn encode(self, blueprint: &FusionBlueprint) -> Result<String, ContractError> {
        let encoded = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(boxed),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(boxed),
        };
        encoded.map_err(|e| ContractError::ConfigParse {
            message: format!("{self} encode failed: {e}"),
            source: Some(e),
        })
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

fn boxed<E>(e: E) -> Box<dyn std::error::Error + Send + Sync>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(e)
}
