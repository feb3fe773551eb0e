//! # Config Loader
//!
//! Turns a TOML or JSON file into a validated [`FusionBlueprint`]. Every section is
//! optional and falls back to its defaults; the blueprint is validated as a whole
//! after decoding, and again by callers after CLI overrides via [`ConfigLoader::validate`].
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), contracts::ContractError> {
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml"))?;
//! println!("tolerance: {}s", blueprint.sync.tolerance_s);
//! # Ok(())
//! # }
//! ```

mod format;
mod validator;

pub use contracts::FusionBlueprint;
pub use format::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, decode and validate a config file; the format comes from the extension
    pub fn load_from_path(path: &Path) -> Result<FusionBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FusionBlueprint, ContractError> {
        let blueprint = format.decode(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// First violated rule, if any
    pub fn validate(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &FusionBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.encode(blueprint)
    }

    pub fn to_json(blueprint: &FusionBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.encode(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::OverflowPolicy;

    const NODE_TOML: &str = r#"
[sync]
tolerance_s = 0.01

[sync.buffer]
max_size = 64
overflow_policy = "reject_newest"

[telemetry]
world_frame_id = "world"

[export]
saving_path = "/tmp/fusion_out/"

[source]
odometry_hz = 20.0
fix_hz = 5.0

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(NODE_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.sync.buffer.max_size, 64);
        assert_eq!(bp.sync.buffer.overflow_policy, OverflowPolicy::RejectNewest);
        assert_eq!(bp.sinks.len(), 1);
    }

    #[test]
    fn test_toml_and_json_agree() {
        let bp = ConfigLoader::load_from_str(NODE_TOML, ConfigFormat::Toml).unwrap();

        let from_toml =
            ConfigLoader::load_from_str(&ConfigLoader::to_toml(&bp).unwrap(), ConfigFormat::Toml)
                .unwrap();
        let from_json =
            ConfigLoader::load_from_str(&ConfigLoader::to_json(&bp).unwrap(), ConfigFormat::Json)
                .unwrap();

        assert_eq!(from_toml, bp);
        assert_eq!(from_json, bp);
    }

    #[test]
    fn test_validation_runs_after_decode() {
        let content = r#"
[[sinks]]
name = "log"
sink_type = "log"

[[sinks]]
name = "log"
sink_type = "file"
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got: {err}");
    }

    #[test]
    fn test_load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, NODE_TOML).unwrap();

        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(bp.telemetry.world_frame_id, "world");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ConfigLoader::load_from_path(Path::new("config.yaml"));
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }
}
