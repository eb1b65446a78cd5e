//! Configuration management for the `idset` binary
use std::path::Path;

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::FileFormat;
use serde::Deserialize;

/// Default bound on how many individual IDs a command may expand a set into.
pub const DEFAULT_MAX_EXPANDED_VALUES: u64 = idset::VALUE_COUNT_LIMIT;

/// Trait for validating configuration values.
trait Validatable {
    /// Validate the configuration values.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Top-level configuration for the binary
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Bounds applied while expanding sets
    pub limits: LimitsConfig,
    /// How results are written to stdout
    pub output: OutputConfig,
}

/// Bounds applied while expanding sets
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LimitsConfig {
    /// The largest number of IDs the `ids` command will materialize
    pub max_expanded_values: u64,
}

impl Validatable for LimitsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_expanded_values == 0 {
            return Err(ConfigError::Message(
                "[limits.max_expanded_values] must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// How results are written to stdout
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    /// Indent JSON output
    pub pretty_json: bool,
    /// Include the command trace in `decode` output even without `--trace`
    pub always_trace: bool,
}

impl Settings {
    /// Loads defaults, then the optional TOML file, then environment
    /// variables.
    ///
    /// The environment variables are prefixed with `IDSET_` and the nested
    /// fields are separated with double underscores, so
    /// `limits.max_expanded_values` is read from
    /// `IDSET_LIMITS__MAX_EXPANDED_VALUES`.
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix("IDSET")
            .separator("__")
            .prefix_separator("_")
            .try_parsing(true);

        let mut cfg_builder = Self::defaults()?;
        if let Some(path) = config_path {
            cfg_builder = cfg_builder.add_source(File::from(path.as_ref()));
        }
        cfg_builder = cfg_builder.add_source(env);

        Self::build(cfg_builder)
    }

    /// Loads defaults overridden by an inline TOML document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let cfg_builder = Self::defaults()?.add_source(File::from_str(document, FileFormat::Toml));
        Self::build(cfg_builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("limits.max_expanded_values", DEFAULT_MAX_EXPANDED_VALUES)?
            .set_default("output.pretty_json", false)?
            .set_default("output.always_trace", false)
    }

    fn build(cfg_builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = cfg_builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(?settings, "loaded configuration");
        Ok(settings)
    }

    /// Perform validation on the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: LimitsConfig {
                max_expanded_values: DEFAULT_MAX_EXPANDED_VALUES,
            },
            output: OutputConfig {
                pretty_json: false,
                always_trace: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_values() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            [limits]
            max_expanded_values = 42

            [output]
            pretty_json = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.limits.max_expanded_values, 42);
        assert!(settings.output.pretty_json);
        assert!(!settings.output.always_trace);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let result = Settings::from_toml("[limits]\nmax_expanded_values = 0\n");
        assert_matches!(result, Err(ConfigError::Message(msg)) if msg.contains("max_expanded_values"));
    }
}
