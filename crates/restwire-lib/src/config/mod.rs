//! Startup configuration: mapper options plus the listener address.
//!
//! Loaded once from a JSON or YAML file (picked by extension), from the file
//! named by `RESTWIRE_CONFIG`, or left at the defaults. Every section is
//! optional; missing keys keep their default values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{RestwireError, Result};
use crate::json::{JsonProcessor, MapperOptions};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RESTWIRE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address (e.g. "0.0.0.0").
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    /// Returns the socket address string "host:port".
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub mapper: MapperOptions,
    pub server: ServerSettings,
}

enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Format::Json),
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Ok(Format::Yaml)
            }
            _ => Err(RestwireError::Config(format!(
                "Unsupported config file {}: expected .json, .yaml or .yml",
                path.display()
            ))),
        }
    }
}

impl ProcessorConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RestwireError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&contents).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(&contents).map_err(|e| e.to_string()),
        }
        .map_err(|e| {
            RestwireError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load from the file named by `RESTWIRE_CONFIG`, or use the defaults.
    pub fn from_env() -> Result<Self> {
        Self::load_or_default(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// Load `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.mapper
            .validate()
            .map_err(|e| RestwireError::Config(e.to_string()))?;
        if self.server.port == 0 {
            return Err(RestwireError::Config("server port must not be 0".into()));
        }
        Ok(())
    }

    /// Build a processor whose mapper uses these options as its base.
    pub fn processor(&self) -> JsonProcessor {
        JsonProcessor::builder().options(self.mapper.clone()).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::Inclusion;
    use crate::processor::SerializationProcessor;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = ProcessorConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.mapper, MapperOptions::default());
        cfg.validate().expect("default config should be valid");
    }

    #[test]
    fn addr_format() {
        let settings = ServerSettings {
            host: "127.0.0.1".into(),
            port: 3000,
        };
        assert_eq!(settings.addr(), "127.0.0.1:3000");
    }

    #[test]
    fn loads_partial_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(&tmp, "restwire.json", r#"{"mapper":{"indent_output":true}}"#);

        let cfg = ProcessorConfig::load(&path).unwrap();
        assert!(cfg.mapper.indent_output);
        assert!(cfg.mapper.accept_empty_string_as_null);
        assert_eq!(cfg.server, ServerSettings::default());
    }

    #[test]
    fn loads_yaml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(
            &tmp,
            "restwire.yml",
            "mapper:\n  inclusion: always\n  fail_on_unknown_properties: true\nserver:\n  port: 9000\n",
        );

        let cfg = ProcessorConfig::load(&path).unwrap();
        assert_eq!(cfg.mapper.inclusion, Inclusion::Always);
        assert!(cfg.mapper.fail_on_unknown_properties);
        assert_eq!(cfg.server.addr(), "0.0.0.0:9000");
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(&tmp, "restwire.toml", "port = 1");
        let err = ProcessorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported config file"));
    }

    #[test]
    fn rejects_corrupt_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(&tmp, "restwire.json", "not valid json!!!");
        let err = ProcessorConfig::load(&path).unwrap_err();
        assert!(matches!(err, RestwireError::Config(_)));
    }

    #[test]
    fn rejects_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = ProcessorConfig::load(tmp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = ProcessorConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ProcessorConfig::default();
        cfg.mapper.date_format = "%Y-%".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_or_default_without_path() {
        assert_eq!(
            ProcessorConfig::load_or_default(None).unwrap(),
            ProcessorConfig::default()
        );
    }

    #[test]
    fn processor_uses_configured_options() {
        let mut cfg = ProcessorConfig::default();
        cfg.mapper.fail_on_empty_beans = true;

        #[derive(Serialize)]
        struct Nothing;

        let processor = cfg.processor();
        assert!(processor.mapper().options().fail_on_empty_beans);
        assert!(processor.serialize(&Nothing).is_err());
    }
}
