// src/config/loader.rs
//! Layered configuration loader
//!
//! Layers, lowest precedence first: compiled defaults, each existing TOML file in
//! path order, then `VTOOL__SECTION__KEY=value` environment variables.

use crate::config::constants::paths;
use crate::config::{validate_config, VtoolConfig};
use crate::error::{VtoolError, VtoolResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`VtoolConfig`] from defaults, files and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader reading `vtool.toml` from the working directory
    pub fn new() -> Self {
        Self::with_paths(vec![PathBuf::from(paths::DEFAULT_CONFIG_FILE)])
    }

    /// Loader reading the given files, in order, instead of the default lookup
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Read overrides from `<prefix>__*` instead of `VTOOL__*`
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Files consulted by [`ConfigLoader::load`]
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Merge every layer, then deserialize and validate
    pub fn load(&self) -> VtoolResult<VtoolConfig> {
        let mut merged = toml::Value::try_from(VtoolConfig::default())?;

        for path in &self.config_paths {
            if !path.exists() {
                debug!(path = %path.display(), "config file absent, skipped");
                continue;
            }
            let overlay = load_config_file(path)?;
            merge_toml_values(&mut merged, overlay);
            debug!(path = %path.display(), "merged config file");
        }

        self.apply_environment_overrides(&mut merged);

        let config: VtoolConfig = merged.try_into()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse and validate one file on its own, on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> VtoolResult<()> {
        let mut merged = toml::Value::try_from(VtoolConfig::default())?;
        merge_toml_values(&mut merged, load_config_file(path.as_ref())?);
        let config: VtoolConfig = merged.try_into()?;
        validate_config(&config)
    }

    /// Write `config` as pretty TOML
    pub fn export_config<P: AsRef<Path>>(&self, config: &VtoolConfig, path: P) -> VtoolResult<()> {
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        let prefix = format!("{}{}", self.env_prefix, paths::ENV_SEPARATOR);
        for (key, value) in std::env::vars() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let path: Vec<String> = rest
                .split(paths::ENV_SEPARATOR)
                .map(str::to_lowercase)
                .collect();
            if path.iter().any(String::is_empty) {
                continue;
            }
            debug!(variable = %key, "environment override");
            set_nested_value(config, &path, parse_env_value(&value));
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_config_file(path: &Path) -> VtoolResult<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| VtoolError::configuration(format!("{}: {}", path.display(), e)))
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Any TOML literal (number, bool, array, quoted string); otherwise the raw string
fn parse_env_value(value: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {}", value))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }
    if let toml::Value::Table(table) = current {
        table.insert(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::analysis_config::WindowType;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn isolated(paths: Vec<PathBuf>, tag: &str) -> ConfigLoader {
        ConfigLoader::with_paths(paths).with_env_prefix(&format!("VTOOL_TEST_{}", tag))
    }

    #[test]
    #[serial]
    fn test_defaults_without_files() {
        let loader = isolated(vec![PathBuf::from("does/not/exist.toml")], "DEFAULTS");
        let config = loader.load().unwrap();
        assert_eq!(config, VtoolConfig::default());
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[analysis]
parallel = false

[analysis.spectral]
df_hz = 0.5
window = "hanning"

[stats]
selections = ["speed", "load"]
"#
        )
        .unwrap();

        let config = isolated(vec![file.path().to_path_buf()], "FILE").load().unwrap();
        assert!(!config.analysis.parallel);
        assert_eq!(config.analysis.spectral.df_hz, 0.5);
        assert_eq!(config.analysis.spectral.window, WindowType::Hann);
        assert_eq!(config.analysis.spectral.overlap_percent, 50.0);
        assert_eq!(config.stats.selections, vec!["speed", "load"]);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        std::env::set_var("VTOOL_TEST_ENV__ANALYSIS__SPECTRAL__DF_HZ", "2");
        std::env::set_var("VTOOL_TEST_ENV__STATS__ARRAY_NAMES", r#"["SIM", "TEST"]"#);

        let config = isolated(vec![], "ENV").load().unwrap();
        assert_eq!(config.analysis.spectral.df_hz, 2.0);
        assert_eq!(config.stats.array_names, vec!["SIM", "TEST"]);

        std::env::remove_var("VTOOL_TEST_ENV__ANALYSIS__SPECTRAL__DF_HZ");
        std::env::remove_var("VTOOL_TEST_ENV__STATS__ARRAY_NAMES");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[analysis.spectral]\ndf_hz = -1.0").unwrap();
        let loader = isolated(vec![], "INVALID");
        let err = loader.validate_config_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("df_hz"));
    }

    #[test]
    #[serial]
    fn test_export_round_trip() {
        let loader = isolated(vec![], "EXPORT");
        let file = NamedTempFile::new().unwrap();
        let mut config = VtoolConfig::default();
        config.analysis.spectral.sample_rate_hz = Some(100.0);
        loader.export_config(&config, file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("[analysis.spectral]"));
        let back = isolated(vec![file.path().to_path_buf()], "EXPORT").load().unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_env_value_parsing() {
        assert_eq!(parse_env_value("4"), toml::Value::Integer(4));
        assert_eq!(parse_env_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_env_value("hann"), toml::Value::String("hann".into()));
    }
}
