//! CLI & Config Layer (C10, ambient): an optional TOML/JSON overlay for
//! `CliArgs`, loaded the way the teacher's `config/loader.rs` resolves a
//! path (explicit `--config`, else a default file in the working
//! directory) and parsed by file extension.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// The subset of `CliArgs` a config file may set. Every field is optional:
/// an explicit CLI flag always overrides the matching config value (the
/// teacher's `config/apply.rs` "CLI wins" rule).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub file: Option<String>,
    pub method: Option<String>,
    pub protocol: Option<String>,
    pub headers: Option<Vec<String>>,
    pub body: Option<String>,
    pub bodytype: Option<String>,
    pub basic_auth: Option<String>,
    pub n: Option<u64>,
    pub c: Option<u64>,
    pub qps: Option<u64>,
    pub duration: Option<String>,
    pub timeout_ms: Option<u64>,
    pub proxy: Option<String>,
    pub disable_compression: Option<bool>,
    pub disable_keepalive: Option<bool>,
    pub cpus: Option<usize>,
    pub output: Option<String>,
    pub verbose: Option<u8>,
    pub listen: Option<String>,
    pub workers: Option<Vec<String>>,
}

/// Loads a config file from `path`, or from `strest.toml`/`strest.json` in
/// the working directory when `path` is `None`. Returns `Ok(None)` when no
/// path was given and neither default file exists.
///
/// # Errors
///
/// Returns a `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(load_config_file(Path::new(path))?));
    }
    let toml_path = PathBuf::from("strest.toml");
    if toml_path.exists() {
        return Ok(Some(load_config_file(&toml_path)?));
    }
    let json_path = PathBuf::from("strest.json");
    if json_path.exists() {
        return Ok(Some(load_config_file(&json_path)?));
    }
    Ok(None)
}

fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        }),
        Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::ParseJson {
            path: path.to_path_buf(),
            source,
        }),
        other => Err(ConfigError::UnsupportedExtension {
            ext: other.unwrap_or_default().to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_unknown_extension() {
        let dir = std::env::temp_dir();
        let path = dir.join("strest_config_test.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "url: http://x").unwrap();
        let result = load_config(Some(path.to_string_lossy().as_ref()));
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedExtension { .. })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn loads_toml_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("strest_config_test.toml");
        std::fs::write(&path, "url = \"http://example.invalid\"\nn = 10\nc = 2\n").unwrap();
        let config = load_config(Some(path.to_string_lossy().as_ref()))
            .unwrap()
            .unwrap();
        assert_eq!(config.url.as_deref(), Some("http://example.invalid"));
        assert_eq!(config.n, Some(10));
        let _ = std::fs::remove_file(&path);
    }
}
