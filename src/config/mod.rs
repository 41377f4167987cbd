//! Configuration management for `schoolfix`.
//!
//! Settings are merged from these layers, lowest to highest precedence:
//! - Built-in defaults
//! - YAML file (`schoolfix.yaml` in the working directory, or `--config`)
//! - Environment variables (`SCHOOLFIX_*`)
//! - Command-line flags
//!
//! Every layer is a flat map of dotted keys (`realtime.poll_ms`). The merged
//! map is then parsed into a typed [`Config`]; bad values are errors.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use schoolfix_lib::store::file::DEFAULT_DATA_FILE;
use schoolfix_lib::store::local::DEFAULT_LOCAL_KEY;
use schoolfix_lib::store::realtime::{DEFAULT_POLL_INTERVAL, DEFAULT_ROOT};
use schoolfix_lib::{
    IssueStore, JsonFileStore, LocalStore, MemoryDatabase, RealtimeDatabase, RealtimeStore,
    RestDatabase, Result, StoreError,
};
use tracing::{info, warn};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "schoolfix.yaml";

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

const ENV_PREFIX: &str = "SCHOOLFIX_";

/// Environment variable suffix → config key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("LISTEN", "listen"),
    ("BACKEND", "backend"),
    ("DATA_FILE", "data_file"),
    ("LOCAL_KEY", "local.key"),
    ("REALTIME_URL", "realtime.url"),
    ("REALTIME_AUTH", "realtime.auth"),
    ("REALTIME_ROOT", "realtime.root"),
    ("REALTIME_POLL_MS", "realtime.poll_ms"),
    ("LOG_JSON", "log.json"),
];

/// One configuration source as dotted key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Built-in defaults.
    #[must_use]
    pub fn defaults() -> Self {
        let mut layer = Self::default();
        layer.set("listen", DEFAULT_LISTEN);
        layer.set("backend", BackendKind::File.as_str());
        layer.set("data_file", DEFAULT_DATA_FILE);
        layer.set("local.key", DEFAULT_LOCAL_KEY);
        layer.set("realtime.root", DEFAULT_ROOT);
        layer.set("realtime.poll_ms", DEFAULT_POLL_INTERVAL.as_millis().to_string());
        layer.set("log.json", "false");
        layer
    }

    /// Build a layer from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a YAML mapping.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))
    }

    /// Build a layer from YAML text. Nested mappings become dotted keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a YAML mapping of scalars.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_yaml::Value = serde_yaml::from_str(contents)
            .map_err(|e| StoreError::Config(format!("invalid YAML: {e}")))?;
        let mut layer = Self::default();
        match value {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Mapping(_) => flatten_yaml(&mut layer, "", &value)?,
            _ => {
                return Err(StoreError::Config(
                    "config file must be a mapping".to_string(),
                ));
            }
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs; only `SCHOOLFIX_*` names count.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (name, value) in vars {
            let Some(suffix) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if let Some((_, key)) = ENV_KEYS.iter().find(|(s, _)| *s == suffix) {
                layer.set(*key, value);
            }
        }
        layer
    }
}

fn flatten_yaml(layer: &mut ConfigLayer, prefix: &str, value: &serde_yaml::Value) -> Result<()> {
    use serde_yaml::Value;

    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let Some(key) = key.as_str() else {
                    return Err(StoreError::Config(format!(
                        "non-string key under '{prefix}'"
                    )));
                };
                let full = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(layer, &full, child)?;
            }
        }
        Value::Null => {}
        Value::Bool(b) => layer.set(prefix, b.to_string()),
        Value::Number(n) => layer.set(prefix, n.to_string()),
        Value::String(s) => layer.set(prefix, s.clone()),
        _ => {
            return Err(StoreError::Config(format!(
                "'{prefix}' must be a scalar value"
            )));
        }
    }
    Ok(())
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub backend: Option<String>,
    pub data_file: Option<PathBuf>,
    pub log_json: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(listen) = &self.listen {
            layer.set("listen", listen.clone());
        }
        if let Some(backend) = &self.backend {
            layer.set("backend", backend.clone());
        }
        if let Some(path) = &self.data_file {
            layer.set("data_file", path.to_string_lossy().to_string());
        }
        if let Some(json) = self.log_json {
            layer.set("log.json", json.to_string());
        }
        layer
    }
}

// ============================================================================
// Typed configuration
// ============================================================================

/// Which issue store to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    File,
    Local,
    Realtime,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Local => "local",
            Self::Realtime => "realtime",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "local" | "localstorage" => Ok(Self::Local),
            "realtime" | "firebase" => Ok(Self::Realtime),
            other => Err(StoreError::Config(format!(
                "unknown backend '{other}' (expected file, local or realtime)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Database base URL; `None` uses an in-process database.
    pub url: Option<String>,
    pub auth: Option<String>,
    pub root: String,
    pub poll_interval: Duration,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen: SocketAddr,
    pub backend: BackendKind,
    pub data_file: PathBuf,
    pub local_key: String,
    pub realtime: RealtimeConfig,
    pub log_json: bool,
}

const KNOWN_KEYS: &[&str] = &[
    "listen",
    "backend",
    "data_file",
    "local.key",
    "realtime.url",
    "realtime.auth",
    "realtime.root",
    "realtime.poll_ms",
    "log.json",
];

impl Config {
    /// Parse a merged layer.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unknown keys or values that do not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let mut unknown: Vec<&str> = layer
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| !KNOWN_KEYS.contains(k))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(StoreError::Config(format!(
                "unknown config key(s): {}",
                unknown.join(", ")
            )));
        }

        let listen_raw = layer.get("listen").unwrap_or(DEFAULT_LISTEN);
        let listen = listen_raw.parse().map_err(|_| {
            StoreError::Config(format!("listen must be host:port, got '{listen_raw}'"))
        })?;

        let backend = layer.get("backend").unwrap_or("file").parse()?;

        let data_file = layer
            .get("data_file")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_DATA_FILE);

        let local_key = layer
            .get("local.key")
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(DEFAULT_LOCAL_KEY);

        let poll_ms = match layer.get("realtime.poll_ms") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| {
                    StoreError::Config(format!(
                        "realtime.poll_ms must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(2000),
        };

        let log_json = match layer.get("log.json") {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                StoreError::Config(format!("log.json must be true or false, got '{raw}'"))
            })?,
            None => false,
        };

        Ok(Self {
            listen,
            backend,
            data_file: PathBuf::from(data_file),
            local_key: local_key.to_string(),
            realtime: RealtimeConfig {
                url: non_empty(layer.get("realtime.url")),
                auth: non_empty(layer.get("realtime.auth")),
                root: layer
                    .get("realtime.root")
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or(DEFAULT_ROOT)
                    .to_string(),
                poll_interval: Duration::from_millis(poll_ms),
            },
            log_json,
        })
    }

    /// Load all layers and parse them.
    ///
    /// `config_path` must exist when given; otherwise `schoolfix.yaml` in
    /// the working directory is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or a value is invalid.
    pub fn load(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        let file_layer = match config_path {
            Some(path) => ConfigLayer::from_yaml(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    ConfigLayer::from_yaml(default_path)?
                } else {
                    ConfigLayer::default()
                }
            }
        };

        let merged = ConfigLayer::merge_layers(&[
            ConfigLayer::defaults(),
            file_layer,
            ConfigLayer::from_env(),
            cli.as_layer(),
        ]);
        Self::from_layer(&merged)
    }

    /// Construct the configured store.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the realtime database settings are invalid.
    pub fn open_store(&self) -> Result<Arc<dyn IssueStore>> {
        let store: Arc<dyn IssueStore> = match self.backend {
            BackendKind::File => {
                info!(path = %self.data_file.display(), "using file store");
                Arc::new(JsonFileStore::new(&self.data_file))
            }
            BackendKind::Local => {
                warn!(key = %self.local_key, "using process-local store, data is not persisted");
                Arc::new(LocalStore::new(self.local_key.clone()))
            }
            BackendKind::Realtime => {
                let db: Arc<dyn RealtimeDatabase> = match self.realtime.url {
                    Some(ref url) => {
                        info!(url = %url, root = %self.realtime.root, "using realtime database");
                        Arc::new(RestDatabase::new(
                            url.clone(),
                            self.realtime.auth.clone(),
                            self.realtime.poll_interval,
                        )?)
                    }
                    None => {
                        warn!("realtime.url not set, using an in-process database");
                        Arc::new(MemoryDatabase::new())
                    }
                };
                Arc::new(RealtimeStore::new(db, self.realtime.root.clone()))
            }
        };
        Ok(store)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend: BackendKind::File,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            local_key: DEFAULT_LOCAL_KEY.to_string(),
            realtime: RealtimeConfig {
                url: None,
                auth: None,
                root: DEFAULT_ROOT.to_string(),
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
            log_json: false,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> ConfigLayer {
        ConfigLayer::from_env_vars(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    #[test]
    fn test_defaults_parse_to_default_config() {
        let config = Config::from_layer(&ConfigLayer::defaults()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_yaml_nested_keys_are_flattened() {
        let layer = ConfigLayer::from_yaml_str(
            "backend: realtime\nrealtime:\n  url: https://db.example.org\n  poll_ms: 500\nlog:\n  json: true\n",
        )
        .unwrap();
        assert_eq!(layer.get("realtime.url"), Some("https://db.example.org"));
        assert_eq!(layer.get("realtime.poll_ms"), Some("500"));

        let merged = ConfigLayer::merge_layers(&[ConfigLayer::defaults(), layer]);
        let config = Config::from_layer(&merged).unwrap();
        assert_eq!(config.backend, BackendKind::Realtime);
        assert_eq!(config.realtime.poll_interval, Duration::from_millis(500));
        assert!(config.log_json);
    }

    #[test]
    fn test_precedence_is_defaults_file_env_cli() {
        let file = ConfigLayer::from_yaml_str("listen: 0.0.0.0:8080\nbackend: local\n").unwrap();
        let env_layer = env(&[
            ("SCHOOLFIX_LISTEN", "127.0.0.1:9000"),
            ("UNRELATED", "x"),
        ]);
        let cli = CliOverrides {
            backend: Some("file".to_string()),
            ..Default::default()
        };

        let merged = ConfigLayer::merge_layers(&[
            ConfigLayer::defaults(),
            file,
            env_layer,
            cli.as_layer(),
        ]);
        let config = Config::from_layer(&merged).unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.backend, BackendKind::File);
    }

    #[test]
    fn test_env_maps_nested_keys() {
        let layer = env(&[
            ("SCHOOLFIX_REALTIME_ROOT", "reports"),
            ("SCHOOLFIX_LOCAL_KEY", "k"),
            ("SCHOOLFIX_NOT_A_KEY", "ignored"),
        ]);
        assert_eq!(layer.get("realtime.root"), Some("reports"));
        assert_eq!(layer.get("local.key"), Some("k"));
        assert_eq!(layer.values.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        for (key, value) in [
            ("backend", "postgres"),
            ("listen", "not an address"),
            ("realtime.poll_ms", "0"),
            ("realtime.poll_ms", "soon"),
            ("log.json", "maybe"),
        ] {
            let mut layer = ConfigLayer::defaults();
            layer.set(key, value);
            let err = Config::from_layer(&layer).unwrap_err();
            assert!(matches!(err, StoreError::Config(_)), "{key}={value}");
        }
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let layer = ConfigLayer::from_yaml_str("bakend: file\n").unwrap();
        let err = Config::from_layer(&layer).unwrap_err();
        assert!(err.to_string().contains("bakend"));
    }

    #[test]
    fn test_yaml_must_be_a_mapping_of_scalars() {
        assert!(ConfigLayer::from_yaml_str("- a\n- b\n").is_err());
        assert!(ConfigLayer::from_yaml_str("listen: [1, 2]\n").is_err());
        assert!(ConfigLayer::from_yaml_str("").unwrap().values.is_empty());
    }

    #[tokio::test]
    async fn test_open_store_picks_backend() {
        let mut config = Config::default();
        assert_eq!(config.open_store().unwrap().backend(), "file");

        config.backend = BackendKind::Local;
        assert_eq!(config.open_store().unwrap().backend(), "local");

        config.backend = BackendKind::Realtime;
        assert_eq!(config.open_store().unwrap().backend(), "realtime");

        config.realtime.url = Some("ftp://nope".to_string());
        assert!(config.open_store().is_err());
    }
}
