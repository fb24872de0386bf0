//! Application configuration.
//!
//! Values resolve in the order defaults, environment, JSON file, then
//! runtime overrides, each layer replacing what the previous one set.

use crate::{
    core::{chunk::ChunkerKind, vector::Distance},
    err,
    error::{RagErr, RagError},
    map_err,
};
use ragkit_embedders::{
    gemini::DEFAULT_GEMINI_MODEL, ollama::DEFAULT_OLLAMA_URL, retry::RetryPolicy, EmbedderKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tracing::{debug, warn};

/// Configuration file loaded by [get_config] unless `RAG_CONFIG_FILE` says otherwise.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const DEFAULT_RETRY_DELAY: f64 = 1.0;

/// Upper bound for `ollama.retry_delay`, in seconds.
const MAX_RETRY_DELAY: f64 = 3600.0;

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    /// Seconds.
    pub request_timeout: u64,
    pub max_retries: u32,
    /// Seconds before the first retry, doubled on every further attempt.
    pub retry_delay: f64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: "bge-m3".to_string(),
            generation_model: "qwen2.5:7b".to_string(),
            request_timeout: 60,
            max_retries: 3,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::try_from_secs_f64(self.retry_delay.max(0.0)).unwrap_or_else(|_| {
            warn!("Invalid retry delay {}, using {DEFAULT_RETRY_DELAY}s", self.retry_delay);
            Duration::from_secs_f64(DEFAULT_RETRY_DELAY)
        });
        RetryPolicy::new(self.max_retries, delay)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub persist_directory: PathBuf,
    pub collection_name: String,
    /// Minimum similarity, in `[0, 1]`, a retrieved chunk needs to be used as context.
    pub similarity_threshold: f32,
    pub distance: Distance,
    pub batch_size: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            persist_directory: PathBuf::from("db/chroma"),
            collection_name: "documents".to_string(),
            similarity_threshold: 0.7,
            distance: Distance::default(),
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub supported_extensions: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub encoding: String,
    pub chunker: ChunkerKind,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            supported_extensions: [".txt", ".md", ".pdf", ".docx"]
                .into_iter()
                .map(String::from)
                .collect(),
            chunk_size: 1000,
            chunk_overlap: 200,
            encoding: "utf-8".to_string(),
            chunker: ChunkerKind::default(),
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    pub format: LogFormat,
    pub file_path: Option<PathBuf>,
    /// Bytes.
    pub max_file_size: u64,
    pub backup_count: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "INFO".to_string(),
            format: LogFormat::default(),
            file_path: Some(PathBuf::from("logs/rag_app.log")),
            max_file_size: 10 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    /// Seconds. 0 disables expiry.
    pub ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("cache"),
            ttl: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Required by the `online` embedder.
    pub api_key: Option<String>,
    pub online_model: String,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            api_key: None,
            online_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama: OllamaConfig,
    pub vector_store: VectorStoreConfig,
    pub document: DocumentConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub embedder: EmbedderConfig,
}

/// Overwrite `$target` with the value of `$var` if the lookup yields one,
/// optionally mapping it first.
macro_rules! from_var {
    ($lookup:ident, $var:literal => $target:expr) => {
        if let Some(val) = $lookup($var) {
            $target = val.into();
        }
    };
    ($lookup:ident, $var:literal => $target:expr, $map:expr) => {
        if let Some(val) = $lookup($var) {
            $target = $map(val);
        }
    };
}

impl AppConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|var| std::env::var(var).ok())
    }

    /// Overlay the variables yielded by `lookup`. Variables it returns
    /// `None` for leave the current value in place.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        from_var!(lookup, "OLLAMA_BASE_URL"         => self.ollama.base_url);
        from_var!(lookup, "OLLAMA_EMBEDDING_MODEL"  => self.ollama.embedding_model);
        from_var!(lookup, "OLLAMA_GENERATION_MODEL" => self.ollama.generation_model);
        from_var!(lookup, "VECTOR_STORE_DIR"        => self.vector_store.persist_directory);
        from_var!(lookup, "LOG_LEVEL"               => self.logging.level);
        from_var!(lookup, "GEMINI_API_KEY"          => self.embedder.api_key, Some);
        from_var!(lookup, "LOGGING_ENABLED"         => self.logging.enabled, |val: String| {
            matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
        });

        if let Some(kind) = lookup("RAG_EMBEDDER") {
            match kind.parse() {
                Ok(kind) => self.embedder.kind = kind,
                Err(e) => warn!("Ignoring RAG_EMBEDDER: {e}"),
            }
        }

        self
    }

    /// Defaults merged with the JSON file at `path`. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RagError> {
        Self::default().merge_file(path)
    }

    /// Merge the JSON object in the file at `path` onto `self`.
    ///
    /// Nested objects are merged key by key, every other value replaces the
    /// current one. Keys the configuration doesn't have are ignored.
    pub fn merge_file(self, path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("Config file '{}' not found, keeping current values", path.display());
            return Ok(self);
        }

        let data: Value = map_err!(serde_json::from_str(&map_err!(std::fs::read_to_string(path))));
        if !data.is_object() {
            return err!(
                ParseConfig,
                "'{}' must contain a JSON object",
                path.display()
            );
        }

        let mut current = map_err!(serde_json::to_value(&self));
        merge(&mut current, &data);

        debug!("Loaded config file '{}'", path.display());

        Self::from_value(current)
    }

    /// Write the configuration as pretty printed JSON, creating parent directories.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            map_err!(std::fs::create_dir_all(parent));
        }

        let json = map_err!(serde_json::to_string_pretty(self));
        map_err!(std::fs::write(path, json));

        Ok(())
    }

    /// Apply runtime overrides. Keys are either a section (`"cache"`), whose
    /// object is merged like a config file, or a dotted field (`"ollama.base_url"`)
    /// that gets replaced. Unknown keys are ignored.
    pub fn apply_overrides(self, overrides: &[(&str, Value)]) -> Result<Self, RagError> {
        if overrides.is_empty() {
            return Ok(self);
        }

        let mut current = map_err!(serde_json::to_value(&self));

        for (key, value) in overrides {
            let target = match key.split_once('.') {
                None => current.get_mut(*key),
                Some((section, field)) if !field.contains('.') => current
                    .get_mut(section)
                    .filter(|s| s.is_object())
                    .and_then(|s| s.get_mut(field)),
                Some(_) => None,
            };

            match target {
                Some(target) if target.is_object() && value.is_object() => merge(target, value),
                Some(target) => *target = value.clone(),
                None => debug!("Ignoring unknown configuration override '{key}'"),
            }
        }

        Self::from_value(current)
    }

    /// Problems that make the configuration unusable. Empty if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        if !self.ollama.base_url.starts_with("http://")
            && !self.ollama.base_url.starts_with("https://")
        {
            errors.push("ollama.base_url must start with http:// or https://".to_string());
        }

        if !(0.0..=MAX_RETRY_DELAY).contains(&self.ollama.retry_delay) {
            errors.push(format!(
                "ollama.retry_delay must be between 0 and {MAX_RETRY_DELAY} seconds"
            ));
        }

        if !(0.0..=1.0).contains(&self.vector_store.similarity_threshold) {
            errors.push("vector_store.similarity_threshold must be between 0 and 1".to_string());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_uppercase().as_str()) {
            errors.push(format!(
                "logging.level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        if self.document.chunk_size == 0 {
            errors.push("document.chunk_size must be greater than 0".to_string());
        } else if self.document.chunk_overlap >= self.document.chunk_size {
            errors.push("document.chunk_overlap must be less than document.chunk_size".to_string());
        }

        if !matches!(
            self.document.encoding.to_lowercase().as_str(),
            "utf-8" | "utf8"
        ) {
            errors.push("document.encoding must be utf-8".to_string());
        }

        if self.embedder.kind == EmbedderKind::Online
            && self.embedder.api_key.as_deref().map_or(true, str::is_empty)
        {
            errors.push("embedder.api_key is required by the online embedder".to_string());
        }

        errors
    }

    fn from_value(value: Value) -> Result<Self, RagError> {
        serde_json::from_value(value)
            .map_err(|e| RagError::new(file!(), line!(), column!(), RagErr::ParseConfig(e.to_string())))
    }
}

fn merge(target: &mut Value, patch: &Value) {
    let (Value::Object(target), Value::Object(patch)) = (target, patch) else {
        return;
    };

    for (key, value) in patch {
        let Some(current) = target.get_mut(key) else {
            debug!("Ignoring unknown configuration key '{key}'");
            continue;
        };

        if current.is_object() && value.is_object() {
            merge(current, value);
        } else {
            *current = value.clone();
        }
    }
}

static CONFIG: RwLock<Option<Arc<AppConfig>>> = RwLock::new(None);

/// The global configuration, loaded from the environment and the file named by
/// `RAG_CONFIG_FILE` (default [DEFAULT_CONFIG_FILE]) on first access.
pub fn get_config() -> Arc<AppConfig> {
    if let Some(config) = CONFIG.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
        return config.clone();
    }

    let mut config = CONFIG.write().unwrap_or_else(PoisonError::into_inner);

    if let Some(config) = config.as_ref() {
        return config.clone();
    }

    let loaded = Arc::new(load());
    *config = Some(loaded.clone());
    loaded
}

/// Replace the global configuration.
pub fn set_config(config: AppConfig) -> Arc<AppConfig> {
    let config = Arc::new(config);
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
    config
}

/// Resolve, override and validate the configuration, then make it global.
///
/// * `path`: Config file to merge onto the environment. When absent, the current
///   global configuration is the starting point.
/// * `overrides`: See [AppConfig::apply_overrides].
pub fn init_config(
    path: Option<&Path>,
    overrides: &[(&str, Value)],
) -> Result<Arc<AppConfig>, RagError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return err!(DoesNotExist, "Config file '{}'", path.display());
            }
            AppConfig::from_env().merge_file(path)?
        }
        None => (*get_config()).clone(),
    };

    let config = config.apply_overrides(overrides)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return err!(ConfigValidation, "{}", errors.join("; "));
    }

    Ok(set_config(config))
}

fn load() -> AppConfig {
    load_with(|var| std::env::var(var).ok())
}

/// Environment variables from `lookup`, then the file named by `RAG_CONFIG_FILE`
/// merged on top.
fn load_with(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    let path = lookup("RAG_CONFIG_FILE").unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = AppConfig::default().with_env(lookup);

    match config.clone().merge_file(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Unable to load config file '{path}', using defaults and environment: {e}");
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!("http://localhost:11434", config.ollama.base_url);
        assert_eq!(0.7, config.vector_store.similarity_threshold);
        assert_eq!(Some(PathBuf::from("logs/rag_app.log")), config.logging.file_path);
    }

    #[test]
    fn validate_reports_every_problem() {
        let mut config = AppConfig::default();
        config.ollama.base_url = "localhost:11434".to_string();
        config.vector_store.similarity_threshold = 1.5;
        config.logging.level = "verbose".to_string();
        config.document.chunk_overlap = 1000;

        let errors = config.validate();

        assert_eq!(4, errors.len());
        assert!(errors[0].contains("base_url"));
        assert!(errors[1].contains("similarity_threshold"));
        assert!(errors[2].contains("DEBUG, INFO, WARNING, ERROR, CRITICAL"));
        assert!(errors[3].contains("chunk_overlap"));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = AppConfig::default();
        config.logging.level = "warning".to_string();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn online_embedder_needs_key() {
        let mut config = AppConfig::default();
        config.embedder.kind = EmbedderKind::Online;
        assert_eq!(1, config.validate().len());

        config.embedder.api_key = Some("key".to_string());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn env_overlays_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OLLAMA_BASE_URL", "http://ollama:11434"),
            ("OLLAMA_GENERATION_MODEL", "llama3"),
            ("VECTOR_STORE_DIR", "/data/vectors"),
            ("LOGGING_ENABLED", "No"),
            ("LOG_LEVEL", "DEBUG"),
            ("RAG_EMBEDDER", "ollama_batch"),
            ("GEMINI_API_KEY", "secret"),
        ]);

        let config = AppConfig::default().with_env(|var| vars.get(var).map(|v| v.to_string()));

        assert_eq!("http://ollama:11434", config.ollama.base_url);
        assert_eq!("bge-m3", config.ollama.embedding_model);
        assert_eq!("llama3", config.ollama.generation_model);
        assert_eq!(PathBuf::from("/data/vectors"), config.vector_store.persist_directory);
        assert!(!config.logging.enabled);
        assert_eq!("DEBUG", config.logging.level);
        assert_eq!(EmbedderKind::OllamaBatch, config.embedder.kind);
        assert_eq!(Some("secret".to_string()), config.embedder.api_key);
    }

    #[test]
    fn env_logging_enabled_accepts_truthy_values() {
        for value in ["true", "1", "YES"] {
            let config = AppConfig::default().with_env(|var| {
                (var == "LOGGING_ENABLED").then(|| value.to_string())
            });
            assert!(config.logging.enabled, "{value}");
        }
    }

    #[test]
    fn env_invalid_embedder_is_ignored() {
        let config = AppConfig::default()
            .with_env(|var| (var == "RAG_EMBEDDER").then(|| "langchain".to_string()));
        assert_eq!(EmbedderKind::OllamaDirect, config.embedder.kind);
    }

    #[test]
    fn from_file_missing_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(dir.path().join("missing.json")).unwrap();
        assert_eq!(AppConfig::default(), config);
    }

    #[test]
    fn merge_file_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            json!({
                "ollama": { "generation_model": "llama3" },
                "document": { "supported_extensions": [".txt"] },
                "logging": { "file_path": null },
                "unknown_section": { "a": 1 },
                "cache": { "unknown_field": true, "ttl": 10 }
            })
            .to_string(),
        )
        .unwrap();

        let base = AppConfig::default().with_env(|var| {
            (var == "OLLAMA_BASE_URL").then(|| "http://env:1".to_string())
        });
        let config = base.merge_file(&path).unwrap();

        assert_eq!("llama3", config.ollama.generation_model);
        assert_eq!("bge-m3", config.ollama.embedding_model);
        assert_eq!("http://env:1", config.ollama.base_url);
        assert_eq!(vec![".txt"], config.document.supported_extensions);
        assert_eq!(1000, config.document.chunk_size);
        assert_eq!(None, config.logging.file_path);
        assert_eq!(10, config.cache.ttl);
        assert!(config.cache.enabled);
    }

    #[test]
    fn merge_file_rejects_wrong_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{ "ollama": { "request_timeout": "soon" } }"#).unwrap();
        let e = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(e.error, RagErr::ParseConfig(_)));

        std::fs::write(&path, "[1, 2]").unwrap();
        let e = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(e.error, RagErr::ParseConfig(_)));
    }

    #[test]
    fn to_file_then_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/config.json");

        let mut config = AppConfig::default();
        config.ollama.generation_model = "通义千问".to_string();
        config.vector_store.distance = Distance::Cosine;
        config.to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("通义千问"));
        assert!(written.contains("\n  \"ollama\": {"));

        assert_eq!(config, AppConfig::from_file(&path).unwrap());
    }

    #[test]
    fn overrides_apply_to_sections_and_fields() {
        let config = AppConfig::default()
            .apply_overrides(&[
                ("ollama.base_url", json!("https://remote:443")),
                ("cache", json!({ "enabled": false })),
                ("vector_store.nope", json!(1)),
                ("a.b.c", json!(1)),
                ("missing", json!(1)),
            ])
            .unwrap();

        assert_eq!("https://remote:443", config.ollama.base_url);
        assert!(!config.cache.enabled);
        assert_eq!(3600, config.cache.ttl);
    }

    #[test]
    fn section_overrides_keep_current_values() {
        let mut config = AppConfig::default();
        config.cache.ttl = 10;
        config.ollama.generation_model = "llama3".to_string();

        let config = config
            .apply_overrides(&[
                ("cache", json!({ "enabled": false })),
                ("ollama", json!({ "max_retries": 7 })),
            ])
            .unwrap();

        assert!(!config.cache.enabled);
        assert_eq!(10, config.cache.ttl);
        assert_eq!(7, config.ollama.max_retries);
        assert_eq!("llama3", config.ollama.generation_model);
    }

    #[test]
    fn retry_delay_is_bounded() {
        let mut config = AppConfig::default();
        config.ollama.retry_delay = 1e20;

        let errors = config.validate();
        assert_eq!(1, errors.len());
        assert!(errors[0].contains("retry_delay"));

        // Must not panic even when validation is skipped.
        let policy = config.ollama.retry_policy();
        assert_eq!(RetryPolicy::new(3, Duration::from_secs(1)), policy);
    }

    #[test]
    fn load_merges_config_file_over_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{ "ollama": { "base_url": "http://file:1" }, "cache": { "ttl": 42 } }"#,
        )
        .unwrap();

        let vars: HashMap<&str, String> = HashMap::from([
            ("RAG_CONFIG_FILE", path.display().to_string()),
            ("OLLAMA_BASE_URL", "http://env:1".to_string()),
            ("OLLAMA_GENERATION_MODEL", "llama3".to_string()),
        ]);
        let config = load_with(|var| vars.get(var).cloned());

        assert_eq!("http://file:1", config.ollama.base_url);
        assert_eq!("llama3", config.ollama.generation_model);
        assert_eq!(42, config.cache.ttl);
    }

    #[test]
    fn load_falls_back_to_environment_on_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let vars: HashMap<&str, String> = HashMap::from([
            ("RAG_CONFIG_FILE", path.display().to_string()),
            ("OLLAMA_BASE_URL", "http://env:1".to_string()),
        ]);
        let config = load_with(|var| vars.get(var).cloned());

        assert_eq!("http://env:1", config.ollama.base_url);
        assert_eq!(3600, config.cache.ttl);
    }

    #[test]
    fn overrides_with_wrong_types_fail() {
        let e = AppConfig::default()
            .apply_overrides(&[("document.chunk_size", json!("big"))])
            .unwrap_err();
        assert!(matches!(e.error, RagErr::ParseConfig(_)));
    }

    #[test]
    fn init_config_validates_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "ollama": { "generation_model": "from-file" } }"#).unwrap();

        let e = init_config(
            Some(&path),
            &[("vector_store.similarity_threshold", json!(2.0))],
        )
        .unwrap_err();
        assert!(matches!(e.error, RagErr::ConfigValidation(_)));

        let config = init_config(Some(&path), &[("cache.ttl", json!(5))]).unwrap();
        assert_eq!("from-file", config.ollama.generation_model);
        assert_eq!(5, config.cache.ttl);
        assert_eq!(config, get_config());

        let missing = init_config(Some(&dir.path().join("nope.json")), &[]).unwrap_err();
        assert!(matches!(missing.error, RagErr::DoesNotExist(_)));
    }
}
