use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segmentation::RfmWeights;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub segmentation: SegmentationConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct SegmentationConfig {
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub weights: RfmWeights,
    pub labels: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub top_n: usize,
    pub click_weight: f64,
    pub cart_weight: f64,
    pub purchase_weight: f64,
    pub segment_boost: f64,
    pub fallback_confidence: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    Ollama,
    Hash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub embedding_provider: Option<EmbeddingProvider>,
    pub embedding_model: Option<String>,
    pub recommendation_top_n: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopsight.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "tinyllama".to_string(),
                dimension: 32,
                timeout_secs: 30,
                max_retries: 2,
            },
            segmentation: SegmentationConfig {
                clusters: 4,
                seed: 42,
                max_iterations: 100,
                weights: RfmWeights::default(),
                labels: vec![
                    "at_risk".to_string(),
                    "occasional".to_string(),
                    "loyal".to_string(),
                    "champion".to_string(),
                ],
            },
            recommendation: RecommendationConfig {
                top_n: 5,
                click_weight: 1.0,
                cart_weight: 2.0,
                purchase_weight: 3.0,
                segment_boost: 1.2,
                fallback_confidence: 0.5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            other => Err(ConfigError::Validation(format!(
                "unsupported embedding provider `{other}` (expected ollama|hash)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopsight.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider;
            }
            if let Some(api_key_value) = embedding.api_key {
                self.embedding.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = Some(base_url);
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(dimension) = embedding.dimension {
                self.embedding.dimension = dimension;
            }
            if let Some(timeout_secs) = embedding.timeout_secs {
                self.embedding.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = embedding.max_retries {
                self.embedding.max_retries = max_retries;
            }
        }

        if let Some(segmentation) = patch.segmentation {
            if let Some(clusters) = segmentation.clusters {
                self.segmentation.clusters = clusters;
            }
            if let Some(seed) = segmentation.seed {
                self.segmentation.seed = seed;
            }
            if let Some(max_iterations) = segmentation.max_iterations {
                self.segmentation.max_iterations = max_iterations;
            }
            if let Some(recency_weight) = segmentation.recency_weight {
                self.segmentation.weights.recency = recency_weight;
            }
            if let Some(frequency_weight) = segmentation.frequency_weight {
                self.segmentation.weights.frequency = frequency_weight;
            }
            if let Some(monetary_weight) = segmentation.monetary_weight {
                self.segmentation.weights.monetary = monetary_weight;
            }
            if let Some(labels) = segmentation.labels {
                self.segmentation.labels = labels;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(top_n) = recommendation.top_n {
                self.recommendation.top_n = top_n;
            }
            if let Some(click_weight) = recommendation.click_weight {
                self.recommendation.click_weight = click_weight;
            }
            if let Some(cart_weight) = recommendation.cart_weight {
                self.recommendation.cart_weight = cart_weight;
            }
            if let Some(purchase_weight) = recommendation.purchase_weight {
                self.recommendation.purchase_weight = purchase_weight;
            }
            if let Some(segment_boost) = recommendation.segment_boost {
                self.recommendation.segment_boost = segment_boost;
            }
            if let Some(fallback_confidence) = recommendation.fallback_confidence {
                self.recommendation.fallback_confidence = fallback_confidence;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPSIGHT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHOPSIGHT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHOPSIGHT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPSIGHT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPSIGHT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_PROVIDER") {
            self.embedding.provider = value.parse()?;
        }
        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(value);
        }
        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_DIMENSION") {
            self.embedding.dimension = parse_usize("SHOPSIGHT_EMBEDDING_DIMENSION", &value)?;
        }
        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_TIMEOUT_SECS") {
            self.embedding.timeout_secs = parse_u64("SHOPSIGHT_EMBEDDING_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SHOPSIGHT_EMBEDDING_MAX_RETRIES") {
            self.embedding.max_retries = parse_u32("SHOPSIGHT_EMBEDDING_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("SHOPSIGHT_SEGMENTATION_CLUSTERS") {
            self.segmentation.clusters = parse_usize("SHOPSIGHT_SEGMENTATION_CLUSTERS", &value)?;
        }
        if let Some(value) = read_env("SHOPSIGHT_SEGMENTATION_SEED") {
            self.segmentation.seed = parse_u64("SHOPSIGHT_SEGMENTATION_SEED", &value)?;
        }
        if let Some(value) = read_env("SHOPSIGHT_SEGMENTATION_MAX_ITERATIONS") {
            self.segmentation.max_iterations =
                parse_usize("SHOPSIGHT_SEGMENTATION_MAX_ITERATIONS", &value)?;
        }

        if let Some(value) = read_env("SHOPSIGHT_RECOMMENDATION_TOP_N") {
            self.recommendation.top_n = parse_usize("SHOPSIGHT_RECOMMENDATION_TOP_N", &value)?;
        }

        let log_level =
            read_env("SHOPSIGHT_LOGGING_LEVEL").or_else(|| read_env("SHOPSIGHT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPSIGHT_LOGGING_FORMAT").or_else(|| read_env("SHOPSIGHT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(embedding_provider) = overrides.embedding_provider {
            self.embedding.provider = embedding_provider;
        }
        if let Some(embedding_model) = overrides.embedding_model {
            self.embedding.model = embedding_model;
        }
        if let Some(top_n) = overrides.recommendation_top_n {
            self.recommendation.top_n = top_n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_embedding(&self.embedding)?;
        validate_segmentation(&self.segmentation)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopsight.toml"), PathBuf::from("config/shopsight.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if embedding.timeout_secs == 0 || embedding.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "embedding.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if embedding.dimension == 0 {
        return Err(ConfigError::Validation(
            "embedding.dimension must be greater than zero".to_string(),
        ));
    }

    match embedding.provider {
        EmbeddingProvider::Ollama => {
            let missing =
                embedding.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "embedding.base_url is required for the ollama provider".to_string(),
                ));
            }
            if embedding.model.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "embedding.model is required for the ollama provider".to_string(),
                ));
            }
        }
        EmbeddingProvider::Hash => {}
    }

    Ok(())
}

fn validate_segmentation(segmentation: &SegmentationConfig) -> Result<(), ConfigError> {
    if segmentation.clusters == 0 {
        return Err(ConfigError::Validation(
            "segmentation.clusters must be greater than zero".to_string(),
        ));
    }

    if segmentation.labels.len() != segmentation.clusters {
        return Err(ConfigError::Validation(format!(
            "segmentation.labels must list exactly {} labels, got {}",
            segmentation.clusters,
            segmentation.labels.len()
        )));
    }

    if segmentation.labels.iter().any(|label| label.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "segmentation.labels must not contain empty labels".to_string(),
        ));
    }

    if segmentation.max_iterations == 0 {
        return Err(ConfigError::Validation(
            "segmentation.max_iterations must be greater than zero".to_string(),
        ));
    }

    let weights = segmentation.weights;
    if weights.recency < 0.0 || weights.frequency < 0.0 || weights.monetary < 0.0 {
        return Err(ConfigError::Validation(
            "segmentation weights must be non-negative".to_string(),
        ));
    }
    let sum = weights.recency + weights.frequency + weights.monetary;
    if (sum - 1.0).abs() > 1e-6 {
        return Err(ConfigError::Validation(format!(
            "segmentation weights must sum to 1.0, got {sum}"
        )));
    }

    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.top_n == 0 {
        return Err(ConfigError::Validation(
            "recommendation.top_n must be greater than zero".to_string(),
        ));
    }

    let weights = [
        ("recommendation.click_weight", recommendation.click_weight),
        ("recommendation.cart_weight", recommendation.cart_weight),
        ("recommendation.purchase_weight", recommendation.purchase_weight),
    ];
    for (name, weight) in weights {
        if weight <= 0.0 || !weight.is_finite() {
            return Err(ConfigError::Validation(format!("{name} must be a positive number")));
        }
    }

    if recommendation.segment_boost < 1.0 || !recommendation.segment_boost.is_finite() {
        return Err(ConfigError::Validation(
            "recommendation.segment_boost must be at least 1.0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&recommendation.fallback_confidence) {
        return Err(ConfigError::Validation(
            "recommendation.fallback_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    embedding: Option<EmbeddingPatch>,
    segmentation: Option<SegmentationPatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    provider: Option<EmbeddingProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    dimension: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentationPatch {
    clusters: Option<usize>,
    seed: Option<u64>,
    max_iterations: Option<usize>,
    recency_weight: Option<f64>,
    frequency_weight: Option<f64>,
    monetary_weight: Option<f64>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    top_n: Option<usize>,
    click_weight: Option<f64>,
    cart_weight: Option<f64>,
    purchase_weight: Option<f64>,
    segment_boost: Option<f64>,
    fallback_confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, EmbeddingProvider, LoadOptions, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_pass_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.database.url == "sqlite://shopsight.db", "default database url")?;
        ensure(config.segmentation.clusters == 4, "default cluster count")?;
        ensure(config.segmentation.labels.len() == 4, "default label count")?;
        ensure(config.recommendation.top_n == 5, "default top_n")?;
        ensure(
            matches!(config.embedding.provider, EmbeddingProvider::Ollama),
            "default embedding provider should be ollama",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_EMBEDDING_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopsight.toml");
            fs::write(
                &path,
                r#"
[embedding]
api_key = "${TEST_EMBEDDING_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config
                .embedding
                .api_key
                .as_ref()
                .ok_or_else(|| "api key should be present".to_string())?;
            ensure(
                api_key.expose_secret() == "key-from-env",
                "api key should be loaded from environment",
            )
        })();

        clear_vars(&["TEST_EMBEDDING_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPSIGHT_LOG_LEVEL", "warn");
        env::set_var("SHOPSIGHT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["SHOPSIGHT_LOG_LEVEL", "SHOPSIGHT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPSIGHT_EMBEDDING_MODEL", "model-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopsight.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[embedding]
model = "model-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.embedding.model == "model-from-env",
                "env model should win over file and defaults",
            )
        })();

        clear_vars(&["SHOPSIGHT_EMBEDDING_MODEL"]);
        result
    }

    #[test]
    fn mismatched_labels_fail_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("shopsight.toml");
        fs::write(
            &path,
            r#"
[segmentation]
clusters = 3
labels = ["low", "high"]
"#,
        )
        .map_err(|err| err.to_string())?;

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("segmentation.labels")
        );
        ensure(has_message, "validation failure should mention segmentation.labels")
    }

    #[test]
    fn weights_must_sum_to_one() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("shopsight.toml");
        fs::write(
            &path,
            r#"
[segmentation]
recency_weight = 0.5
frequency_weight = 0.5
monetary_weight = 0.5
"#,
        )
        .map_err(|err| err.to_string())?;

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("sum to 1.0")
        );
        ensure(has_message, "validation failure should mention the weight sum")
    }

    #[test]
    fn invalid_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPSIGHT_RECOMMENDATION_TOP_N", "lots");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected override failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let is_override_error = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "SHOPSIGHT_RECOMMENDATION_TOP_N"
            );
            ensure(is_override_error, "error should name the offending env var")
        })();

        clear_vars(&["SHOPSIGHT_RECOMMENDATION_TOP_N"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPSIGHT_EMBEDDING_API_KEY", "super-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("super-secret-value"),
                "debug output should not contain the api key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["SHOPSIGHT_EMBEDDING_API_KEY"]);
        result
    }
}
