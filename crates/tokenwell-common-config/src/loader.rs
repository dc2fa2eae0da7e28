//! Configuration file loading and parsing.

use crate::types::TokenwellConfig;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tokenwell_bucket::{BucketConfiguration, ConfigurationError};
use tracing::debug;

/// File name looked up in the loader's directory.
pub const CONFIG_FILE: &str = "tokenwell.yaml";

/// Overrides the configuration file location.
pub const CONFIG_PATH_VAR: &str = "TOKENWELL_CONFIG_PATH";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error("bucket '{bucket}' is invalid: {source}")]
    InvalidBucket {
        bucket: String,
        #[source]
        source: ConfigurationError,
    },
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env var pattern is a valid regex")
    })
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the file [`load`](Self::load) reads.
    pub fn config_path(&self) -> PathBuf {
        match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.base_path.join(CONFIG_FILE),
        }
    }

    /// Load configuration from `tokenwell.yaml` or `$TOKENWELL_CONFIG_PATH`.
    ///
    /// A missing default file yields an empty configuration. A missing file
    /// named by the environment variable is an error.
    pub fn load(&self) -> Result<TokenwellConfig, ConfigError> {
        let explicit = std::env::var_os(CONFIG_PATH_VAR).is_some_and(|path| !path.is_empty());
        let config_path = self.config_path();

        if !config_path.exists() {
            if explicit {
                return Err(ConfigError::NotFound { path: config_path });
            }
            debug!(path = %config_path.display(), "no bucket configuration file, using defaults");
            return Ok(TokenwellConfig::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Load, expand and validate a specific file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<TokenwellConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse_str(&contents)?;
        debug!(path = %path.display(), buckets = config.buckets.len(), "loaded bucket configuration");
        Ok(config)
    }

    /// Expand, parse and validate YAML text.
    pub fn parse_str(content: &str) -> Result<TokenwellConfig, ConfigError> {
        let expanded = expand_env_vars(content)?;

        let config: TokenwellConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        validate(&config)?;
        Ok(config)
    }

    /// Load and build every bucket configuration, keyed by bucket name.
    pub fn load_buckets(&self) -> Result<BTreeMap<String, BucketConfiguration>, ConfigError> {
        build_buckets(&self.load()?)
    }

    /// Save configuration to `tokenwell.yaml` in the loader's directory.
    pub fn save(&self, config: &TokenwellConfig) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.base_path)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(self.base_path.join(CONFIG_FILE), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Build every bucket configuration in `config`.
pub fn build_buckets(
    config: &TokenwellConfig,
) -> Result<BTreeMap<String, BucketConfiguration>, ConfigError> {
    config
        .buckets
        .iter()
        .map(|(name, spec)| {
            spec.to_configuration()
                .map(|configuration| (name.clone(), configuration))
                .map_err(|source| ConfigError::InvalidBucket {
                    bucket: name.clone(),
                    source,
                })
        })
        .collect()
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for cap in env_var_pattern().captures_iter(content) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) => v,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.to_string(),
                    })
                }
            },
        };

        result.push_str(&content[last..full_match.start()]);
        result.push_str(&value);
        last = full_match.end();
    }

    result.push_str(&content[last..]);
    Ok(result)
}

fn validate(config: &TokenwellConfig) -> Result<(), ConfigError> {
    if let Some(name) = config.buckets.keys().find(|name| name.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            message: format!("bucket name '{name}' must not be blank"),
        });
    }

    build_buckets(config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BandwidthSpec, BucketSpec, RefillSpec};
    use std::time::Duration;

    #[test]
    fn test_expand_env_vars_with_default() {
        let expanded =
            expand_env_vars("capacity: ${TOKENWELL_TEST_UNSET_CAPACITY:-42}").unwrap();
        assert_eq!(expanded, "capacity: 42");
    }

    #[test]
    fn test_expand_env_vars_from_environment() {
        std::env::set_var("TOKENWELL_TEST_EXPAND_TOKENS", "7");
        let expanded = expand_env_vars("a: ${TOKENWELL_TEST_EXPAND_TOKENS}, b: ${TOKENWELL_TEST_EXPAND_TOKENS:-1}")
            .unwrap();
        std::env::remove_var("TOKENWELL_TEST_EXPAND_TOKENS");
        assert_eq!(expanded, "a: 7, b: 7");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let err = expand_env_vars("capacity: ${TOKENWELL_TEST_NEVER_SET}").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { var } if var == "TOKENWELL_TEST_NEVER_SET"));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = ConfigLoader::parse_str("buckets:\n  api:\n    bandwidths: [\n").unwrap_err();
        match err {
            ConfigError::ParseError { line, .. } => assert!(line.is_some()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_duration_is_a_parse_error() {
        let yaml = r#"
buckets:
  api:
    bandwidths:
      - capacity: 1
        refill: { kind: smooth, tokens: 1, period: 5 fortnights }
"#;
        let err = ConfigLoader::parse_str(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown duration unit"));
    }

    #[test]
    fn test_validation_names_bucket() {
        let yaml = r#"
buckets:
  uploads:
    bandwidths:
      - capacity: 0
        refill: { kind: smooth, tokens: 1, period: 1s }
"#;
        let err = ConfigLoader::parse_str(yaml).unwrap_err();
        match err {
            ConfigError::InvalidBucket { bucket, source } => {
                assert_eq!(bucket, "uploads");
                assert_eq!(source, ConfigurationError::NonPositiveCapacity { capacity: 0 });
            }
            other => panic!("expected invalid bucket, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_bucket_name_rejected() {
        let yaml = r#"
buckets:
  " ":
    bandwidths:
      - capacity: 1
        refill: { kind: smooth, tokens: 1, period: 1s }
"#;
        let err = ConfigLoader::parse_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_build_buckets() {
        let mut config = TokenwellConfig::default();
        config.buckets.insert(
            "api".to_string(),
            BucketSpec {
                bandwidths: vec![BandwidthSpec {
                    capacity: 5,
                    initial_tokens: None,
                    refill: RefillSpec::Smooth {
                        tokens: 5,
                        period: Duration::from_secs(1),
                    },
                }],
            },
        );

        let buckets = build_buckets(&config).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets["api"].bandwidths()[0].capacity(), 5);
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::ParseError {
            line: None,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "invalid YAML at line unknown: boom");
    }
}
