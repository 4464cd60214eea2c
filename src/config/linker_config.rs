//! Linker configuration parsing
//!
//! Loads the linker configuration from YAML and applies environment
//! overrides. Every field has a default, so an absent file yields a usable
//! configuration pointing at local backends.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "ENTITY_LINKER_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/entity_linker.yaml";

/// Upper bound on the triple-store connection pool
pub const MAX_KB_CONNECTIONS: u32 = 64;

/// Content-type header line that marks an HTML response inside a record
pub const DEFAULT_CONTENT_TYPE_MARKER: &str = "Content-Type: text/html; charset=UTF-8";

/// Root configuration for a linking run
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkerConfig {
    /// Base URL of the Elasticsearch-compatible label index
    pub search_endpoint: String,
    /// Index holding (identifier, label) documents
    pub search_index: String,
    /// `_source` field carrying the label of a hit
    pub search_label_field: String,
    /// Per-attempt timeout for label search, in seconds
    pub search_timeout: u64,
    /// Retries after the first failed label search
    pub search_retries: u32,
    /// Only the top N hits of a label search are considered
    pub search_result_cap: usize,
    /// Initial retry backoff in milliseconds (doubles per retry)
    pub retry_backoff_ms: u64,
    /// Path of the SQLite triple store
    pub kb_path: PathBuf,
    /// Per-attempt timeout for triple-store lookups, in seconds
    pub kb_timeout: u64,
    /// Retries after a failed triple-store lookup
    pub kb_retries: u32,
    /// Prefix prepended to bare search identifiers before store lookup
    pub kb_id_prefix: Option<String>,
    /// Stop after this many records (None = whole archive)
    pub max_records: Option<usize>,
    /// Records linked concurrently
    pub workers: usize,
    /// Mentions of one record resolved concurrently
    pub mention_concurrency: usize,
    /// Candidates of one mention scored concurrently
    pub candidate_concurrency: usize,
    /// Header line that must be present for a record to be treated as HTML
    pub content_type_marker: String,
    /// Remote tagger service; the built-in heuristic tagger is used when unset
    pub tagger_endpoint: Option<String>,
    /// Disambiguation policy
    pub ranking: RankingMode,
    /// Predicate linking an entity to its class
    pub type_predicate: String,
    /// Tagger label -> allowed class IRIs, used by [`RankingMode::TypeAware`]
    pub type_constraints: HashMap<String, Vec<String>>,
}

/// Which disambiguation policy the ranker applies
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Highest inbound-reference count wins
    #[default]
    Popularity,
    /// Popularity restricted to candidates whose class fits the mention label
    TypeAware,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            search_endpoint: "http://localhost:9200".to_string(),
            search_index: "wikidata_en".to_string(),
            search_label_field: "schema_name".to_string(),
            search_timeout: 30,
            search_retries: 10,
            search_result_cap: 10,
            retry_backoff_ms: 200,
            kb_path: PathBuf::from("assets/wikidata.sqlite"),
            kb_timeout: 5,
            kb_retries: 2,
            kb_id_prefix: None,
            max_records: None,
            workers: 4,
            mention_concurrency: 4,
            candidate_concurrency: 2,
            content_type_marker: DEFAULT_CONTENT_TYPE_MARKER.to_string(),
            tagger_endpoint: None,
            ranking: RankingMode::Popularity,
            type_predicate: "http://www.wikidata.org/prop/direct/P31".to_string(),
            type_constraints: HashMap::new(),
        }
    }
}

impl LinkerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as null, not as an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: LinkerConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Resolve the configuration for a process.
    ///
    /// Uses `$ENTITY_LINKER_CONFIG` if set (a missing file is an error), then
    /// `config/entity_linker.yaml` if it exists, then defaults. Environment
    /// overrides are applied last and the result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ENTITY_LINKER_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("ENTITY_LINKER_SEARCH_ENDPOINT") {
            self.search_endpoint = endpoint;
        }
        if let Some(path) = lookup("ENTITY_LINKER_KB_PATH") {
            self.kb_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("ENTITY_LINKER_MAX_RECORDS") {
            let raw = raw.trim();
            self.max_records = if raw.is_empty() {
                None
            } else {
                Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "max_records",
                    message: format!("'{raw}' is not a record count"),
                })?)
            };
        }
        Ok(())
    }

    /// Reject values that would stall or disable the pipeline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.search_endpoint).is_err() {
            return Err(ConfigError::Invalid {
                key: "search_endpoint",
                message: format!("'{}' is not a URL", self.search_endpoint),
            });
        }
        if self.search_index.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "search_index",
                message: "must not be empty".to_string(),
            });
        }
        if self.search_result_cap == 0 {
            return Err(ConfigError::Invalid {
                key: "search_result_cap",
                message: "must be at least 1".to_string(),
            });
        }
        if self.search_timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "search_timeout",
                message: "must be at least 1 second".to_string(),
            });
        }
        if self.kb_timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "kb_timeout",
                message: "must be at least 1 second".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                key: "workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.mention_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "mention_concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if self.candidate_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "candidate_concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if self.content_type_marker.is_empty() {
            return Err(ConfigError::Invalid {
                key: "content_type_marker",
                message: "must not be empty".to_string(),
            });
        }
        if let Some(endpoint) = &self.tagger_endpoint {
            if url::Url::parse(endpoint).is_err() {
                return Err(ConfigError::Invalid {
                    key: "tagger_endpoint",
                    message: format!("'{endpoint}' is not a URL"),
                });
            }
        }
        Ok(())
    }

    /// Retry policy for label-search calls (also used for the remote tagger)
    pub fn search_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.search_retries,
            timeout: Duration::from_secs(self.search_timeout),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Store connections needed so that no scoring call waits for the pool
    pub fn kb_connections(&self) -> u32 {
        let in_flight = self
            .workers
            .saturating_mul(self.mention_concurrency)
            .saturating_mul(self.candidate_concurrency);
        in_flight.clamp(1, MAX_KB_CONNECTIONS as usize) as u32
    }

    /// Retry policy for triple-store lookups
    pub fn kb_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.kb_retries,
            timeout: Duration::from_secs(self.kb_timeout),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
search_endpoint: "http://fs0.example.org:10010"
search_timeout: 10
search_retries: 3
kb_path: "/data/wikidata.sqlite"
kb_id_prefix: "http://www.wikidata.org/entity/"
max_records: 3
ranking: type_aware
type_constraints:
  PERSON:
    - "http://www.wikidata.org/entity/Q5"
"#;

        let config = LinkerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.search_endpoint, "http://fs0.example.org:10010");
        assert_eq!(config.search_timeout, 10);
        assert_eq!(config.search_retries, 3);
        assert_eq!(config.kb_path, PathBuf::from("/data/wikidata.sqlite"));
        assert_eq!(config.max_records, Some(3));
        assert_eq!(config.ranking, RankingMode::TypeAware);
        assert_eq!(
            config.type_constraints.get("PERSON").unwrap(),
            &vec!["http://www.wikidata.org/entity/Q5".to_string()]
        );
        // Unset keys fall back to defaults
        assert_eq!(config.search_index, "wikidata_en");
        assert_eq!(config.workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config =
            LinkerConfig::from_yaml(include_str!("../../config/entity_linker.yaml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.kb_id_prefix.as_deref(),
            Some("http://www.wikidata.org/entity/")
        );
        assert_eq!(config.type_constraints.len(), 3);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = LinkerConfig::from_yaml("  \n").unwrap();
        assert_eq!(config, LinkerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = LinkerConfig::default();
        let env: HashMap<&str, &str> = [
            ("ENTITY_LINKER_SEARCH_ENDPOINT", "http://search:9200"),
            ("ENTITY_LINKER_KB_PATH", "/tmp/kb.sqlite"),
            ("ENTITY_LINKER_MAX_RECORDS", "25"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.search_endpoint, "http://search:9200");
        assert_eq!(config.kb_path, PathBuf::from("/tmp/kb.sqlite"));
        assert_eq!(config.max_records, Some(25));
    }

    #[test]
    fn test_bad_max_records_override() {
        let mut config = LinkerConfig::default();
        let err = config
            .apply_overrides(|key| (key == "ENTITY_LINKER_MAX_RECORDS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "max_records", .. }));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = LinkerConfig {
            workers: 0,
            ..LinkerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "workers", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = LinkerConfig {
            mention_concurrency: 0,
            ..LinkerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "mention_concurrency", .. })
        ));

        let config = LinkerConfig {
            candidate_concurrency: 0,
            ..LinkerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "candidate_concurrency", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = LinkerConfig {
            search_endpoint: "not a url".to_string(),
            ..LinkerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "search_endpoint", .. })
        ));
    }

    #[test]
    fn test_retry_policies() {
        let config = LinkerConfig::default();
        let search = config.search_retry_policy();
        assert_eq!(search.retries, 10);
        assert_eq!(search.timeout, Duration::from_secs(30));

        assert_eq!(config.kb_connections(), 32);
        let busy = LinkerConfig {
            workers: 16,
            mention_concurrency: 16,
            ..LinkerConfig::default()
        };
        assert_eq!(busy.kb_connections(), MAX_KB_CONNECTIONS);

        let kb = config.kb_retry_policy();
        assert_eq!(kb.retries, 2);
        assert_eq!(kb.timeout, Duration::from_secs(5));
    }
}
