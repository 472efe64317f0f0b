//! Configuration system for Scorecard.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> environment -> explicit overrides.

use crate::error::{EvalError, Result};
use crate::generation::GenerationOptions;
use crate::generation::ollama::DEFAULT_OLLAMA_ENDPOINT;
use crate::metrics::RECENT_LOG_CAPACITY;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorecardConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Where dataset files are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Local directory holding `<filename>` for each dataset identifier.
    #[serde(default = "default_dataset_root")]
    pub root: PathBuf,
    /// When set, datasets are fetched from `<base_url>/<filename>` instead.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: default_dataset_root(),
            base_url: None,
        }
    }
}

fn default_dataset_root() -> PathBuf {
    PathBuf::from("datasets")
}

/// Generation backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Ollama,
    Mock,
}

impl FromStr for BackendKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(EvalError::config(format!("unknown backend '{other}'"))),
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Options passed with every generation request.
    #[serde(default)]
    pub options: GenerationOptions,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            options: GenerationOptions::default(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_OLLAMA_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// What to do with a record no format validator accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedPolicy {
    /// Leave it out of scoring, with a warning.
    #[default]
    Skip,
    /// Score an empty stand-in example, counting it in accuracy.
    Score,
    /// Abort the run.
    Fail,
}

impl FromStr for UnrecognizedPolicy {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "score" => Ok(Self::Score),
            "fail" => Ok(Self::Fail),
            other => Err(EvalError::config(format!(
                "unknown unrecognized-record policy '{other}' (expected skip, score or fail)"
            ))),
        }
    }
}

impl fmt::Display for UnrecognizedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "skip",
            Self::Score => "score",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Run behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub on_unrecognized: UnrecognizedPolicy,
    /// Entries kept in the recent-activity log.
    #[serde(default = "default_recent_log_capacity")]
    pub recent_log_capacity: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            on_unrecognized: UnrecognizedPolicy::default(),
            recent_log_capacity: default_recent_log_capacity(),
        }
    }
}

fn default_recent_log_capacity() -> usize {
    RECENT_LOG_CAPACITY
}

/// Individual settings taken from the command line. Only the fields that
/// are set override lower layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_root: Option<PathBuf>,
    pub base_url: Option<String>,
    pub backend: Option<BackendKind>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub on_unrecognized: Option<UnrecognizedPolicy>,
}

impl ConfigOverrides {
    /// The set fields as a partial config tree.
    fn to_value(&self) -> Value {
        let mut dataset = Map::new();
        if let Some(root) = &self.dataset_root {
            dataset.insert("root".into(), json!(root.to_string_lossy()));
        }
        if let Some(base_url) = &self.base_url {
            dataset.insert("base_url".into(), json!(base_url));
        }

        let mut generation = Map::new();
        if let Some(backend) = self.backend {
            generation.insert("backend".into(), json!(backend));
        }
        if let Some(model) = &self.model {
            generation.insert("model".into(), json!(model));
        }
        if let Some(endpoint) = &self.endpoint {
            generation.insert("endpoint".into(), json!(endpoint));
        }

        let mut evaluation = Map::new();
        if let Some(policy) = self.on_unrecognized {
            evaluation.insert("on_unrecognized".into(), json!(policy));
        }

        let mut root = Map::new();
        for (section, values) in [
            ("dataset", dataset),
            ("generation", generation),
            ("evaluation", evaluation),
        ] {
            if !values.is_empty() {
                root.insert(section.into(), Value::Object(values));
            }
        }
        Value::Object(root)
    }
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".scorecard").join("config.toml")
}

/// Path of the user-level config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "scorecard", "scorecard")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides
/// 2. Environment variables (prefixed with `SCORECARD_`, sections split on `__`)
/// 3. Workspace-local config (`.scorecard/config.toml`)
/// 4. User config (`~/.config/scorecard/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ScorecardConfig> {
    let mut figment = Figment::from(Serialized::defaults(ScorecardConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // SCORECARD_GENERATION__MODEL, SCORECARD_DATASET__ROOT, ...
    figment = figment.merge(Env::prefixed("SCORECARD_").split("__"));

    figment = figment.merge(Serialized::defaults(overrides.to_value()));

    Ok(figment.extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ScorecardConfig::default();
        assert_eq!(config.dataset.root, PathBuf::from("datasets"));
        assert_eq!(config.generation.backend, BackendKind::Ollama);
        assert_eq!(config.generation.endpoint, DEFAULT_OLLAMA_ENDPOINT);
        assert_eq!(config.evaluation.on_unrecognized, UnrecognizedPolicy::Skip);
        assert_eq!(config.evaluation.recent_log_capacity, 10);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ScorecardConfig = toml_from_str(
            r#"
            [generation]
            model = "qwen2.5:0.5b"

            [evaluation]
            on_unrecognized = "fail"
            "#,
        );
        assert_eq!(config.generation.model, "qwen2.5:0.5b");
        assert_eq!(config.generation.timeout_secs, 120);
        assert_eq!(config.evaluation.on_unrecognized, UnrecognizedPolicy::Fail);
        assert_eq!(config.dataset, DatasetConfig::default());
    }

    #[test]
    fn test_workspace_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".scorecard")).unwrap();
        std::fs::write(
            workspace_config_path(dir.path()),
            "[generation]\nmodel = \"from-file\"\nendpoint = \"http://gpu-box:11434\"\n",
        )
        .unwrap();

        let overrides = ConfigOverrides {
            model: Some("from-cli".into()),
            on_unrecognized: Some(UnrecognizedPolicy::Score),
            ..Default::default()
        };
        let config = load_config(Some(dir.path()), &overrides).unwrap();
        assert_eq!(config.generation.model, "from-cli");
        assert_eq!(config.generation.endpoint, "http://gpu-box:11434");
        assert_eq!(config.evaluation.on_unrecognized, UnrecognizedPolicy::Score);
    }

    #[test]
    fn test_empty_overrides_emit_nothing() {
        assert_eq!(ConfigOverrides::default().to_value(), json!({}));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("SKIP".parse::<UnrecognizedPolicy>().unwrap(), UnrecognizedPolicy::Skip);
        assert_eq!("fail".parse::<UnrecognizedPolicy>().unwrap(), UnrecognizedPolicy::Fail);
        assert!("maybe".parse::<UnrecognizedPolicy>().is_err());
        assert_eq!("mock".parse::<BackendKind>().unwrap(), BackendKind::Mock);
    }

    fn toml_from_str(source: &str) -> ScorecardConfig {
        Figment::from(Toml::string(source)).extract().unwrap()
    }
}
