use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub profile: Option<ProfileConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub token_env: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub url: String,
}

/// A configured source with its credential looked up from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub base_url: String,
    pub credential: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;
        Self::from_yaml(&text, &path_display)
    }

    /// The configuration compiled into the binary, used when no file is given.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(Self::example_yaml(), "<builtin>")
    }

    fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output must not be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        if let Some(metrics_file) = &self.metrics_file {
            if metrics_file.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "metrics_file must not be empty when set".to_string(),
                ));
            }
        }

        validate_sources(&self.sources)?;
        if let Some(profile) = &self.profile {
            validate_url("profile.url", &profile.url)?;
        }

        Ok(())
    }

    /// Resolves every source's credential from the environment, keeping the
    /// configured order.
    pub fn resolve_sources(&self) -> Vec<Source> {
        self.sources
            .iter()
            .map(|s| Source {
                name: s.name.clone(),
                base_url: s.url.trim_end_matches('/').to_string(),
                credential: resolve_credential_from_env(&s.token_env),
            })
            .collect()
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut envs = HashSet::new();
    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sources[*].name must not be empty".to_string(),
            ));
        }
        if !names.insert(source.name.clone()) {
            return Err(ConfigError::Validation(format!(
                "source name '{}' must be unique",
                source.name
            )));
        }
        validate_url(&format!("sources '{}' url", source.name), &source.url)?;
        if source.token_env.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "sources '{}' token_env must not be empty",
                source.name
            )));
        }
        if !envs.insert(source.token_env.clone()) {
            return Err(ConfigError::Validation(format!(
                "sources '{}' token_env '{}' is already used by another source",
                source.name, source.token_env
            )));
        }
    }
    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ConfigError::Validation(format!("{field} must not be empty")));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn resolve_credential_from_env(env_name: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("_data/dashboard.json")
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("sitestats/{}", env!("CARGO_PKG_VERSION"))
}
