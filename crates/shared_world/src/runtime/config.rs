//! Session configuration from `shared_world.toml` or the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use shared_world_text::{DocConfig, DEFAULT_CUTOFF};

use super::error::ConfigError;

pub const ENV_SESSION_ID: &str = "SHARED_WORLD_SESSION_ID";
pub const ENV_RNG_SEED: &str = "SHARED_WORLD_RNG_SEED";
pub const ENV_DOC_CUTOFF_TICKS: &str = "SHARED_WORLD_DOC_CUTOFF_TICKS";
pub const ENV_DOC_SNAPSHOT_EVERY: &str = "SHARED_WORLD_DOC_SNAPSHOT_EVERY";
pub const ENV_PERSIST_PERIOD_MS: &str = "SHARED_WORLD_PERSIST_PERIOD_MS";
pub const ENV_MAX_CASCADE_EVENTS: &str = "SHARED_WORLD_MAX_CASCADE_EVENTS";
pub const ENV_KILL_PLANE_Y: &str = "SHARED_WORLD_KILL_PLANE_Y";
pub const ENV_CODEC: &str = "SHARED_WORLD_CODEC";
pub const ENV_ROOT_BEHAVIORS: &str = "SHARED_WORLD_ROOT_BEHAVIORS";

const ENV_PREFIX: &str = "SHARED_WORLD_";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "shared_world.toml";
pub const DEFAULT_SESSION_ID: &str = "default";
pub const DEFAULT_RNG_SEED: u64 = 0x5eed;
pub const DEFAULT_PERSIST_PERIOD_MS: u64 = 60_000;
pub const DEFAULT_MAX_CASCADE_EVENTS: usize = 4_096;
pub const DEFAULT_KILL_PLANE_Y: f64 = -10.0;
pub const DEFAULT_ROOT_BEHAVIOR: &str = "session-root";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    Cbor,
}

impl CodecKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(CodecKind::Json),
            "cbor" => Some(CodecKind::Cbor),
            _ => None,
        }
    }
}

/// Every replica of a session must run with the same values; only
/// `persist_period_ms` and `codec` are local to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_id: String,
    pub rng_seed: u64,
    pub doc_cutoff_ticks: u64,
    pub doc_snapshot_every: u64,
    pub persist_period_ms: u64,
    pub max_cascade_events: usize,
    pub kill_plane_y: f64,
    pub codec: CodecKind,
    pub root_behaviors: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: DEFAULT_SESSION_ID.to_string(),
            rng_seed: DEFAULT_RNG_SEED,
            doc_cutoff_ticks: DEFAULT_CUTOFF,
            doc_snapshot_every: DEFAULT_CUTOFF / 6,
            persist_period_ms: DEFAULT_PERSIST_PERIOD_MS,
            max_cascade_events: DEFAULT_MAX_CASCADE_EVENTS,
            kill_plane_y: DEFAULT_KILL_PLANE_Y,
            codec: CodecKind::Json,
            root_behaviors: vec![DEFAULT_ROOT_BEHAVIOR.to_string()],
        }
    }
}

impl SessionConfig {
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn doc_config(&self) -> DocConfig {
        DocConfig {
            cutoff: self.doc_cutoff_ticks,
            snapshot_every: self.doc_snapshot_every.max(1),
        }
    }

    pub fn from_default_sources() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Self::from_env()
    }

    /// Reads a flat TOML table keyed by the lowercase names
    /// (`session_id`, `doc_cutoff_ticks`, ...); keys missing from the file
    /// fall back to the environment.
    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let value: toml::Value =
            toml::from_str(&content).map_err(|err| ConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let table = value
            .as_table()
            .ok_or_else(|| ConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: "root is not a TOML table".to_string(),
            })?;

        Self::from_env_with(|key| {
            let file_key = key.trim_start_matches(ENV_PREFIX).to_ascii_lowercase();
            table
                .get(&file_key)
                .and_then(toml_value_to_string)
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut getter: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let session_id = getter(ENV_SESSION_ID)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.session_id);
        let rng_seed = parse_or(&mut getter, ENV_RNG_SEED, defaults.rng_seed)?;
        let doc_cutoff_ticks =
            parse_or(&mut getter, ENV_DOC_CUTOFF_TICKS, defaults.doc_cutoff_ticks)?;
        let doc_snapshot_every = parse_or(
            &mut getter,
            ENV_DOC_SNAPSHOT_EVERY,
            (doc_cutoff_ticks / 6).max(1),
        )?;
        if doc_snapshot_every == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_DOC_SNAPSHOT_EVERY,
                value: "0".to_string(),
            });
        }
        let persist_period_ms =
            parse_or(&mut getter, ENV_PERSIST_PERIOD_MS, defaults.persist_period_ms)?;
        let max_cascade_events =
            parse_or(&mut getter, ENV_MAX_CASCADE_EVENTS, defaults.max_cascade_events)?;
        let kill_plane_y = parse_or(&mut getter, ENV_KILL_PLANE_Y, defaults.kill_plane_y)?;
        if !kill_plane_y.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: ENV_KILL_PLANE_Y,
                value: kill_plane_y.to_string(),
            });
        }
        let codec = match getter(ENV_CODEC) {
            Some(value) => CodecKind::parse(&value).ok_or(ConfigError::InvalidValue {
                key: ENV_CODEC,
                value,
            })?,
            None => defaults.codec,
        };
        let root_behaviors = getter(ENV_ROOT_BEHAVIORS)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty())
            .unwrap_or(defaults.root_behaviors);

        Ok(Self {
            session_id,
            rng_seed,
            doc_cutoff_ticks,
            doc_snapshot_every,
            persist_period_ms,
            max_cascade_events,
            kill_plane_y,
            codec,
            root_behaviors,
        })
    }
}

fn parse_or<F, T>(getter: &mut F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match getter(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        toml::Value::Float(value) => Some(value.to_string()),
        toml::Value::Boolean(value) => Some(value.to_string()),
        toml::Value::Array(values) => Some(
            values
                .iter()
                .filter_map(toml_value_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}
