use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kanban::{default_columns, Column};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub wizard: WizardConfig,
    pub kanban: KanbanConfig,
    pub bus: BusConfig,
    pub ids: IdConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardConfig {
    pub success_close_delay_ms: u64,
}

impl WizardConfig {
    pub fn success_close_delay(&self) -> Duration {
        Duration::from_millis(self.success_close_delay_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KanbanConfig {
    pub columns: Vec<Column>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    pub capacity: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdConfig {
    /// First id handed out; the wall clock in milliseconds when unset.
    pub start: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub success_close_delay_ms: Option<u64>,
    pub bus_capacity: Option<usize>,
    pub ids_start: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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

pub const MAX_CLOSE_DELAY_MS: u64 = 60_000;
pub const MAX_BUS_CAPACITY: usize = 4_096;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            wizard: WizardConfig { success_close_delay_ms: 2_000 },
            kanban: KanbanConfig { columns: default_columns() },
            bus: BusConfig { capacity: 64 },
            ids: IdConfig { start: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("procura.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(wizard) = patch.wizard {
            if let Some(delay) = wizard.success_close_delay_ms {
                self.wizard.success_close_delay_ms = delay;
            }
        }

        if let Some(kanban) = patch.kanban {
            if let Some(columns) = kanban.columns {
                self.kanban.columns = columns
                    .into_iter()
                    .map(|column| {
                        let title = column.title.unwrap_or_else(|| column.id.clone());
                        Column::new(column.id, title)
                    })
                    .collect();
            }
        }

        if let Some(bus) = patch.bus {
            if let Some(capacity) = bus.capacity {
                self.bus.capacity = capacity;
            }
        }

        if let Some(ids) = patch.ids {
            if let Some(start) = ids.start {
                self.ids.start = Some(start);
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
        if let Some(value) = read_env("PROCURA_WIZARD_SUCCESS_CLOSE_DELAY_MS") {
            self.wizard.success_close_delay_ms =
                parse_u64("PROCURA_WIZARD_SUCCESS_CLOSE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("PROCURA_KANBAN_COLUMNS") {
            self.kanban.columns = parse_columns("PROCURA_KANBAN_COLUMNS", &value)?;
        }
        if let Some(value) = read_env("PROCURA_BUS_CAPACITY") {
            self.bus.capacity = parse_usize("PROCURA_BUS_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("PROCURA_IDS_START") {
            self.ids.start = Some(parse_u64("PROCURA_IDS_START", &value)?);
        }

        let log_level =
            read_env("PROCURA_LOGGING_LEVEL").or_else(|| read_env("PROCURA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROCURA_LOGGING_FORMAT").or_else(|| read_env("PROCURA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(delay) = overrides.success_close_delay_ms {
            self.wizard.success_close_delay_ms = delay;
        }
        if let Some(capacity) = overrides.bus_capacity {
            self.bus.capacity = capacity;
        }
        if let Some(start) = overrides.ids_start {
            self.ids.start = Some(start);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_wizard(&self.wizard)?;
        validate_kanban(&self.kanban)?;
        validate_bus(&self.bus)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("procura.toml"), PathBuf::from("config/procura.toml")]
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

fn validate_wizard(wizard: &WizardConfig) -> Result<(), ConfigError> {
    if wizard.success_close_delay_ms == 0 || wizard.success_close_delay_ms > MAX_CLOSE_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "wizard.success_close_delay_ms must be in range 1..={MAX_CLOSE_DELAY_MS}"
        )));
    }
    Ok(())
}

fn validate_kanban(kanban: &KanbanConfig) -> Result<(), ConfigError> {
    if kanban.columns.is_empty() {
        return Err(ConfigError::Validation(
            "kanban.columns must define at least one column".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for column in &kanban.columns {
        if column.id.as_str().trim().is_empty() {
            return Err(ConfigError::Validation("kanban.columns ids must not be empty".to_string()));
        }
        if !seen.insert(column.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "kanban.columns contains duplicate id `{}`",
                column.id
            )));
        }
    }
    Ok(())
}

fn validate_bus(bus: &BusConfig) -> Result<(), ConfigError> {
    if bus.capacity == 0 || bus.capacity > MAX_BUS_CAPACITY {
        return Err(ConfigError::Validation(format!(
            "bus.capacity must be in range 1..={MAX_BUS_CAPACITY}"
        )));
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// `id:Title,id2:Title 2`; a missing title reuses the id.
fn parse_columns(key: &str, value: &str) -> Result<Vec<Column>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((id, title)) if !id.trim().is_empty() => Ok(Column::new(id.trim(), title.trim())),
            Some(_) => Err(ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Ok(Column::new(entry, entry)),
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    wizard: Option<WizardPatch>,
    kanban: Option<KanbanPatch>,
    bus: Option<BusPatch>,
    ids: Option<IdPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WizardPatch {
    success_close_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KanbanPatch {
    columns: Option<Vec<ColumnPatch>>,
}

#[derive(Debug, Deserialize)]
struct ColumnPatch {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BusPatch {
    capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct IdPatch {
    start: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
