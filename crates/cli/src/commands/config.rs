use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use procura_core::config::AppConfig;
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    CommandResult::success("config", render(&config))
}

fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let columns = config
        .kanban
        .columns
        .iter()
        .map(|column| format!("{}:{}", column.id, column.title))
        .collect::<Vec<_>>()
        .join(",");
    let ids_start =
        config.ids.start.map(|start| start.to_string()).unwrap_or_else(|| "<clock>".to_string());

    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "wizard.success_close_delay_ms",
            &config.wizard.success_close_delay_ms.to_string(),
            source("wizard.success_close_delay_ms", &["PROCURA_WIZARD_SUCCESS_CLOSE_DELAY_MS"]),
        ),
        render_line("kanban.columns", &columns, source("kanban.columns", &["PROCURA_KANBAN_COLUMNS"])),
        render_line(
            "bus.capacity",
            &config.bus.capacity.to_string(),
            source("bus.capacity", &["PROCURA_BUS_CAPACITY"]),
        ),
        render_line("ids.start", &ids_start, source("ids.start", &["PROCURA_IDS_START"])),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["PROCURA_LOGGING_LEVEL", "PROCURA_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            source("logging.format", &["PROCURA_LOGGING_FORMAT", "PROCURA_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("procura.toml"), PathBuf::from("config/procura.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
