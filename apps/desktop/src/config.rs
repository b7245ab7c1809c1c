use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use client_core::{DEFAULT_EVALUATOR_AGENT_ID, DEFAULT_TUTOR_AGENT_ID};
use serde::Deserialize;
use storage::DEFAULT_SAVE_SLOT;

pub const DEFAULT_CONFIG_FILE: &str = "quest.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    /// Agent gateway endpoint; without one the session runs offline.
    pub gateway_url: Option<String>,
    pub tutor_agent_id: String,
    pub evaluator_agent_id: String,
    pub save_slot: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/quest.db".into(),
            gateway_url: None,
            tutor_agent_id: DEFAULT_TUTOR_AGENT_ID.into(),
            evaluator_agent_id: DEFAULT_EVALUATOR_AGENT_ID.into(),
            save_slot: DEFAULT_SAVE_SLOT.into(),
            request_timeout_secs: 60,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    gateway_url: Option<String>,
    tutor_agent_id: Option<String>,
    evaluator_agent_id: Option<String>,
    save_slot: Option<String>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
}

/// Defaults, then the config file if present, then `APP__*` variables.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        // An explicitly requested file must exist.
        Err(err) if config_path.is_some() => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.gateway_url {
        settings.gateway_url = Some(v);
    }
    if let Some(v) = file_cfg.tutor_agent_id {
        settings.tutor_agent_id = v;
    }
    if let Some(v) = file_cfg.evaluator_agent_id {
        settings.evaluator_agent_id = v;
    }
    if let Some(v) = file_cfg.save_slot {
        settings.save_slot = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__GATEWAY_URL") {
        settings.gateway_url = Some(v).filter(|url| !url.trim().is_empty());
    }
    if let Some(v) = lookup("APP__TUTOR_AGENT_ID") {
        settings.tutor_agent_id = v;
    }
    if let Some(v) = lookup("APP__EVALUATOR_AGENT_ID") {
        settings.evaluator_agent_id = v;
    }
    if let Some(v) = lookup("APP__SAVE_SLOT") {
        settings.save_slot = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for save database '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
