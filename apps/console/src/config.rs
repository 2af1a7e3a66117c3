use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub log_filter: String,
    pub notification_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            log_filter: "info".into(),
            notification_capacity: 64,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    log_filter: Option<String>,
    notification_capacity: Option<usize>,
}

/// Defaults, then the settings file, then the environment. Command line flags
/// are applied by the caller.
///
/// A missing default file is fine; a file named explicitly must exist.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_SETTINGS_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.notification_capacity {
        settings.notification_capacity = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CONSOLE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = lookup("APP__NOTIFICATION_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.notification_capacity = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            "server_url = \"http://lift.local:9000\"\nnotification_capacity = 8\n",
        )
        .expect("parse");

        assert_eq!(settings.server_url, "http://lift.local:9000");
        assert_eq!(settings.notification_capacity, 8);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn app_prefixed_env_wins_over_short_form() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env_of(&[
                ("CONSOLE_SERVER_URL", "http://short:1"),
                ("APP__SERVER_URL", "http://prefixed:2"),
                ("APP__LOG_FILTER", "console_core=debug"),
                ("APP__NOTIFICATION_CAPACITY", "not-a-number"),
            ]),
        );

        assert_eq!(settings.server_url, "http://prefixed:2");
        assert_eq!(settings.log_filter, "console_core=debug");
        assert_eq!(settings.notification_capacity, 64);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let mut settings = Settings::default();
        assert!(apply_file(&mut settings, "server_url = [").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("elevator_console_missing_{suffix}.toml"));

        let err = load_settings(Some(&path)).expect_err("must fail");
        assert!(err.to_string().contains("failed to read settings file"));
    }
}
