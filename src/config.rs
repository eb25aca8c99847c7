//! Configuration loading from environment variables.
//!
//! All values are loaded from `LOCAL_MODELS_*` environment variables with
//! sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `LOCAL_MODELS_COMPONENTS_DIR` | `./components` | Root holding all component install dirs |
//! | `LOCAL_MODELS_ENABLED` | `true` | Register the component (else delete it) |
//! | `LOCAL_MODELS_LOG_LEVEL` | `info` | Log filter directive |
//! | `LOCAL_MODELS_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `LOCAL_MODELS_LOG_FILE` | unset | Write JSON logs to this file instead of stderr |
//! | `LOCAL_MODELS_KEEP_VERSIONS` | 1 | Installed versions retained by cleanup |

use std::path::PathBuf;

use crate::telemetry::{LogConfig, LogFormat};

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub components_dir: PathBuf,
    pub enabled: bool,
    pub keep_versions: usize,
    pub log: LogConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            components_dir: PathBuf::from("./components"),
            enabled: true,
            keep_versions: 1,
            log: LogConfig::default(),
        }
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a boolean env var (`1/0`, `true/false`, `yes/no`, `on/off`).
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn parse_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn load_log_config() -> LogConfig {
    let defaults = LogConfig::default();
    let format = parse_non_empty("LOCAL_MODELS_LOG_FORMAT")
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or(defaults.format);
    LogConfig {
        format,
        level: parse_non_empty("LOCAL_MODELS_LOG_LEVEL").unwrap_or(defaults.level),
        output_path: parse_non_empty("LOCAL_MODELS_LOG_FILE").map(PathBuf::from),
    }
}

/// Load all configuration from environment variables.
pub fn load() -> EnvConfig {
    let defaults = EnvConfig::default();
    let components_dir = parse_non_empty("LOCAL_MODELS_COMPONENTS_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.components_dir);
    let keep_versions = parse_usize("LOCAL_MODELS_KEEP_VERSIONS", defaults.keep_versions).max(1);

    EnvConfig {
        components_dir,
        enabled: parse_bool("LOCAL_MODELS_ENABLED", defaults.enabled),
        keep_versions,
        log: load_log_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "LOCAL_MODELS_COMPONENTS_DIR",
        "LOCAL_MODELS_ENABLED",
        "LOCAL_MODELS_LOG_LEVEL",
        "LOCAL_MODELS_LOG_FORMAT",
        "LOCAL_MODELS_LOG_FILE",
        "LOCAL_MODELS_KEEP_VERSIONS",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.components_dir, PathBuf::from("./components"));
        assert!(cfg.enabled);
        assert_eq!(cfg.keep_versions, 1);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.log.level, "info");
        assert!(cfg.log.output_path.is_none());
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LOCAL_MODELS_COMPONENTS_DIR", "/var/lib/models");
        std::env::set_var("LOCAL_MODELS_ENABLED", "off");
        std::env::set_var("LOCAL_MODELS_LOG_FORMAT", "pretty");
        std::env::set_var("LOCAL_MODELS_LOG_LEVEL", "debug");
        std::env::set_var("LOCAL_MODELS_KEEP_VERSIONS", "3");
        let cfg = load();
        assert_eq!(cfg.components_dir, PathBuf::from("/var/lib/models"));
        assert!(!cfg.enabled);
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.keep_versions, 3);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LOCAL_MODELS_ENABLED", "maybe");
        std::env::set_var("LOCAL_MODELS_LOG_FORMAT", "xml");
        std::env::set_var("LOCAL_MODELS_KEEP_VERSIONS", "abc");
        std::env::set_var("LOCAL_MODELS_COMPONENTS_DIR", "   ");
        let cfg = load();
        assert!(cfg.enabled);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.keep_versions, 1);
        assert_eq!(cfg.components_dir, PathBuf::from("./components"));
        clear_env_vars();
    }

    #[test]
    fn test_keep_versions_floor() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LOCAL_MODELS_KEEP_VERSIONS", "0");
        let cfg = load();
        assert_eq!(cfg.keep_versions, 1, "must keep at least the active version");
        clear_env_vars();
    }
}
