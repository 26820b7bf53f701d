//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the path given with `-f`) relative to the
//! current working directory, then applies `CAMPUS_WORK_DIR`,
//! `CAMPUS_LOG_LEVEL` and `CAMPUS_ADMIN_ID` env overrides.
//!
//! The Telegram token is never read from TOML; the telegram channel takes it
//! from `TELEGRAM_BOT_TOKEN` at start.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Directory under `work_dir` holding the record file and the log.
const DATA_DIR: &str = "data";
const MODELS_FILENAME: &str = "models.json";

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the PTY channel is explicitly enabled.
    pub enabled: bool,
    /// Caller identity attached to every console line.
    pub caller_id: u64,
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Whether the Telegram channel is explicitly enabled.
    pub enabled: bool,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub telegram: TelegramConfig,
}

/// Replaceable reply texts for `/news` and `/resources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    pub news: String,
    pub resources: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            news: default_news(),
            resources: default_resources(),
        }
    }
}

/// Fully-resolved bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Append-only log file, resolved against `work_dir`.
    pub log_file: Option<PathBuf>,
    /// The single admin identity. `None` means nobody may run admin commands.
    pub admin_id: Option<u64>,
    pub comms: CommsConfig,
    pub content: ContentConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the Telegram channel should be loaded.
    pub fn comms_telegram_should_load(&self) -> bool {
        self.comms.telegram.enabled
    }

    pub fn data_dir(&self) -> PathBuf {
        self.work_dir.join(DATA_DIR)
    }

    /// Location of the building record file.
    pub fn models_path(&self) -> PathBuf {
        self.data_dir().join(MODELS_FILENAME)
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    admin: RawAdmin,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    content: RawContent,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    work_dir: String,
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawAdmin {
    #[serde(default)]
    id: Option<u64>,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    telegram: RawTelegram,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `false`: the console only runs with `-i` or when enabled here.
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default)]
    caller_id: u64,
}

#[derive(Deserialize)]
struct RawTelegram {
    /// Defaults to `true`: Telegram is the bot's main channel.
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize, Default)]
struct RawContent {
    #[serde(default)]
    news: Option<String>,
    #[serde(default)]
    resources: Option<String>,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: false, caller_id: 0 }
    }
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_news() -> String {
    "📰 Project news:\n1. Building A created\n2. Building B added\n3. 2GIS integration".to_string()
}

fn default_resources() -> String {
    "🔗 Useful links:\n- https://2gis.ru\n- https://mospolytech.ru".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("CAMPUS_WORK_DIR").ok();
    let log_level_override = env::var("CAMPUS_LOG_LEVEL").ok();
    let admin_id_override = env::var("CAMPUS_ADMIN_ID").ok();
    load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
        admin_id_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
    admin_id_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;

    let work_dir_str = work_dir_override.unwrap_or(&b.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&b.log_level).to_string();
    let log_file = b.log_file.map(|log_file| {
        let path = PathBuf::from(log_file);
        if path.is_absolute() {
            path
        } else {
            work_dir.join(path)
        }
    });

    let admin_id = match admin_id_override {
        Some(raw_id) => Some(parse_admin_id(raw_id)?),
        None => parsed.admin.id,
    };

    Ok(Config {
        bot_name: b.name,
        work_dir,
        log_level,
        log_file,
        admin_id,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
                caller_id: parsed.comms.pty.caller_id,
            },
            telegram: TelegramConfig {
                enabled: parsed.comms.telegram.enabled,
            },
        },
        content: ContentConfig {
            news: parsed.content.news.unwrap_or_else(default_news),
            resources: parsed.content.resources.unwrap_or_else(default_resources),
        },
    })
}

fn parse_admin_id(raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("invalid admin id '{raw}': {e}")))
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — console only, no Telegram.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            admin_id: Some(1),
            comms: CommsConfig {
                pty: PtyConfig { enabled: true, caller_id: 1 },
                telegram: TelegramConfig { enabled: false },
            },
            content: ContentConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[bot]
name = "test-bot"
work_dir = "~/.campus-bot"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None, None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.admin_id, None);
        assert!(cfg.log_file.is_none());
        assert!(cfg.comms_telegram_should_load());
        assert!(!cfg.comms_pty_should_load());
        assert_eq!(cfg.content, ContentConfig::default());
    }

    #[test]
    fn full_config_sections() {
        let f = write_toml(
            r#"
[bot]
name = "campus"
work_dir = "/srv/campus"
log_level = "debug"
log_file = "data/bot.log"

[admin]
id = 42

[comms.pty]
enabled = true
caller_id = 42

[comms.telegram]
enabled = false

[content]
news = "nothing new"
"#,
        );
        let cfg = load_from(f.path(), None, None, None).unwrap();
        assert_eq!(cfg.admin_id, Some(42));
        assert_eq!(cfg.log_file, Some(PathBuf::from("/srv/campus/data/bot.log")));
        assert_eq!(cfg.comms.pty.caller_id, 42);
        assert!(!cfg.comms_telegram_should_load());
        assert_eq!(cfg.content.news, "nothing new");
        assert_eq!(cfg.content.resources, default_resources());
        assert_eq!(cfg.models_path(), PathBuf::from("/srv/campus/data/models.json"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.campus-bot");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".campus-bot"));
    }

    #[test]
    fn absolute_path_unchanged() {
        let p = expand_home("/absolute/path");
        assert_eq!(p, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn relative_path_unchanged() {
        let p = expand_home("relative/path");
        assert_eq!(p, PathBuf::from("relative/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_work_dir_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/test-override"), None, None).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/test-override"));
        assert_eq!(cfg.data_dir(), PathBuf::from("/tmp/test-override/data"));
    }

    #[test]
    fn env_log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, Some("debug"), None).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn env_admin_id_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None, Some(" 777 ")).unwrap();
        assert_eq!(cfg.admin_id, Some(777));
    }

    #[test]
    fn invalid_admin_id_errors() {
        let f = write_toml(MINIMAL_TOML);
        let err = load_from(f.path(), None, None, Some("admin")).unwrap_err();
        assert!(err.to_string().contains("invalid admin id"));
    }
}
