use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub prompt: String,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt: "dsh4> ".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Parsed `log_level`; unknown names fall back to `warn`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }
}

/// Capacity limits enforced by the tokenizer and the pipeline splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Stages per pipeline.
    pub max_commands: usize,
    /// Arguments per command, program included.
    pub max_args: usize,
    /// Characters per argument.
    pub max_token_len: usize,
    /// Characters per pipeline segment.
    pub max_command_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_commands: 8,
            max_args: 8,
            max_token_len: 255,
            max_command_len: 319,
        }
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    limits: LimitsOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    prompt: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LimitsOverlay {
    max_commands: Option<usize>,
    max_args: Option<usize>,
    max_token_len: Option<usize>,
    max_command_len: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            eprintln!("dsh: embedded default config is invalid: {e}");
            Self {
                settings: Settings::default(),
                limits: Limits::default(),
            }
        })
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge `path` if given, otherwise `~/.config/dsh/config.toml` if it exists
    ///
    /// An explicit `path` that cannot be read or parsed is an error. Problems with
    /// the implicit user file are printed to stderr and the defaults are kept, since
    /// the logger is configured from the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("can't read config {}", path.display()))?;
                config
                    .merge_str(&content)
                    .with_context(|| format!("can't parse config {}", path.display()))?;
            }
            None => {
                if let Some(path) = Self::user_config_path() {
                    if let Ok(content) = std::fs::read_to_string(&path) {
                        if let Err(e) = config.merge_str(&content) {
                            eprintln!("dsh: ignoring config {}: {e:#}", path.display());
                        }
                    }
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/dsh/config.toml"))
    }

    /// Parse `content` as an overlay and apply it on top of this config.
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let overlay: ConfigOverlay = toml::from_str(content)?;
        self.apply_overlay(overlay);
        Ok(())
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.prompt {
            self.settings.prompt = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }

        let l = overlay.limits;
        if let Some(v) = l.max_commands {
            self.limits.max_commands = v;
        }
        if let Some(v) = l.max_args {
            self.limits.max_args = v;
        }
        if let Some(v) = l.max_token_len {
            self.limits.max_token_len = v;
        }
        if let Some(v) = l.max_command_len {
            self.limits.max_command_len = v;
        }
    }

    /// Every limit must allow at least one item.
    fn validate(&self) -> Result<()> {
        let l = &self.limits;
        for (name, value) in [
            ("max_commands", l.max_commands),
            ("max_args", l.max_args),
            ("max_token_len", l.max_token_len),
            ("max_command_len", l.max_command_len),
        ] {
            if value == 0 {
                anyhow::bail!("limits.{name} must be greater than zero");
            }
        }
        Ok(())
    }
}
