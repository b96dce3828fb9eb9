//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMESHELL_CONFIG` (environment variable)
//! 2. `~/.config/mimeshell/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimeshell\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::export::WriteOptions;
use crate::parser::ParseOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Part tree parser settings.
    pub parser: ParserConfig,
    /// Content decode pipeline settings.
    pub decode: DecodeConfig,
    /// Serializer settings.
    pub serializer: SerializerConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Part tree parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Nesting depth beyond which containers are treated as leaves.
    pub max_depth: usize,
    /// Charset assumed for text parts that declare none.
    pub default_charset: String,
    /// Skip a leading mbox `From ` separator line.
    pub strip_mbox_from_line: bool,
}

/// Content decode pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Convert CRLF to LF when extracting text bodies.
    pub normalize_newlines: bool,
}

/// Serializer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Target length for re-folded header lines.
    pub line_length: usize,
    /// Prefix for synthesized multipart boundaries.
    pub boundary_prefix: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        let opts = ParseOptions::default();
        Self {
            max_depth: opts.max_depth,
            default_charset: opts.default_charset,
            strip_mbox_from_line: opts.strip_mbox_from_line,
        }
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        let opts = WriteOptions::default();
        Self {
            line_length: opts.line_length,
            boundary_prefix: opts.boundary_prefix,
        }
    }
}

impl Config {
    /// Parser options derived from this configuration.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.parser.max_depth,
            default_charset: self.parser.default_charset.clone(),
            strip_mbox_from_line: self.parser.strip_mbox_from_line,
        }
    }

    /// Serializer options derived from this configuration.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            line_length: self.serializer.line_length,
            boundary_prefix: self.serializer.boundary_prefix.clone(),
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Falls back to defaults when no file exists or it cannot be read.
pub fn load_config() -> Config {
    let Some(path) = config_file_path().filter(|p| p.exists()) else {
        return Config::default();
    };
    match read_config(&path) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Using default config");
            Config::default()
        }
    }
}

/// Parse one config file.
pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MIMESHELL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mimeshell").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimeshell")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mimeshell.log")
}
