use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::internal::favorites::FAVORITES_STORAGE_KEY;
use crate::internal::keybindings::ReaderCommand;
use crate::internal::models::MAX_PAGE_SIZE;
use crate::utils::url::{COVER_CDN_BASE_URL, PageQuality};

pub const CONFIG_FILE_NAME: &str = "config.ron";
pub const APP_DIR_NAME: &str = "manhwa-reader";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub reader: ReaderConfig,
    /// Overrides the favorites file location (defaults to the OS config dir).
    pub favorites_file: Option<String>,
    /// Persisted theme preference.
    pub dark_mode: bool,
}

/// Catalog API connection and the fixed content constraints attached to every
/// catalog request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub cover_base_url: String,
    pub user_agent: String,
    pub content_ratings: Vec<String>,
    pub original_languages: Vec<String>,
    pub translated_languages: Vec<String>,
    /// Catalog page size; `Engine::from_config` clamps it into `1..=100`.
    pub page_size: usize,
    /// Page size used while walking a chapter feed.
    pub feed_page_size: usize,
    pub page_quality: PageQuality,
    /// How long manga details and chapter lists are memoized.
    pub cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mangadex.org".to_string(),
            cover_base_url: COVER_CDN_BASE_URL.to_string(),
            user_agent: format!("{}/{}", APP_DIR_NAME, env!("CARGO_PKG_VERSION")),
            content_ratings: vec!["safe".to_string(), "suggestive".to_string()],
            original_languages: vec!["ko".to_string()],
            translated_languages: vec!["en".to_string()],
            page_size: MAX_PAGE_SIZE,
            feed_page_size: 500,
            page_quality: PageQuality::Data,
            cache_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `(module, level)` overrides appended to the base level.
    pub module_levels: Vec<(String, String)>,
    /// When set, logs go to a daily-rotating file in this directory.
    pub log_directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: vec![
                ("hyper".to_string(), "warn".to_string()),
                ("reqwest".to_string(), "warn".to_string()),
            ],
            log_directory: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Fraction of the viewport a scroll-forward/back command moves.
    pub scroll_step: f64,
    /// Extra key bindings, e.g. `"j": ScrollForward`.
    pub keybindings: HashMap<String, ReaderCommand>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            scroll_step: 0.8,
            keybindings: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Self {
        // Look for config.ron in current directory or next to executable
        let mut candidates = Vec::new();

        candidates.push(PathBuf::from(CONFIG_FILE_NAME));

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to load config at {}: {:#}", path.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        ron::from_str::<AppConfig>(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Flip the theme preference and write it through to `path`.
    pub fn set_dark_mode(&mut self, dark_mode: bool, path: &Path) -> Result<()> {
        self.dark_mode = dark_mode;
        self.save_to(path)
    }

    /// Persist the config. An existing file keeps its comments and layout:
    /// only the user-mutable values are rewritten in place.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let existing_content = fs::read_to_string(path).unwrap_or_default();

        let dark_mode_re = RegexBuilder::new(r#"(\s*dark_mode\s*:\s*)[^,\s)]+"#)
            .build()
            .context("failed to build dark_mode pattern")?;

        if existing_content.is_empty() || !dark_mode_re.is_match(&existing_content) {
            let pretty = ron::ser::PrettyConfig::default().depth_limit(3);
            let content =
                ron::ser::to_string_pretty(self, pretty).context("failed to serialize config")?;
            fs::write(path, content)
                .with_context(|| format!("failed to write config to {}", path.display()))?;
            tracing::info!("Saved config to {}", path.display());
            return Ok(());
        }

        let new_content = dark_mode_re
            .replace_all(&existing_content, format!("${{1}}{}", self.dark_mode))
            .to_string();

        fs::write(path, new_content)
            .with_context(|| format!("failed to update config at {}", path.display()))?;
        tracing::info!("Updated config at {} (preserving comments)", path.display());
        Ok(())
    }

    /// Where favorites live unless the config overrides it.
    pub fn favorites_path(&self) -> Option<PathBuf> {
        match &self.favorites_file {
            Some(path) => Some(PathBuf::from(path)),
            None => dirs::config_dir().map(|dir| {
                dir.join(APP_DIR_NAME)
                    .join(format!("{FAVORITES_STORAGE_KEY}.json"))
            }),
        }
    }
}
