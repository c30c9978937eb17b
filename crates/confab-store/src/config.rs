//! Store configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the store can come up with zero
//! configuration for local development and tests.

use std::path::PathBuf;

/// Object-store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Filesystem root under which media objects are stored.
    /// Env: `MEDIA_ROOT`
    /// Default: `./media`
    pub media_root: PathBuf,

    /// URL prefix baked into the retrievable references handed back to
    /// message bodies.
    /// Env: `MEDIA_BASE_URL`
    /// Default: `confab://media`
    pub media_base_url: String,

    /// Maximum media object size in bytes.
    /// Env: `MAX_MEDIA_SIZE`
    /// Default: 50 MiB
    pub max_media_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("./media"),
            media_base_url: "confab://media".to_string(),
            max_media_size: 50 * 1024 * 1024,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MEDIA_ROOT") {
            config.media_root = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("MEDIA_BASE_URL") {
            config.media_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(val) = std::env::var("MAX_MEDIA_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_media_size = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_MEDIA_SIZE, using default");
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.media_root, PathBuf::from("./media"));
        assert_eq!(config.media_base_url, "confab://media");
        assert_eq!(config.max_media_size, 50 * 1024 * 1024);
    }
}
