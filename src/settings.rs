use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::fade::DEFAULT_FADE_DURATION_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for a thumbnail session. Every field is optional in the JSON
/// file; missing ones keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub fade_duration_ms: u64,
    pub preload_delay_ms: u64,
    pub cache_capacity: usize,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_width: 256,
            max_height: 256,
            fade_duration_ms: DEFAULT_FADE_DURATION_MS,
            preload_delay_ms: 5,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ThumbnailSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings {}", path.display()))
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_root(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("launcher-thumbs-settings-{name}-{nonce}"))
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let root = test_root("partial");
        fs::create_dir_all(&root).expect("create dir");
        let file = root.join("thumbs.json");
        fs::write(&file, r#"{ "max_width": 120, "fade_duration_ms": 0 }"#).expect("write");

        let settings = ThumbnailSettings::load(&file).expect("load");
        assert_eq!(settings.max_width, 120);
        assert_eq!(settings.fade_duration_ms, 0);
        assert_eq!(settings.max_height, 256);
        assert_eq!(settings.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(settings.preload_delay(), Duration::from_millis(5));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_file_reports_path() {
        let missing = test_root("missing").join("thumbs.json");
        let err = ThumbnailSettings::load(&missing).expect_err("should fail");
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let root = test_root("malformed");
        fs::create_dir_all(&root).expect("create dir");
        let file = root.join("thumbs.json");
        fs::write(&file, "{ max_width: ").expect("write");

        let err = ThumbnailSettings::load(&file).expect_err("should fail");
        assert!(err.to_string().contains("failed to parse settings"));
        let _ = fs::remove_dir_all(&root);
    }
}
