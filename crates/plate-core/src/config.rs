use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sanitize::SanitizeMode;

pub const DEFAULT_BASE_FONT_SIZE: u32 = 16;
pub const DEFAULT_UPLOAD_LIMIT_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;

/// Zero values mean "use the default"; see [`EditorConfig::with_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub base_font_size: u32,
    pub upload_limit_bytes: u64,
    pub paste_mode: SanitizeMode,
    /// Hold selection restores until the next [`crate::Editor::tick`].
    pub defer_selection_restore: bool,
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.base_font_size == 0 {
            self.base_font_size = DEFAULT_BASE_FONT_SIZE;
        }
        if self.upload_limit_bytes == 0 {
            self.upload_limit_bytes = DEFAULT_UPLOAD_LIMIT_BYTES;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = DEFAULT_MAX_NORMALIZE_ITERATIONS;
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        Ok(config.with_defaults())
    }
}
