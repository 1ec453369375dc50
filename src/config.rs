//! # Configuration
//!
//! Optional YAML file, read from `--config <file>` or `musicmerge.yaml` in the working
//! directory. Every key is optional:
//!
//! ```yaml
//! viewer: /usr/bin/mscore          # notation viewer; auto-detected when absent
//! output: merged.musicxml          # where the merged score is written
//! preview-dir: /tmp/musicmerge     # where one-measure preview files go
//! text-preview: true               # also print measures as text
//! ```

use crate::error::MergeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "musicmerge.yaml";

pub const DEFAULT_OUTPUT: &str = "merged.musicxml";

/// Raw config for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub viewer: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub preview_dir: Option<PathBuf>,
    pub text_preview: Option<bool>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` when no viewer was configured and none was found
    pub viewer: Option<PathBuf>,
    pub output: PathBuf,
    pub preview_dir: PathBuf,
    pub text_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

impl Config {
    /// Parse YAML config content
    pub fn from_yaml(content: &str) -> Result<Self, MergeError> {
        // An empty file is a valid, empty config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| MergeError::Config(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        Self {
            viewer: raw.viewer.or_else(detect_musescore),
            output: raw.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            preview_dir: raw
                .preview_dir
                .unwrap_or_else(|| std::env::temp_dir().join("musicmerge")),
            text_preview: raw.text_preview.unwrap_or(true),
        }
    }

    /// Read the config file at `path`
    pub fn load(path: &Path) -> Result<Self, MergeError> {
        let content = std::fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Read `explicit` if given, else `musicmerge.yaml` in `dir` if it exists, else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, MergeError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

const WINDOWS_MUSESCORE: &[&str] = &[
    r"C:\Program Files\MuseScore 4\bin\MuseScore4.exe",
    r"C:\Program Files\MuseScore 3\bin\MuseScore3.exe",
];

const MACOS_MUSESCORE: &[&str] = &[
    "/Applications/MuseScore 4.app/Contents/MacOS/mscore",
    "/Applications/MuseScore 3.app/Contents/MacOS/mscore",
];

const LINUX_MUSESCORE: &[&str] = &["/usr/bin/musescore", "/usr/bin/mscore", "/usr/local/bin/musescore"];

/// Common MuseScore install locations for this platform
pub fn musescore_candidates() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        WINDOWS_MUSESCORE
    } else if cfg!(target_os = "macos") {
        MACOS_MUSESCORE
    } else {
        LINUX_MUSESCORE
    }
}

/// First MuseScore install found on this machine
pub fn detect_musescore() -> Option<PathBuf> {
    let found = musescore_candidates()
        .iter()
        .map(|p| PathBuf::from(*p))
        .find(|p| p.exists());
    match &found {
        Some(path) => tracing::debug!(viewer = %path.display(), "detected MuseScore"),
        None => tracing::debug!("no MuseScore install found"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let yaml = "viewer: /opt/viewer\noutput: out.musicxml\npreview-dir: /tmp/pv\ntext-preview: false\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.viewer, Some(PathBuf::from("/opt/viewer")));
        assert_eq!(config.output, PathBuf::from("out.musicxml"));
        assert_eq!(config.preview_dir, PathBuf::from("/tmp/pv"));
        assert!(!config.text_preview);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.preview_dir, std::env::temp_dir().join("musicmerge"));
        assert!(config.text_preview);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Config::from_yaml("viewr: /opt/viewer\n");
        assert!(matches!(result, Err(MergeError::Config(_))));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = Config::from_yaml("text-preview: maybe\n");
        assert!(matches!(result, Err(MergeError::Config(_))));
    }

    #[test]
    fn test_discover_prefers_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "output: local.musicxml\n").unwrap();
        let explicit = dir.path().join("other.yaml");
        std::fs::write(&explicit, "output: explicit.musicxml\n").unwrap();

        let config = Config::discover(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.output, PathBuf::from("explicit.musicxml"));

        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.output, PathBuf::from("local.musicxml"));
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::discover(Some(&dir.path().join("nope.yaml")), dir.path());
        assert!(matches!(result, Err(MergeError::Io { .. })));
    }
}
