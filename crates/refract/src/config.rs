//! Configuration for refract.
//!
//! Loads config from:
//! 1. Global: ~/.config/refract/config.toml
//! 2. Per-project: .refract/config.toml (overrides global)
//!
//! Command-line flags override both.
//!
//! Example config.toml:
//! ```toml
//! [convert]
//! overwrite_existing_packages = true
//! convert_standard_library = false
//! exclude_pattern = "_test\\.go$"
//!
//! [roots]
//! goroot = "/usr/lib/go"
//! ```

use refract_graph::Options;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Conversion options. Unset keys keep the value from the layer below.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConvertConfig {
    pub overwrite_existing_files: Option<bool>,
    pub overwrite_existing_packages: Option<bool>,
    pub convert_standard_library: Option<bool>,
    pub local_convert_only: Option<bool>,
    pub target_path: Option<PathBuf>,
    pub target_std_path: Option<PathBuf>,
    pub exclude_pattern: Option<String>,
    pub show_parse_tree: Option<bool>,
}

/// Installation directories; `src` is appended to each.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RootsConfig {
    pub goroot: Option<PathBuf>,
    pub gopath: Option<PathBuf>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RefractConfig {
    pub convert: ConvertConfig,
    pub roots: RootsConfig,
}

impl RefractConfig {
    /// Load configuration for a project directory.
    pub fn load(root: &Path) -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path()
            && let Some(global) = Self::load_file(&global_path)
        {
            config = config.merge(global);
        }

        let project_path = root.join(".refract").join("config.toml");
        if let Some(project) = Self::load_file(&project_path) {
            config = config.merge(project);
        }

        config
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("refract").join("config.toml"))
    }

    /// Load config from a file path. A malformed file is reported and ignored.
    fn load_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring invalid config: {}", err);
                None
            }
        }
    }

    /// Merge another config into this one; keys set in `other` win.
    fn merge(self, other: Self) -> Self {
        let (a, b) = (self.convert, other.convert);
        Self {
            convert: ConvertConfig {
                overwrite_existing_files: b.overwrite_existing_files.or(a.overwrite_existing_files),
                overwrite_existing_packages: b
                    .overwrite_existing_packages
                    .or(a.overwrite_existing_packages),
                convert_standard_library: b.convert_standard_library.or(a.convert_standard_library),
                local_convert_only: b.local_convert_only.or(a.local_convert_only),
                target_path: b.target_path.or(a.target_path),
                target_std_path: b.target_std_path.or(a.target_std_path),
                exclude_pattern: b.exclude_pattern.or(a.exclude_pattern),
                show_parse_tree: b.show_parse_tree.or(a.show_parse_tree),
            },
            roots: RootsConfig {
                goroot: other.roots.goroot.or(self.roots.goroot),
                gopath: other.roots.gopath.or(self.roots.gopath),
            },
        }
    }

    /// Run options with configured keys applied over the defaults.
    pub fn options(&self) -> Options {
        let defaults = Options::default();
        let c = &self.convert;
        Options {
            overwrite_existing_files: c
                .overwrite_existing_files
                .unwrap_or(defaults.overwrite_existing_files),
            overwrite_existing_packages: c
                .overwrite_existing_packages
                .unwrap_or(defaults.overwrite_existing_packages),
            convert_standard_library: c
                .convert_standard_library
                .unwrap_or(defaults.convert_standard_library),
            local_convert_only: c.local_convert_only.unwrap_or(defaults.local_convert_only),
            target_path: c.target_path.clone().or(defaults.target_path),
            target_std_path: c.target_std_path.clone().or(defaults.target_std_path),
            exclude_pattern: c.exclude_pattern.clone().or(defaults.exclude_pattern),
            show_parse_tree: c.show_parse_tree.unwrap_or(defaults.show_parse_tree),
        }
    }
}
