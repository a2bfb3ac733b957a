//! Run options.

use crate::error::ConvertError;
use crate::roots::SourceRoots;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default pattern for files left out of directory scans.
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"_test\.go$";

/// Directory under the workspace root receiving standard-library output
/// when no explicit root is configured.
pub const DEFAULT_STD_TARGET_DIR: &str = "refract-std";

/// Options for one conversion run.
///
/// Every field has a default, so a config file may set any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Replace target files that already exist.
    pub overwrite_existing_files: bool,
    /// Replace target files of packages reached through imports.
    pub overwrite_existing_packages: bool,
    /// Convert packages found under the standard root.
    pub convert_standard_library: bool,
    /// Convert only the given file or directory, without following imports.
    pub local_convert_only: bool,
    /// Output directory for the top-level conversion and workspace imports.
    pub target_path: Option<PathBuf>,
    /// Output root for standard-library packages.
    pub target_std_path: Option<PathBuf>,
    /// Regex matched against file names; matching files are not converted.
    pub exclude_pattern: Option<String>,
    /// Report each file's parse tree.
    pub show_parse_tree: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            overwrite_existing_files: false,
            overwrite_existing_packages: false,
            convert_standard_library: false,
            local_convert_only: false,
            target_path: None,
            target_std_path: None,
            exclude_pattern: Some(DEFAULT_EXCLUDE_PATTERN.to_string()),
            show_parse_tree: false,
        }
    }
}

impl Options {
    /// Compile the exclusion pattern. An empty pattern excludes nothing.
    pub fn exclude_regex(&self) -> Result<Option<Regex>, ConvertError> {
        match self.exclude_pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern).map(Some).map_err(|source| {
                ConvertError::InvalidExcludePattern {
                    pattern: pattern.to_string(),
                    source,
                }
            }),
        }
    }

    /// Output root for standard-library packages.
    pub fn std_target_root(&self, roots: &SourceRoots) -> PathBuf {
        self.target_std_path
            .clone()
            .unwrap_or_else(|| roots.workspace().join(DEFAULT_STD_TARGET_DIR))
    }

    /// Options for converting an imported package: its files are replaced
    /// according to `overwrite_existing_packages`.
    pub fn for_package(&self) -> Options {
        Options {
            overwrite_existing_files: self.overwrite_existing_packages,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excludes_test_files() {
        let regex = Options::default().exclude_regex().unwrap().unwrap();
        assert!(regex.is_match("reader_test.go"));
        assert!(!regex.is_match("reader.go"));
    }

    #[test]
    fn test_empty_pattern_excludes_nothing() {
        let options = Options {
            exclude_pattern: Some(String::new()),
            ..Options::default()
        };
        assert!(options.exclude_regex().unwrap().is_none());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let options = Options {
            exclude_pattern: Some("(".into()),
            ..Options::default()
        };
        assert!(matches!(
            options.exclude_regex(),
            Err(ConvertError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_package_options_use_package_overwrite() {
        let options = Options {
            overwrite_existing_files: true,
            overwrite_existing_packages: false,
            ..Options::default()
        };
        assert!(!options.for_package().overwrite_existing_files);
    }
}
