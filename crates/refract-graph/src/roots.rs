//! The two source roots searched when resolving imports.

use crate::error::ConvertError;
use crate::package::PackageImportPath;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Fallback standard installation when `GOROOT` is unset.
const DEFAULT_GOROOT: &str = "/usr/local/go";

/// Standard root and workspace root, both already suffixed with `src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoots {
    standard: PathBuf,
    workspace: PathBuf,
}

impl SourceRoots {
    /// Use the given `src` directories. The standard root must exist; the
    /// workspace root is created when missing.
    pub fn new(standard: PathBuf, workspace: PathBuf) -> Result<Self, ConvertError> {
        if !standard.is_dir() {
            return Err(ConvertError::StandardRootMissing(standard));
        }
        if !workspace.is_dir() {
            fs::create_dir_all(&workspace).map_err(|source| ConvertError::CreateTargetDir {
                path: workspace.clone(),
                source,
            })?;
        }
        Ok(Self {
            standard,
            workspace,
        })
    }

    /// Locate the roots from explicit installation directories, falling back
    /// to `GOROOT`/`GOPATH` and then to the conventional locations.
    pub fn discover(goroot: Option<PathBuf>, gopath: Option<PathBuf>) -> Result<Self, ConvertError> {
        let goroot = goroot
            .or_else(|| env::var_os("GOROOT").filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GOROOT));
        let gopath = gopath
            .or_else(|| {
                env::var_os("GOPATH")
                    .filter(|v| !v.is_empty())
                    .and_then(|v| env::split_paths(&v).next())
            })
            .or_else(|| dirs::home_dir().map(|home| home.join("go")))
            .unwrap_or_else(|| PathBuf::from("go"));
        tracing::debug!(goroot = %goroot.display(), gopath = %gopath.display(), "source roots");
        Self::new(goroot.join("src"), gopath.join("src"))
    }

    pub fn standard(&self) -> &Path {
        &self.standard
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Candidate directories for an import, standard root first.
    pub fn candidates(&self, import: &PackageImportPath) -> [PathBuf; 2] {
        let relative = import.relative_path();
        [self.standard.join(&relative), self.workspace.join(&relative)]
    }

    /// Import path of a package directory under either root.
    pub fn package_path_of(&self, dir: &Path) -> Option<String> {
        let relative = dir
            .strip_prefix(&self.standard)
            .or_else(|_| dir.strip_prefix(&self.workspace))
            .ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!segments.is_empty()).then(|| segments.join("/"))
    }

    /// Resolve a source path argument. Relative paths are taken from the
    /// current directory when they exist there, else from the workspace root.
    pub fn resolve_source(&self, path: &Path) -> Result<PathBuf, ConvertError> {
        let resolved = if path.is_absolute() || path.exists() {
            absolute(path)
        } else {
            self.workspace.join(path)
        };
        if resolved.exists() {
            Ok(resolved)
        } else {
            Err(ConvertError::SourcePathNotFound(resolved))
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
