//! Package keys, run-scoped state and the end-of-run report.

use refract_translate::{Diagnostic, TypeModel};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

/// Hierarchical package key such as `a/b/c`.
///
/// Comparisons inside a run use [`PackageImportPath::key`], which is
/// case-folded, so differently-cased spellings resolve to one package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageImportPath(String);

impl PackageImportPath {
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self(path.trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The path relative to a source root.
    pub fn relative_path(&self) -> PathBuf {
        self.segments().collect()
    }
}

impl fmt::Display for PackageImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Converted,
    /// A target already existed and overwriting was not requested.
    Skipped,
}

/// One source file's conversion record.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionUnit {
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: FileStatus,
    pub package_name: Option<String>,
    pub imports: Vec<String>,
    pub warnings: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_tree: Option<String>,
}

/// An import found under neither root.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedImport {
    pub import: PackageImportPath,
    pub candidates: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub processed_files: usize,
    pub skipped_files: usize,
    pub skipped_packages: usize,
    pub warnings: usize,
}

/// Everything a run produced, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files: Vec<ConversionUnit>,
    pub unresolved: Vec<UnresolvedImport>,
    pub totals: Totals,
}

impl RunReport {
    pub fn converted(&self) -> impl Iterator<Item = &ConversionUnit> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Converted)
    }
}

/// State scoped to one top-level invocation.
///
/// A fresh context starts with empty memo sets, so independent runs never
/// see each other's processed files or packages.
#[derive(Debug, Default)]
pub struct RunContext {
    processed_files: HashSet<String>,
    processed_packages: HashSet<String>,
    pending: VecDeque<PackageImportPath>,
    queued: HashSet<String>,
    models: HashMap<PathBuf, TypeModel>,
    pub(crate) report: RunReport,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a file processed. Returns false when it already was.
    pub(crate) fn claim_file(&mut self, path: &Path) -> bool {
        let inserted = self.processed_files.insert(file_key(path));
        if inserted {
            self.report.totals.processed_files += 1;
        }
        inserted
    }

    /// Mark a package processed. Returns false when it already was.
    pub(crate) fn claim_package(&mut self, import: &PackageImportPath) -> bool {
        self.processed_packages.insert(import.key())
    }

    /// Queue an import unless it was already processed or queued.
    pub(crate) fn enqueue(&mut self, import: PackageImportPath) {
        let key = import.key();
        if self.processed_packages.contains(&key) || !self.queued.insert(key) {
            return;
        }
        self.pending.push_back(import);
    }

    pub(crate) fn next_pending(&mut self) -> Option<PackageImportPath> {
        let import = self.pending.pop_front()?;
        self.queued.remove(&import.key());
        Some(import)
    }

    /// The type model of a package directory, built on first use.
    pub(crate) fn package_model<E>(
        &mut self,
        dir: &Path,
        build: impl FnOnce() -> Result<TypeModel, E>,
    ) -> Result<&TypeModel, E> {
        match self.models.entry(dir.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(build()?)),
        }
    }

    pub fn is_file_processed(&self, path: &Path) -> bool {
        self.processed_files.contains(&file_key(path))
    }

    pub fn is_package_processed(&self, import: &PackageImportPath) -> bool {
        self.processed_packages.contains(&import.key())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }
}

fn file_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
