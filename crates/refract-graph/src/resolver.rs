//! Import graph resolution.
//!
//! Imports discovered while converting files are queued on the
//! [`RunContext`] and drained as a worklist. A package is claimed before it
//! is converted, so cycles and diamonds convert each package exactly once.

use crate::driver::{convert_file, source_files};
use crate::error::ConvertError;
use crate::options::Options;
use crate::package::{RunContext, RunReport, UnresolvedImport};
use crate::roots::SourceRoots;
use refract_translate::TARGET_EXTENSION;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Convert `source` (a file or a directory) and everything it imports,
/// in a fresh run context.
pub fn run(source: &Path, options: &Options, roots: &SourceRoots) -> Result<RunReport, ConvertError> {
    let mut ctx = RunContext::new();
    convert_path(&mut ctx, source, options, roots)?;
    let report = ctx.into_report();
    info!(
        processed = report.totals.processed_files,
        skipped_files = report.totals.skipped_files,
        skipped_packages = report.totals.skipped_packages,
        warnings = report.totals.warnings,
        "run finished"
    );
    Ok(report)
}

/// Convert a file, or the direct source children of a directory, then
/// drain the import queue unless only local conversion was requested.
pub fn convert_path(
    ctx: &mut RunContext,
    path: &Path,
    options: &Options,
    roots: &SourceRoots,
) -> Result<(), ConvertError> {
    let source = roots.resolve_source(path)?;
    let source_dir = if source.is_dir() {
        source.as_path()
    } else {
        source.parent().unwrap_or(Path::new("."))
    };
    let target_dir = options
        .target_path
        .clone()
        .unwrap_or_else(|| source_dir.to_path_buf());

    if source.is_dir() {
        convert_dir(ctx, &source, &target_dir, options, roots)?;
    } else {
        convert_file(ctx, &source, &target_dir, options, roots)?;
    }

    if !options.local_convert_only {
        drain_imports(ctx, options, roots)?;
    }
    Ok(())
}

/// Convert the direct source children of `dir`; subdirectories are not
/// descended into.
pub fn convert_dir(
    ctx: &mut RunContext,
    dir: &Path,
    target_dir: &Path,
    options: &Options,
    roots: &SourceRoots,
) -> Result<(), ConvertError> {
    let exclude = options.exclude_regex()?;
    for file in source_files(dir, exclude.as_ref())? {
        convert_file(ctx, &file, target_dir, options, roots)?;
    }
    Ok(())
}

/// Resolve and convert queued imports until the queue is empty.
pub fn drain_imports(
    ctx: &mut RunContext,
    options: &Options,
    roots: &SourceRoots,
) -> Result<(), ConvertError> {
    let package_options = options.for_package();
    while let Some(import) = ctx.next_pending() {
        if !ctx.claim_package(&import) {
            continue;
        }

        let relative = import.relative_path();
        let [standard_dir, workspace_dir] = roots.candidates(&import);

        if standard_dir.is_dir() {
            let target = options.std_target_root(roots).join(&relative);
            if options.convert_standard_library {
                debug!(import = %import, "converting standard package");
                convert_dir(ctx, &standard_dir, &target, &package_options, roots)?;
            } else if has_converted_files(&target) {
                // Already converted by an earlier run: neither redone nor counted.
                debug!(import = %import, "standard package already converted");
            } else {
                info!(import = %import, "skipping convert for standard library package");
                ctx.report.totals.skipped_packages += 1;
            }
        } else if workspace_dir.is_dir() {
            let target = match &options.target_path {
                Some(root) => root.join(&relative),
                None => workspace_dir.clone(),
            };
            debug!(import = %import, "converting workspace package");
            convert_dir(ctx, &workspace_dir, &target, &package_options, roots)?;
        } else {
            warn!(
                import = %import,
                standard = %standard_dir.display(),
                workspace = %workspace_dir.display(),
                "failed to locate package"
            );
            ctx.report.totals.warnings += 1;
            ctx.report.unresolved.push(UnresolvedImport {
                import,
                candidates: vec![standard_dir, workspace_dir],
            });
        }
    }
    Ok(())
}

fn has_converted_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == TARGET_EXTENSION)
            })
        })
        .unwrap_or(false)
}
