//! Per-file conversion driver.

use crate::error::ConvertError;
use crate::options::Options;
use crate::package::{ConversionUnit, FileStatus, PackageImportPath, RunContext};
use crate::roots::SourceRoots;
use refract_translate::{
    Diagnostic, FileContext, ParsedSource, SOURCE_EXTENSION, TARGET_EXTENSION, TypeModel,
    parse_source, translate,
};
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Target file for a source file inside `target_dir`.
pub fn target_file(source: &Path, target_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    target_dir.join(format!("{}.{}", stem, TARGET_EXTENSION))
}

/// Whether `path` is a source file a directory scan would pick up.
fn is_package_source(path: &Path, exclude: Option<&Regex>) -> bool {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION));
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    has_extension && !exclude.is_some_and(|re| re.is_match(&name))
}

/// Source files directly inside `dir`, minus excluded names, sorted.
pub fn source_files(dir: &Path, exclude: Option<&Regex>) -> Result<Vec<PathBuf>, ConvertError> {
    let entries = fs::read_dir(dir).map_err(|source| ConvertError::SourceRead {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| is_package_source(path, exclude))
        .collect();
    files.sort();
    Ok(files)
}

/// A parsed source file. Bytes that are not valid UTF-8 are replaced, and
/// `invalid_utf8` holds the line and column of the first one.
struct SourceFile {
    parsed: ParsedSource,
    invalid_utf8: Option<(usize, usize)>,
}

/// Read and parse one file. Only a failed read is an error; undecodable
/// bytes are reported on the file by the caller.
fn read_source(path: &Path) -> Result<SourceFile, ConvertError> {
    let bytes = fs::read(path).map_err(|source| ConvertError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid_utf8 = std::str::from_utf8(&bytes)
        .err()
        .map(|err| position_of(&bytes[..err.valid_up_to()]));
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let parsed = parse_source(text).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SourceFile {
        parsed,
        invalid_utf8,
    })
}

/// 1-based line and byte column just past `prefix`.
fn position_of(prefix: &[u8]) -> (usize, usize) {
    let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    (line, prefix.len() - line_start + 1)
}

/// Declarations of every source file in `dir`.
fn collect_package(dir: &Path, exclude: Option<&Regex>) -> Result<TypeModel, ConvertError> {
    let mut model = TypeModel::new();
    for file in source_files(dir, exclude)? {
        model.add_file(&read_source(&file)?.parsed);
    }
    debug!(dir = %dir.display(), types = model.len(), "collected package types");
    Ok(model)
}

/// Convert one file into `target_dir`.
///
/// Returns `None` when the file was already processed in this run. A file
/// whose target exists is skipped (and counted) unless overwriting is
/// enabled; its imports are not followed because it is never parsed.
pub fn convert_file(
    ctx: &mut RunContext,
    source: &Path,
    target_dir: &Path,
    options: &Options,
    roots: &SourceRoots,
) -> Result<Option<FileStatus>, ConvertError> {
    if !ctx.claim_file(source) {
        debug!(file = %source.display(), "already processed");
        return Ok(None);
    }

    let target = target_file(source, target_dir);
    if target.exists() && !options.overwrite_existing_files {
        info!(
            source = %source.display(),
            target = %target.display(),
            "skipping convert, target already exists"
        );
        ctx.report.totals.skipped_files += 1;
        ctx.report.files.push(ConversionUnit {
            source: source.to_path_buf(),
            target,
            status: FileStatus::Skipped,
            package_name: None,
            imports: Vec::new(),
            warnings: Vec::new(),
            parse_tree: None,
        });
        return Ok(Some(FileStatus::Skipped));
    }

    info!(source = %source.display(), target = %target.display(), "converting");
    let file = read_source(source)?;
    let dir = source.parent().unwrap_or(Path::new("."));
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut context = FileContext::new(file_name.clone());
    context.package_path = roots.package_path_of(dir);

    let exclude = options.exclude_regex()?;
    let cached = ctx.package_model(dir, || collect_package(dir, exclude.as_ref()))?;
    // A file the directory scan leaves out still sees its own declarations.
    let merged;
    let model = if is_package_source(source, exclude.as_ref()) {
        cached
    } else {
        let mut model = cached.clone();
        model.add_file(&file.parsed);
        merged = model;
        &merged
    };
    let mut translation = translate(&file.parsed, model, &context);
    if let Some((line, column)) = file.invalid_utf8 {
        translation.diagnostics.insert(
            0,
            Diagnostic {
                file: file_name,
                line,
                column,
                message: "source is not valid UTF-8; invalid bytes were replaced".into(),
            },
        );
    }

    fs::create_dir_all(target_dir).map_err(|source| ConvertError::CreateTargetDir {
        path: target_dir.to_path_buf(),
        source,
    })?;
    write_target(&target, &translation.text)?;

    for warning in &translation.diagnostics {
        warn!("{}", warning);
    }
    ctx.report.totals.warnings += translation.diagnostics.len();

    if !options.local_convert_only {
        for import in &translation.imports {
            ctx.enqueue(PackageImportPath::new(import.as_str()));
        }
    }

    ctx.report.files.push(ConversionUnit {
        source: source.to_path_buf(),
        target,
        status: FileStatus::Converted,
        package_name: translation.package_name,
        imports: translation.imports,
        warnings: translation.diagnostics,
        parse_tree: options.show_parse_tree.then(|| file.parsed.sexp()),
    });
    Ok(Some(FileStatus::Converted))
}

/// Write the whole text through one scoped handle. A failed write may
/// leave a partial file behind.
fn write_target(path: &Path, text: &str) -> Result<(), ConvertError> {
    let to_error = |source| ConvertError::TargetWrite {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(text.as_bytes()).map_err(to_error)?;
    writer.flush().map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_file_swaps_extension() {
        assert_eq!(
            target_file(Path::new("/src/a/point.go"), Path::new("/out")),
            PathBuf::from("/out/point.cs")
        );
    }

    #[test]
    fn test_invalid_utf8_is_located_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.go");
        fs::write(&path, b"package p\n\n// caf\xe9\n").unwrap();
        let file = read_source(&path).unwrap();
        assert_eq!(file.invalid_utf8, Some((3, 7)));
        assert!(file.parsed.source().contains("caf\u{fffd}"));
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = read_source(&dir.path().join("missing.go")).err().unwrap();
        assert!(matches!(err, ConvertError::SourceRead { .. }));
    }

    #[test]
    fn test_excluded_names_are_not_package_sources() {
        let exclude = Options::default().exclude_regex().unwrap();
        assert!(is_package_source(Path::new("/p/a.go"), exclude.as_ref()));
        assert!(!is_package_source(Path::new("/p/a_test.go"), exclude.as_ref()));
        assert!(!is_package_source(Path::new("/p/a.txt"), None));
    }

    #[test]
    fn test_source_files_are_filtered_and_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b.go", "a.go", "a_test.go", "notes.txt"] {
            fs::write(dir.path().join(name), "package p\n").unwrap();
        }
        fs::create_dir(dir.path().join("sub.go")).unwrap();
        let exclude = Options::default().exclude_regex().unwrap();
        let files = source_files(dir.path(), exclude.as_ref()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
    }
}
