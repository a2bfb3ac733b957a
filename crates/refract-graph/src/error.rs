use refract_translate::ParseError;
use std::io;
use std::path::PathBuf;

/// Errors that abort a whole run.
///
/// Everything else (syntax errors, unsupported constructs, unresolved
/// imports) is reported as data on the [`RunReport`](crate::RunReport).
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("standard source root not found: {}", .0.display())]
    StandardRootMissing(PathBuf),

    #[error("source path not found: {}", .0.display())]
    SourcePathNotFound(PathBuf),

    #[error("failed to read {}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", .path.display())]
    TargetWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}", .path.display())]
    CreateTargetDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid exclude pattern `{pattern}`")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}
