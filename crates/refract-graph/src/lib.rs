//! Conversion driver and import graph for refract.
//!
//! [`run`] converts a file or directory, then follows its imports through
//! the standard and workspace source roots until every reachable package
//! has been converted once. All memoization lives on a [`RunContext`]
//! created per run.
//!
//! ```ignore
//! use refract_graph::{Options, SourceRoots, run};
//!
//! let roots = SourceRoots::discover(None, None)?;
//! let report = run(Path::new("example.org/app"), &Options::default(), &roots)?;
//! println!("{} files", report.totals.processed_files);
//! ```

mod driver;
mod error;
mod options;
mod package;
mod resolver;
mod roots;

pub use driver::{convert_file, source_files, target_file};
pub use error::ConvertError;
pub use options::{DEFAULT_EXCLUDE_PATTERN, DEFAULT_STD_TARGET_DIR, Options};
pub use package::{
    ConversionUnit, FileStatus, PackageImportPath, RunContext, RunReport, Totals, UnresolvedImport,
};
pub use resolver::{convert_dir, convert_path, drain_imports, run};
pub use roots::SourceRoots;
