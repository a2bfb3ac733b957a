//! Go to C# translation engine.
//!
//! `refract-translate` turns one Go source file into C# text that targets a
//! small runtime shim (`NilType`, `Ref<T>`, `ptr<T>`, `slice<T>`, ...). The
//! shim itself lives elsewhere; this crate only emits its names.
//!
//! # Architecture
//!
//! ```text
//! source text ──> parse ──> walk ──> Converter ──> EmissionBuffer ──> finalize
//!                   │                  │   │
//!                   │                  │   └─> ScopeTracker (owed closers)
//!                   │                  └─────> TypeModel + promotion
//!                   └─> syntax errors ───────> Diagnostics
//! ```
//!
//! The walk is single-pass. Facts that are only known after the whole file
//! has been seen (which `using` directives the output needs) are written as
//! a deferred marker and patched in during finalization.
//!
//! # Example
//!
//! ```ignore
//! use refract_translate::{FileContext, TypeModel, parse_source, translate};
//!
//! let parsed = parse_source("package main\n\ntype Point struct { X int }\n")?;
//! let model = TypeModel::collect(&parsed);
//! let out = translate(&parsed, &model, &FileContext::new("point.go"));
//! assert!(out.text.contains("public partial struct Point"));
//! ```

pub mod body;
pub mod converter;
pub mod diagnostics;
pub mod emit;
pub mod model;
pub mod names;
pub mod parse;
pub mod promotion;
pub mod scope;
pub mod structs;
pub mod walk;

pub use converter::{Converter, FileContext, Translation, translate};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use emit::{DeferredMarker, EmissionBuffer};
pub use model::{EmbeddedTypeRelation, FieldDecl, MethodDecl, Param, StructDecl, TypeModel};
pub use parse::{ParseError, ParsedSource, SyntaxError, parse_source};
pub use promotion::{MemberKind, PromotedMember, Promotion, promote};
pub use scope::{ScopeKind, ScopeTracker};
pub use walk::{Listener, Visit, walk};

/// Name written into `GeneratedCode` attributes.
pub const GENERATOR: &str = "refract";

/// Version written into `GeneratedCode` attributes.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extension of source files this engine reads.
pub const SOURCE_EXTENSION: &str = "go";

/// Extension of files this engine writes.
pub const TARGET_EXTENSION: &str = "cs";
