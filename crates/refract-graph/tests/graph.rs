//! Import graph tests over temporary source roots.

use refract_graph::{ConvertError, FileStatus, Options, RunReport, SourceRoots, run};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    roots: SourceRoots,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let standard = dir.path().join("goroot/src");
        fs::create_dir_all(&standard).unwrap();
        let roots = SourceRoots::new(standard, dir.path().join("gopath/src")).unwrap();
        Self { dir, roots }
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn std_out(&self) -> PathBuf {
        self.dir.path().join("std-out")
    }

    fn options(&self) -> Options {
        Options {
            target_path: Some(self.out()),
            target_std_path: Some(self.std_out()),
            ..Options::default()
        }
    }

    fn workspace_file(&self, rel: &str, text: &str) -> PathBuf {
        write(&self.roots.workspace().join(rel), text)
    }

    fn standard_file(&self, rel: &str, text: &str) -> PathBuf {
        write(&self.roots.standard().join(rel), text)
    }

    fn package(&self, rel: &str) -> PathBuf {
        self.roots.workspace().join(rel)
    }

    fn run(&self, source: &Path, options: &Options) -> RunReport {
        run(source, options, &self.roots).expect("run failed")
    }
}

fn write(path: &Path, text: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
    path.to_path_buf()
}

fn converted_count(report: &RunReport, file_name: &str) -> usize {
    report
        .converted()
        .filter(|f| f.source.file_name().unwrap() == file_name)
        .count()
}

fn importing(package: &str, imports: &[&str]) -> String {
    let mut text = format!("package {}\n\n", package);
    for import in imports {
        text.push_str(&format!("import \"{}\"\n", import));
    }
    text.push_str("\nfunc Run() {}\n");
    text
}

#[test]
fn repeated_run_skips_existing_target() {
    let fx = Fixture::new();
    let main = fx.workspace_file("example.org/app/main.go", "package main\n\nfunc main() {}\n");
    let options = fx.options();

    let first = fx.run(&main, &options);
    assert_eq!(first.totals.processed_files, 1);
    assert_eq!(first.totals.skipped_files, 0);
    let target = fx.out().join("main.cs");
    let text = fs::read_to_string(&target).unwrap();

    for _ in 0..2 {
        let again = fx.run(&main, &options);
        assert_eq!(again.totals.skipped_files, 1);
        assert_eq!(again.files[0].status, FileStatus::Skipped);
        assert_eq!(fs::read_to_string(&target).unwrap(), text);
    }
}

#[test]
fn overwrite_reconverts_existing_target() {
    let fx = Fixture::new();
    let main = fx.workspace_file("example.org/app/main.go", "package main\n\nfunc main() {}\n");
    fx.run(&main, &fx.options());

    let options = Options {
        overwrite_existing_files: true,
        ..fx.options()
    };
    let report = fx.run(&main, &options);
    assert_eq!(report.totals.skipped_files, 0);
    assert_eq!(converted_count(&report, "main.go"), 1);
}

#[test]
fn import_cycle_converts_each_package_once() {
    let fx = Fixture::new();
    fx.workspace_file("example.org/a/a.go", &importing("a", &["example.org/b"]));
    fx.workspace_file("example.org/b/b.go", &importing("b", &["example.org/a"]));

    let report = fx.run(&fx.package("example.org/a"), &fx.options());
    assert_eq!(converted_count(&report, "a.go"), 1);
    assert_eq!(converted_count(&report, "b.go"), 1);
    assert!(report.unresolved.is_empty());
    assert!(fx.out().join("a.cs").is_file());
    assert!(fx.out().join("example.org/b/b.cs").is_file());
}

#[test]
fn diamond_dependency_converted_once() {
    let fx = Fixture::new();
    fx.workspace_file(
        "example.org/app/main.go",
        &importing("main", &["example.org/x", "example.org/y"]),
    );
    fx.workspace_file("example.org/x/x.go", &importing("x", &["example.org/z"]));
    fx.workspace_file("example.org/y/y.go", &importing("y", &["example.org/z"]));
    fx.workspace_file("example.org/z/z.go", &importing("z", &[]));

    let report = fx.run(&fx.package("example.org/app"), &fx.options());
    assert_eq!(converted_count(&report, "z.go"), 1);
    assert_eq!(report.converted().count(), 4);
    assert!(fx.out().join("example.org/z/z.cs").is_file());
}

#[test]
fn unresolved_import_is_reported_and_run_continues() {
    let fx = Fixture::new();
    fx.workspace_file(
        "example.org/app/main.go",
        &importing("main", &["example.org/missing", "example.org/lib"]),
    );
    fx.workspace_file("example.org/lib/lib.go", &importing("lib", &[]));

    let report = fx.run(&fx.package("example.org/app"), &fx.options());
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].import.as_str(), "example.org/missing");
    assert_eq!(report.unresolved[0].candidates.len(), 2);
    assert_eq!(report.totals.warnings, 1);
    assert_eq!(converted_count(&report, "lib.go"), 1);
}

#[test]
fn standard_package_skip_not_counted_when_already_converted() {
    let fx = Fixture::new();
    fx.standard_file("fmt/print.go", "package fmt\n\nfunc Println(a ...any) {}\n");
    let main = fx.workspace_file("example.org/app/main.go", &importing("main", &["fmt"]));

    let first = fx.run(&main, &fx.options());
    assert_eq!(first.totals.skipped_packages, 1);
    assert_eq!(converted_count(&first, "print.go"), 0);

    write(&fx.std_out().join("fmt/print.cs"), "// converted earlier\n");
    let options = Options {
        overwrite_existing_files: true,
        ..fx.options()
    };
    let second = fx.run(&main, &options);
    assert_eq!(second.totals.skipped_packages, 0);
    assert_eq!(converted_count(&second, "print.go"), 0);
}

#[test]
fn standard_package_converted_when_enabled() {
    let fx = Fixture::new();
    fx.standard_file("fmt/print.go", "package fmt\n\nfunc Println(a ...any) {}\n");
    let main = fx.workspace_file("example.org/app/main.go", &importing("main", &["fmt"]));

    let options = Options {
        convert_standard_library: true,
        ..fx.options()
    };
    let report = fx.run(&main, &options);
    assert_eq!(converted_count(&report, "print.go"), 1);
    let text = fs::read_to_string(fx.std_out().join("fmt/print.cs")).unwrap();
    assert!(text.contains("public static partial class fmt_package"));
    assert!(text.contains("public static void Println(params object[] a)"));
}

#[test]
fn local_only_does_not_follow_imports() {
    let fx = Fixture::new();
    fx.workspace_file("example.org/app/main.go", &importing("main", &["example.org/lib"]));
    fx.workspace_file("example.org/lib/lib.go", &importing("lib", &[]));

    let options = Options {
        local_convert_only: true,
        ..fx.options()
    };
    let report = fx.run(&fx.package("example.org/app"), &options);
    assert_eq!(report.converted().count(), 1);
    assert!(!fx.out().join("example.org/lib").exists());
}

#[test]
fn two_file_package_promotes_across_files() {
    let fx = Fixture::new();
    fx.workspace_file(
        "example.org/shapes/base.go",
        "package shapes\n\ntype Base struct {\n\tname string\n}\n",
    );
    fx.workspace_file(
        "example.org/shapes/derived.go",
        "package shapes\n\ntype Derived struct {\n\tBase\n\trole string\n}\n",
    );

    let report = fx.run(&fx.package("example.org/shapes"), &fx.options());
    assert_eq!(report.converted().count(), 2);
    assert_eq!(report.totals.warnings, 0);

    let derived = fs::read_to_string(fx.out().join("derived.cs")).unwrap();
    assert!(derived.contains("namespace go.example_org"));
    assert!(derived.contains("public static partial class shapes_package"));
    assert!(derived.contains("public ref @string name => ref m_BaseRef.Value.name;"));
    assert!(derived.contains("this.m_BaseRef = new Ref<Base>(new Base(nil));"));
}

#[test]
fn directory_scan_honors_exclusion_and_does_not_recurse() {
    let fx = Fixture::new();
    fx.workspace_file("example.org/app/a.go", "package app\n");
    fx.workspace_file("example.org/app/a_test.go", "package app\n");
    fx.workspace_file("example.org/app/skip_me.go", "package app\n");
    fx.workspace_file("example.org/app/nested/n.go", "package nested\n");

    let options = Options {
        exclude_pattern: Some(r"(_test|^skip_.*)\.go$".into()),
        ..fx.options()
    };
    let report = fx.run(&fx.package("example.org/app"), &options);
    let names: Vec<_> = report
        .files
        .iter()
        .map(|f| f.source.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.go"]);
}

#[test]
fn syntax_errors_are_warnings_not_failures() {
    let fx = Fixture::new();
    let main = fx.workspace_file(
        "example.org/app/main.go",
        "package main\n\nfunc main() {\n\tx := \n}\n",
    );
    let report = fx.run(&main, &fx.options());
    assert_eq!(report.converted().count(), 1);
    assert!(report.totals.warnings >= 1);
    assert!(fx.out().join("main.cs").is_file());
}

#[test]
fn missing_source_path_is_fatal() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("nowhere");
    let err = run(&missing, &fx.options(), &fx.roots).unwrap_err();
    assert!(matches!(err, ConvertError::SourcePathNotFound(_)));
}

#[test]
fn parse_tree_reported_on_request() {
    let fx = Fixture::new();
    let main = fx.workspace_file("example.org/app/main.go", "package main\n");
    let options = Options {
        show_parse_tree: true,
        ..fx.options()
    };
    let report = fx.run(&main, &options);
    let tree = report.files[0].parse_tree.as_deref().unwrap();
    assert!(tree.starts_with("(source_file"));
}

#[test]
fn undecodable_sibling_is_a_warning_on_that_file() {
    let fx = Fixture::new();
    fx.workspace_file("example.org/pkg/a.go", "package pkg\n\nfunc A() {}\n");
    let sibling = fx.package("example.org/pkg/b.go");
    fs::write(&sibling, b"package pkg\n\n// caf\xe9\nfunc B() {}\n").unwrap();

    let report = fx.run(&fx.package("example.org/pkg"), &fx.options());
    assert_eq!(report.converted().count(), 2);
    assert!(fx.out().join("a.cs").is_file());
    assert_eq!(report.totals.warnings, 1);

    let b = report
        .files
        .iter()
        .find(|f| f.source.file_name().unwrap() == "b.go")
        .unwrap();
    assert_eq!(b.warnings.len(), 1);
    assert_eq!((b.warnings[0].line, b.warnings[0].column), (3, 7));
    assert!(b.warnings[0].message.contains("not valid UTF-8"));
    let text = fs::read_to_string(fx.out().join("b.cs")).unwrap();
    assert!(text.contains("public static void B()"));
}

#[test]
fn explicitly_converted_excluded_file_sees_its_own_types() {
    let fx = Fixture::new();
    fx.workspace_file("example.org/app/a.go", "package app\n\ntype Unrelated struct{}\n");
    let file = fx.workspace_file(
        "example.org/app/o_test.go",
        "package app\n\ntype P struct {\n\tv int\n}\n\ntype O struct {\n\tP\n}\n",
    );

    let report = fx.run(&file, &fx.options());
    assert_eq!(report.converted().count(), 1);
    assert_eq!(report.totals.warnings, 0);
    let text = fs::read_to_string(fx.out().join("o_test.cs")).unwrap();
    assert!(text.contains("public ref nint v => ref m_PRef.Value.v;"));
    assert!(text.contains("this.m_PRef = new Ref<P>(new P(nil));"));
}
