//! End-of-run output.

use refract_graph::{FileStatus, RunReport};
use std::io::{self, Write};

/// Write the report as indented JSON.
pub fn write_json(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}

/// Write the report as text: one block per file, then totals.
pub fn write_text(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    for file in &report.files {
        match file.status {
            FileStatus::Converted => writeln!(
                out,
                "Converted {} -> {}",
                file.source.display(),
                file.target.display()
            )?,
            FileStatus::Skipped => writeln!(
                out,
                "Skipped {}, target {} already exists",
                file.source.display(),
                file.target.display()
            )?,
        }
        if let Some(tree) = &file.parse_tree {
            writeln!(out, "{}", tree)?;
        }
        if !file.warnings.is_empty() {
            writeln!(out, "WARNINGS:")?;
            for warning in &file.warnings {
                writeln!(out, "    {}", warning)?;
            }
        }
    }

    for unresolved in &report.unresolved {
        writeln!(
            out,
            "WARNING: failed to locate package \"{}\" at either:",
            unresolved.import
        )?;
        for candidate in &unresolved.candidates {
            writeln!(out, "    {}", candidate.display())?;
        }
    }

    let totals = &report.totals;
    writeln!(out)?;
    writeln!(out, "{} total processed files", totals.processed_files)?;
    writeln!(out, "{} total skipped files", totals.skipped_files)?;
    writeln!(out, "{} total skipped packages", totals.skipped_packages)?;
    writeln!(out, "{} total warnings", totals.warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refract_graph::{ConversionUnit, PackageImportPath, Totals, UnresolvedImport};
    use std::path::PathBuf;

    fn sample() -> RunReport {
        RunReport {
            files: vec![ConversionUnit {
                source: PathBuf::from("/ws/app/main.go"),
                target: PathBuf::from("/out/main.cs"),
                status: FileStatus::Converted,
                package_name: Some("main".into()),
                imports: vec!["example.org/none".into()],
                warnings: Vec::new(),
                parse_tree: None,
            }],
            unresolved: vec![UnresolvedImport {
                import: PackageImportPath::new("example.org/none"),
                candidates: vec![PathBuf::from("/std/example.org/none")],
            }],
            totals: Totals {
                processed_files: 1,
                skipped_files: 0,
                skipped_packages: 0,
                warnings: 1,
            },
        }
    }

    #[test]
    fn test_text_report() {
        let mut out = Vec::new();
        write_text(&sample(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Converted /ws/app/main.go -> /out/main.cs"));
        assert!(text.contains("failed to locate package \"example.org/none\""));
        assert!(text.ends_with("1 total warnings\n"));
    }

    #[test]
    fn test_json_report() {
        let mut out = Vec::new();
        write_json(&sample(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["files"][0]["status"], "converted");
        assert_eq!(value["unresolved"][0]["import"], "example.org/none");
        assert_eq!(value["totals"]["processed_files"], 1);
        assert!(value["files"][0].get("parse_tree").is_none());
    }
}
