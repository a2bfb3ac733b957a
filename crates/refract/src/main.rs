//! refract: convert Go packages to C#.

mod config;
mod report;

use anyhow::Context;
use clap::Parser;
use config::RefractConfig;
use refract_graph::{Options, SourceRoots};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "refract", version, about = "Convert Go source files and their imports to C#")]
struct Cli {
    /// Go source file or package directory. Relative paths that do not
    /// exist locally are resolved against the workspace root (GOPATH/src).
    source: PathBuf,

    /// Output directory for converted files (default: next to the sources)
    #[arg(short = 't', long)]
    target: Option<PathBuf>,

    /// Output root for converted standard-library packages
    #[arg(long)]
    std_target: Option<PathBuf>,

    /// Overwrite existing target files
    #[arg(short = 'o', long)]
    overwrite_files: bool,

    /// Overwrite existing converted packages reached through imports
    #[arg(short = 'p', long)]
    overwrite_packages: bool,

    /// Convert standard-library packages that are imported
    #[arg(short = 's', long)]
    convert_std: bool,

    /// Only convert the given file or directory; do not follow imports
    #[arg(short = 'l', long)]
    local: bool,

    /// Regex for file names to leave out of directory scans
    #[arg(short = 'e', long)]
    exclude: Option<String>,

    /// Print each converted file's parse tree
    #[arg(long)]
    show_parse_tree: bool,

    /// Go installation directory (default: $GOROOT or /usr/local/go)
    #[arg(long)]
    goroot: Option<PathBuf>,

    /// Go workspace directory (default: $GOPATH or ~/go)
    #[arg(long)]
    gopath: Option<PathBuf>,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Flags override the configured options; unset flags leave them alone.
    fn apply(&self, mut options: Options) -> Options {
        options.overwrite_existing_files |= self.overwrite_files;
        options.overwrite_existing_packages |= self.overwrite_packages;
        options.convert_standard_library |= self.convert_std;
        options.local_convert_only |= self.local;
        options.show_parse_tree |= self.show_parse_tree;
        if let Some(target) = &self.target {
            options.target_path = Some(target.clone());
        }
        if let Some(std_target) = &self.std_target {
            options.target_std_path = Some(std_target.clone());
        }
        if let Some(exclude) = &self.exclude {
            options.exclude_pattern = Some(exclude.clone());
        }
        options
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("refract=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config = RefractConfig::load(&cwd);
    let options = cli.apply(config.options());

    let roots = SourceRoots::discover(
        cli.goroot.clone().or(config.roots.goroot),
        cli.gopath.clone().or(config.roots.gopath),
    )
    .context("failed to locate Go source roots")?;

    let report = refract_graph::run(&cli.source, &options, &roots)
        .with_context(|| format!("failed to convert {}", cli.source.display()))?;

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        report::write_json(&report, &mut stdout)?;
    } else {
        report::write_text(&report, &mut stdout)?;
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["refract", "app", "-o", "-t", "/out", "-e", "^x"]);
        let configured = Options {
            convert_standard_library: true,
            ..Options::default()
        };
        let options = cli.apply(configured);
        assert!(options.overwrite_existing_files);
        assert!(options.convert_standard_library);
        assert!(!options.local_convert_only);
        assert_eq!(options.target_path, Some(PathBuf::from("/out")));
        assert_eq!(options.exclude_pattern.as_deref(), Some("^x"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
