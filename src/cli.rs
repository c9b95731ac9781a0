use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{Engine, RunOverrides};

#[derive(Parser)]
#[command(name = "apiscope")]
#[command(about = "API signature and patch report generator for C# mod projects")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Scan location overrides shared by the scanning commands
#[derive(Args)]
pub struct ScanArgs {
    /// Project root (defaults to the configured root)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Directory to scan, relative to the root; repeat for several
    #[arg(long = "scan-dir")]
    pub scan_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Scan the sources and write the API report
    Generate {
        #[command(flatten)]
        scan: ScanArgs,

        /// Report file (defaults to the configured output file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the extracted model as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Run only the critical checks
    Check {
        #[command(flatten)]
        scan: ScanArgs,

        /// Fail if any issue is found (useful for CI)
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    pub fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => engine.init(path, force),
            Commands::Generate { scan, output, json } => {
                let overrides = RunOverrides {
                    root: scan.root,
                    scan_dirs: scan.scan_dirs,
                    output,
                };
                engine.generate(overrides, json).map(|_| ())
            }
            Commands::Check { scan, strict } => {
                let overrides = RunOverrides {
                    root: scan.root,
                    scan_dirs: scan.scan_dirs,
                    output: None,
                };
                engine.check(overrides, strict).map(|_| ())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "apiscope", "--verbose", "generate", "--root", "mod", "--scan-dir", "Core",
            "--scan-dir", "Patches", "--json", "out.json",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate { scan, output, json } => {
                assert_eq!(scan.root, Some(PathBuf::from("mod")));
                assert_eq!(scan.scan_dirs, vec![PathBuf::from("Core"), PathBuf::from("Patches")]);
                assert!(output.is_none());
                assert_eq!(json, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_check_strict() {
        let cli = Cli::parse_from(["apiscope", "check", "--strict"]);
        assert!(matches!(cli.command, Commands::Check { strict: true, .. }));
    }
}
