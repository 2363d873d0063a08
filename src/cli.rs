//! Command-line interface definitions.
//!
//! Defines all CLI arguments using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// mdforge static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to the root (optional on disk)
    #[arg(short = 'C', long, default_value = "mdforge.toml")]
    pub config: PathBuf,

    /// Build once (`production`) or build, watch and serve (`development`)
    #[arg(short, long, value_enum, default_value_t = Mode::Production)]
    pub mode: Mode,

    /// URL prefix the site is served under [default: /]
    #[arg(short = 'b', long = "base-dir")]
    pub base_dir: Option<String>,

    /// Markdown content directory (relative to project root)
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Template directory (relative to project root)
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Output directory (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Remove the output directory before building
    #[arg(long)]
    pub clean: bool,

    /// Interface for the development server to bind on
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Port for the development server
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Pipeline mode.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Build, then watch the sources and serve the output with live reload
    Development,
    /// Build once and exit
    #[default]
    Production,
}

impl Cli {
    pub const fn is_development(&self) -> bool {
        matches!(self.mode, Mode::Development)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mdforge"]).unwrap();

        assert_eq!(cli.mode, Mode::Production);
        assert_eq!(cli.config, PathBuf::from("mdforge.toml"));
        assert!(cli.base_dir.is_none());
        assert!(!cli.clean);
        assert!(!cli.is_development());
    }

    #[test]
    fn test_mode_short_flag() {
        let cli = Cli::try_parse_from(["mdforge", "-m", "development"]).unwrap();
        assert!(cli.is_development());
    }

    #[test]
    fn test_base_dir() {
        let cli = Cli::try_parse_from(["mdforge", "--base-dir", "/docs/"]).unwrap();
        assert_eq!(cli.base_dir.as_deref(), Some("/docs/"));

        let cli = Cli::try_parse_from(["mdforge", "-b", "/blog/"]).unwrap();
        assert_eq!(cli.base_dir.as_deref(), Some("/blog/"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["mdforge", "--mode", "staging"]).is_err());
    }

    #[test]
    fn test_path_overrides() {
        let cli = Cli::try_parse_from([
            "mdforge",
            "--root",
            "site",
            "--content",
            "pages",
            "-o",
            "dist",
            "--clean",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("site")));
        assert_eq!(cli.content, Some(PathBuf::from("pages")));
        assert_eq!(cli.output, Some(PathBuf::from("dist")));
        assert!(cli.clean);
    }
}
