//! Site configuration management for `mdforge.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[build]`   | Source/output paths, base URL, styles, scripts |
//! | `[serve]`   | Development server (port, interface, watch)    |
//! | `[extra]`   | User-defined values exposed to templates       |
//!
//! The file is optional: a project without `mdforge.toml` builds with the
//! defaults below.
//!
//! # Example
//!
//! ```toml
//! [build]
//! content = "src/markdown"
//! output = "build"
//! base_url = "/"
//!
//! [build.styles]
//! input = "src/scss/index.scss"
//!
//! [serve]
//! port = 8080
//!
//! [extra]
//! analytics_id = "UA-12345"
//! ```

mod build;
pub mod defaults;
mod error;
mod serve;

pub use error::ConfigError;

use build::BuildConfig;
use serve::ServeConfig;

use crate::cli::Cli;
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing mdforge.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// User-defined extra fields, available to templates as `site`
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Resolve the config for a CLI invocation.
    ///
    /// Reads `<root>/<config>` when it exists, applies CLI overrides,
    /// normalizes every path against the root and validates the result.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };

        config.update_with_cli(cli, &root);
        config.validate()?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Path relative to the project root, for log lines.
    pub fn rel_path(&self, path: &Path) -> String {
        path.strip_prefix(self.get_root())
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli, root: &Path) {
        Self::update_option(&mut self.build.base_url, cli.base_dir.as_ref());
        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.templates, cli.templates.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.serve.interface, cli.interface.as_ref());
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        self.build.clean |= cli.clean;

        self.update_path_with_root(root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, config_file: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(config_file));

        self.build.content = Self::normalize_path(&root.join(&self.build.content));
        self.build.templates = Self::normalize_path(&root.join(&self.build.templates));
        self.build.assets = Self::normalize_path(&root.join(&self.build.assets));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.build.styles.input = Self::normalize_path(&root.join(&self.build.styles.input));
        self.build.scripts.input = Self::normalize_path(&root.join(&self.build.scripts.input));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration values that would otherwise fail mid-build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.build.base_url;
        if !(base_url.starts_with('/')
            || base_url.starts_with("http://")
            || base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "[build.base_url] `{base_url}` must start with `/`, http:// or https://"
            )));
        }

        if self.build.default_template.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[build.default_template] must not be empty".into(),
            ));
        }

        if self.build.styles.enable && self.build.styles.command.is_empty() {
            return Err(ConfigError::Validation(
                "[build.styles.command] must have at least one element".into(),
            ));
        }

        if self.build.scripts.enable && self.build.scripts.command.is_empty() {
            return Err(ConfigError::Validation(
                "[build.scripts.command] must have at least one element".into(),
            ));
        }

        if self.build.content == self.build.output {
            return Err(ConfigError::Validation(
                "[build.output] must differ from [build.content]".into(),
            ));
        }

        self.serve.ip_addr()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str(
            r#"
            [build]
            content = "docs"
            base_url = "/site/"
        "#,
        )
        .unwrap();

        assert_eq!(config.build.content, PathBuf::from("docs"));
        assert_eq!(config.build.base_url, "/site/");
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::from_str("[build\ncontent = \"x\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = SiteConfig::from_path(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io(..))));
    }

    #[test]
    fn test_get_root_default() {
        let config = SiteConfig::default();
        assert_eq!(config.get_root(), Path::new("./"));
    }

    #[test]
    fn test_set_root() {
        let mut config = SiteConfig::default();
        config.set_root(Path::new("/custom/path"));
        assert_eq!(config.get_root(), Path::new("/custom/path"));
    }

    #[test]
    fn test_rel_path() {
        let mut config = SiteConfig::default();
        config.set_root(Path::new("/site"));

        assert_eq!(
            config.rel_path(Path::new("/site/src/markdown/a.md")),
            "src/markdown/a.md"
        );
        assert_eq!(config.rel_path(Path::new("/elsewhere/b.md")), "/elsewhere/b.md");
    }

    #[test]
    fn test_extra_fields() {
        let config = r#"
            [extra]
            custom_field = "custom_value"
            number_field = 42

            [extra.social]
            github = "username"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(
            config.extra.get("custom_field").and_then(|v| v.as_str()),
            Some("custom_value")
        );
        assert_eq!(
            config.extra.get("number_field").and_then(|v| v.as_integer()),
            Some(42)
        );
        let social = config.extra.get("social").and_then(|v| v.as_table()).unwrap();
        assert_eq!(social.get("github").and_then(|v| v.as_str()), Some("username"));
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        let result: Result<SiteConfig, _> = toml::from_str("[deploy]\nforce = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_update_with_cli_overrides_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "mdforge",
            "--base-dir",
            "/blog/",
            "--content",
            "pages",
            "--port",
            "9000",
            "--clean",
        ])
        .unwrap();

        let mut config = SiteConfig::default();
        config.update_with_cli(&cli, dir.path());

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.get_root(), root);
        assert_eq!(config.build.base_url, "/blog/");
        assert_eq!(config.build.content, root.join("pages"));
        assert_eq!(config.build.output, root.join("build"));
        assert_eq!(config.build.styles.input, root.join("src/scss/index.scss"));
        assert_eq!(config.config_path, root.join("mdforge.toml"));
        assert_eq!(config.serve.port, 9000);
        assert!(config.build.clean);
    }

    #[test]
    fn test_load_without_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["mdforge", "--root", root]).unwrap();

        let config = SiteConfig::load(&cli).unwrap();

        assert_eq!(config.build.base_url, "/");
        assert!(config.build.content.ends_with("src/markdown"));
    }

    #[test]
    fn test_load_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mdforge.toml"),
            "[build]\noutput = \"dist\"\nbase_url = \"/docs/\"\n",
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["mdforge", "--root", root]).unwrap();

        let config = SiteConfig::load(&cli).unwrap();

        assert!(config.build.output.ends_with("dist"));
        assert_eq!(config.build.base_url, "/docs/");
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = SiteConfig::default();
        assert!(config.validate().is_ok());

        config.build.base_url = "https://example.com/docs/".into();
        assert!(config.validate().is_ok());

        config.build.base_url = "docs".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_interface() {
        let mut config = SiteConfig::default();
        config.serve.interface = "not-an-ip".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_empty_command() {
        let mut config = SiteConfig::default();
        config.build.styles.command.clear();
        assert!(config.validate().is_err());

        config.build.styles.enable = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_output_equals_content() {
        let mut config = SiteConfig::default();
        config.build.output = config.build.content.clone();
        assert!(config.validate().is_err());
    }
}
