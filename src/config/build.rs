//! `[build]` section configuration.
//!
//! Contains source/output paths and the external stylesheet and script steps.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in mdforge.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// content = "src/markdown"   # Markdown sources
/// templates = "src/templates"
/// output = "build"
/// base_url = "/docs/"
///
/// [build.styles]
/// command = ["sass", "--no-source-map"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Markdown content directory.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Template directory, holding `<name>.html` files.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Static assets copied verbatim into the output root.
    #[serde(default = "defaults::build::assets")]
    #[educe(Default = defaults::build::assets())]
    pub assets: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// URL prefix the site is deployed under, exposed to templates as `baseDir`.
    #[serde(default = "defaults::build::base_url")]
    #[educe(Default = defaults::build::base_url())]
    pub base_url: String,

    /// Template used by pages without a `[_template]` field.
    #[serde(default = "defaults::build::default_template")]
    #[educe(Default = defaults::build::default_template())]
    pub default_template: String,

    /// Remove the output directory before building.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Stylesheet compilation.
    #[serde(default)]
    pub styles: StylesConfig,

    /// Script bundling.
    #[serde(default)]
    pub scripts: ScriptsConfig,
}

/// `[build.styles]` section - stylesheet compiler.
///
/// Invoked as `<command...> --style=compressed <input> <output>/index.css`.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct StylesConfig {
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Entry stylesheet
    #[serde(default = "defaults::build::styles::input")]
    #[educe(Default = defaults::build::styles::input())]
    pub input: PathBuf,

    /// Compiler command and leading arguments
    #[serde(default = "defaults::build::styles::command")]
    #[educe(Default = defaults::build::styles::command())]
    pub command: Vec<String>,
}

/// `[build.scripts]` section - script bundler.
///
/// Invoked as `<command...> <input> --bundle --sourcemap --outfile=<output>/index.js`.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ScriptsConfig {
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Entry script
    #[serde(default = "defaults::build::scripts::input")]
    #[educe(Default = defaults::build::scripts::input())]
    pub input: PathBuf,

    /// Bundler command and leading arguments
    #[serde(default = "defaults::build::scripts::command")]
    #[educe(Default = defaults::build::scripts::command())]
    pub command: Vec<String>,
}
