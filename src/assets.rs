//! Stylesheet compilation, script bundling and static asset copying.
//!
//! All three steps are blocking and run on the blocking pool while the
//! content crawl proceeds. None of them is fatal: a missing input is
//! skipped, a failing command is logged.

use crate::{
    config::SiteConfig,
    exec, log,
    utils::{
        exec::FilterRule,
        fs::{collect_all_files, copy_mirrored},
    },
};
use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

/// Compiled stylesheet, written next to its `.map`.
pub const STYLES_OUTPUT: &str = "index.css";
/// Bundled script, written next to its `.map`.
pub const SCRIPTS_OUTPUT: &str = "index.js";

/// Sass deprecation notices are noise for site authors.
const SASS_FILTER: FilterRule = FilterRule::new(&["Deprecation Warning", "More info"]);

/// Compile the entry stylesheet to `<output>/index.css`.
pub fn compile_styles(config: &SiteConfig) {
    if let Err(e) = try_compile_styles(config) {
        log!("error"; "styles: {:#}", e);
    }
}

/// Bundle the entry script to `<output>/index.js`.
pub fn bundle_scripts(config: &SiteConfig) {
    if let Err(e) = try_bundle_scripts(config) {
        log!("error"; "scripts: {:#}", e);
    }
}

/// Copy the assets directory into the output root.
///
/// Returns the number of files copied.
pub fn copy_assets(config: &SiteConfig) -> usize {
    let assets = &config.build.assets;
    let output = &config.build.output;

    let mut copied = 0;
    for file in collect_all_files(assets) {
        match copy_mirrored(&file, assets, output) {
            Ok(_) => {
                log!("copy"; "{}", config.rel_path(&file));
                copied += 1;
            }
            Err(e) => log!("error"; "{:#}", e),
        }
    }
    copied
}

fn try_compile_styles(config: &SiteConfig) -> Result<Option<PathBuf>> {
    let styles = &config.build.styles;
    if !styles.enable {
        return Ok(None);
    }
    if !styles.input.is_file() {
        log!("compile"; "skip styles, {} not found", config.rel_path(&styles.input));
        return Ok(None);
    }
    check_command_installed(&styles.command)?;

    let output = prepare_output(config, STYLES_OUTPUT)?;
    log!("compile"; "{}", config.rel_path(&styles.input));

    exec!(
        filter=&SASS_FILTER;
        config.get_root();
        &styles.command;
        "--style=compressed",
        &styles.input,
        &output
    )?;

    Ok(Some(output))
}

fn try_bundle_scripts(config: &SiteConfig) -> Result<Option<PathBuf>> {
    let scripts = &config.build.scripts;
    if !scripts.enable {
        return Ok(None);
    }
    if !scripts.input.is_file() {
        log!("compile"; "skip scripts, {} not found", config.rel_path(&scripts.input));
        return Ok(None);
    }
    check_command_installed(&scripts.command)?;

    let output = prepare_output(config, SCRIPTS_OUTPUT)?;
    log!("compile"; "{}", config.rel_path(&scripts.input));

    exec!(
        config.get_root();
        &scripts.command;
        &scripts.input,
        "--bundle",
        "--sourcemap",
        format!("--outfile={}", output.display())
    )?;

    Ok(Some(output))
}

fn prepare_output(config: &SiteConfig, name: &str) -> Result<PathBuf> {
    let output = &config.build.output;
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create `{}`", output.display()))?;
    Ok(output.join(name))
}

/// Check if a command is installed and available
fn check_command_installed(command: &[String]) -> Result<()> {
    let cmd = command.first().context("empty command")?;
    which::which(cmd).with_context(|| format!("`{cmd}` not found. Please install it first."))?;
    Ok(())
}
