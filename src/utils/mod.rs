//! Utility modules for the static site generator.

pub mod exec;
pub mod fs;
