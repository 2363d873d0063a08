//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "src/markdown".into()
    }

    pub fn templates() -> PathBuf {
        "src/templates".into()
    }

    pub fn assets() -> PathBuf {
        "src/assets".into()
    }

    pub fn output() -> PathBuf {
        "build".into()
    }

    pub fn base_url() -> String {
        "/".into()
    }

    pub fn default_template() -> String {
        "default".into()
    }

    pub mod styles {
        use std::path::PathBuf;

        pub fn input() -> PathBuf {
            "src/scss/index.scss".into()
        }

        pub fn command() -> Vec<String> {
            vec!["sass".into()]
        }
    }

    pub mod scripts {
        use std::path::PathBuf;

        pub fn input() -> PathBuf {
            "src/js/index.js".into()
        }

        pub fn command() -> Vec<String> {
            vec!["esbuild".into()]
        }
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8080
    }

    pub fn reload_port() -> u16 {
        35729
    }
}
