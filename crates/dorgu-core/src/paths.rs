use crate::error::{DorguError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

/// Per-app and per-workspace configuration file name.
pub const APP_CONFIG_FILE: &str = ".dorgu.yaml";
pub const GLOBAL_CONFIG_DIR: &str = "dorgu";
pub const GLOBAL_CONFIG_FILE: &str = "config.yaml";

pub const DEFAULT_ANALYSIS_FILE: &str = "analysis.yaml";
pub const DEFAULT_OUTPUT_DIR: &str = "k8s";

// Generated documents, relative to the output directory.
pub const DEPLOYMENT_FILE: &str = "deployment.yaml";
pub const SERVICE_FILE: &str = "service.yaml";
pub const INGRESS_FILE: &str = "ingress.yaml";
pub const HPA_FILE: &str = "hpa.yaml";
pub const ARGOCD_FILE: &str = "argocd/application.yaml";
pub const CI_WORKFLOW_FILE: &str = "../.github/workflows/deploy.yaml";
pub const PERSONA_MD_FILE: &str = "../PERSONA.md";
pub const PERSONA_YAML_FILE: &str = "persona.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn app_config_path(dir: &Path) -> PathBuf {
    dir.join(APP_CONFIG_FILE)
}

pub fn analysis_path(app_dir: &Path) -> PathBuf {
    app_dir.join(DEFAULT_ANALYSIS_FILE)
}

/// `$XDG_CONFIG_HOME/dorgu`, else `~/.config/dorgu`.
pub fn global_config_dir() -> Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join(GLOBAL_CONFIG_DIR));
    }
    let home = home::home_dir().ok_or(DorguError::HomeNotFound)?;
    Ok(home.join(".config").join(GLOBAL_CONFIG_DIR))
}

pub fn global_config_path() -> Result<PathBuf> {
    Ok(global_config_dir()?.join(GLOBAL_CONFIG_FILE))
}
