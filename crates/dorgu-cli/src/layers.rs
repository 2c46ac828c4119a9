//! Loads the configuration sources from disk and resolves them.
//!
//! A layer that cannot be read or parsed is logged and treated as empty so a
//! broken file never blocks generation.

use dorgu_core::app_config::AppConfig;
use dorgu_core::config::{self, ConfigLayer, EffectiveConfig};
use dorgu_core::global::GlobalConfig;
use dorgu_core::paths;
use std::path::{Path, PathBuf};

/// Where each source lives for one invocation.
pub struct Sources<'a> {
    pub root: &'a Path,
    pub app_dir: &'a Path,
    /// `--config`; defaults to `<root>/.dorgu.yaml`.
    pub workspace_config: Option<&'a Path>,
    pub namespace: Option<String>,
    pub registry: Option<String>,
}

pub struct Resolved {
    pub config: EffectiveConfig,
    pub app_config: Option<AppConfig>,
}

pub fn load_global() -> GlobalConfig {
    let path = match paths::global_config_path() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "global config unavailable, using defaults");
            return GlobalConfig::default();
        }
    };
    GlobalConfig::load(&path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable global config");
        GlobalConfig::default()
    })
}

fn load_workspace(path: &Path) -> ConfigLayer {
    ConfigLayer::load(path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable workspace config");
        ConfigLayer::default()
    })
}

fn load_app(app_dir: &Path) -> Option<AppConfig> {
    let path = paths::app_config_path(app_dir);
    AppConfig::load(&path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable app config");
        None
    })
}

pub fn resolve(sources: &Sources) -> Resolved {
    let workspace_path: PathBuf = sources
        .workspace_config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths::app_config_path(sources.root));

    let global = load_global().as_layer();
    let workspace = load_workspace(&workspace_path);
    let app_config = load_app(sources.app_dir);
    let app = app_config
        .as_ref()
        .map(AppConfig::as_layer)
        .unwrap_or_default();
    let cli = ConfigLayer::with_overrides(sources.namespace.clone(), sources.registry.clone());

    tracing::debug!(
        workspace = %workspace_path.display(),
        app = app_config.is_some(),
        "resolving configuration"
    );

    Resolved {
        config: config::resolve(&ConfigLayer::builtin(), &global, &workspace, &app, &cli),
        app_config,
    }
}
