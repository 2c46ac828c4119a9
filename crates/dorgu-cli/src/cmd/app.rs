use crate::layers::{self, Sources};
use anyhow::Context;
use clap::Args;
use dorgu_core::analysis::AnalysisResult;
use dorgu_core::config::EffectiveConfig;
use dorgu_core::paths;
use std::path::{Path, PathBuf};

/// Where an application's analysis and config come from.
#[derive(Args)]
pub struct AppArgs {
    /// Application directory
    #[arg(default_value = ".")]
    pub app_dir: PathBuf,

    /// Analysis file, YAML or JSON (default: <app-dir>/analysis.yaml)
    #[arg(long)]
    pub analysis: Option<PathBuf>,

    /// Override the application name
    #[arg(long)]
    pub name: Option<String>,

    /// Target namespace
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Container registry, e.g. ghcr.io/acme
    #[arg(long)]
    pub registry: Option<String>,

    /// Workspace config file (default: <root>/.dorgu.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl AppArgs {
    /// `<app-dir>/<dir>` unless an explicit output directory was given.
    pub fn output_dir(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.app_dir.join(paths::DEFAULT_OUTPUT_DIR))
    }

    /// Load the analysis, fold in the app's `.dorgu.yaml`, apply `--name`,
    /// and resolve the effective config.
    pub fn load(&self, root: &Path) -> anyhow::Result<(AnalysisResult, EffectiveConfig)> {
        let path = self
            .analysis
            .clone()
            .unwrap_or_else(|| paths::analysis_path(&self.app_dir));
        let mut analysis = AnalysisResult::load(&path)
            .with_context(|| format!("failed to read analysis {}", path.display()))?;

        let resolved = layers::resolve(&Sources {
            root,
            app_dir: &self.app_dir,
            workspace_config: self.config.as_deref(),
            namespace: self.namespace.clone(),
            registry: self.registry.clone(),
        });
        if let Some(app_config) = &resolved.app_config {
            analysis = analysis.with_app_config(app_config);
        }
        if let Some(name) = &self.name {
            analysis.name = name.clone();
        }
        Ok((analysis, resolved.config))
    }
}
