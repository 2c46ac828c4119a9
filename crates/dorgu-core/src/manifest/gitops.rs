use super::common;
use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ARGOCD_NAMESPACE: &str = "argocd";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: ApplicationSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub project: String,
    pub source: Source,
    pub destination: Destination,
    pub sync_policy: SyncPolicy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub path: String,
    pub target_revision: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Destination {
    pub server: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPolicy {
    pub automated: Automated,
    pub sync_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Automated {
    pub prune: bool,
    pub self_heal: bool,
}

pub fn build(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<Application> {
    common::require_name(analysis)?;
    let gitops = &config.gitops;

    Ok(Application {
        api_version: "argoproj.io/v1alpha1".to_string(),
        kind: "Application".to_string(),
        metadata: Metadata {
            name: common::resource_name(analysis, config),
            namespace: ARGOCD_NAMESPACE.to_string(),
            labels: common::labels(analysis, config),
        },
        spec: ApplicationSpec {
            project: gitops.project.clone(),
            source: Source {
                repo_url: analysis.repository_url(),
                path: gitops.path.clone(),
                target_revision: gitops.target_revision.clone(),
            },
            destination: Destination {
                server: gitops.server.clone(),
                namespace: if gitops.namespace.is_empty() {
                    namespace.to_string()
                } else {
                    gitops.namespace.clone()
                },
            },
            sync_policy: SyncPolicy {
                automated: Automated {
                    prune: gitops.sync_policy.prune,
                    self_heal: gitops.sync_policy.self_heal,
                },
                sync_options: vec!["CreateNamespace=true".to_string()],
            },
        },
    })
}

pub fn generate(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<String> {
    common::to_yaml(&build(analysis, namespace, config)?)
}
