//! Manifest assembly engine.
//!
//! Each submodule turns one `(AnalysisResult, namespace, EffectiveConfig)`
//! tuple into one document. [`generate_all`] runs them in the fixed order the
//! output sink and the CI workflow rely on.

pub mod autoscaling;
pub mod common;
pub mod gitops;
pub mod ingress;
pub mod persona;
pub mod persona_spec;
pub mod pipeline;
pub mod service;
pub mod workload;

pub use persona::PersonaWriter;

use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::Result;
use crate::paths;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Workload,
    NetworkExposure,
    Endpoint,
    Autoscaling,
    GitOpsApplication,
    CiPipeline,
    PersonaText,
    PersonaSpec,
}

impl DocumentKind {
    /// Path relative to the output directory.
    pub fn path(self) -> &'static str {
        match self {
            DocumentKind::Workload => paths::DEPLOYMENT_FILE,
            DocumentKind::NetworkExposure => paths::SERVICE_FILE,
            DocumentKind::Endpoint => paths::INGRESS_FILE,
            DocumentKind::Autoscaling => paths::HPA_FILE,
            DocumentKind::GitOpsApplication => paths::ARGOCD_FILE,
            DocumentKind::CiPipeline => paths::CI_WORKFLOW_FILE,
            DocumentKind::PersonaText => paths::PERSONA_MD_FILE,
            DocumentKind::PersonaSpec => paths::PERSONA_YAML_FILE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub kind: DocumentKind,
    pub path: String,
    pub content: String,
}

impl GeneratedDocument {
    pub fn new(kind: DocumentKind, content: String) -> Self {
        Self {
            kind,
            path: kind.path().to_string(),
            content,
        }
    }
}

#[derive(Default, Clone, Copy)]
pub struct GenerateOptions<'a> {
    /// Invocation namespace; empty falls back to `defaults.namespace`.
    pub namespace: &'a str,
    pub skip_gitops: bool,
    pub skip_ci: bool,
    pub skip_persona: bool,
    pub persona_writer: Option<&'a dyn PersonaWriter>,
}

/// Assemble every applicable document in order: workload, service, ingress,
/// autoscaler, GitOps application, CI workflow, persona text, persona spec.
///
/// The first failure among the required documents aborts. The free-text
/// persona falls back to the basic renderer; a structured persona failure is
/// logged and the document omitted.
pub fn generate_all(
    analysis: &AnalysisResult,
    config: &EffectiveConfig,
    options: &GenerateOptions<'_>,
) -> Result<Vec<GeneratedDocument>> {
    common::require_name(analysis)?;
    let ns = common::namespace_or_default(options.namespace, config);
    let mut docs = Vec::with_capacity(8);

    docs.push(GeneratedDocument::new(
        DocumentKind::Workload,
        workload::generate(analysis, ns, config)?,
    ));

    if !analysis.ports.is_empty() {
        docs.push(GeneratedDocument::new(
            DocumentKind::NetworkExposure,
            service::generate(analysis, ns, config)?,
        ));
        if common::exposes_http(&analysis.ports) {
            docs.push(GeneratedDocument::new(
                DocumentKind::Endpoint,
                ingress::generate(analysis, ns, config)?,
            ));
        }
    }

    if let Some(hpa) = autoscaling::generate(analysis, ns, config)? {
        docs.push(GeneratedDocument::new(DocumentKind::Autoscaling, hpa));
    }

    if !options.skip_gitops {
        docs.push(GeneratedDocument::new(
            DocumentKind::GitOpsApplication,
            gitops::generate(analysis, ns, config)?,
        ));
    }

    if !options.skip_ci {
        docs.push(GeneratedDocument::new(
            DocumentKind::CiPipeline,
            pipeline::generate(analysis, ns, config)?,
        ));
    }

    if !options.skip_persona {
        docs.push(GeneratedDocument::new(
            DocumentKind::PersonaText,
            persona::generate_with(analysis, ns, config, options.persona_writer)?,
        ));
        match persona_spec::generate(analysis, ns, config) {
            Ok(yaml) => docs.push(GeneratedDocument::new(DocumentKind::PersonaSpec, yaml)),
            Err(e) => tracing::warn!(error = %e, "skipping structured persona"),
        }
    }

    tracing::debug!(app = %analysis.name, count = docs.len(), "assembled documents");
    Ok(docs)
}
