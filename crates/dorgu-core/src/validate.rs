//! Post-generation validation.
//!
//! Rules look at the same analysis, config and documents the assembly engine
//! used, resolve values through [`crate::manifest::common`], and report
//! findings. Validation never fails; it only annotates.

use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::manifest::{common, DocumentKind, GeneratedDocument};
use crate::paths;
use crate::quantity::{parse_cpu_millis, parse_memory_bytes};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: String,
    pub file: String,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
}

impl ValidationIssue {
    fn new(severity: Severity, category: &str, file: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.to_string(),
            file: file.to_string(),
            message: message.into(),
            suggestion: String::new(),
        }
    }

    fn suggest(mut self, suggestion: &str) -> Self {
        self.suggestion = suggestion.to_string();
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub passed: bool,
    pub summary: String,
}

impl ValidationResult {
    /// Groups issues by severity (stable within a group) and derives
    /// `passed` and `summary`.
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        issues.sort_by_key(|i| i.severity);
        let count = |s: Severity| issues.iter().filter(|i| i.severity == s).count();
        let (errors, warnings, infos) = (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        );

        let summary = if issues.is_empty() {
            "All validation checks passed".to_string()
        } else {
            let parts: Vec<String> = [(errors, "error"), (warnings, "warning"), (infos, "info")]
                .into_iter()
                .filter(|(n, _)| *n > 0)
                .map(|(n, label)| format!("{n} {label}(s)"))
                .collect();
            format!("Validation: {}", parts.join(", "))
        };

        Self {
            passed: errors == 0,
            summary,
            issues,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

// ---------------------------------------------------------------------------
// Rule engine
// ---------------------------------------------------------------------------

pub struct ValidationContext<'a> {
    pub analysis: &'a AnalysisResult,
    pub documents: &'a [GeneratedDocument],
    pub config: &'a EffectiveConfig,
}

impl ValidationContext<'_> {
    fn has_document(&self, kind: DocumentKind) -> bool {
        self.documents.iter().any(|d| d.kind == kind)
    }
}

pub struct Rule {
    pub id: &'static str,
    pub check: fn(&ValidationContext, &mut Vec<ValidationIssue>),
}

pub struct Validator {
    rules: Vec<Rule>,
}

impl Validator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        let mut issues = Vec::new();
        for rule in &self.rules {
            let before = issues.len();
            (rule.check)(ctx, &mut issues);
            if issues.len() > before {
                tracing::debug!(rule = rule.id, found = issues.len() - before, "rule reported");
            }
        }
        ValidationResult::from_issues(issues)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Run the default rule set.
pub fn validate(
    analysis: &AnalysisResult,
    documents: &[GeneratedDocument],
    config: &EffectiveConfig,
) -> ValidationResult {
    Validator::default().validate(&ValidationContext {
        analysis,
        documents,
        config,
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn check_image(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    if ctx.config.ci.registry.trim().is_empty() {
        out.push(
            ValidationIssue::new(
                Severity::Warning,
                "image",
                paths::DEPLOYMENT_FILE,
                format!(
                    "Container image is placeholder '{}' (no registry set)",
                    common::image(ctx.analysis, ctx.config)
                ),
            )
            .suggest(
                "Set CI registry via 'dorgu config set defaults.registry <registry>' or in .dorgu.yaml",
            ),
        );
    }
    out.push(
        ValidationIssue::new(
            Severity::Info,
            "image",
            paths::DEPLOYMENT_FILE,
            "Image uses ':latest' tag",
        )
        .suggest("Use specific image tags in production for reproducible deployments"),
    );
}

fn check_resources(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    let r = common::resources(ctx.analysis, ctx.config);
    let exceeds = |req: Option<u64>, lim: Option<u64>| match (req, lim) {
        (Some(req), Some(lim)) => req > 0 && lim > 0 && req > lim,
        _ => false,
    };

    if exceeds(parse_cpu_millis(&r.requests.cpu), parse_cpu_millis(&r.limits.cpu)) {
        out.push(
            ValidationIssue::new(
                Severity::Error,
                "resources",
                paths::DEPLOYMENT_FILE,
                format!(
                    "Resource requests > limits: CPU request ({}) > limit ({})",
                    r.requests.cpu, r.limits.cpu
                ),
            )
            .suggest("CPU request must be <= CPU limit"),
        );
    }
    if exceeds(
        parse_memory_bytes(&r.requests.memory),
        parse_memory_bytes(&r.limits.memory),
    ) {
        out.push(
            ValidationIssue::new(
                Severity::Error,
                "resources",
                paths::DEPLOYMENT_FILE,
                format!(
                    "Resource requests > limits: memory request ({}) > limit ({})",
                    r.requests.memory, r.limits.memory
                ),
            )
            .suggest("Memory request must be <= memory limit"),
        );
    }
}

fn check_probe_ports(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    let declared = &ctx.analysis.ports;
    if declared.is_empty() {
        return;
    }
    for port in common::configured_health_ports(ctx.analysis) {
        if !declared.iter().any(|p| p.port == port) {
            out.push(
                ValidationIssue::new(
                    Severity::Warning,
                    "ports",
                    paths::DEPLOYMENT_FILE,
                    format!("Health check port {port} does not match any container port"),
                )
                .suggest("Ensure health check port matches one of the exposed container ports"),
            );
        }
    }
}

fn check_scaling(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    if !ctx.has_document(DocumentKind::Autoscaling) {
        return;
    }
    let Some(s) = common::scaling(ctx.analysis) else {
        return;
    };
    if s.min_replicas > s.max_replicas {
        out.push(
            ValidationIssue::new(
                Severity::Error,
                "scaling",
                paths::HPA_FILE,
                format!(
                    "HPA minReplicas ({}) > maxReplicas ({})",
                    s.min_replicas, s.max_replicas
                ),
            )
            .suggest("Set minReplicas <= maxReplicas"),
        );
    }
}

fn check_ingress_host(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    if !ctx.has_document(DocumentKind::Endpoint) {
        return;
    }
    if common::ingress_host(ctx.analysis, ctx.config).is_empty() {
        out.push(
            ValidationIssue::new(
                Severity::Warning,
                "ingress",
                paths::INGRESS_FILE,
                "Ingress host is empty",
            )
            .suggest(
                "Set ingress.host in .dorgu.yaml or ensure ingress.domain_suffix is set in org config",
            ),
        );
    }
}

fn check_health(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    if common::probes(ctx.analysis).is_empty() {
        out.push(
            ValidationIssue::new(
                Severity::Warning,
                "health",
                paths::DEPLOYMENT_FILE,
                "No health probes configured",
            )
            .suggest(
                "Add health.liveness/readiness in .dorgu.yaml or implement a /health endpoint",
            ),
        );
    }
}

fn check_metadata(ctx: &ValidationContext, out: &mut Vec<ValidationIssue>) {
    if ctx.analysis.name.trim().is_empty() {
        out.push(
            ValidationIssue::new(
                Severity::Error,
                "metadata",
                paths::DEPLOYMENT_FILE,
                "Missing required field: application name",
            )
            .suggest("Set app.name in .dorgu.yaml or use --name"),
        );
    }
    if ctx.analysis.repository().is_empty() {
        out.push(
            ValidationIssue::new(
                Severity::Info,
                "metadata",
                paths::ARGOCD_FILE,
                "Repository URL not set",
            )
            .suggest("Set app.repository in .dorgu.yaml or ensure git remote origin is configured"),
        );
    }
}

/// Display order within a severity group follows this list.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "image_placeholder",
            check: check_image,
        },
        Rule {
            id: "resource_bounds",
            check: check_resources,
        },
        Rule {
            id: "probe_ports",
            check: check_probe_ports,
        },
        Rule {
            id: "autoscaling_bounds",
            check: check_scaling,
        },
        Rule {
            id: "ingress_host",
            check: check_ingress_host,
        },
        Rule {
            id: "health_probes",
            check: check_health,
        },
        Rule {
            id: "required_fields",
            check: check_metadata,
        },
    ]
}
