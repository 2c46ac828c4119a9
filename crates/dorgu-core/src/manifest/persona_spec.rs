//! Machine-readable `ApplicationPersona` (dorgu.io/v1) document.

use super::common;
use crate::analysis::AnalysisResult;
use crate::config::{EffectiveConfig, ResourceValues};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub const API_VERSION: &str = "dorgu.io/v1";
pub const KIND: &str = "ApplicationPersona";
pub const TEAM_LABEL: &str = "dorgu.io/team";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPersona {
    pub api_version: String,
    pub kind: String,
    pub metadata: PersonaMetadata,
    pub spec: PersonaSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonaMetadata {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSpec {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub tier: String,
    pub technical: Technical,
    pub resources: Resources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<ScalingSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencySpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Ownership>,
    pub policies: Policies,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Technical {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub framework: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resources {
    pub requests: ResourceValues,
    pub limits: ResourceValues,
    pub profile: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingSpec {
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(rename = "targetCPU", skip_serializing_if = "Option::is_none")]
    pub target_cpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_memory: Option<u32>,
    pub behavior: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub liveness_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub readiness_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub startup_grace_period: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub required: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub health_check: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortSpec {
    pub port: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub purpose: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    pub enabled: bool,
    pub host: String,
    pub paths: Vec<String>,
    pub tls_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Networking {
    pub ports: Vec<PortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<IngressSpec>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Ownership {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub team: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub oncall: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub runbook: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicy {
    pub run_as_non_root: bool,
    pub read_only_root_filesystem: bool,
    pub allow_privilege_escalation: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPolicySpec {
    pub strategy: String,
    pub max_surge: String,
    pub max_unavailable: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub window: String,
    pub auto_restart: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Policies {
    pub security: SecurityPolicy,
    pub deployment: DeploymentPolicySpec,
    pub maintenance: Maintenance,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn health(analysis: &AnalysisResult) -> Option<HealthSpec> {
    let probes = common::probes(analysis);
    if probes.is_empty() {
        return None;
    }
    let liveness = probes.liveness.as_ref();
    let readiness = probes.readiness.as_ref();
    let grace = analysis
        .health_override()
        .map(|h| h.startup_grace_period.as_str())
        .filter(|g| !g.is_empty())
        .unwrap_or("30s");
    Some(HealthSpec {
        liveness_path: liveness.map(|p| p.path.clone()).unwrap_or_default(),
        readiness_path: readiness.map(|p| p.path.clone()).unwrap_or_default(),
        port: liveness.or(readiness).map(|p| p.port),
        startup_grace_period: grace.to_string(),
    })
}

fn dependencies(analysis: &AnalysisResult) -> Vec<DependencySpec> {
    match analysis.overrides().map(|o| &o.dependencies) {
        Some(deps) if !deps.is_empty() => deps
            .iter()
            .map(|d| DependencySpec {
                name: d.name.clone(),
                kind: d.kind.clone(),
                required: d.required,
                health_check: d.health_check.clone(),
            })
            .collect(),
        _ => analysis
            .dependencies
            .iter()
            .map(|name| DependencySpec {
                name: name.clone(),
                kind: String::new(),
                required: false,
                health_check: String::new(),
            })
            .collect(),
    }
}

fn networking(analysis: &AnalysisResult, config: &EffectiveConfig) -> Option<Networking> {
    if analysis.ports.is_empty() {
        return None;
    }
    let ports = analysis
        .ports
        .iter()
        .map(|p| PortSpec {
            port: p.port,
            protocol: if p.protocol.is_empty() {
                "TCP".to_string()
            } else {
                p.protocol.to_uppercase()
            },
            purpose: p.purpose.clone(),
        })
        .collect();
    let ingress = common::exposes_http(&analysis.ports).then(|| {
        let configured: Vec<String> = analysis
            .ingress_override()
            .map(|i| {
                i.paths
                    .iter()
                    .filter(|p| !p.path.is_empty())
                    .map(|p| p.path.clone())
                    .collect()
            })
            .unwrap_or_default();
        IngressSpec {
            enabled: true,
            host: common::ingress_host(analysis, config),
            paths: if configured.is_empty() {
                vec!["/".to_string()]
            } else {
                configured
            },
            tls_enabled: common::tls_enabled(analysis, config),
        }
    });
    Some(Networking { ports, ingress })
}

fn ownership(analysis: &AnalysisResult) -> Option<Ownership> {
    let ops = analysis.operations();
    let o = Ownership {
        team: analysis.team().to_string(),
        owner: analysis.owner().to_string(),
        repository: analysis.repository().to_string(),
        oncall: ops.map(|o| o.on_call.clone()).unwrap_or_default(),
        runbook: ops.map(|o| o.runbook.clone()).unwrap_or_default(),
    };
    let empty = o.team.is_empty()
        && o.owner.is_empty()
        && o.repository.is_empty()
        && o.oncall.is_empty()
        && o.runbook.is_empty();
    (!empty).then_some(o)
}

fn policies(analysis: &AnalysisResult, config: &EffectiveConfig) -> Policies {
    let baseline = config.security.enforce_baseline;
    let dp = analysis.overrides().and_then(|o| o.deployment_policy.as_ref());
    let pick = |get: fn(&crate::analysis::DeploymentPolicy) -> &str, fallback: &str| {
        dp.map(get)
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    let ops = analysis.operations();
    Policies {
        security: SecurityPolicy {
            run_as_non_root: baseline,
            read_only_root_filesystem: baseline,
            allow_privilege_escalation: !baseline,
        },
        deployment: DeploymentPolicySpec {
            strategy: pick(|d| d.strategy.as_str(), "RollingUpdate"),
            max_surge: pick(|d| d.max_surge.as_str(), "25%"),
            max_unavailable: pick(|d| d.max_unavailable.as_str(), "25%"),
        },
        maintenance: Maintenance {
            window: ops.map(|o| o.maintenance_window.clone()).unwrap_or_default(),
            auto_restart: ops.is_some_and(|o| o.auto_restart),
        },
    }
}

pub fn build(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<ApplicationPersona> {
    common::require_name(analysis)?;

    let mut labels = BTreeMap::from([(
        common::MANAGED_BY_LABEL.to_string(),
        common::MANAGED_BY.to_string(),
    )]);
    if !analysis.team().is_empty() {
        labels.insert(TEAM_LABEL.to_string(), analysis.team().to_string());
    }

    let resources = common::resources(analysis, config);
    let tier = analysis
        .overrides()
        .map(|o| o.tier.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or("standard");

    Ok(ApplicationPersona {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        metadata: PersonaMetadata {
            name: common::resource_name(analysis, config),
            namespace: common::namespace_or_default(namespace, config).to_string(),
            labels,
        },
        spec: PersonaSpec {
            name: analysis.name.clone(),
            version: "1".to_string(),
            app_type: analysis.app_type().to_string(),
            tier: tier.to_string(),
            technical: Technical {
                language: analysis.language.clone(),
                framework: analysis.framework.clone(),
                description: analysis.description().to_string(),
            },
            resources: Resources {
                requests: resources.requests,
                limits: resources.limits,
                profile: analysis.resource_profile().to_string(),
            },
            scaling: common::scaling(analysis).map(|s| ScalingSpec {
                min_replicas: s.min_replicas,
                max_replicas: s.max_replicas,
                target_cpu: (s.target_cpu > 0).then_some(s.target_cpu),
                target_memory: (s.target_memory > 0).then_some(s.target_memory),
                behavior: s.behavior,
            }),
            health: health(analysis),
            dependencies: dependencies(analysis),
            networking: networking(analysis, config),
            ownership: ownership(analysis),
            policies: policies(analysis, config),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        AppOverrides, DeploymentPolicy, HealthCheck, Operations, Port, ResourceOverrides, Scaling,
    };

    fn orders() -> AnalysisResult {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![Port::new(8080, "TCP", "HTTP API")];
        a.resource_profile = "api".to_string();
        a.scaling = Some(Scaling {
            min_replicas: 2,
            max_replicas: 10,
            target_cpu: 70,
            ..Scaling::default()
        });
        a
    }

    #[test]
    fn header_and_defaults() {
        let p = build(&orders(), "", &EffectiveConfig::builtin()).unwrap();
        assert_eq!(p.api_version, "dorgu.io/v1");
        assert_eq!(p.kind, "ApplicationPersona");
        assert_eq!(p.metadata.namespace, "default");
        assert_eq!(p.spec.tier, "standard");
        assert_eq!(p.spec.app_type, "api");
        assert_eq!(p.spec.resources.profile, "api");
        assert_eq!(p.spec.scaling.as_ref().unwrap().behavior, "balanced");
        assert!(p.spec.health.is_none());
        assert!(p.spec.ownership.is_none());
        assert_eq!(p.spec.policies.deployment.strategy, "RollingUpdate");
        assert!(p.spec.policies.security.run_as_non_root);
        assert!(!p.spec.policies.security.allow_privilege_escalation);
        let ingress = p.spec.networking.unwrap().ingress.unwrap();
        assert_eq!(ingress.host, "orders.local");
        assert_eq!(ingress.paths, vec!["/".to_string()]);
    }

    #[test]
    fn overrides_agree_with_workload_values() {
        let mut a = orders();
        a.health_check = Some(HealthCheck {
            path: "/health".to_string(),
            port: 8080,
            ..HealthCheck::default()
        });
        a.overrides = Some(AppOverrides {
            tier: "critical".to_string(),
            team: "payments".to_string(),
            resources: Some(ResourceOverrides {
                requests_cpu: "750m".to_string(),
                ..ResourceOverrides::default()
            }),
            scaling: Some(Scaling {
                max_replicas: 4,
                ..Scaling::default()
            }),
            deployment_policy: Some(DeploymentPolicy {
                strategy: "Recreate".to_string(),
                ..DeploymentPolicy::default()
            }),
            operations: Some(Operations {
                on_call: "#payments-oncall".to_string(),
                auto_restart: true,
                ..Operations::default()
            }),
            ..AppOverrides::default()
        });
        let p = build(&a, "payments", &EffectiveConfig::builtin()).unwrap();
        assert_eq!(p.spec.tier, "critical");
        assert_eq!(p.spec.resources.requests.cpu, "750m");
        assert_eq!(p.spec.scaling.as_ref().unwrap().max_replicas, 4);
        assert_eq!(p.spec.scaling.as_ref().unwrap().min_replicas, 2);
        assert_eq!(p.metadata.labels[TEAM_LABEL], "payments");
        assert_eq!(p.spec.policies.deployment.strategy, "Recreate");
        assert_eq!(p.spec.policies.deployment.max_surge, "25%");
        assert!(p.spec.policies.maintenance.auto_restart);
        assert_eq!(p.spec.ownership.as_ref().unwrap().oncall, "#payments-oncall");

        let health = p.spec.health.unwrap();
        assert_eq!(health.liveness_path, "/health");
        assert_eq!(health.readiness_path, "/health");
        assert_eq!(health.port, Some(8080));
        assert_eq!(health.startup_grace_period, "30s");
    }

    #[test]
    fn yaml_field_names() {
        let yaml = generate(&orders(), "default", &EffectiveConfig::builtin()).unwrap();
        assert!(yaml.starts_with("apiVersion: dorgu.io/v1\nkind: ApplicationPersona\n"));
        assert!(yaml.contains("targetCPU: 70"));
        assert!(yaml.contains("minReplicas: 2"));
        assert!(yaml.contains("tlsEnabled: false"));
        assert!(!yaml.contains("targetMemory"));
    }
}
