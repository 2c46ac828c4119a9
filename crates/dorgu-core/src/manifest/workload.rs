use super::common::{self, ProbeSpec};
use crate::analysis::AnalysisResult;
use crate::config::{EffectiveConfig, ResourceValues};
use crate::error::Result;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, Container, ContainerPort, EnvVar, EnvVarSource, HTTPGetAction,
    PodSecurityContext, PodSpec, PodTemplateSpec, Probe, ResourceRequirements, SeccompProfile,
    SecretKeySelector, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

fn quantities(values: &ResourceValues) -> BTreeMap<String, Quantity> {
    let mut out = BTreeMap::new();
    if !values.cpu.is_empty() {
        out.insert("cpu".to_string(), Quantity(values.cpu.clone()));
    }
    if !values.memory.is_empty() {
        out.insert("memory".to_string(), Quantity(values.memory.clone()));
    }
    out
}

fn http_probe(spec: &ProbeSpec) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(spec.path.clone()),
            port: IntOrString::Int(i32::from(spec.port)),
            ..HTTPGetAction::default()
        }),
        initial_delay_seconds: Some(common::int32(spec.initial_delay)),
        period_seconds: Some(common::int32(spec.period)),
        timeout_seconds: Some(common::int32(spec.timeout)),
        failure_threshold: Some(common::int32(spec.failure_threshold)),
        ..Probe::default()
    }
}

/// Secret entries reference `{name}-secrets` keyed by the lower-cased
/// variable name; plain entries are inlined only when they carry a value.
fn env_vars(analysis: &AnalysisResult) -> Vec<EnvVar> {
    let secret = common::secret_name(analysis);
    analysis
        .env_vars
        .iter()
        .filter_map(|var| {
            if var.secret {
                Some(EnvVar {
                    name: var.name.clone(),
                    value_from: Some(EnvVarSource {
                        secret_key_ref: Some(SecretKeySelector {
                            name: secret.clone(),
                            key: var.name.to_lowercase(),
                            ..SecretKeySelector::default()
                        }),
                        ..EnvVarSource::default()
                    }),
                    ..EnvVar::default()
                })
            } else if !var.value.is_empty() {
                Some(EnvVar {
                    name: var.name.clone(),
                    value: Some(var.value.clone()),
                    ..EnvVar::default()
                })
            } else {
                None
            }
        })
        .collect()
}

fn security_contexts(
    config: &EffectiveConfig,
) -> (Option<PodSecurityContext>, Option<SecurityContext>) {
    if !config.security.enforce_baseline {
        return (None, None);
    }
    let seccomp = (!config.security.seccomp_profile.is_empty()).then(|| SeccompProfile {
        type_: config.security.seccomp_profile.clone(),
        ..SeccompProfile::default()
    });
    let pod = PodSecurityContext {
        run_as_non_root: Some(true),
        seccomp_profile: seccomp,
        ..PodSecurityContext::default()
    };
    let container = SecurityContext {
        allow_privilege_escalation: Some(false),
        read_only_root_filesystem: Some(true),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_string()]),
            ..Capabilities::default()
        }),
        ..SecurityContext::default()
    };
    (Some(pod), Some(container))
}

pub fn build(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<Deployment> {
    common::require_name(analysis)?;

    let name = common::resource_name(analysis, config);
    let labels = common::labels(analysis, config);
    let resources = common::resources(analysis, config);
    let probes = common::probes(analysis);
    let (pod_security, container_security) = security_contexts(config);

    let ports: Vec<ContainerPort> = analysis
        .ports
        .iter()
        .enumerate()
        .map(|(i, p)| ContainerPort {
            name: Some(format!("port-{i}")),
            container_port: i32::from(p.port),
            protocol: Some(if p.protocol.is_empty() {
                "TCP".to_string()
            } else {
                p.protocol.to_uppercase()
            }),
            ..ContainerPort::default()
        })
        .collect();
    let env = env_vars(analysis);

    let container = Container {
        name: analysis.name.clone(),
        image: Some(common::image(analysis, config)),
        ports: (!ports.is_empty()).then_some(ports),
        env: (!env.is_empty()).then_some(env),
        resources: Some(ResourceRequirements {
            requests: Some(quantities(&resources.requests)),
            limits: Some(quantities(&resources.limits)),
            ..ResourceRequirements::default()
        }),
        liveness_probe: probes.liveness.as_ref().map(http_probe),
        readiness_probe: probes.readiness.as_ref().map(http_probe),
        security_context: container_security,
        ..Container::default()
    };

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            annotations: common::annotations(analysis, config),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(common::int32(common::replicas(analysis))),
            selector: LabelSelector {
                match_labels: Some(common::selector_labels(analysis)),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    security_context: pod_security,
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
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
        AppOverrides, EnvVar as AppEnvVar, HealthCheck, Port, ResourceOverrides, Scaling,
    };

    fn orders() -> AnalysisResult {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![Port::new(8080, "TCP", "HTTP API")];
        a.resource_profile = "api".to_string();
        a
    }

    fn container(d: &Deployment) -> &Container {
        &d.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    #[test]
    fn override_cpu_request_lands_in_workload() {
        let mut a = orders();
        a.overrides = Some(AppOverrides {
            resources: Some(ResourceOverrides {
                requests_cpu: "750m".to_string(),
                ..ResourceOverrides::default()
            }),
            ..AppOverrides::default()
        });
        let cfg = EffectiveConfig::builtin();
        let d = build(&a, "default", &cfg).unwrap();
        let requests = container(&d)
            .resources
            .as_ref()
            .unwrap()
            .requests
            .as_ref()
            .unwrap();
        assert_eq!(requests["cpu"], Quantity("750m".to_string()));

        let yaml = generate(&a, "default", &cfg).unwrap();
        assert!(yaml.contains("cpu: 750m"));
        assert!(!yaml.contains("cpu: 100m"));
    }

    #[test]
    fn secret_env_var_references_secret() {
        let mut a = orders();
        a.env_vars = vec![
            AppEnvVar {
                name: "DB_PASSWORD".to_string(),
                value: "hunter2".to_string(),
                secret: true,
                ..AppEnvVar::default()
            },
            AppEnvVar {
                name: "LOG_LEVEL".to_string(),
                value: "info".to_string(),
                ..AppEnvVar::default()
            },
            AppEnvVar {
                name: "UNSET".to_string(),
                ..AppEnvVar::default()
            },
        ];
        let cfg = EffectiveConfig::builtin();
        let d = build(&a, "default", &cfg).unwrap();
        let env = container(&d).env.as_ref().unwrap();
        assert_eq!(env.len(), 2);

        let secret = env[0]
            .value_from
            .as_ref()
            .unwrap()
            .secret_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(secret.name, "orders-secrets");
        assert_eq!(secret.key, "db_password");
        assert!(env[0].value.is_none());
        assert_eq!(env[1].value.as_deref(), Some("info"));

        let yaml = generate(&a, "default", &cfg).unwrap();
        assert!(!yaml.contains("hunter2"));
    }

    #[test]
    fn security_baseline_applied() {
        let cfg = EffectiveConfig::builtin();
        let d = build(&orders(), "default", &cfg).unwrap();
        let sc = container(&d).security_context.as_ref().unwrap();
        assert_eq!(sc.allow_privilege_escalation, Some(false));
        assert_eq!(sc.read_only_root_filesystem, Some(true));
        assert_eq!(
            sc.capabilities.as_ref().unwrap().drop,
            Some(vec!["ALL".to_string()])
        );
        let pod = d
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .security_context
            .as_ref()
            .unwrap();
        assert_eq!(pod.run_as_non_root, Some(true));
    }

    #[test]
    fn baseline_toggled_off_at_org_level() {
        let mut cfg = EffectiveConfig::builtin();
        cfg.security.enforce_baseline = false;
        let d = build(&orders(), "default", &cfg).unwrap();
        assert!(container(&d).security_context.is_none());
    }

    #[test]
    fn ports_named_by_index_and_no_probes_without_health() {
        let mut a = orders();
        a.ports.push(Port::new(9090, "tcp", "metrics"));
        let d = build(&a, "default", &EffectiveConfig::builtin()).unwrap();
        let c = container(&d);
        let ports = c.ports.as_ref().unwrap();
        assert_eq!(ports[0].name.as_deref(), Some("port-0"));
        assert_eq!(ports[1].name.as_deref(), Some("port-1"));
        assert_eq!(ports[1].protocol.as_deref(), Some("TCP"));
        assert!(c.liveness_probe.is_none());
        assert!(c.readiness_probe.is_none());
    }

    #[test]
    fn image_and_replicas() {
        let mut cfg = EffectiveConfig::builtin();
        cfg.ci.registry = "ghcr.io/acme".to_string();
        let d = build(&orders(), "payments", &cfg).unwrap();
        assert_eq!(
            container(&d).image.as_deref(),
            Some("ghcr.io/acme/orders:latest")
        );
        assert_eq!(d.spec.as_ref().unwrap().replicas, Some(2));
        assert_eq!(d.metadata.namespace.as_deref(), Some("payments"));
    }

    #[test]
    fn oversized_values_saturate_instead_of_wrapping() {
        let mut a = orders();
        a.scaling = Some(Scaling {
            min_replicas: u32::MAX,
            max_replicas: u32::MAX,
            ..Scaling::default()
        });
        a.health_check = Some(HealthCheck {
            path: "/healthz".to_string(),
            port: 8080,
            initial_delay: 4_000_000_000,
            ..HealthCheck::default()
        });
        let d = build(&a, "default", &EffectiveConfig::builtin()).unwrap();
        assert_eq!(d.spec.as_ref().unwrap().replicas, Some(i32::MAX));
        let liveness = container(&d).liveness_probe.as_ref().unwrap();
        assert_eq!(liveness.initial_delay_seconds, Some(i32::MAX));
    }

    #[test]
    fn yaml_has_kind_and_no_empty_annotations() {
        let yaml = generate(&orders(), "default", &EffectiveConfig::builtin()).unwrap();
        assert!(yaml.contains("apiVersion: apps/v1"));
        assert!(yaml.contains("kind: Deployment"));
        assert!(!yaml.contains("annotations"));
    }
}
