//! Derivations shared by every document generator and by the validator.
//!
//! Each helper resolves one value from {analysis, app overrides, effective
//! config} with the same precedence everywhere, so a value that surfaces in
//! more than one document always agrees.

use crate::analysis::{AnalysisResult, Port};
use crate::config::{EffectiveConfig, ResourceSpec, ResourceValues};
use crate::error::{DorguError, Result};
use crate::merge::{first_set, merge_maps};
use serde::Serialize;
use std::collections::BTreeMap;

pub const NAME_LABEL: &str = "app.kubernetes.io/name";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const TEAM_LABEL: &str = "app.kubernetes.io/team";
pub const ENVIRONMENT_LABEL: &str = "app.kubernetes.io/environment";
pub const MANAGED_BY: &str = "dorgu";

pub const DEFAULT_REPLICAS: u32 = 2;
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const HTTP_PORTS: [u16; 6] = [80, 443, 8080, 3000, 5000, 8000];

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub fn require_name(analysis: &AnalysisResult) -> Result<()> {
    if analysis.name.trim().is_empty() {
        return Err(DorguError::MissingName);
    }
    Ok(())
}

/// Kubernetes object name for the application.
pub fn resource_name(analysis: &AnalysisResult, config: &EffectiveConfig) -> String {
    config.resource_name(&analysis.name)
}

/// `{name}-secrets`, lower-cased.
pub fn secret_name(analysis: &AnalysisResult) -> String {
    format!("{}-secrets", analysis.name.to_lowercase())
}

/// `{registry}/{name}:latest`, or `{name}:latest` with no registry.
pub fn image(analysis: &AnalysisResult, config: &EffectiveConfig) -> String {
    let registry = config.ci.registry.trim_end_matches('/');
    if registry.is_empty() {
        format!("{}:latest", analysis.name)
    } else {
        format!("{registry}/{}:latest", analysis.name)
    }
}

pub fn namespace_or_default<'a>(namespace: &'a str, config: &'a EffectiveConfig) -> &'a str {
    first_set([Some(namespace), Some(config.defaults.namespace.as_str())]).unwrap_or("default")
}

// ---------------------------------------------------------------------------
// Labels and annotations
// ---------------------------------------------------------------------------

/// Canonical labels plus org custom labels plus app labels, app winning.
pub fn labels(analysis: &AnalysisResult, config: &EffectiveConfig) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(NAME_LABEL.to_string(), analysis.name.clone());
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    if !analysis.team().is_empty() {
        labels.insert(TEAM_LABEL.to_string(), analysis.team().to_string());
    }
    if !analysis.environment().is_empty() {
        labels.insert(
            ENVIRONMENT_LABEL.to_string(),
            analysis.environment().to_string(),
        );
    }
    labels.extend(merge_maps([
        analysis.overrides().map(|o| &o.labels),
        Some(&config.labels.custom),
    ]));
    labels
}

pub fn selector_labels(analysis: &AnalysisResult) -> BTreeMap<String, String> {
    BTreeMap::from([(NAME_LABEL.to_string(), analysis.name.clone())])
}

/// Org then app annotations, app winning. `None` when there are none so the
/// field is omitted rather than serialized as `{}`.
pub fn annotations(
    analysis: &AnalysisResult,
    config: &EffectiveConfig,
) -> Option<BTreeMap<String, String>> {
    let merged = merge_maps([
        analysis.overrides().map(|o| &o.annotations),
        Some(&config.annotations.custom),
    ]);
    (!merged.is_empty()).then_some(merged)
}

// ---------------------------------------------------------------------------
// Resources and replicas
// ---------------------------------------------------------------------------

/// Profile resources with each of the four override fields applied
/// independently.
pub fn resources(analysis: &AnalysisResult, config: &EffectiveConfig) -> ResourceSpec {
    let base = config.resources_for_profile(analysis.resource_profile());
    let Some(ov) = analysis.overrides().and_then(|o| o.resources.as_ref()) else {
        return base.clone();
    };
    let pick = |over: &str, fallback: &str| {
        first_set([Some(over), Some(fallback)])
            .unwrap_or_default()
            .to_string()
    };
    ResourceSpec {
        requests: ResourceValues {
            cpu: pick(&ov.requests_cpu, &base.requests.cpu),
            memory: pick(&ov.requests_memory, &base.requests.memory),
        },
        limits: ResourceValues {
            cpu: pick(&ov.limits_cpu, &base.limits.cpu),
            memory: pick(&ov.limits_memory, &base.limits.memory),
        },
    }
}

pub fn replicas(analysis: &AnalysisResult) -> u32 {
    first_set([
        analysis
            .overrides()
            .and_then(|o| o.scaling.as_ref())
            .map(|s| s.min_replicas),
        analysis.scaling.as_ref().map(|s| s.min_replicas),
    ])
    .unwrap_or(DEFAULT_REPLICAS)
}

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScaling {
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub target_cpu: u32,
    /// Zero means no memory metric.
    pub target_memory: u32,
    pub behavior: String,
}

/// Autoscaling intent. `None` unless the analysis asks for scaling; each
/// field then prefers the override, then the analysis, then a default.
pub fn scaling(analysis: &AnalysisResult) -> Option<ResolvedScaling> {
    let base = analysis.scaling.as_ref()?;
    let ov = analysis.overrides().and_then(|o| o.scaling.as_ref());
    let field = |get: fn(&crate::analysis::Scaling) -> u32, fallback: u32| {
        first_set([ov.map(get), Some(get(base))]).unwrap_or(fallback)
    };
    Some(ResolvedScaling {
        min_replicas: field(|s| s.min_replicas, DEFAULT_REPLICAS),
        max_replicas: field(|s| s.max_replicas, 10),
        target_cpu: field(|s| s.target_cpu, 70),
        target_memory: field(|s| s.target_memory, 0),
        behavior: first_set([
            ov.map(|s| s.behavior.as_str()),
            Some(base.behavior.as_str()),
        ])
        .unwrap_or("balanced")
        .to_string(),
    })
}

// ---------------------------------------------------------------------------
// Health probes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub path: String,
    pub port: u16,
    pub initial_delay: u32,
    pub period: u32,
    pub timeout: u32,
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProbes {
    pub liveness: Option<ProbeSpec>,
    pub readiness: Option<ProbeSpec>,
}

impl ResolvedProbes {
    pub fn is_empty(&self) -> bool {
        self.liveness.is_none() && self.readiness.is_none()
    }
}

fn set_or<T: crate::merge::Unset>(value: T, fallback: T) -> T {
    first_set([Some(value)]).unwrap_or(fallback)
}

/// Liveness and readiness probes. App-config paths win; otherwise the
/// analysis health check serves both. Readiness follows liveness when only a
/// liveness path is configured.
pub fn probes(analysis: &AnalysisResult) -> ResolvedProbes {
    let hc = analysis.health_check.as_ref().filter(|h| !h.path.is_empty());
    let first_port = analysis.ports.first().map(|p| p.port);

    let fallback = hc.map(|h| ProbeSpec {
        path: h.path.clone(),
        port: first_set([Some(h.port), first_port]).unwrap_or(DEFAULT_HTTP_PORT),
        initial_delay: set_or(h.initial_delay, 10),
        period: set_or(h.period, 10),
        timeout: set_or(h.timeout, 5),
        failure_threshold: set_or(h.failure_threshold, 3),
    });

    let Some(ov) = analysis.health_override() else {
        return ResolvedProbes {
            liveness: fallback.clone(),
            readiness: fallback,
        };
    };
    let hc_port = hc.map(|h| h.port);

    let liveness = if ov.liveness_path.is_empty() {
        fallback.clone()
    } else {
        Some(ProbeSpec {
            path: ov.liveness_path.clone(),
            port: first_set([Some(ov.liveness_port), hc_port, first_port])
                .unwrap_or(DEFAULT_HTTP_PORT),
            initial_delay: set_or(ov.initial_delay, 10),
            period: set_or(ov.period, 10),
            timeout: 5,
            failure_threshold: 3,
        })
    };

    let readiness_path = first_set([
        Some(ov.readiness_path.as_str()),
        Some(ov.liveness_path.as_str()),
    ]);
    let readiness = match readiness_path {
        Some(path) => Some(ProbeSpec {
            path: path.to_string(),
            port: first_set([
                Some(ov.readiness_port),
                Some(ov.liveness_port),
                hc_port,
                first_port,
            ])
            .unwrap_or(DEFAULT_HTTP_PORT),
            initial_delay: set_or(ov.initial_delay, 5),
            period: set_or(ov.period, 5),
            timeout: 5,
            failure_threshold: 3,
        }),
        None => fallback,
    };

    ResolvedProbes {
        liveness,
        readiness,
    }
}

/// Explicitly configured health ports (no fallback to container ports).
pub fn configured_health_ports(analysis: &AnalysisResult) -> Vec<u16> {
    let hc_port = analysis.health_check.as_ref().map(|h| h.port);
    let ov = analysis.health_override();
    let liveness = first_set([ov.map(|o| o.liveness_port), hc_port]);
    let readiness = first_set([
        ov.map(|o| o.readiness_port),
        ov.map(|o| o.liveness_port),
        hc_port,
    ]);
    let mut ports: Vec<u16> = liveness.into_iter().chain(readiness).collect();
    ports.dedup();
    ports
}

// ---------------------------------------------------------------------------
// Network exposure
// ---------------------------------------------------------------------------

pub fn is_well_known_http(port: &Port) -> bool {
    HTTP_PORTS.contains(&port.port) || port.purpose == "HTTP" || port.purpose == "HTTP API"
}

/// Whether an endpoint (Ingress) document is emitted.
///
/// Falls back to true for any declared port when none looks like HTTP, so a
/// gRPC-only or raw TCP service still gets an Ingress.
pub fn exposes_http(ports: &[Port]) -> bool {
    ports.iter().any(is_well_known_http) || !ports.is_empty()
}

/// First well-known HTTP port, else the first declared port.
pub fn http_backend_port(ports: &[Port]) -> u16 {
    ports
        .iter()
        .find(|p| is_well_known_http(p))
        .or_else(|| ports.first())
        .map(|p| p.port)
        .unwrap_or(DEFAULT_HTTP_PORT)
}

pub fn ingress_host(analysis: &AnalysisResult, config: &EffectiveConfig) -> String {
    let derived = format!("{}{}", analysis.name, config.ingress.domain_suffix);
    first_set([
        analysis.ingress_override().map(|i| i.host.as_str()),
        Some(derived.as_str()),
    ])
    .unwrap_or_default()
    .to_string()
}

pub fn tls_enabled(analysis: &AnalysisResult, config: &EffectiveConfig) -> bool {
    config.ingress.tls.enabled || analysis.ingress_override().is_some_and(|i| i.tls_enabled)
}

pub fn tls_secret(analysis: &AnalysisResult) -> String {
    let derived = format!("{}-tls", analysis.name);
    first_set([
        analysis.ingress_override().map(|i| i.tls_secret.as_str()),
        Some(derived.as_str()),
    ])
    .unwrap_or_default()
    .to_string()
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Kubernetes int32 fields; values past `i32::MAX` saturate.
pub fn int32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        AppOverrides, HealthCheck, HealthOverride, IngressOverride, ResourceOverrides, Scaling,
    };

    fn orders() -> AnalysisResult {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![Port::new(8080, "TCP", "HTTP API")];
        a.resource_profile = "api".to_string();
        a
    }

    fn with_overrides(mut a: AnalysisResult, o: AppOverrides) -> AnalysisResult {
        a.overrides = Some(o);
        a
    }

    #[test]
    fn labels_precedence() {
        let mut cfg = EffectiveConfig::builtin();
        cfg.labels
            .custom
            .insert("tier".to_string(), "backend".to_string());
        cfg.labels
            .custom
            .insert("cost-center".to_string(), "42".to_string());
        let a = with_overrides(
            orders(),
            AppOverrides {
                team: "payments".to_string(),
                labels: BTreeMap::from([("tier".to_string(), "edge".to_string())]),
                ..AppOverrides::default()
            },
        );
        let l = labels(&a, &cfg);
        assert_eq!(l[NAME_LABEL], "orders");
        assert_eq!(l[MANAGED_BY_LABEL], "dorgu");
        assert_eq!(l[TEAM_LABEL], "payments");
        assert_eq!(l["tier"], "edge");
        assert_eq!(l["cost-center"], "42");
        assert!(!l.contains_key(ENVIRONMENT_LABEL));
    }

    #[test]
    fn annotations_absent_when_empty() {
        let cfg = EffectiveConfig::builtin();
        assert!(annotations(&orders(), &cfg).is_none());

        let a = with_overrides(
            orders(),
            AppOverrides {
                annotations: BTreeMap::from([("a".to_string(), "b".to_string())]),
                ..AppOverrides::default()
            },
        );
        assert_eq!(annotations(&a, &cfg).unwrap()["a"], "b");
    }

    #[test]
    fn resource_overrides_apply_per_field() {
        let cfg = EffectiveConfig::builtin();
        let a = with_overrides(
            orders(),
            AppOverrides {
                resources: Some(ResourceOverrides {
                    requests_cpu: "750m".to_string(),
                    ..ResourceOverrides::default()
                }),
                ..AppOverrides::default()
            },
        );
        let r = resources(&a, &cfg);
        assert_eq!(r.requests.cpu, "750m");
        assert_eq!(r.requests.memory, "256Mi");
        assert_eq!(r.limits.cpu, "1000m");
    }

    #[test]
    fn replicas_fallbacks() {
        let mut a = orders();
        assert_eq!(replicas(&a), 2);
        a.scaling = Some(Scaling {
            min_replicas: 3,
            max_replicas: 5,
            ..Scaling::default()
        });
        assert_eq!(replicas(&a), 3);
        let a = with_overrides(
            a,
            AppOverrides {
                scaling: Some(Scaling {
                    min_replicas: 4,
                    ..Scaling::default()
                }),
                ..AppOverrides::default()
            },
        );
        assert_eq!(replicas(&a), 4);
    }

    #[test]
    fn scaling_requires_analysis_intent_and_merges_fields() {
        let mut a = orders();
        assert!(scaling(&a).is_none());
        a.scaling = Some(Scaling {
            min_replicas: 2,
            max_replicas: 8,
            target_cpu: 60,
            ..Scaling::default()
        });
        let a = with_overrides(
            a,
            AppOverrides {
                scaling: Some(Scaling {
                    max_replicas: 20,
                    target_memory: 80,
                    ..Scaling::default()
                }),
                ..AppOverrides::default()
            },
        );
        let s = scaling(&a).unwrap();
        assert_eq!(s.min_replicas, 2);
        assert_eq!(s.max_replicas, 20);
        assert_eq!(s.target_cpu, 60);
        assert_eq!(s.target_memory, 80);
        assert_eq!(s.behavior, "balanced");
    }

    #[test]
    fn probes_absent_without_health() {
        assert!(probes(&orders()).is_empty());
    }

    #[test]
    fn probes_from_analysis_serve_both() {
        let mut a = orders();
        a.health_check = Some(HealthCheck {
            path: "/health".to_string(),
            port: 8080,
            ..HealthCheck::default()
        });
        let p = probes(&a);
        let live = p.liveness.unwrap();
        assert_eq!(live.path, "/health");
        assert_eq!(live.initial_delay, 10);
        assert_eq!(live.timeout, 5);
        assert_eq!(p.readiness.unwrap(), live);
    }

    #[test]
    fn readiness_follows_liveness_override() {
        let mut a = orders();
        a.health_check = Some(HealthCheck {
            path: "/health".to_string(),
            port: 8080,
            ..HealthCheck::default()
        });
        let a = with_overrides(
            a,
            AppOverrides {
                health: Some(HealthOverride {
                    liveness_path: "/livez".to_string(),
                    liveness_port: 9090,
                    ..HealthOverride::default()
                }),
                ..AppOverrides::default()
            },
        );
        let p = probes(&a);
        let live = p.liveness.unwrap();
        let ready = p.readiness.unwrap();
        assert_eq!(live.path, "/livez");
        assert_eq!(live.port, 9090);
        assert_eq!(ready.path, "/livez");
        assert_eq!(ready.port, 9090);
        assert_eq!(ready.initial_delay, 5);
        assert_eq!(ready.period, 5);
    }

    #[test]
    fn http_detection_and_backend_port() {
        let grpc = vec![Port::new(50051, "TCP", "gRPC")];
        assert!(exposes_http(&grpc));
        assert!(!exposes_http(&[]));
        assert_eq!(http_backend_port(&grpc), 50051);

        let mixed = vec![Port::new(9090, "TCP", "metrics"), Port::new(3000, "TCP", "")];
        assert_eq!(http_backend_port(&mixed), 3000);
        assert_eq!(http_backend_port(&[]), 80);
    }

    #[test]
    fn ingress_host_and_tls() {
        let cfg = EffectiveConfig::builtin();
        let a = orders();
        assert_eq!(ingress_host(&a, &cfg), "orders.local");
        assert!(!tls_enabled(&a, &cfg));
        assert_eq!(tls_secret(&a), "orders-tls");

        let a = with_overrides(
            a,
            AppOverrides {
                ingress: Some(IngressOverride {
                    enabled: true,
                    host: "orders.acme.io".to_string(),
                    tls_enabled: true,
                    tls_secret: "wildcard-tls".to_string(),
                    ..IngressOverride::default()
                }),
                ..AppOverrides::default()
            },
        );
        assert_eq!(ingress_host(&a, &cfg), "orders.acme.io");
        assert!(tls_enabled(&a, &cfg));
        assert_eq!(tls_secret(&a), "wildcard-tls");
    }

    #[test]
    fn image_reference() {
        let mut cfg = EffectiveConfig::builtin();
        assert_eq!(image(&orders(), &cfg), "orders:latest");
        cfg.ci.registry = "ghcr.io/acme/".to_string();
        assert_eq!(image(&orders(), &cfg), "ghcr.io/acme/orders:latest");
    }

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            require_name(&AnalysisResult::default()),
            Err(DorguError::MissingName)
        ));
    }
}
