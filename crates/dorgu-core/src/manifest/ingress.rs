use super::common;
use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::Result;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const CLUSTER_ISSUER_ANNOTATION: &str = "cert-manager.io/cluster-issuer";
const DEFAULT_PATH_TYPE: &str = "Prefix";

pub fn build(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<Ingress> {
    common::require_name(analysis)?;

    let name = common::resource_name(analysis, config);
    let host = common::ingress_host(analysis, config);
    let tls = common::tls_enabled(analysis, config);

    let backend = IngressBackend {
        service: Some(IngressServiceBackend {
            name: name.clone(),
            port: Some(ServiceBackendPort {
                number: Some(i32::from(common::http_backend_port(&analysis.ports))),
                ..ServiceBackendPort::default()
            }),
        }),
        ..IngressBackend::default()
    };

    let configured: Vec<(String, String)> = analysis
        .ingress_override()
        .map(|i| {
            i.paths
                .iter()
                .filter(|p| !p.path.is_empty())
                .map(|p| (p.path.clone(), p.path_type.clone()))
                .collect()
        })
        .unwrap_or_default();
    let paths = if configured.is_empty() {
        vec![("/".to_string(), String::new())]
    } else {
        configured
    };
    let paths = paths
        .into_iter()
        .map(|(path, path_type)| HTTPIngressPath {
            path: Some(path),
            path_type: if path_type.is_empty() {
                DEFAULT_PATH_TYPE.to_string()
            } else {
                path_type
            },
            backend: backend.clone(),
        })
        .collect();

    let mut annotations = common::annotations(analysis, config);
    if tls && !config.ingress.tls.cluster_issuer.is_empty() {
        annotations.get_or_insert_with(Default::default).insert(
            CLUSTER_ISSUER_ANNOTATION.to_string(),
            config.ingress.tls.cluster_issuer.clone(),
        );
    }

    Ok(Ingress {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: Some(common::labels(analysis, config)),
            annotations,
            ..ObjectMeta::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: (!config.ingress.class.is_empty())
                .then(|| config.ingress.class.clone()),
            rules: Some(vec![IngressRule {
                host: (!host.is_empty()).then(|| host.clone()),
                http: Some(HTTPIngressRuleValue { paths }),
            }]),
            tls: tls.then(|| {
                vec![IngressTLS {
                    hosts: Some(vec![host.clone()]),
                    secret_name: Some(common::tls_secret(analysis)),
                }]
            }),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
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
    use crate::analysis::{AppOverrides, IngressOverride, IngressPath, Port};

    fn orders() -> AnalysisResult {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![Port::new(9090, "TCP", "metrics"), Port::new(8080, "TCP", "")];
        a
    }

    fn rule(ing: &Ingress) -> &IngressRule {
        &ing.spec.as_ref().unwrap().rules.as_ref().unwrap()[0]
    }

    #[test]
    fn defaults_single_prefix_path() {
        let ing = build(&orders(), "default", &EffectiveConfig::builtin()).unwrap();
        let spec = ing.spec.as_ref().unwrap();
        assert_eq!(spec.ingress_class_name.as_deref(), Some("nginx"));
        assert!(spec.tls.is_none());

        let r = rule(&ing);
        assert_eq!(r.host.as_deref(), Some("orders.local"));
        let paths = &r.http.as_ref().unwrap().paths;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path.as_deref(), Some("/"));
        assert_eq!(paths[0].path_type, "Prefix");
        let port = paths[0]
            .backend
            .service
            .as_ref()
            .unwrap()
            .port
            .as_ref()
            .unwrap();
        assert_eq!(port.number, Some(8080));
    }

    #[test]
    fn override_host_paths_and_tls() {
        let mut a = orders();
        a.overrides = Some(AppOverrides {
            ingress: Some(IngressOverride {
                enabled: true,
                host: "orders.acme.io".to_string(),
                paths: vec![
                    IngressPath {
                        path: "/api".to_string(),
                        path_type: String::new(),
                    },
                    IngressPath {
                        path: "/static".to_string(),
                        path_type: "Exact".to_string(),
                    },
                ],
                tls_enabled: true,
                tls_secret: String::new(),
            }),
            ..AppOverrides::default()
        });
        let mut cfg = EffectiveConfig::builtin();
        cfg.ingress.tls.cluster_issuer = "letsencrypt".to_string();

        let ing = build(&a, "default", &cfg).unwrap();
        let r = rule(&ing);
        assert_eq!(r.host.as_deref(), Some("orders.acme.io"));
        let paths = &r.http.as_ref().unwrap().paths;
        assert_eq!(paths[0].path_type, "Prefix");
        assert_eq!(paths[1].path_type, "Exact");

        let tls = &ing.spec.as_ref().unwrap().tls.as_ref().unwrap()[0];
        assert_eq!(tls.secret_name.as_deref(), Some("orders-tls"));
        assert_eq!(tls.hosts, Some(vec!["orders.acme.io".to_string()]));
        assert_eq!(
            ing.metadata.annotations.as_ref().unwrap()[CLUSTER_ISSUER_ANNOTATION],
            "letsencrypt"
        );
    }

    #[test]
    fn org_tls_without_issuer_has_no_annotation() {
        let mut cfg = EffectiveConfig::builtin();
        cfg.ingress.tls.enabled = true;
        let ing = build(&orders(), "default", &cfg).unwrap();
        assert!(ing.spec.as_ref().unwrap().tls.is_some());
        assert!(ing.metadata.annotations.is_none());
    }
}
