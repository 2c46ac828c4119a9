use super::common;
use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::Result;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub fn build(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<Service> {
    common::require_name(analysis)?;

    let ports = analysis
        .ports
        .iter()
        .enumerate()
        .map(|(i, p)| ServicePort {
            name: Some(format!("port-{i}")),
            port: i32::from(p.port),
            target_port: Some(IntOrString::Int(i32::from(p.port))),
            protocol: Some(if p.protocol.is_empty() {
                "TCP".to_string()
            } else {
                p.protocol.to_uppercase()
            }),
            ..ServicePort::default()
        })
        .collect();

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(common::resource_name(analysis, config)),
            namespace: Some(namespace.to_string()),
            labels: Some(common::labels(analysis, config)),
            annotations: common::annotations(analysis, config),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(common::selector_labels(analysis)),
            ports: Some(ports),
            ..ServiceSpec::default()
        }),
        ..Service::default()
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
    use crate::analysis::Port;

    #[test]
    fn one_port_entry_per_analysis_port() {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![
            Port::new(8080, "TCP", "HTTP API"),
            Port::new(9090, "UDP", "metrics"),
        ];
        let svc = build(&a, "default", &EffectiveConfig::builtin()).unwrap();
        let spec = svc.spec.unwrap();
        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].port, 8080);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(8080)));
        assert_eq!(ports[1].protocol.as_deref(), Some("UDP"));
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        assert_eq!(
            spec.selector.unwrap()[common::NAME_LABEL],
            "orders".to_string()
        );
    }

    #[test]
    fn yaml_shape() {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![Port::new(8080, "TCP", "")];
        let yaml = generate(&a, "payments", &EffectiveConfig::builtin()).unwrap();
        assert!(yaml.contains("kind: Service"));
        assert!(yaml.contains("namespace: payments"));
        assert!(yaml.contains("targetPort: 8080"));
    }
}
