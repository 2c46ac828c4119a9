use super::common;
use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::Result;
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
    MetricTarget, ResourceMetricSource,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

fn utilization(resource: &str, percent: u32) -> MetricSpec {
    MetricSpec {
        type_: "Resource".to_string(),
        resource: Some(ResourceMetricSource {
            name: resource.to_string(),
            target: MetricTarget {
                type_: "Utilization".to_string(),
                average_utilization: Some(common::int32(percent)),
                ..MetricTarget::default()
            },
        }),
        ..MetricSpec::default()
    }
}

/// `None` when the analysis carries no scaling intent.
pub fn build(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<Option<HorizontalPodAutoscaler>> {
    common::require_name(analysis)?;
    let Some(scaling) = common::scaling(analysis) else {
        return Ok(None);
    };

    let name = common::resource_name(analysis, config);
    let mut metrics = vec![utilization("cpu", scaling.target_cpu)];
    if scaling.target_memory > 0 {
        metrics.push(utilization("memory", scaling.target_memory));
    }

    Ok(Some(HorizontalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(common::labels(analysis, config)),
            annotations: common::annotations(analysis, config),
            ..ObjectMeta::default()
        },
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name,
            },
            min_replicas: Some(common::int32(scaling.min_replicas)),
            max_replicas: common::int32(scaling.max_replicas),
            metrics: Some(metrics),
            ..HorizontalPodAutoscalerSpec::default()
        }),
        ..HorizontalPodAutoscaler::default()
    }))
}

/// Serialized autoscaler, or `None` when scaling is not requested.
pub fn generate(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
) -> Result<Option<String>> {
    build(analysis, namespace, config)?
        .map(|hpa| common::to_yaml(&hpa))
        .transpose()
}
