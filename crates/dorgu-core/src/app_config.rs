use crate::analysis::{
    AnalysisResult, AppOverrides, AppType, Dependency, DeploymentPolicy, HealthOverride,
    IngressOverride, IngressPath, Operations, ResourceOverrides, Scaling,
};
use crate::config::{ConfigLayer, ResourceValuesLayer};
use crate::error::Result;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub team: String,
    pub owner: String,
    pub repository: String,
    #[serde(rename = "type")]
    pub app_type: Option<AppType>,
    pub tier: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppResources {
    pub requests: ResourceValuesLayer,
    pub limits: ResourceValuesLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppTls {
    pub enabled: bool,
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppIngress {
    pub enabled: bool,
    pub host: String,
    pub paths: Vec<IngressPath>,
    pub tls: Option<AppTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthProbe {
    pub path: String,
    pub port: u16,
    pub initial_delay: u32,
    pub period: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppHealth {
    pub liveness: Option<HealthProbe>,
    pub readiness: Option<HealthProbe>,
    pub startup_grace_period: String,
}

/// A `dependencies:` entry: either a bare service name or a full record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Name(String),
    Detailed(Dependency),
}

impl DependencySpec {
    pub fn into_dependency(self) -> Dependency {
        match self {
            DependencySpec::Name(name) => Dependency {
                name,
                ..Dependency::default()
            },
            DependencySpec::Detailed(dep) => dep,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppCi {
    pub registry: Option<String>,
}

/// Per-application `.dorgu.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub app: AppMetadata,
    pub environment: String,
    pub namespace: Option<String>,
    pub resources: Option<AppResources>,
    pub scaling: Option<Scaling>,
    #[serde(deserialize_with = "scalar_map")]
    pub labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "scalar_map")]
    pub annotations: BTreeMap<String, String>,
    pub ingress: Option<AppIngress>,
    pub health: Option<AppHealth>,
    pub dependencies: Vec<DependencySpec>,
    pub operations: Option<Operations>,
    pub deployment_policy: Option<DeploymentPolicy>,
    pub ci: AppCi,
}

/// String map that accepts numeric and boolean values (`cost-center: 42`)
/// and skips nested entries, so a workspace file with `labels.custom` still
/// parses as an app file.
fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_yaml::Value;

    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| {
            let value = match v {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k, value))
        })
        .collect())
}

impl AppConfig {
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data).map(Some)
    }

    /// The configuration-layer projection of this file: namespace and
    /// registry.
    pub fn as_layer(&self) -> ConfigLayer {
        let some = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());
        ConfigLayer::with_overrides(some(&self.namespace), some(&self.ci.registry))
    }

    pub fn to_overrides(&self) -> AppOverrides {
        let resources = self.resources.as_ref().map(|r| ResourceOverrides {
            requests_cpu: r.requests.cpu.clone().unwrap_or_default(),
            requests_memory: r.requests.memory.clone().unwrap_or_default(),
            limits_cpu: r.limits.cpu.clone().unwrap_or_default(),
            limits_memory: r.limits.memory.clone().unwrap_or_default(),
        });

        let ingress = self.ingress.as_ref().map(|i| IngressOverride {
            enabled: i.enabled,
            host: i.host.clone(),
            paths: i.paths.clone(),
            tls_enabled: i.tls.as_ref().is_some_and(|t| t.enabled),
            tls_secret: i
                .tls
                .as_ref()
                .map(|t| t.secret_name.clone())
                .unwrap_or_default(),
        });

        let health = self.health.as_ref().map(|h| {
            let liveness = h.liveness.clone().unwrap_or_default();
            let readiness = h.readiness.clone().unwrap_or_default();
            HealthOverride {
                liveness_path: liveness.path,
                liveness_port: liveness.port,
                readiness_path: readiness.path,
                readiness_port: readiness.port,
                initial_delay: liveness.initial_delay,
                period: liveness.period,
                startup_grace_period: h.startup_grace_period.clone(),
            }
        });

        AppOverrides {
            name: self.app.name.clone(),
            description: self.app.description.clone(),
            team: self.app.team.clone(),
            owner: self.app.owner.clone(),
            repository: self.app.repository.clone(),
            app_type: self.app.app_type,
            tier: self.app.tier.clone(),
            instructions: self.app.instructions.clone(),
            environment: self.environment.clone(),
            resources,
            scaling: self.scaling.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            ingress,
            health,
            dependencies: self
                .dependencies
                .iter()
                .cloned()
                .map(DependencySpec::into_dependency)
                .collect(),
            operations: self.operations.clone(),
            deployment_policy: self.deployment_policy.clone(),
        }
    }
}

impl AnalysisResult {
    /// Fold a per-app config into this analysis: attach it as overrides and
    /// mirror identity fields so downstream consumers see one value.
    pub fn with_app_config(mut self, config: &AppConfig) -> Self {
        let overrides = config.to_overrides();

        let mirror = |target: &mut String, value: &str| {
            if !value.is_empty() {
                *target = value.to_string();
            }
        };
        mirror(&mut self.name, &overrides.name);
        mirror(&mut self.team, &overrides.team);
        mirror(&mut self.owner, &overrides.owner);
        mirror(&mut self.repository, &overrides.repository);
        mirror(&mut self.environment, &overrides.environment);
        mirror(&mut self.description, &overrides.description);

        if let Some(app_type) = overrides.app_type {
            self.app_type = app_type;
            self.resource_profile = app_type.as_str().to_string();
        }
        if self.scaling.is_none() {
            self.scaling = overrides.scaling.clone();
        }

        self.overrides = Some(overrides);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_YAML: &str = r#"
app:
  name: orders
  team: payments
  owner: payments@example.com
  type: worker
  tier: critical
environment: production
namespace: payments
resources:
  requests:
    cpu: 750m
scaling:
  min_replicas: 3
  max_replicas: 6
labels:
  cost-center: 42
  tier: edge
ingress:
  enabled: true
  host: orders.example.com
  tls:
    enabled: true
health:
  liveness:
    path: /livez
    port: 9090
  startup_grace_period: 60s
dependencies:
  - redis
  - name: postgres
    type: database
    required: true
ci:
  registry: ghcr.io/acme
"#;

    #[test]
    fn parses_full_app_config() {
        let cfg = AppConfig::from_yaml(APP_YAML).unwrap();
        assert_eq!(cfg.app.app_type, Some(AppType::Worker));
        assert_eq!(cfg.labels["cost-center"], "42");
        assert_eq!(cfg.dependencies.len(), 2);
        assert_eq!(
            cfg.dependencies[0],
            DependencySpec::Name("redis".to_string())
        );
        assert!(matches!(cfg.dependencies[1], DependencySpec::Detailed(_)));
    }

    #[test]
    fn overrides_projection() {
        let cfg = AppConfig::from_yaml(APP_YAML).unwrap();
        let o = cfg.to_overrides();
        let r = o.resources.unwrap();
        assert_eq!(r.requests_cpu, "750m");
        assert!(r.limits_cpu.is_empty());
        let ingress = o.ingress.unwrap();
        assert!(ingress.tls_enabled);
        assert!(ingress.tls_secret.is_empty());
        let health = o.health.unwrap();
        assert_eq!(health.liveness_path, "/livez");
        assert!(health.readiness_path.is_empty());
        assert_eq!(o.dependencies[0].name, "redis");
        assert_eq!(o.dependencies[1].kind, "database");
    }

    #[test]
    fn layer_projection_carries_namespace_and_registry() {
        let cfg = AppConfig::from_yaml(APP_YAML).unwrap();
        let layer = cfg.as_layer();
        assert_eq!(layer.defaults.namespace.as_deref(), Some("payments"));
        assert_eq!(layer.ci.registry.as_deref(), Some("ghcr.io/acme"));
        assert!(layer.ingress.class.is_none());
    }

    #[test]
    fn with_app_config_mirrors_identity_and_seeds_scaling() {
        let cfg = AppConfig::from_yaml(APP_YAML).unwrap();
        let a = AnalysisResult::new("detected-name").with_app_config(&cfg);
        assert_eq!(a.name, "orders");
        assert_eq!(a.team, "payments");
        assert_eq!(a.environment, "production");
        assert_eq!(a.app_type, AppType::Worker);
        assert_eq!(a.resource_profile, "worker");
        assert_eq!(a.scaling.as_ref().unwrap().min_replicas, 3);
        assert!(a.overrides.is_some());
    }

    #[test]
    fn workspace_file_parses_as_app_file() {
        let yaml = r#"
org:
  name: acme
labels:
  custom:
    cost-center: "42"
resources:
  defaults:
    requests:
      cpu: 100m
ci:
  provider: github-actions
"#;
        let cfg = AppConfig::from_yaml(yaml).unwrap();
        assert!(cfg.labels.is_empty());
        assert!(cfg.resources.unwrap().requests.cpu.is_none());
    }

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(AppConfig::load(&dir.path().join(".dorgu.yaml"))
            .unwrap()
            .is_none());
    }
}
