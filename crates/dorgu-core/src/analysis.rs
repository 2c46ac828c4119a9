//! The description of one application, produced upstream of assembly by
//! parsing and optional enrichment, plus the app-config overrides that win
//! over every analysis-derived value.

use crate::error::{DorguError, Result};
use crate::merge::first_set;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// AppType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    #[default]
    Api,
    Web,
    Worker,
    Cron,
    Daemon,
}

impl AppType {
    pub fn as_str(self) -> &'static str {
        match self {
            AppType::Api => "api",
            AppType::Web => "web",
            AppType::Worker => "worker",
            AppType::Cron => "cron",
            AppType::Daemon => "daemon",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppType {
    type Err = DorguError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "api" => Ok(AppType::Api),
            "web" => Ok(AppType::Web),
            "worker" => Ok(AppType::Worker),
            "cron" => Ok(AppType::Cron),
            "daemon" => Ok(AppType::Daemon),
            other => Err(DorguError::InvalidConfigValue {
                key: "app.type".to_string(),
                value: other.to_string(),
                reason: "expected api, web, worker, cron or daemon".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis records
// ---------------------------------------------------------------------------

fn default_protocol() -> String {
    "TCP".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub purpose: String,
}

impl Port {
    pub fn new(port: u16, protocol: &str, purpose: &str) -> Self {
        Self {
            port,
            protocol: protocol.to_string(),
            purpose: purpose.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    pub path: String,
    pub port: u16,
    #[serde(alias = "initial_delay_seconds")]
    pub initial_delay: u32,
    #[serde(alias = "period_seconds")]
    pub period: u32,
    #[serde(alias = "timeout_seconds")]
    pub timeout: u32,
    pub success_threshold: u32,
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVar {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    pub required: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub secret: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scaling {
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(alias = "target_cpu_percent")]
    pub target_cpu: u32,
    #[serde(alias = "target_memory_percent")]
    pub target_memory: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub behavior: String,
}

// ---------------------------------------------------------------------------
// App-config overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceOverrides {
    pub requests_cpu: String,
    pub requests_memory: String,
    pub limits_cpu: String,
    pub limits_memory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressPath {
    pub path: String,
    pub path_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressOverride {
    pub enabled: bool,
    pub host: String,
    pub paths: Vec<IngressPath>,
    pub tls_enabled: bool,
    pub tls_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthOverride {
    pub liveness_path: String,
    pub liveness_port: u16,
    pub readiness_path: String,
    pub readiness_port: u16,
    pub initial_delay: u32,
    pub period: u32,
    pub startup_grace_period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    pub health_check: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operations {
    pub runbook: String,
    pub alerts: Vec<String>,
    pub maintenance_window: String,
    pub on_call: String,
    pub auto_restart: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentPolicy {
    pub strategy: String,
    pub max_surge: String,
    pub max_unavailable: String,
}

/// Explicit user intent from a per-app `.dorgu.yaml`. Any field set here
/// wins over the analysis-derived value in every generated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppOverrides {
    pub name: String,
    pub description: String,
    pub team: String,
    pub owner: String,
    pub repository: String,
    #[serde(rename = "type")]
    pub app_type: Option<AppType>,
    pub tier: String,
    pub instructions: String,
    pub environment: String,
    pub resources: Option<ResourceOverrides>,
    pub scaling: Option<Scaling>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub ingress: Option<IngressOverride>,
    pub health: Option<HealthOverride>,
    pub dependencies: Vec<Dependency>,
    pub operations: Option<Operations>,
    pub deployment_policy: Option<DeploymentPolicy>,
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: AppType,
    pub language: String,
    pub framework: String,
    pub description: String,
    pub ports: Vec<Port>,
    pub health_check: Option<HealthCheck>,
    pub env_vars: Vec<EnvVar>,
    pub dependencies: Vec<String>,
    pub resource_profile: String,
    pub scaling: Option<Scaling>,
    #[serde(rename = "app_config")]
    pub overrides: Option<AppOverrides>,
    pub team: String,
    pub owner: String,
    pub repository: String,
    pub environment: String,
}

/// Repository URL used when neither the analysis nor the app config names one.
pub fn placeholder_repository(name: &str) -> String {
    format!("https://github.com/YOUR_ORG/{name}.git")
}

impl AnalysisResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read an analysis from YAML or JSON (JSON is valid YAML).
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(serde_yaml::from_str(&data)?)
        }
    }

    pub fn overrides(&self) -> Option<&AppOverrides> {
        self.overrides.as_ref()
    }

    fn override_str(&self, get: fn(&AppOverrides) -> &str) -> Option<&str> {
        self.overrides().map(get)
    }

    pub fn description(&self) -> &str {
        first_set([
            self.override_str(|o| o.description.as_str()),
            Some(self.description.as_str()),
        ])
        .unwrap_or_default()
    }

    pub fn team(&self) -> &str {
        first_set([self.override_str(|o| o.team.as_str()), Some(self.team.as_str())])
            .unwrap_or_default()
    }

    pub fn owner(&self) -> &str {
        first_set([self.override_str(|o| o.owner.as_str()), Some(self.owner.as_str())])
            .unwrap_or_default()
    }

    pub fn environment(&self) -> &str {
        first_set([
            self.override_str(|o| o.environment.as_str()),
            Some(self.environment.as_str()),
        ])
        .unwrap_or_default()
    }

    pub fn app_type(&self) -> AppType {
        self.overrides()
            .and_then(|o| o.app_type)
            .unwrap_or(self.app_type)
    }

    /// Repository as configured, analysis first. Empty when unknown.
    pub fn repository(&self) -> &str {
        first_set([
            Some(self.repository.as_str()),
            self.override_str(|o| o.repository.as_str()),
        ])
        .unwrap_or_default()
    }

    /// [`repository`](Self::repository) or the placeholder URL.
    pub fn repository_url(&self) -> String {
        match self.repository() {
            "" => placeholder_repository(&self.name),
            repo => repo.to_string(),
        }
    }

    /// Resource profile key, falling back to the application type.
    pub fn resource_profile(&self) -> &str {
        match self.overrides().and_then(|o| o.app_type) {
            Some(t) => t.as_str(),
            None if !self.resource_profile.is_empty() => &self.resource_profile,
            None => self.app_type.as_str(),
        }
    }

    pub fn ingress_override(&self) -> Option<&IngressOverride> {
        self.overrides()
            .and_then(|o| o.ingress.as_ref())
            .filter(|i| i.enabled)
    }

    pub fn health_override(&self) -> Option<&HealthOverride> {
        self.overrides().and_then(|o| o.health.as_ref())
    }

    pub fn operations(&self) -> Option<&Operations> {
        self.overrides().and_then(|o| o.operations.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_type_parse_and_display() {
        assert_eq!("worker".parse::<AppType>().unwrap(), AppType::Worker);
        assert_eq!(AppType::Cron.to_string(), "cron");
        assert!("lambda".parse::<AppType>().is_err());
        assert_eq!(AppType::default(), AppType::Api);
    }

    #[test]
    fn yaml_deserializes_with_defaults() {
        let yaml = r#"
name: orders
type: api
ports:
  - port: 8080
    purpose: HTTP API
health_check:
  path: /healthz
  port: 8080
  initial_delay_seconds: 15
scaling:
  min_replicas: 2
  max_replicas: 10
  target_cpu_percent: 70
"#;
        let a: AnalysisResult = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(a.name, "orders");
        assert_eq!(a.ports[0].protocol, "TCP");
        assert_eq!(a.health_check.as_ref().unwrap().initial_delay, 15);
        assert_eq!(a.scaling.as_ref().unwrap().target_cpu, 70);
        assert!(a.overrides.is_none());
    }

    #[test]
    fn json_analysis_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("analysis.json");
        std::fs::write(&path, r#"{"name":"orders","type":"worker","ports":[]}"#).unwrap();
        let a = AnalysisResult::load(&path).unwrap();
        assert_eq!(a.app_type, AppType::Worker);
    }

    #[test]
    fn override_wins_for_ownership() {
        let mut a = AnalysisResult::new("orders");
        a.team = "detected".to_string();
        a.owner = "someone@example.com".to_string();
        a.overrides = Some(AppOverrides {
            team: "payments".to_string(),
            ..AppOverrides::default()
        });
        assert_eq!(a.team(), "payments");
        assert_eq!(a.owner(), "someone@example.com");
    }

    #[test]
    fn repository_order_is_analysis_then_override_then_placeholder() {
        let mut a = AnalysisResult::new("orders");
        assert_eq!(a.repository(), "");
        assert_eq!(
            a.repository_url(),
            "https://github.com/YOUR_ORG/orders.git"
        );

        a.overrides = Some(AppOverrides {
            repository: "https://github.com/acme/orders-config.git".to_string(),
            ..AppOverrides::default()
        });
        assert_eq!(a.repository_url(), "https://github.com/acme/orders-config.git");

        a.repository = "https://github.com/acme/orders.git".to_string();
        assert_eq!(a.repository_url(), "https://github.com/acme/orders.git");
    }

    #[test]
    fn resource_profile_resolution() {
        let mut a = AnalysisResult::new("orders");
        assert_eq!(a.resource_profile(), "api");
        a.resource_profile = "web".to_string();
        assert_eq!(a.resource_profile(), "web");
        a.overrides = Some(AppOverrides {
            app_type: Some(AppType::Worker),
            ..AppOverrides::default()
        });
        assert_eq!(a.resource_profile(), "worker");
        assert_eq!(a.app_type(), AppType::Worker);
    }

    #[test]
    fn disabled_ingress_override_is_ignored() {
        let mut a = AnalysisResult::new("orders");
        a.overrides = Some(AppOverrides {
            ingress: Some(IngressOverride {
                host: "orders.example.com".to_string(),
                ..IngressOverride::default()
            }),
            ..AppOverrides::default()
        });
        assert!(a.ingress_override().is_none());
    }
}
