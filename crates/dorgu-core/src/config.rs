use crate::error::Result;
use crate::merge::{first_set, layered, layered_map};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Effective configuration (fully resolved, read-only after `resolve`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValues {
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub requests: ResourceValues,
    pub limits: ResourceValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSettings {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingSettings {
    pub pattern: String,
    pub dns_safe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSettings {
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSettings {
    pub defaults: ResourceSpec,
    pub profiles: BTreeMap<String, ResourceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMap {
    pub custom: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Apply the non-root / read-only / no-escalation / drop-ALL baseline to
    /// every workload.
    pub enforce_baseline: bool,
    pub seccomp_profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    pub enabled: bool,
    pub cluster_issuer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressSettings {
    pub class: String,
    pub domain_suffix: String,
    pub tls: TlsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub prune: bool,
    pub self_heal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitOpsSettings {
    pub project: String,
    pub server: String,
    /// Destination namespace; empty means "the namespace of the invocation".
    pub namespace: String,
    /// Repository path holding the manifests. The CI pipeline patches
    /// `<path>/deployment.yaml`.
    pub path: String,
    pub target_revision: String,
    pub sync_policy: SyncSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiSettings {
    pub provider: String,
    pub registry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub version: String,
    pub org: OrgSettings,
    pub naming: NamingSettings,
    pub defaults: DefaultSettings,
    pub resources: ResourceSettings,
    pub labels: CustomMap,
    pub annotations: CustomMap,
    pub security: SecuritySettings,
    pub ingress: IngressSettings,
    #[serde(alias = "argocd")]
    pub gitops: GitOpsSettings,
    pub ci: CiSettings,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EffectiveConfig {
    /// The configuration produced by the built-in defaults alone.
    pub fn builtin() -> Self {
        let empty = ConfigLayer::default();
        resolve(&ConfigLayer::builtin(), &empty, &empty, &empty, &empty)
    }

    /// Named profile if present, else the default resource spec. An unknown
    /// profile name is not an error.
    pub fn resources_for_profile(&self, profile: &str) -> &ResourceSpec {
        self.resources
            .profiles
            .get(profile)
            .unwrap_or(&self.resources.defaults)
    }

    /// Render the Kubernetes object name for an application using
    /// `naming.pattern`.
    pub fn resource_name(&self, app: &str) -> String {
        let rendered = self
            .naming
            .pattern
            .replace("{app}", app)
            .replace("{org}", &self.org.name);
        let rendered = if rendered.is_empty() {
            app.to_string()
        } else {
            rendered
        };
        if self.naming.dns_safe {
            dns_safe(&rendered)
        } else {
            rendered
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

static DNS_UNSAFE_RE: OnceLock<Regex> = OnceLock::new();

fn dns_unsafe_re() -> &'static Regex {
    DNS_UNSAFE_RE.get_or_init(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"))
}

fn dns_safe(name: &str) -> String {
    let lowered = name.to_lowercase();
    dns_unsafe_re()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

// ---------------------------------------------------------------------------
// ConfigLayer: one partially populated configuration source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceValuesLayer {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceSpecLayer {
    pub requests: ResourceValuesLayer,
    pub limits: ResourceValuesLayer,
}

impl ResourceSpecLayer {
    fn of(req_cpu: &str, req_mem: &str, lim_cpu: &str, lim_mem: &str) -> Self {
        Self {
            requests: ResourceValuesLayer {
                cpu: Some(req_cpu.to_string()),
                memory: Some(req_mem.to_string()),
            },
            limits: ResourceValuesLayer {
                cpu: Some(lim_cpu.to_string()),
                memory: Some(lim_mem.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrgLayer {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamingLayer {
    pub pattern: Option<String>,
    pub dns_safe: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DefaultsLayer {
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourcesLayer {
    pub defaults: ResourceSpecLayer,
    pub profiles: BTreeMap<String, ResourceSpecLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CustomMapLayer {
    pub custom: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SecurityLayer {
    pub enforce_baseline: Option<bool>,
    pub seccomp_profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TlsLayer {
    pub enabled: Option<bool>,
    pub cluster_issuer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngressLayer {
    pub class: Option<String>,
    pub domain_suffix: Option<String>,
    pub tls: TlsLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncLayer {
    pub prune: Option<bool>,
    pub self_heal: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GitOpsLayer {
    pub project: Option<String>,
    pub server: Option<String>,
    pub namespace: Option<String>,
    pub path: Option<String>,
    pub target_revision: Option<String>,
    pub sync_policy: SyncLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CiLayer {
    pub provider: Option<String>,
    pub registry: Option<String>,
}

/// A configuration source in which every field may be unset. Five of these
/// (CLI, per-app, workspace, global, built-in) are merged by [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub version: Option<String>,
    pub org: OrgLayer,
    pub naming: NamingLayer,
    pub defaults: DefaultsLayer,
    pub resources: ResourcesLayer,
    pub labels: CustomMapLayer,
    pub annotations: CustomMapLayer,
    pub security: SecurityLayer,
    pub ingress: IngressLayer,
    #[serde(alias = "argocd")]
    pub gitops: GitOpsLayer,
    pub ci: CiLayer,
}

impl ConfigLayer {
    /// Built-in defaults: the lowest-precedence layer.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "api".to_string(),
            ResourceSpecLayer::of("100m", "256Mi", "1000m", "1Gi"),
        );
        profiles.insert(
            "worker".to_string(),
            ResourceSpecLayer::of("500m", "512Mi", "2000m", "2Gi"),
        );
        profiles.insert(
            "web".to_string(),
            ResourceSpecLayer::of("50m", "128Mi", "500m", "512Mi"),
        );

        Self {
            version: Some("1".to_string()),
            org: OrgLayer::default(),
            naming: NamingLayer {
                pattern: Some("{app}".to_string()),
                dns_safe: Some(true),
            },
            defaults: DefaultsLayer {
                namespace: Some("default".to_string()),
            },
            resources: ResourcesLayer {
                defaults: ResourceSpecLayer::of("100m", "128Mi", "500m", "512Mi"),
                profiles,
            },
            labels: CustomMapLayer::default(),
            annotations: CustomMapLayer::default(),
            security: SecurityLayer {
                enforce_baseline: Some(true),
                seccomp_profile: Some("RuntimeDefault".to_string()),
            },
            ingress: IngressLayer {
                class: Some("nginx".to_string()),
                domain_suffix: Some(".local".to_string()),
                tls: TlsLayer {
                    enabled: Some(false),
                    cluster_issuer: None,
                },
            },
            gitops: GitOpsLayer {
                project: Some("default".to_string()),
                server: Some("https://kubernetes.default.svc".to_string()),
                namespace: None,
                path: Some("k8s".to_string()),
                target_revision: Some("HEAD".to_string()),
                sync_policy: SyncLayer {
                    prune: Some(false),
                    self_heal: Some(false),
                },
            },
            ci: CiLayer {
                provider: Some("github-actions".to_string()),
                registry: None,
            },
        }
    }

    /// Layer holding only a namespace and a registry: the shape of CLI flag
    /// overrides and of the per-app config projection.
    pub fn with_overrides(namespace: Option<String>, registry: Option<String>) -> Self {
        Self {
            defaults: DefaultsLayer { namespace },
            ci: CiLayer {
                registry,
                ..CiLayer::default()
            },
            ..Self::default()
        }
    }

    /// Parse a layer from YAML text. Empty text is an empty layer.
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Load a layer from disk. A missing file is an empty layer; a malformed
    /// file is an error the caller downgrades to a warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

fn text(layers: &[&ConfigLayer], get: fn(&ConfigLayer) -> Option<&String>) -> String {
    layered(layers, get).unwrap_or_default()
}

fn flag(layers: &[&ConfigLayer], get: fn(&ConfigLayer) -> Option<&bool>) -> bool {
    layered(layers, get).unwrap_or(false)
}

fn resource_spec(layers: &[&ResourceSpecLayer], fallback: Option<&ResourceSpec>) -> ResourceSpec {
    let pick = |get: fn(&ResourceSpecLayer) -> Option<&String>, base: Option<&String>| {
        first_set([layered(layers, get).as_ref(), base])
            .cloned()
            .unwrap_or_default()
    };
    ResourceSpec {
        requests: ResourceValues {
            cpu: pick(|r| r.requests.cpu.as_ref(), fallback.map(|f| &f.requests.cpu)),
            memory: pick(
                |r| r.requests.memory.as_ref(),
                fallback.map(|f| &f.requests.memory),
            ),
        },
        limits: ResourceValues {
            cpu: pick(|r| r.limits.cpu.as_ref(), fallback.map(|f| &f.limits.cpu)),
            memory: pick(
                |r| r.limits.memory.as_ref(),
                fallback.map(|f| &f.limits.memory),
            ),
        },
    }
}

fn resolve_resources(layers: &[&ConfigLayer]) -> ResourceSettings {
    let default_layers: Vec<&ResourceSpecLayer> =
        layers.iter().map(|l| &l.resources.defaults).collect();
    let defaults = resource_spec(&default_layers, None);

    let names: BTreeSet<&String> = layers
        .iter()
        .flat_map(|l| l.resources.profiles.keys())
        .collect();
    let profiles = names
        .into_iter()
        .map(|name| {
            let profile_layers: Vec<&ResourceSpecLayer> = layers
                .iter()
                .filter_map(|l| l.resources.profiles.get(name))
                .collect();
            (name.clone(), resource_spec(&profile_layers, Some(&defaults)))
        })
        .collect();

    ResourceSettings { defaults, profiles }
}

/// Merge the five configuration sources into one [`EffectiveConfig`].
///
/// Precedence per field, highest first: `cli`, `app`, `workspace`, `global`,
/// `defaults`. Scalars take the first set value; label, annotation and
/// resource-profile maps merge additively with the higher source winning a
/// key collision. Never fails: an empty layer simply defers downward.
pub fn resolve(
    defaults: &ConfigLayer,
    global: &ConfigLayer,
    workspace: &ConfigLayer,
    app: &ConfigLayer,
    cli: &ConfigLayer,
) -> EffectiveConfig {
    let layers = [cli, app, workspace, global, defaults];
    let l = &layers[..];

    EffectiveConfig {
        version: text(l, |c| c.version.as_ref()),
        org: OrgSettings {
            name: text(l, |c| c.org.name.as_ref()),
        },
        naming: NamingSettings {
            pattern: text(l, |c| c.naming.pattern.as_ref()),
            dns_safe: flag(l, |c| c.naming.dns_safe.as_ref()),
        },
        defaults: DefaultSettings {
            namespace: text(l, |c| c.defaults.namespace.as_ref()),
        },
        resources: resolve_resources(l),
        labels: CustomMap {
            custom: layered_map(l, |c| Some(&c.labels.custom)),
        },
        annotations: CustomMap {
            custom: layered_map(l, |c| Some(&c.annotations.custom)),
        },
        security: SecuritySettings {
            enforce_baseline: flag(l, |c| c.security.enforce_baseline.as_ref()),
            seccomp_profile: text(l, |c| c.security.seccomp_profile.as_ref()),
        },
        ingress: IngressSettings {
            class: text(l, |c| c.ingress.class.as_ref()),
            domain_suffix: text(l, |c| c.ingress.domain_suffix.as_ref()),
            tls: TlsSettings {
                enabled: flag(l, |c| c.ingress.tls.enabled.as_ref()),
                cluster_issuer: text(l, |c| c.ingress.tls.cluster_issuer.as_ref()),
            },
        },
        gitops: GitOpsSettings {
            project: text(l, |c| c.gitops.project.as_ref()),
            server: text(l, |c| c.gitops.server.as_ref()),
            namespace: text(l, |c| c.gitops.namespace.as_ref()),
            path: text(l, |c| c.gitops.path.as_ref()),
            target_revision: text(l, |c| c.gitops.target_revision.as_ref()),
            sync_policy: SyncSettings {
                prune: flag(l, |c| c.gitops.sync_policy.prune.as_ref()),
                self_heal: flag(l, |c| c.gitops.sync_policy.self_heal.as_ref()),
            },
        },
        ci: CiSettings {
            provider: text(l, |c| c.ci.provider.as_ref()),
            registry: text(l, |c| c.ci.registry.as_ref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
